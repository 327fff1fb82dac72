//! HTTP and WebSocket handlers for the two listeners.
//!
//! The webhook listener has a single route, `POST /`, that runs the
//! verify → normalize → distribute pipeline. The dashboard listener serves
//! the query endpoints, the pause controls and the `/ws` live feed.

use crate::{
    config::PlatformConfig,
    connection::{ConnectionId, SubscriberHub},
    error::UpstreamError,
    messaging::{route_subscriber_message, ResumeResponse},
    upstream::EventSource,
};
use axum::{
    body::Bytes,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use monitor_events::{
    Event, EventTypeSummary, IngestOutcome, MonitorStore, PauseStatus, ShutdownState,
    SignatureVerifier, StatsSample,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, error, trace, warn};

/// Everything a handler needs, shared by both routers.
#[derive(Clone)]
pub struct MonitorState {
    /// Cache, statistics and pause state
    pub store: Arc<MonitorStore>,
    /// Live subscribers
    pub hub: Arc<SubscriberHub>,
    /// Webhook signature verifier
    pub verifier: Arc<SignatureVerifier>,
    /// The platform's own event list
    pub upstream: Arc<dyn EventSource>,
    /// Platform settings (dashboard URL, header name, list size)
    pub platform: Arc<PlatformConfig>,
    /// Lets long-lived sockets notice shutdown
    pub shutdown: ShutdownState,
}

/// Body of `GET /environment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentResponse {
    /// Platform dashboard for the configured key's mode
    #[serde(rename = "dashboardUrl")]
    pub dashboard_url: String,
}

/// Query string of `GET /events`.
#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    /// Maximum number of events; all when absent
    pub limit: Option<usize>,
}

/// Builds the router for the webhook listener.
pub fn webhook_router(state: MonitorState) -> Router {
    Router::new()
        .route("/", post(receive_webhook))
        .with_state(state)
}

/// Builds the router for the dashboard listener.
pub fn dashboard_router(state: MonitorState) -> Router {
    Router::new()
        .route("/environment", get(environment))
        .route("/recent-events", get(recent_events))
        .route("/events", get(cached_events))
        .route("/stats", get(stats_window))
        .route("/event-types", get(event_types))
        .route("/pause", get(pause_status).post(pause))
        .route("/resume", post(resume))
        .route("/ws", get(subscribe))
        .with_state(state)
}

/// Handles one webhook delivery.
///
/// Answers `200` only after the event is distributed (or queued while
/// paused), and `400` for any verification or parse failure. A duplicate
/// delivery is acknowledged so the platform stops retrying it.
pub async fn receive_webhook(
    State(state): State<MonitorState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(state.platform.signature_header.as_str())
        .and_then(|value| value.to_str().ok());

    let event = match state.verifier.verify(&body, signature) {
        Ok(event) => event,
        Err(e) => {
            warn!("🚫 Rejected webhook: {}", e);
            return StatusCode::BAD_REQUEST;
        }
    };

    let event_id = event.id.clone();
    let event_type = event.event_type.clone();
    match state.store.ingest(event).await {
        IngestOutcome::Distributed { subscribers } => {
            debug!(%event_id, %event_type, subscribers, "📨 Webhook accepted");
        }
        IngestOutcome::Queued { position } => {
            debug!(%event_id, %event_type, position, "⏸️ Webhook queued while paused");
        }
        IngestOutcome::Duplicate => {
            debug!(%event_id, "🔁 Duplicate webhook acknowledged");
        }
    }
    StatusCode::OK
}

async fn environment(State(state): State<MonitorState>) -> Json<EnvironmentResponse> {
    Json(EnvironmentResponse {
        dashboard_url: state.platform.dashboard_url(),
    })
}

async fn recent_events(State(state): State<MonitorState>) -> Result<Json<Vec<Event>>, UpstreamError> {
    let limit = state.platform.recent_events_limit;
    let mut events = state.upstream.list_events(limit).await?;
    events.truncate(limit);
    Ok(Json(events))
}

async fn cached_events(
    State(state): State<MonitorState>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<Event>> {
    Json(state.store.recent_events(query.limit).await)
}

async fn stats_window(State(state): State<MonitorState>) -> Json<Vec<StatsSample>> {
    Json(state.store.stats_window().await)
}

async fn event_types(State(state): State<MonitorState>) -> Json<Vec<EventTypeSummary>> {
    Json(state.store.event_types().await)
}

async fn pause_status(State(state): State<MonitorState>) -> Json<PauseStatus> {
    Json(state.store.pause_status().await)
}

async fn pause(State(state): State<MonitorState>) -> Json<PauseStatus> {
    Json(state.store.pause_with_status().await)
}

async fn resume(State(state): State<MonitorState>) -> Json<ResumeResponse> {
    let (flushed, status) = state.store.resume_with_status().await;
    Json(ResumeResponse {
        paused: status.paused,
        queued: status.queued,
        flushed,
    })
}

async fn subscribe(
    State(state): State<MonitorState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| handle_subscriber(socket, addr, state))
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        warn!("Upstream request failed: {}", self);
        (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": self.to_string() })),
        )
            .into_response()
    }
}

/// Handles a single subscriber from upgrade to cleanup.
///
/// # Connection Flow
///
/// 1. Register with the hub and obtain the outbound queue
/// 2. Outgoing task: drain the queue into the socket
/// 3. Incoming task: apply control messages and reply through the hub
/// 4. Stop when either task ends or shutdown begins, then unregister
///
/// Eviction by the hub closes the queue, which ends the outgoing task and
/// closes the socket.
pub async fn handle_subscriber(socket: WebSocket, addr: SocketAddr, state: MonitorState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (connection_id, mut outbound) = state.hub.add_subscriber(addr);

    let outgoing_task = async move {
        while let Some(frame) = outbound.recv().await {
            if let Err(e) = ws_sender.send(Message::Text(frame.to_string().into())).await {
                debug!("Failed to send to subscriber {}: {}", connection_id, e);
                return;
            }
        }
        // queue closed: evicted or shutting down
        let _ = ws_sender.send(Message::Close(None)).await;
    };

    let incoming_task = {
        let store = state.store.clone();
        let hub = state.hub.clone();
        async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        reply(&hub, connection_id, &route_subscriber_message(text.as_str(), &store).await);
                    }
                    Ok(Message::Close(_)) => {
                        debug!("🔌 Subscriber {} requested close", connection_id);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        trace!("WebSocket error for subscriber {}: {}", connection_id, e);
                        break;
                    }
                }
            }
        }
    };

    tokio::select! {
        _ = outgoing_task => {},
        _ = incoming_task => {},
        _ = state.shutdown.wait() => {},
    }

    state.hub.remove_subscriber(connection_id);
}

fn reply<T: Serialize>(hub: &SubscriberHub, connection_id: ConnectionId, message: &T) {
    match serde_json::to_string(message) {
        Ok(frame) => {
            hub.send_to(connection_id, Arc::from(frame));
        }
        Err(e) => error!("Failed to serialize reply: {}", e),
    }
}
