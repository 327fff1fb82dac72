//! Core monitor server implementation.
//!
//! This module contains the main `MonitorServer` struct, which wires the
//! store, the subscriber hub and the platform client together, binds the
//! dashboard and webhook listeners, and runs the statistics ticker.

use crate::{
    config::ServerConfig,
    connection::SubscriberHub,
    error::ServerError,
    server::handlers::{dashboard_router, webhook_router, MonitorState},
    upstream::{EventSource, PlatformClient},
};
use monitor_events::{
    current_timestamp_millis, MonitorStore, RecentEventCache, ShutdownState, SignatureVerifier,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

/// The core monitor server structure.
///
/// `MonitorServer` owns the shared state every handler works on. Nothing is
/// bound until [`bind`](Self::bind) or
/// [`start_with_shutdown_state`](Self::start_with_shutdown_state) is called.
///
/// # Architecture
///
/// * **Store**: cache, statistics and pause state behind one lock
/// * **Subscriber Hub**: fan-out to live WebSocket subscribers
/// * **Verifier**: webhook signature checks (or insecure pass-through)
/// * **Event Source**: the platform's own event list for `/recent-events`
pub struct MonitorServer {
    /// Server configuration settings
    config: ServerConfig,

    /// Cache, aggregator and pause state
    store: Arc<MonitorStore>,

    /// Manager for live subscribers
    hub: Arc<SubscriberHub>,

    /// Webhook signature verifier
    verifier: Arc<SignatureVerifier>,

    /// Source for `/recent-events`
    upstream: Arc<dyn EventSource>,
}

/// A server whose listeners are bound but not yet serving.
pub struct BoundServer {
    state: MonitorState,
    dashboard_listener: TcpListener,
    webhook_listener: TcpListener,
    interval_ms: u64,
}

impl MonitorServer {
    /// Creates a new monitor server that lists upstream events through the
    /// platform API.
    ///
    /// # Returns
    ///
    /// A new `MonitorServer`, or a `ServerError` if the HTTP client could not
    /// be built.
    pub fn new(config: ServerConfig) -> Result<Self, ServerError> {
        let upstream = PlatformClient::new(&config.platform)
            .map_err(|e| ServerError::Internal(format!("Platform client setup failed: {e}")))?;
        Ok(Self::with_event_source(config, Arc::new(upstream)))
    }

    /// Creates a new monitor server with a custom source for
    /// `/recent-events`.
    pub fn with_event_source(config: ServerConfig, upstream: Arc<dyn EventSource>) -> Self {
        let hub = Arc::new(SubscriberHub::new(config.subscriber_queue_capacity));
        let store = Arc::new(MonitorStore::new(
            RecentEventCache::with_capacity(config.cache_max_events),
            config.stats.clone(),
            hub.clone(),
        ));
        let verifier = Arc::new(
            SignatureVerifier::from_optional(config.platform.signing_secret.as_deref())
                .with_tolerance(config.platform.signature_tolerance()),
        );

        Self {
            config,
            store,
            hub,
            verifier,
            upstream,
        }
    }

    /// Binds both listeners.
    ///
    /// Failing to bind either port is the one fatal startup error.
    pub async fn bind(&self) -> Result<BoundServer, ServerError> {
        let dashboard_listener = bind_listener(self.config.dashboard_address, "dashboard").await?;
        let webhook_listener = bind_listener(self.config.webhook_address, "webhook").await?;

        Ok(BoundServer {
            state: MonitorState {
                store: self.store.clone(),
                hub: self.hub.clone(),
                verifier: self.verifier.clone(),
                upstream: self.upstream.clone(),
                platform: Arc::new(self.config.platform.clone()),
                shutdown: ShutdownState::new(),
            },
            dashboard_listener,
            webhook_listener,
            interval_ms: self.config.stats.interval_ms,
        })
    }

    /// Binds and serves until shutdown is initiated through `shutdown_state`.
    ///
    /// # Startup Sequence
    ///
    /// 1. Bind the dashboard and webhook listeners
    /// 2. Warn once if signatures are not verified
    /// 3. Pre-populate the statistics window and start the ticker
    /// 4. Serve both routers until shutdown
    /// 5. Close subscribers and wait for the ticker to stop
    pub async fn start_with_shutdown_state(&self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        self.bind().await?.serve(shutdown_state).await
    }

    /// The shared store.
    pub fn store(&self) -> Arc<MonitorStore> {
        self.store.clone()
    }

    /// The subscriber hub.
    pub fn hub(&self) -> Arc<SubscriberHub> {
        self.hub.clone()
    }

    /// The configuration the server was built with.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl BoundServer {
    /// Actual address of the dashboard listener.
    pub fn dashboard_addr(&self) -> Result<SocketAddr, ServerError> {
        local_addr(&self.dashboard_listener)
    }

    /// Actual address of the webhook listener.
    pub fn webhook_addr(&self) -> Result<SocketAddr, ServerError> {
        local_addr(&self.webhook_listener)
    }

    /// Serves both listeners until shutdown is initiated.
    pub async fn serve(self, shutdown_state: ShutdownState) -> Result<(), ServerError> {
        let BoundServer {
            mut state,
            dashboard_listener,
            webhook_listener,
            interval_ms,
        } = self;
        state.shutdown = shutdown_state.clone();

        info!("🚀 Dashboard listening on {}", local_addr(&dashboard_listener)?);
        info!("📬 Webhooks listening on {}", local_addr(&webhook_listener)?);
        if state.verifier.is_insecure() {
            warn!("⚠️ No signing secret configured - webhook signatures are NOT verified");
        }

        state.store.initialize_stats(current_timestamp_millis()).await;
        let ticker = spawn_stats_ticker(state.store.clone(), interval_ms, shutdown_state.clone());
        info!("🕒 Stats ticker started with interval: {}ms", interval_ms);

        let hub = state.hub.clone();
        let dashboard = axum::serve(
            dashboard_listener,
            dashboard_router(state.clone()).into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(wait_for(shutdown_state.clone()))
        .into_future();
        let webhook = axum::serve(webhook_listener, webhook_router(state))
            .with_graceful_shutdown(wait_for(shutdown_state.clone()))
            .into_future();

        let served = tokio::try_join!(dashboard, webhook);

        // make sure the ticker stops even when a listener failed on its own
        shutdown_state.initiate_shutdown();
        info!("🧹 Performing server cleanup...");
        hub.close_all();
        if let Err(e) = ticker.await {
            error!("Stats ticker task failed: {}", e);
        }
        info!("✅ Server cleanup completed");

        served
            .map(|_| ())
            .map_err(|e| ServerError::Network(format!("Listener failed: {e}")))
    }

    /// The state handed to the routers.
    pub fn state(&self) -> &MonitorState {
        &self.state
    }
}

/// Spawns the periodic statistics tick.
///
/// The first tick fires one interval after start, matching the window that
/// `initialize_stats` laid out. The task ends as soon as shutdown is
/// initiated and never ticks afterwards.
pub fn spawn_stats_ticker(
    store: Arc<MonitorStore>,
    interval_ms: u64,
    shutdown_state: ShutdownState,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_millis(interval_ms.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval's first tick completes immediately
        ticker.tick().await;

        let stopped = shutdown_state.wait();
        tokio::pin!(stopped);

        loop {
            tokio::select! {
                biased;
                _ = &mut stopped => {
                    info!("🕒 Stats ticker stopping - shutdown initiated");
                    break;
                }
                _ = ticker.tick() => {
                    match store.tick(current_timestamp_millis()).await {
                        Some(sample) => trace!("📊 Stats sample with {} event(s)", sample.total()),
                        None => trace!("Stats tick skipped while paused"),
                    }
                }
            }
        }

        debug!("✅ Stats ticker loop completed gracefully");
    })
}

async fn bind_listener(address: SocketAddr, role: &str) -> Result<TcpListener, ServerError> {
    TcpListener::bind(address)
        .await
        .map_err(|e| ServerError::Network(format!("Failed to bind {role} listener on {address}: {e}")))
}

fn local_addr(listener: &TcpListener) -> Result<SocketAddr, ServerError> {
    listener
        .local_addr()
        .map_err(|e| ServerError::Network(format!("Failed to read listener address: {e}")))
}

async fn wait_for(shutdown_state: ShutdownState) {
    shutdown_state.wait().await
}
