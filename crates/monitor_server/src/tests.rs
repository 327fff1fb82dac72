// Include tests
#[cfg(test)]
mod tests {
    use crate::*;
    use async_trait::async_trait;
    use futures_util::{SinkExt, StreamExt};
    use monitor_events::{
        current_timestamp, signature_header, Event, ShutdownState, StatsConfig,
    };
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio::task::JoinHandle;
    use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

    const SECRET: &str = "whsec_integration";

    type Subscriber = WebSocketStream<MaybeTlsStream<TcpStream>>;

    struct FixedSource {
        events: usize,
    }

    #[async_trait]
    impl EventSource for FixedSource {
        async fn list_events(&self, _limit: usize) -> Result<Vec<Event>, UpstreamError> {
            Ok((0..self.events)
                .map(|i| Event::from_value(payload(&format!("evt_up_{i}"), "charge.succeeded")).unwrap())
                .collect())
        }
    }

    struct DownSource;

    #[async_trait]
    impl EventSource for DownSource {
        async fn list_events(&self, _limit: usize) -> Result<Vec<Event>, UpstreamError> {
            Err(UpstreamError::Unavailable("connection refused".to_string()))
        }
    }

    struct Harness {
        dashboard: SocketAddr,
        webhook: SocketAddr,
        hub: Arc<SubscriberHub>,
        shutdown: ShutdownState,
        handle: JoinHandle<Result<(), ServerError>>,
        http: reqwest::Client,
    }

    impl Harness {
        async fn start(secret: Option<&str>, upstream: Arc<dyn EventSource>, stats: StatsConfig) -> Self {
            let config = ServerConfig {
                dashboard_address: "127.0.0.1:0".parse().unwrap(),
                webhook_address: "127.0.0.1:0".parse().unwrap(),
                subscriber_queue_capacity: 64,
                cache_max_events: None,
                platform: PlatformConfig {
                    api_key: Some("sk_test_integration".to_string()),
                    signing_secret: secret.map(str::to_string),
                    ..Default::default()
                },
                stats,
            };

            let server = MonitorServer::with_event_source(config, upstream);
            let bound = server.bind().await.expect("bind listeners");
            let dashboard = bound.dashboard_addr().unwrap();
            let webhook = bound.webhook_addr().unwrap();
            let hub = bound.state().hub.clone();

            let shutdown = ShutdownState::new();
            let handle = tokio::spawn(bound.serve(shutdown.clone()));

            Self {
                dashboard,
                webhook,
                hub,
                shutdown,
                handle,
                http: reqwest::Client::new(),
            }
        }

        async fn signed(upstream: Arc<dyn EventSource>) -> Self {
            Self::start(Some(SECRET), upstream, StatsConfig::default()).await
        }

        async fn post_webhook(&self, body: &Value, signature: Option<String>) -> reqwest::StatusCode {
            let mut request = self
                .http
                .post(format!("http://{}/", self.webhook))
                .body(serde_json::to_vec(body).unwrap());
            if let Some(signature) = signature {
                request = request.header("Stripe-Signature", signature);
            }
            request.send().await.unwrap().status()
        }

        async fn post_signed(&self, body: &Value) -> reqwest::StatusCode {
            let raw = serde_json::to_vec(body).unwrap();
            let header = signature_header(SECRET.as_bytes(), current_timestamp() as i64, &raw);
            let response = self
                .http
                .post(format!("http://{}/", self.webhook))
                .header("stripe-signature", header)
                .body(raw)
                .send()
                .await
                .unwrap();
            response.status()
        }

        async fn get(&self, path: &str) -> (reqwest::StatusCode, Value) {
            let response = self
                .http
                .get(format!("http://{}{}", self.dashboard, path))
                .send()
                .await
                .unwrap();
            let status = response.status();
            (status, response.json().await.unwrap())
        }

        async fn post(&self, path: &str) -> Value {
            self.http
                .post(format!("http://{}{}", self.dashboard, path))
                .send()
                .await
                .unwrap()
                .json()
                .await
                .unwrap()
        }

        async fn subscribe(&self) -> Subscriber {
            let expected = self.hub.subscriber_count() + 1;
            let (ws, _) = connect_async(format!("ws://{}/ws", self.dashboard))
                .await
                .expect("websocket handshake");
            tokio::time::timeout(Duration::from_secs(2), async {
                while self.hub.subscriber_count() < expected {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("subscriber registered");
            ws
        }

        async fn stop(self) {
            self.shutdown.initiate_shutdown();
            let result = tokio::time::timeout(Duration::from_secs(5), self.handle)
                .await
                .expect("server stops")
                .expect("server task");
            assert!(result.is_ok());
        }
    }

    fn payload(id: &str, event_type: &str) -> Value {
        json!({
            "id": id,
            "object": "event",
            "type": event_type,
            "created": 1_700_000_000,
            "data": { "object": { "id": "ch_1", "amount": 2000, "metadata": { "order": "42" } } }
        })
    }

    async fn next_frame(ws: &mut Subscriber, kind: &str) -> Value {
        tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Text(text))) => {
                        let frame: Value = serde_json::from_str(text.as_str()).unwrap();
                        if frame["kind"] == kind {
                            return frame;
                        }
                    }
                    Some(Ok(_)) => {}
                    other => panic!("subscriber stream ended: {other:?}"),
                }
            }
        })
        .await
        .unwrap_or_else(|_| panic!("no {kind} frame received"))
    }

    fn ids(events: &Value) -> Vec<&str> {
        events
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["id"].as_str().unwrap())
            .collect()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_signed_webhook_is_cached_counted_and_broadcast() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;
        let mut first = harness.subscribe().await;
        let mut second = harness.subscribe().await;

        assert_eq!(harness.post_signed(&payload("evt_1", "charge.succeeded")).await, 200);

        for ws in [&mut first, &mut second] {
            let frame = next_frame(ws, "event").await;
            assert_eq!(frame["data"]["id"], "evt_1");
            assert_eq!(frame["data"]["type"], "charge.succeeded");
            assert_eq!(frame["data"]["object"], "event");
        }

        let (status, events) = harness.get("/events").await;
        assert_eq!(status, 200);
        assert_eq!(ids(&events), vec!["evt_1"]);

        let (_, types) = harness.get("/event-types").await;
        assert_eq!(types[0]["type"], "charge.succeeded");
        assert_eq!(types[0]["count"], 1);
        assert!(types[0]["color"].as_str().unwrap().starts_with('#'));

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_webhooks_leave_no_trace() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;
        let body = payload("evt_bad", "charge.succeeded");
        let raw = serde_json::to_vec(&body).unwrap();
        let now = current_timestamp() as i64;

        // wrong secret
        let forged = signature_header(b"whsec_other", now, &raw);
        assert_eq!(harness.post_webhook(&body, Some(forged)).await, 400);

        // replayed outside the tolerance window
        let stale = signature_header(SECRET.as_bytes(), now - 3600, &raw);
        assert_eq!(harness.post_webhook(&body, Some(stale)).await, 400);

        // no signature at all
        assert_eq!(harness.post_webhook(&body, None).await, 400);

        // correctly signed but not an event
        assert_eq!(harness.post_signed(&json!({ "id": "evt_x", "type": "" })).await, 400);

        let (_, events) = harness.get("/events").await;
        assert!(events.as_array().unwrap().is_empty());
        let (_, types) = harness.get("/event-types").await;
        assert!(types.as_array().unwrap().is_empty());

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_insecure_mode_accepts_unsigned_but_rejects_malformed() {
        let harness = Harness::start(
            None,
            Arc::new(FixedSource { events: 0 }),
            StatsConfig::default(),
        )
        .await;

        assert_eq!(harness.post_webhook(&payload("evt_1", "invoice.paid"), None).await, 200);
        assert_eq!(harness.post_webhook(&json!({ "id": "evt_2" }), None).await, 400);

        let (_, events) = harness.get("/events").await;
        assert_eq!(ids(&events), vec!["evt_1"]);

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_ping_is_cached_but_not_broadcast() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;
        let mut ws = harness.subscribe().await;

        assert_eq!(harness.post_signed(&payload("evt_ping", "ping")).await, 200);
        assert_eq!(harness.post_signed(&payload("evt_real", "charge.succeeded")).await, 200);

        // the first event frame is the real one
        let frame = next_frame(&mut ws, "event").await;
        assert_eq!(frame["data"]["id"], "evt_real");

        let (_, events) = harness.get("/events").await;
        assert_eq!(ids(&events), vec!["evt_real", "evt_ping"]);

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_delivery_is_acknowledged_once() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;

        assert_eq!(harness.post_signed(&payload("evt_1", "charge.succeeded")).await, 200);
        assert_eq!(harness.post_signed(&payload("evt_1", "charge.succeeded")).await, 200);

        let (_, events) = harness.get("/events").await;
        assert_eq!(ids(&events), vec!["evt_1"]);
        let (_, types) = harness.get("/event-types").await;
        assert_eq!(types[0]["count"], 1);

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pause_resume_preserves_order() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;
        let mut ws = harness.subscribe().await;

        let status = harness.post("/pause").await;
        assert_eq!(status, json!({ "paused": true, "queued": 0 }));

        for id in ["e1", "e2", "e3"] {
            assert_eq!(harness.post_signed(&payload(id, "charge.succeeded")).await, 200);
        }
        let (_, status) = harness.get("/pause").await;
        assert_eq!(status, json!({ "paused": true, "queued": 3 }));
        let (_, events) = harness.get("/events").await;
        assert!(events.as_array().unwrap().is_empty());

        let resumed = harness.post("/resume").await;
        assert_eq!(resumed, json!({ "paused": false, "queued": 0, "flushed": 3 }));
        assert_eq!(harness.post_signed(&payload("e4", "charge.succeeded")).await, 200);

        for expected in ["e1", "e2", "e3", "e4"] {
            let frame = next_frame(&mut ws, "event").await;
            assert_eq!(frame["data"]["id"], expected);
        }
        let (_, events) = harness.get("/events?limit=10").await;
        assert_eq!(ids(&events), vec!["e4", "e3", "e2", "e1"]);
        let (_, events) = harness.get("/events?limit=2").await;
        assert_eq!(ids(&events), vec!["e4", "e3"]);

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_subscriber_can_drive_pause_over_socket() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;
        let mut ws = harness.subscribe().await;

        ws.send(Message::Text(r#"{"action":"pause"}"#.into())).await.unwrap();
        let reply = next_frame(&mut ws, "pause_status").await;
        assert_eq!(reply["data"], json!({ "paused": true, "queued": 0 }));

        ws.send(Message::Text(r#"{"action":"nonsense"}"#.into())).await.unwrap();
        let reply = next_frame(&mut ws, "error").await;
        assert!(reply["data"]["message"].is_string());

        // still connected after a bad command
        ws.send(Message::Text(r#"{"action":"resume"}"#.into())).await.unwrap();
        let reply = next_frame(&mut ws, "pause_status").await;
        assert_eq!(reply["data"]["paused"], false);

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stats_window_and_push() {
        let stats = StatsConfig {
            max_event_count: 10,
            interval_ms: 50,
            ..Default::default()
        };
        let harness = Harness::start(Some(SECRET), Arc::new(FixedSource { events: 0 }), stats).await;
        let mut ws = harness.subscribe().await;

        assert_eq!(harness.post_signed(&payload("evt_1", "charge.succeeded")).await, 200);

        let mut counted = 0;
        for _ in 0..10 {
            let frame = next_frame(&mut ws, "stats").await;
            assert!(frame["data"]["timestamp"].is_u64());
            counted += frame["data"]["counts"]["charge.succeeded"].as_u64().unwrap_or(0);
            if counted > 0 {
                break;
            }
        }
        assert_eq!(counted, 1);

        let (_, window) = harness.get("/stats").await;
        let window = window.as_array().unwrap();
        assert_eq!(window.len(), 10);
        let timestamps: Vec<u64> = window.iter().map(|s| s["timestamp"].as_u64().unwrap()).collect();
        assert!(timestamps.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(window.iter().all(|s| s["counts"].get("charge.succeeded").is_some()));

        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_recent_events_are_capped() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 25 })).await;
        let (status, events) = harness.get("/recent-events").await;
        assert_eq!(status, 200);
        assert_eq!(events.as_array().unwrap().len(), 20);
        assert_eq!(events[0]["id"], "evt_up_0");
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_recent_events_upstream_failure_is_bad_gateway() {
        let harness = Harness::signed(Arc::new(DownSource)).await;
        let (status, body) = harness.get("/recent-events").await;
        assert_eq!(status, 502);
        assert!(body["error"].as_str().unwrap().contains("connection refused"));

        // the rest of the dashboard is unaffected
        let (status, env) = harness.get("/environment").await;
        assert_eq!(status, 200);
        assert_eq!(env, json!({ "dashboardUrl": "https://dashboard.stripe.com/test/" }));
        harness.stop().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_closes_subscribers() {
        let harness = Harness::signed(Arc::new(FixedSource { events: 0 })).await;
        let mut ws = harness.subscribe().await;
        let hub = harness.hub.clone();

        harness.stop().await;
        assert_eq!(hub.subscriber_count(), 0);

        let closed = tokio::time::timeout(Duration::from_secs(3), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_port_in_use_is_a_network_error() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let config = ServerConfig {
            dashboard_address: taken.local_addr().unwrap(),
            webhook_address: "127.0.0.1:0".parse().unwrap(),
            ..Default::default()
        };
        let server = create_server_with_config(config).unwrap();
        assert!(matches!(server.bind().await, Err(ServerError::Network(_))));
    }
}
