//! Agent integration tests against a local mock HTTP server.
//!
//! Run with: `cargo test -p centri-agent --test integration`

use std::sync::{Arc, Mutex};

use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use centri_agent::*;

const KEY: &str = "test-api-key";

fn ok(result: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "result": result }))
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(header("X-API-Key", KEY))
        .and(header("Content-Type", "application/json"))
        .respond_with(response)
        .mount(server)
        .await;
}

/// Counts fulfilled/failed events for one agent.
#[derive(Default)]
struct EventLog {
    fulfilled: Mutex<Vec<RequestEvent>>,
    failed: Mutex<Vec<RequestEvent>>,
}

impl RequestObserver for EventLog {
    fn on_fulfilled(&self, event: &RequestEvent) {
        self.fulfilled.lock().unwrap().push(event.clone());
    }

    fn on_failed(&self, event: &RequestEvent) {
        self.failed.lock().unwrap().push(event.clone());
    }
}

/// Find a port with nothing listening on it.
fn find_free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

fn agent_for(server: &MockServer) -> (CentriAgent, Arc<EventLog>) {
    let log = Arc::new(EventLog::default());
    let agent = CentriAgent::builder(server.uri(), KEY)
        .observer(log.clone())
        .build()
        .expect("agent builds");
    (agent, log)
}

#[tokio::test]
async fn test_info_resolves_result() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/info"))
        .and(body_json(json!({})))
        .respond_with(ok(json!({"nodes": []})))
        .expect(1)
        .mount(&server)
        .await;

    let (agent, log) = agent_for(&server);
    let info = agent.info(&InfoRequest {}).await.unwrap();
    assert!(info.nodes.is_empty());
    assert_eq!(log.fulfilled.lock().unwrap().len(), 1);
    assert!(log.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_channels_resolves_result() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/channels",
        ok(json!({"channels": {"a": {"num_clients": 2}}})),
    )
    .await;

    let (agent, _) = agent_for(&server);
    let resp = agent.channels(&ChannelsRequest::default()).await.unwrap();
    assert_eq!(resp.channels.len(), 1);
    assert_eq!(resp.channels["a"].num_clients, 2);

    // Raw dispatch returns the result object untouched.
    let raw = agent.call("/channels", &json!({})).await.unwrap();
    assert_eq!(raw, json!({"channels": {"a": {"num_clients": 2}}}));
}

#[tokio::test]
async fn test_http_500_is_transport_error() {
    let server = MockServer::start().await;
    mount(&server, "/publish", ResponseTemplate::new(500)).await;

    let (agent, log) = agent_for(&server);
    let err = agent
        .publish(&PublishRequest::new("news", json!({"text": "hi"})))
        .await
        .unwrap_err();

    assert!(err.is_transport());
    assert_eq!(err.status(), Some(500));
    assert!(err.to_string().contains("500"));

    let failed = log.failed.lock().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].path, "/publish");
    assert!(log.fulfilled.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_envelope_error_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/subscribe"))
        .and(body_json(json!({"user": "u1", "channel": "c1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "result": {},
            "error": {"code": 108, "message": "unknown channel"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (agent, log) = agent_for(&server);
    let err = agent
        .subscribe(&SubscribeRequest::new("u1", "c1"))
        .await
        .unwrap_err();

    let api = match err {
        Error::Api(api) => api,
        other => panic!("expected API error, got {other:?}"),
    };
    assert_eq!(api.code, 108);
    assert_eq!(api.message, "unknown channel");
    assert_eq!(log.failed.lock().unwrap().len(), 1);
    assert!(log.fulfilled.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_every_method_posts_its_body_to_its_path() {
    let server = MockServer::start().await;
    for m in Method::ALL {
        mount(&server, m.path(), ok(json!({}))).await;
    }
    let (agent, log) = agent_for(&server);

    let publish = PublishRequest::new("news", json!({"n": 1})).skip_history(true);
    let broadcast = BroadcastRequest::new(["a", "b"], json!({"n": 2}));
    let subscribe = SubscribeRequest::new("u1", "c1").client("client-1");
    let unsubscribe = UnsubscribeRequest::new("u1", "c1");
    let disconnect = DisconnectRequest::new("u1").reason(4000, "bye");
    let refresh = RefreshRequest::new("u1").expired(true);
    let presence = PresenceRequest::new("c1");
    let presence_stats = PresenceStatsRequest::new("c1");
    let history = HistoryRequest::new("c1")
        .limit(10)
        .since(StreamPosition::new(5, "ep"))
        .reverse(true);
    let history_remove = HistoryRemoveRequest::new("c1");
    let channels = ChannelsRequest::matching("chat:*");
    let info = InfoRequest {};

    agent.publish(&publish).await.unwrap();
    agent.broadcast(&broadcast).await.unwrap();
    agent.subscribe(&subscribe).await.unwrap();
    agent.unsubscribe(&unsubscribe).await.unwrap();
    agent.disconnect(&disconnect).await.unwrap();
    agent.refresh(&refresh).await.unwrap();
    agent.presence(&presence).await.unwrap();
    agent.presence_stats(&presence_stats).await.unwrap();
    agent.history(&history).await.unwrap();
    agent.history_remove(&history_remove).await.unwrap();
    agent.channels(&channels).await.unwrap();
    agent.info(&info).await.unwrap();

    let expected: Vec<(&str, Value)> = vec![
        ("/publish", serde_json::to_value(&publish).unwrap()),
        ("/broadcast", serde_json::to_value(&broadcast).unwrap()),
        ("/subscribe", serde_json::to_value(&subscribe).unwrap()),
        ("/unsubscribe", serde_json::to_value(&unsubscribe).unwrap()),
        ("/disconnect", serde_json::to_value(&disconnect).unwrap()),
        ("/refresh", serde_json::to_value(&refresh).unwrap()),
        ("/presence", serde_json::to_value(&presence).unwrap()),
        ("/presence_stats", serde_json::to_value(&presence_stats).unwrap()),
        ("/history", serde_json::to_value(&history).unwrap()),
        ("/history_remove", serde_json::to_value(&history_remove).unwrap()),
        ("/channels", serde_json::to_value(&channels).unwrap()),
        ("/info", serde_json::to_value(&info).unwrap()),
    ];

    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), expected.len());
    for (request, (route, body)) in received.iter().zip(&expected) {
        assert_eq!(request.method.as_str(), "POST");
        assert_eq!(request.url.path(), *route);
        let sent: Value = serde_json::from_slice(&request.body).unwrap();
        assert_eq!(&sent, body, "body for {route}");
    }

    // Spot-check a few wire bodies against the literal shapes.
    assert_eq!(
        expected[4].1,
        json!({"user": "u1", "disconnect": {"code": 4000, "reason": "bye"}})
    );
    assert_eq!(
        expected[8].1,
        json!({"channel": "c1", "limit": 10, "since": {"offset": 5, "epoch": "ep"}, "reverse": true})
    );

    assert_eq!(log.fulfilled.lock().unwrap().len(), 12);
    assert!(log.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_idempotency_key_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/publish"))
        .and(body_json(json!({
            "channel": "news",
            "data": {"text": "hi"},
            "idempotency_key": "k-1"
        })))
        .respond_with(ok(json!({"offset": 1, "epoch": "e"})))
        .expect(2)
        .mount(&server)
        .await;

    let (agent, _) = agent_for(&server);
    let request = PublishRequest::new("news", json!({"text": "hi"})).idempotency_key("k-1");

    // No client-side dedup: both calls reach the server.
    let first = agent.publish(&request).await.unwrap();
    let second = agent.publish(&request).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.offset, Some(1));
}

#[tokio::test]
async fn test_base_url_trailing_slashes_are_stripped() {
    let server = MockServer::start().await;
    mount(&server, "/info", ok(json!({"nodes": []}))).await;

    for base in [
        format!("{}/", server.uri()),
        format!("{}//", server.uri()),
        server.uri(),
    ] {
        let agent = CentriAgent::new(base, KEY).unwrap();
        assert_eq!(agent.base_url(), server.uri());
        agent.info(&InfoRequest {}).await.unwrap();
    }

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
    for request in &received {
        assert_eq!(request.url.path(), "/info");
    }
}

#[tokio::test]
async fn test_batch_replies_align_with_commands() {
    let server = MockServer::start().await;
    let batch = BatchRequest::new()
        .command(PublishRequest::new("news", json!({"n": 1})))
        .command(PresenceStatsRequest::new("news"))
        .command(HistoryRequest::new("news").limit(1))
        .command(InfoRequest {});

    Mock::given(method("POST"))
        .and(path("/batch"))
        .and(body_json(json!({"commands": [
            {"publish": {"channel": "news", "data": {"n": 1}}},
            {"presence_stats": {"channel": "news"}},
            {"history": {"channel": "news", "limit": 1}},
            {"info": {}}
        ]})))
        .respond_with(ok(json!({"replies": [
            {"publish": {"offset": 4, "epoch": "e"}},
            {"presence_stats": {"num_clients": 3, "num_users": 2}},
            {"error": {"code": 108, "message": "not available"}},
            {"info": {"nodes": [{"uid": "n1", "name": "node", "num_clients": 3}]}}
        ]})))
        .expect(1)
        .mount(&server)
        .await;

    let (agent, log) = agent_for(&server);
    let resp = agent.batch(&batch).await.unwrap();

    assert_eq!(resp.len(), batch.len());
    resp.check_alignment(&batch.commands).unwrap();

    let mut replies = resp.replies.into_iter();
    let publish = replies.next().unwrap().into_response::<PublishRequest>().unwrap();
    assert_eq!(publish.offset, Some(4));
    let stats = replies
        .next()
        .unwrap()
        .into_response::<PresenceStatsRequest>()
        .unwrap();
    assert_eq!(stats.num_clients, 3);
    let history = replies.next().unwrap().into_response::<HistoryRequest>();
    assert_eq!(history.unwrap_err().api_code(), Some(108));
    let info = replies.next().unwrap().into_response::<InfoRequest>().unwrap();
    assert_eq!(info.nodes[0].name, "node");

    // A per-command error is not a call failure.
    assert_eq!(log.fulfilled.lock().unwrap().len(), 1);
    assert!(log.failed.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_invalid_json_body() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/presence",
        ResponseTemplate::new(200).set_body_string("<html>gateway</html>"),
    )
    .await;

    let (strict, log) = agent_for(&server);
    let err = strict.presence(&PresenceRequest::new("c1")).await.unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(log.failed.lock().unwrap().len(), 1);

    let lenient = CentriAgent::builder(server.uri(), KEY)
        .invalid_json(InvalidJsonPolicy::Empty)
        .build()
        .unwrap();
    let resp = lenient.presence(&PresenceRequest::new("c1")).await.unwrap();
    assert!(resp.presence.is_empty());
}

#[tokio::test]
async fn test_unreachable_server_fires_failed() {
    let uri = format!("http://127.0.0.1:{}", find_free_port());

    let log = Arc::new(EventLog::default());
    let agent = CentriAgent::builder(uri, KEY)
        .observer(log.clone())
        .build()
        .unwrap();

    let err = agent.info(&InfoRequest {}).await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(TransportError::Request(_))
    ));
    assert_eq!(log.failed.lock().unwrap().len(), 1);
    assert!(log.fulfilled.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_concurrent_calls_on_clones() {
    let server = MockServer::start().await;
    mount(&server, "/presence_stats", ok(json!({"num_clients": 1, "num_users": 1}))).await;

    let (agent, log) = agent_for(&server);
    let mut handles = Vec::new();
    for i in 0..8 {
        let agent = agent.clone();
        handles.push(tokio::spawn(async move {
            agent
                .presence_stats(&PresenceStatsRequest::new(format!("c{i}")))
                .await
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap().num_users, 1);
    }
    assert_eq!(log.fulfilled.lock().unwrap().len(), 8);
}
