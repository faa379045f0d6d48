//! End-to-end tests for `StreamConnection` against a local axum SSE server.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream, StreamExt};
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;
use vitrine_stream::{BackoffConfig, Received, StreamConfig, StreamConnection};
use vitrine_types::{Envelope, EventName, StoreId};

/// Request details recorded by the test server.
#[derive(Debug, Clone)]
struct SeenRequest {
    store_id: String,
    authorization: Option<String>,
    last_event_id: Option<String>,
}

struct TestServer {
    /// `(id, data)` pairs served on every connection.
    events: Vec<(String, String)>,
    /// When set, the first connection ends after one event.
    hang_up_first: bool,
    requests: Mutex<Vec<SeenRequest>>,
}

async fn events_handler(
    State(server): State<Arc<TestServer>>,
    Path(store_id): Path<String>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let connection_index = {
        let mut requests = server.requests.lock().unwrap();
        requests.push(SeenRequest {
            store_id,
            authorization: header("authorization"),
            last_event_id: header("last-event-id"),
        });
        requests.len()
    };

    let events: Vec<Result<Event, Infallible>> = server
        .events
        .iter()
        .map(|(id, data)| Ok(Event::default().id(id.clone()).data(data.clone())))
        .collect();

    let stream = if server.hang_up_first && connection_index == 1 {
        stream::iter(events.into_iter().take(1)).boxed()
    } else {
        stream::iter(events).chain(stream::pending()).boxed()
    };
    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn start_server(server: TestServer) -> (Url, Arc<TestServer>) {
    let server = Arc::new(server);
    let app = Router::new()
        .route("/stores/{store_id}/events", get(events_handler))
        .with_state(server.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (Url::parse(&format!("http://{addr}/")).unwrap(), server)
}

fn fast_backoff() -> BackoffConfig {
    BackoffConfig {
        initial: Duration::from_millis(10),
        max: Duration::from_millis(50),
        multiplier: 2,
        jitter: false,
    }
}

async fn next_within(connection: &mut StreamConnection) -> Received {
    tokio::time::timeout(Duration::from_secs(5), connection.next())
        .await
        .expect("timed out waiting for envelope")
        .expect("connection closed")
}

fn event(id: &str, data: &str) -> (String, String) {
    (id.to_string(), data.to_string())
}

#[tokio::test]
async fn delivers_envelopes_in_order_and_drops_malformed_frames() {
    let (base, _server) = start_server(TestServer {
        events: vec![
            event("1", r#"{"type":"notification","message":"Olá"}"#),
            event("2", "{definitely not json"),
            event(
                "3",
                r#"{"type":"webhook_event","event":"store.viewed","data":{}}"#,
            ),
        ],
        hang_up_first: false,
        requests: Mutex::new(Vec::new()),
    })
    .await;

    let config = StreamConfig::new(base, StoreId::from("loja-1")).with_backoff(fast_backoff());
    let mut connection = StreamConnection::open(config).unwrap();

    let first = next_within(&mut connection).await;
    assert_eq!(first.seq, 1);
    assert_eq!(
        first.envelope,
        Envelope::Notification {
            message: "Olá".to_string()
        }
    );

    let second = next_within(&mut connection).await;
    assert_eq!(second.seq, 2);
    assert_eq!(second.envelope.event_name(), Some(&EventName::StoreViewed));

    connection.close();
}

#[tokio::test]
async fn sends_bearer_token_and_store_path() {
    let (base, server) = start_server(TestServer {
        events: vec![event("1", r#"{"type":"notification","message":"x"}"#)],
        hang_up_first: false,
        requests: Mutex::new(Vec::new()),
    })
    .await;

    let config = StreamConfig::new(base, StoreId::from("loja-42"))
        .with_token(Some("s3cret".to_string()))
        .with_backoff(fast_backoff());
    let mut connection = StreamConnection::open(config).unwrap();
    next_within(&mut connection).await;

    let requests = server.requests.lock().unwrap().clone();
    assert_eq!(requests[0].store_id, "loja-42");
    assert_eq!(requests[0].authorization.as_deref(), Some("Bearer s3cret"));
}

#[tokio::test]
async fn omits_authorization_without_token() {
    let (base, server) = start_server(TestServer {
        events: vec![event("1", r#"{"type":"notification","message":"x"}"#)],
        hang_up_first: false,
        requests: Mutex::new(Vec::new()),
    })
    .await;

    let config = StreamConfig::new(base, StoreId::from("loja-1")).with_backoff(fast_backoff());
    let mut connection = StreamConnection::open(config).unwrap();
    next_within(&mut connection).await;

    let requests = server.requests.lock().unwrap().clone();
    assert_eq!(requests[0].authorization, None);
}

#[tokio::test]
async fn reconnects_after_hang_up_without_redelivering() {
    let (base, server) = start_server(TestServer {
        events: vec![
            event("a1", r#"{"type":"notification","message":"primeira"}"#),
            event("a2", r#"{"type":"notification","message":"segunda"}"#),
        ],
        hang_up_first: true,
        requests: Mutex::new(Vec::new()),
    })
    .await;

    let config = StreamConfig::new(base, StoreId::from("loja-1")).with_backoff(fast_backoff());
    let mut connection = StreamConnection::open(config).unwrap();

    let first = next_within(&mut connection).await;
    let second = next_within(&mut connection).await;
    assert_eq!((first.seq, second.seq), (1, 2));
    assert_eq!(
        second.envelope,
        Envelope::Notification {
            message: "segunda".to_string()
        }
    );

    // The replayed "a1" on the second connection must not come through.
    let extra = tokio::time::timeout(Duration::from_millis(200), connection.next()).await;
    assert!(extra.is_err(), "unexpected extra envelope: {extra:?}");

    let requests = server.requests.lock().unwrap().clone();
    assert!(requests.len() >= 2);
    assert_eq!(requests[0].last_event_id, None);
    assert_eq!(requests[1].last_event_id.as_deref(), Some("a1"));
}

#[tokio::test]
async fn unreachable_endpoint_keeps_retrying_quietly() {
    // Bind then drop a listener to get a port nobody is serving.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base = Url::parse(&format!("http://{addr}/")).unwrap();
    let config = StreamConfig::new(base, StoreId::from("loja-1")).with_backoff(fast_backoff());
    let mut connection = StreamConnection::open(config).unwrap();

    let result = tokio::time::timeout(Duration::from_millis(300), connection.next()).await;
    assert!(result.is_err(), "no envelope should arrive from a dead endpoint");
    connection.close();
}
