//! End-to-end tests for the credential handoff chain
//!
//! A single mock server stands in for both the SSRA authority and the
//! gateway: the directory response points the gateway hostname back at the
//! mock, so the handoff GET and the lightsocket upgrade land on it too.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use lightsock::Error;
use lightsock::config::{Config, GatewayTarget, SsraConfig};
use lightsock::session::{Outcome, Session};
use lightsock::ssra::SsraClient;

const BEARER: &str = "Bearer tok-e2e";

/// Shared mock-server state: call counters plus whatever the handlers saw.
#[derive(Default)]
struct Mock {
    /// Own address, so the directory can point the gateway back at this server
    addr: Mutex<Option<SocketAddr>>,
    /// Gateways returned by the directory endpoint
    directory: Mutex<Vec<Value>>,
    /// Whether the handoff response carries the `user` cookie
    issue_user_cookie: std::sync::atomic::AtomicBool,
    /// Refuse the websocket upgrade outright
    ws_reject: std::sync::atomic::AtomicBool,
    connection_hits: AtomicUsize,
    handoff_hits: AtomicUsize,
    ws_hits: AtomicUsize,
    handoff_query: Mutex<Option<HashMap<String, String>>>,
    ws_cookie: Mutex<Option<String>>,
    ws_protocol: Mutex<Option<String>>,
    subscribe_frame: Mutex<Option<String>>,
}

impl Mock {
    fn own_addr(&self) -> SocketAddr {
        self.addr.lock().unwrap().expect("mock not started")
    }
}

async fn start_mock(mock: Arc<Mock>) -> SocketAddr {
    let app = Router::new()
        .route("/auth/local", post(login))
        .route("/api/v1/gateways/mine", get(gateways))
        .route("/api/v1/connections/{id}", get(connection))
        .route("/", get(handoff))
        .route("/lightsocket/websocket", get(lightsocket))
        .with_state(Arc::clone(&mock));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    *mock.addr.lock().unwrap() = Some(addr);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    addr
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] != "user@example.com" || body["password"] != "pw-e2e" {
        return (StatusCode::UNAUTHORIZED, "bad credentials").into_response();
    }
    (
        [(header::SET_COOKIE, "sessionid=S; Path=/; HttpOnly")],
        Json(json!({ "token": "tok-e2e" })),
    )
        .into_response()
}

async fn gateways(State(mock): State<Arc<Mock>>, headers: HeaderMap) -> Response {
    if !has_bearer(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let directory = mock.directory.lock().unwrap().clone();
    Json(Value::Array(directory)).into_response()
}

async fn connection(
    State(mock): State<Arc<Mock>>,
    Path(id): Path<u64>,
    headers: HeaderMap,
) -> Response {
    if !has_bearer(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    mock.connection_hits.fetch_add(1, Ordering::SeqCst);
    assert_eq!(id, 1);
    // Percent-encoded token: the client must hand the decoded value on.
    Json(json!({ "url": "http://x?token=TK%2B1&nonce=NC-42" })).into_response()
}

async fn handoff(
    State(mock): State<Arc<Mock>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !has_bearer(&headers) {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    mock.handoff_hits.fetch_add(1, Ordering::SeqCst);
    *mock.handoff_query.lock().unwrap() = Some(query);

    if mock.issue_user_cookie.load(Ordering::SeqCst) {
        ([(header::SET_COOKIE, "user=U; Path=/")], "ok").into_response()
    } else {
        "ok".into_response()
    }
}

async fn lightsocket(
    State(mock): State<Arc<Mock>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    mock.ws_hits.fetch_add(1, Ordering::SeqCst);
    if mock.ws_reject.load(Ordering::SeqCst) {
        return StatusCode::SERVICE_UNAVAILABLE.into_response();
    }
    *mock.ws_cookie.lock().unwrap() = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    *mock.ws_protocol.lock().unwrap() = headers
        .get(header::SEC_WEBSOCKET_PROTOCOL)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    ws.protocols(["echo-protocol"])
        .on_upgrade(move |socket| serve_stream(socket, mock))
}

async fn serve_stream(mut socket: WebSocket, mock: Arc<Mock>) {
    // First frame is the subscription declaration
    if let Some(Ok(Message::Text(frame))) = socket.recv().await {
        *mock.subscribe_frame.lock().unwrap() = Some(frame.as_str().to_owned());
    }

    let _ = socket
        .send(Message::Text(r#"{"type":"sensor_value","id":1}"#.into()))
        .await;
    let _ = socket
        .send(Message::Text(r#"{"type":"zone_control","id":2}"#.into()))
        .await;
    let _ = socket.send(Message::Close(None)).await;
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(BEARER)
}

fn test_config(addr: SocketAddr) -> Config {
    let mut config = Config {
        ssra: SsraConfig {
            host: format!("http://{addr}"),
            email: "user@example.com".to_string(),
            password: "pw-e2e".to_string(),
        },
        gateway: GatewayTarget {
            name: "Gateway Name".to_string(),
        },
        ..Config::default()
    };
    // Stream closes after two events; the window is just an upper bound.
    config.stream.watch = Duration::from_secs(3);
    config
}

fn gateway_record(addr: SocketAddr) -> Value {
    json!({ "id": 1, "name": "Gateway Name", "hostname": addr.to_string() })
}

#[tokio::test]
async fn happy_path_hands_credentials_through_to_the_stream() {
    let mock = Arc::new(Mock::default());
    mock.issue_user_cookie.store(true, Ordering::SeqCst);
    let addr = start_mock(Arc::clone(&mock)).await;
    *mock.directory.lock().unwrap() = vec![
        json!({ "id": 9, "name": "A", "hostname": "other.example" }),
        gateway_record(mock.own_addr()),
    ];

    let session = Session::new(test_config(addr)).unwrap();
    let outcome = session.run().await.unwrap();
    assert_eq!(outcome, Outcome::Watched);

    // Connection was brokered exactly once, for the matched gateway
    assert_eq!(mock.connection_hits.load(Ordering::SeqCst), 1);
    assert_eq!(mock.handoff_hits.load(Ordering::SeqCst), 1);
    assert_eq!(mock.ws_hits.load(Ordering::SeqCst), 1);

    // Handoff carried the decoded SSO token, the nonce, and the session id
    let query = mock.handoff_query.lock().unwrap().clone().unwrap();
    assert_eq!(query.get("token").map(String::as_str), Some("TK+1"));
    assert_eq!(query.get("nonce").map(String::as_str), Some("NC-42"));
    assert_eq!(query.get("sessionid").map(String::as_str), Some("S"));

    // Websocket handshake carried both cookies and the subprotocol
    assert_eq!(
        mock.ws_cookie.lock().unwrap().as_deref(),
        Some("user=U; sessionid=S")
    );
    assert_eq!(
        mock.ws_protocol.lock().unwrap().as_deref(),
        Some("echo-protocol")
    );

    // Subscription declared the default message types
    let frame = mock.subscribe_frame.lock().unwrap().clone().unwrap();
    let parsed: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(parsed["type"], "subscribe");
    assert_eq!(
        parsed["data"],
        json!(["create", "update", "delete", "sensor_value", "zone_control"])
    );
}

#[tokio::test]
async fn absent_gateway_is_terminal_but_clean() {
    let mock = Arc::new(Mock::default());
    mock.issue_user_cookie.store(true, Ordering::SeqCst);
    let addr = start_mock(Arc::clone(&mock)).await;
    // Directory has gateways, just not the requested one
    *mock.directory.lock().unwrap() =
        vec![json!({ "id": 2, "name": "Some Other Gateway", "hostname": "other.example" })];

    let session = Session::new(test_config(addr)).unwrap();
    let outcome = session.run().await.unwrap();
    assert_eq!(outcome, Outcome::GatewayNotFound);

    // No downstream calls were made
    assert_eq!(mock.connection_hits.load(Ordering::SeqCst), 0);
    assert_eq!(mock.handoff_hits.load(Ordering::SeqCst), 0);
    assert_eq!(mock.ws_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_directory_is_terminal_but_clean() {
    let mock = Arc::new(Mock::default());
    let addr = start_mock(Arc::clone(&mock)).await;

    let session = Session::new(test_config(addr)).unwrap();
    let outcome = session.run().await.unwrap();
    assert_eq!(outcome, Outcome::GatewayNotFound);
    assert_eq!(mock.connection_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn missing_user_cookie_is_a_malformed_handoff() {
    let mock = Arc::new(Mock::default());
    // Handoff responds 200 but without the user cookie
    mock.issue_user_cookie.store(false, Ordering::SeqCst);
    let addr = start_mock(Arc::clone(&mock)).await;
    *mock.directory.lock().unwrap() = vec![gateway_record(mock.own_addr())];

    let session = Session::new(test_config(addr)).unwrap();
    let err = session.run().await.unwrap_err();
    assert!(matches!(err, Error::MalformedHandoff(_)), "got {err:?}");

    // The chain stopped before the websocket
    assert_eq!(mock.ws_hits.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stream_connect_failure_is_swallowed() {
    let mock = Arc::new(Mock::default());
    mock.issue_user_cookie.store(true, Ordering::SeqCst);
    mock.ws_reject.store(true, Ordering::SeqCst);
    let addr = start_mock(Arc::clone(&mock)).await;
    *mock.directory.lock().unwrap() = vec![gateway_record(mock.own_addr())];

    let mut config = test_config(addr);
    config.stream.watch = Duration::from_millis(200);

    // HTTP-chain errors fail the session; stream-side errors do not.
    let session = Session::new(config).unwrap();
    let outcome = session.run().await.unwrap();
    assert_eq!(outcome, Outcome::Watched);
    assert_eq!(mock.ws_hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn gateway_listing_preserves_server_order() {
    let mock = Arc::new(Mock::default());
    let addr = start_mock(Arc::clone(&mock)).await;
    *mock.directory.lock().unwrap() = vec![
        json!({ "id": 3, "name": "C", "hostname": "c.example" }),
        json!({ "id": 1, "name": "A", "hostname": "a.example" }),
        json!({ "id": 2, "name": "B", "hostname": "b.example" }),
    ];

    let ssra = SsraClient::new(format!("http://{addr}")).unwrap();
    let login = ssra.login("user@example.com", "pw-e2e").await.unwrap();
    assert_eq!(login.session_id, "S");

    let gateways = ssra.gateways(&login.token).await.unwrap();
    assert_eq!(
        gateways.iter().map(|g| g.id).collect::<Vec<_>>(),
        vec![3, 1, 2]
    );
    assert_eq!(gateways[0].hostname, "c.example");
}

#[tokio::test]
async fn login_failure_propagates() {
    let mock = Arc::new(Mock::default());
    let addr = start_mock(Arc::clone(&mock)).await;

    let mut config = test_config(addr);
    config.ssra.password = "wrong".to_string();

    let session = Session::new(config).unwrap();
    let err = session.run().await.unwrap_err();
    assert!(matches!(err, Error::Api(_)), "got {err:?}");
}
