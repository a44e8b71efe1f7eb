//! Lightsocket event stream client
//!
//! Opens the gateway's `/lightsocket/websocket` endpoint, declares a one-shot
//! subscription, and forwards inbound text frames as typed events over a
//! bounded channel. Terminal states (`Closed`, `Errored`) are sinks; there is
//! no reconnect.

use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SEC_WEBSOCKET_PROTOCOL};
use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Subprotocol the gateway negotiates on upgrade
pub const SUBPROTOCOL: &str = "echo-protocol";

/// An event observed on the lightsocket
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// Raw payload of an inbound text frame (arbitrary JSON, not parsed here)
    Event(String),
    /// The server closed the connection
    Closed,
    /// The connection failed mid-stream
    Errored(String),
}

/// Websocket URL for a gateway's lightsocket endpoint.
///
/// `wss://` against real gateways; `ws://` when the relay chain runs over
/// plain http (local testing).
#[must_use]
pub fn endpoint_url(hostname: &str, tls: bool) -> String {
    let scheme = if tls { "wss" } else { "ws" };
    format!("{scheme}://{hostname}/lightsocket/websocket")
}

/// The one-shot subscription declaration sent after upgrade
#[must_use]
pub fn subscribe_frame(subscriptions: &[String]) -> String {
    serde_json::json!({
        "type": "subscribe",
        "data": subscriptions,
    })
    .to_string()
}

/// Connect to a gateway's lightsocket and subscribe.
///
/// Sends `Cookie: user=<>; sessionid=<>` and the `echo-protocol` subprotocol
/// on the upgrade request, then the subscription declaration as the first
/// frame. Inbound text frames arrive on the returned channel in socket order;
/// the channel ends after a `Closed` or `Errored` event.
///
/// # Errors
///
/// Returns [`Error::Stream`] if the upgrade or the subscription send fails.
pub async fn connect(
    url: &str,
    user_cookie: &str,
    session_id: &str,
    subscriptions: &[String],
    buffer_size: usize,
) -> Result<mpsc::Receiver<StreamEvent>> {
    let mut request = url
        .into_client_request()
        .map_err(|e| Error::Stream(format!("invalid websocket url {url}: {e}")))?;

    let cookie = format!("user={user_cookie}; sessionid={session_id}");
    request.headers_mut().insert(
        COOKIE,
        HeaderValue::from_str(&cookie)
            .map_err(|e| Error::Stream(format!("invalid cookie header: {e}")))?,
    );
    request
        .headers_mut()
        .insert(SEC_WEBSOCKET_PROTOCOL, HeaderValue::from_static(SUBPROTOCOL));

    let (mut socket, response) = connect_async(request)
        .await
        .map_err(|e| Error::Stream(format!("connect failed: {e}")))?;

    info!(url = %url, status = %response.status(), "lightsocket connected");

    socket
        .send(Message::text(subscribe_frame(subscriptions)))
        .await
        .map_err(|e| Error::Stream(format!("subscribe failed: {e}")))?;

    debug!(subscriptions = ?subscriptions, "subscription declared");

    let (tx, rx) = mpsc::channel(buffer_size);

    // Single reader task; dropping the receiver ends it, dropping the socket
    // without a close handshake.
    tokio::spawn(async move {
        loop {
            match socket.next().await {
                Some(Ok(Message::Text(frame))) => {
                    if tx.send(StreamEvent::Event(frame.to_string())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => {
                    debug!("lightsocket closed by server");
                    let _ = tx.send(StreamEvent::Closed).await;
                    break;
                }
                // Binary and control frames carry no events
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "lightsocket read error");
                    let _ = tx.send(StreamEvent::Errored(e.to_string())).await;
                    break;
                }
            }
        }
    });

    Ok(rx)
}
