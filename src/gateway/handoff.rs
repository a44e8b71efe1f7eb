//! Gateway SSO handoff
//!
//! The connection URL brokered by SSRA looks like:
//!
//! ```text
//! http://gateway-62c256.example:8080/?token=A6sm3wz%2B0NTb...&nonce=f5096791-...&sessionid=
//! ```
//!
//! Its `token` and `nonce` parameters, together with the SSRA session id,
//! are exchanged directly with the gateway for a gateway-local `user`
//! session cookie.

use reqwest::Client;
use url::Url;

use crate::ssra::cookies;
use crate::{Error, Result};

/// Extract the SSO `token` query parameter from a connection URL
/// (percent-decoded), or `None` if missing. Pure; no I/O.
#[must_use]
pub fn extract_token(connection_url: &str) -> Option<String> {
    query_param(connection_url, "token")
}

/// Extract the SSO `nonce` query parameter from a connection URL
/// (percent-decoded), or `None` if missing. Pure; no I/O.
#[must_use]
pub fn extract_nonce(connection_url: &str) -> Option<String> {
    query_param(connection_url, "nonce")
}

fn query_param(raw: &str, name: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// The credentials a gateway needs to issue a local session
#[derive(Debug, Clone)]
pub struct SsoHandoff {
    /// One-time SSO token from the connection URL
    pub token: String,
    /// One-time nonce from the connection URL
    pub nonce: String,
    /// SSRA `sessionid` cookie value
    pub session_id: String,
}

impl SsoHandoff {
    /// Build a handoff from a brokered connection URL and the login session id.
    ///
    /// A URL missing `token` or `nonce` is a [`Error::MalformedHandoff`]
    /// rather than an absent value threaded into the gateway handshake.
    pub fn from_connection_url(connection_url: &str, session_id: &str) -> Result<Self> {
        let token = extract_token(connection_url).ok_or_else(|| {
            Error::MalformedHandoff("connection url missing token parameter".to_string())
        })?;
        let nonce = extract_nonce(connection_url).ok_or_else(|| {
            Error::MalformedHandoff("connection url missing nonce parameter".to_string())
        })?;
        Ok(Self {
            token,
            nonce,
            session_id: session_id.to_string(),
        })
    }
}

/// Client for the gateway's own SSO handoff endpoint
pub struct HandoffClient {
    http: Client,
}

impl HandoffClient {
    /// Create a handoff client
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: Client::builder().build()?,
        })
    }

    /// Exchange SSO credentials for the gateway-local `user` session cookie.
    ///
    /// GETs `<gateway_base>/?token=&nonce=&sessionid=` with the original SSRA
    /// bearer token. A response without a `user` cookie is a
    /// [`Error::MalformedHandoff`].
    pub async fn exchange(
        &self,
        gateway_base: &str,
        bearer_token: &str,
        sso: &SsoHandoff,
    ) -> Result<String> {
        let response = self
            .http
            .get(format!("{gateway_base}/"))
            .query(&[
                ("token", sso.token.as_str()),
                ("nonce", sso.nonce.as_str()),
                ("sessionid", sso.session_id.as_str()),
            ])
            .bearer_auth(bearer_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "gateway handoff failed: HTTP {status} - {body}"
            )));
        }

        cookies::cookie_value(response.headers(), "user").ok_or_else(|| {
            Error::MalformedHandoff("gateway response carried no user cookie".to_string())
        })
    }
}
