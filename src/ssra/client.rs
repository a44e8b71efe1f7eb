//! SSRA HTTP client
//!
//! Covers the three authority-side calls of the handoff chain: login,
//! gateway directory listing, and per-gateway connection brokering.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::cookies;
use crate::{Error, Result};

/// A gateway record from the SSRA directory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gateway {
    /// SSRA-assigned gateway identifier
    pub id: u64,
    /// Display name as assigned in SSRA
    pub name: String,
    /// Gateway's own hostname (serves the handoff endpoint and lightsocket)
    pub hostname: String,
}

/// Credentials established by a successful login
#[derive(Debug, Clone)]
pub struct LoginSession {
    /// Bearer token for subsequent SSRA calls
    pub token: String,
    /// `sessionid` cookie value, threaded through to the gateway handshake
    pub session_id: String,
}

/// Login response body
#[derive(Debug, Deserialize)]
struct LoginBody {
    #[serde(default)]
    token: Option<String>,
}

/// Connection broker response body
#[derive(Debug, Deserialize)]
struct ConnectionBody {
    url: String,
}

/// Client for the SSRA session-relay authority
pub struct SsraClient {
    http: Client,
    base_url: String,
}

impl SsraClient {
    /// Create a client for the given SSRA base URL (scheme included,
    /// no trailing slash), e.g. `https://ssra.example.com`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Base URL this client talks to
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Authenticate with email/password.
    ///
    /// Returns the bearer token from the response body and the `sessionid`
    /// cookie. A response missing either is an [`Error::Auth`]; non-2xx
    /// statuses propagate as [`Error::Api`] with no retry.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginSession> {
        let response = self
            .http
            .post(format!("{}/auth/local", self.base_url))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!("login failed: HTTP {status} - {body}")));
        }

        let session_id = cookies::cookie_value(response.headers(), "sessionid")
            .ok_or_else(|| Error::Auth("login response carried no sessionid cookie".to_string()))?;

        let body: LoginBody = response.json().await?;
        let token = body
            .token
            .ok_or_else(|| Error::Auth("login response carried no token".to_string()))?;

        debug!("SSRA login complete");
        Ok(LoginSession { token, session_id })
    }

    /// List the gateways visible to the authenticated user, in server order.
    pub async fn gateways(&self, token: &str) -> Result<Vec<Gateway>> {
        let response = self
            .http
            .get(format!("{}/api/v1/gateways/mine", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "gateway listing failed: HTTP {status} - {body}"
            )));
        }

        Ok(response.json().await?)
    }

    /// Resolve a gateway by its SSRA display name.
    ///
    /// First exact case-sensitive match in server order; duplicates silently
    /// resolve to the first. No match is `Ok(None)`, not an error.
    pub async fn gateway_by_name(&self, token: &str, name: &str) -> Result<Option<Gateway>> {
        let gateways = self.gateways(token).await?;
        Ok(find_by_name(&gateways, name).cloned())
    }

    /// Exchange a gateway id for its one-time connection URL.
    ///
    /// The returned URL carries the SSO `token` and `nonce` query parameters
    /// consumed by the gateway handoff.
    pub async fn connection_url(&self, token: &str, gateway_id: u64) -> Result<String> {
        let response = self
            .http
            .get(format!("{}/api/v1/connections/{gateway_id}", self.base_url))
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Api(format!(
                "connection brokering failed for gateway {gateway_id}: HTTP {status} - {body}"
            )));
        }

        let body: ConnectionBody = response.json().await?;
        Ok(body.url)
    }
}

/// First gateway whose name exactly equals `name`, in slice order.
#[must_use]
pub fn find_by_name<'a>(gateways: &'a [Gateway], name: &str) -> Option<&'a Gateway> {
    gateways.iter().find(|gateway| gateway.name == name)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn gateway(id: u64, name: &str) -> Gateway {
        Gateway {
            id,
            name: name.to_string(),
            hostname: format!("gw-{id}.example"),
        }
    }

    #[test]
    fn find_by_name_returns_first_exact_match() {
        let gateways = vec![
            gateway(1, "A"),
            gateway(2, "Gateway Name"),
            gateway(3, "Gateway Name"),
        ];
        let found = find_by_name(&gateways, "Gateway Name").unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn find_by_name_is_case_sensitive() {
        let gateways = vec![gateway(1, "gateway name")];
        assert!(find_by_name(&gateways, "Gateway Name").is_none());
    }

    #[test]
    fn find_by_name_on_empty_directory() {
        assert!(find_by_name(&[], "Gateway Name").is_none());
    }

    #[test]
    fn gateway_record_ignores_unknown_fields() {
        let raw = r#"{"id":7,"name":"N","hostname":"h.example","firmware":"1.2.3"}"#;
        let parsed: Gateway = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.id, 7);
        assert_eq!(parsed.hostname, "h.example");
    }
}
