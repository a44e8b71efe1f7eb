//! Connection flow orchestration
//!
//! Sequences the credential handoff end to end: login → gateway resolution
//! → connection brokering → SSO handoff → lightsocket subscription, then
//! watches the stream for the configured window.
//!
//! Error handling is deliberately asymmetric: failures in the HTTP chain
//! propagate out of [`Session::run`], while stream-side failures after the
//! handoff are logged and the watch window still runs to completion.

use tokio::time::{Instant, sleep, timeout};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::gateway::{HandoffClient, SsoHandoff, lightsocket};
use crate::ssra::SsraClient;
use crate::{Error, Result};

/// How a completed session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The named gateway is not in the user's directory. Terminal but clean:
    /// the process exits 0 without brokering a connection.
    GatewayNotFound,
    /// The stream was opened (or its failure swallowed) and the watch
    /// window elapsed.
    Watched,
}

/// A single connect-and-watch session
pub struct Session {
    config: Config,
    ssra: SsraClient,
    tls: bool,
}

impl Session {
    /// Create a session from configuration.
    ///
    /// A bare `ssra.host` is reached over https; an explicit `http://` origin
    /// switches the whole chain (gateway handoff and websocket included) to
    /// plain transports.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let (base_url, tls) = ssra_base_url(&config.ssra.host)?;
        let ssra = SsraClient::new(base_url)?;

        Ok(Self { config, ssra, tls })
    }

    /// Run the credential handoff and watch the event stream.
    pub async fn run(&self) -> Result<Outcome> {
        let email = self.config.ssra.resolve_email();
        let password = self.config.ssra.resolve_password();

        info!(host = %self.ssra.base_url(), "logging in to SSRA");
        let login = self.ssra.login(&email, &password).await?;
        info!("logged in");

        let name = &self.config.gateway.name;
        let Some(gateway) = self.ssra.gateway_by_name(&login.token, name).await? else {
            error!(gateway = %name, "no such gateway");
            return Ok(Outcome::GatewayNotFound);
        };
        info!(gateway = %gateway.name, id = gateway.id, hostname = %gateway.hostname, "resolved gateway");

        let connection_url = self.ssra.connection_url(&login.token, gateway.id).await?;
        let sso = SsoHandoff::from_connection_url(&connection_url, &login.session_id)?;

        let handoff = HandoffClient::new()?;
        let user_cookie = handoff
            .exchange(&self.gateway_base(&gateway.hostname), &login.token, &sso)
            .await?;

        let url = lightsocket::endpoint_url(&gateway.hostname, self.tls);
        info!(url = %url, "connecting to lightsocket");

        match lightsocket::connect(
            &url,
            &user_cookie,
            &login.session_id,
            &self.config.stream.subscriptions,
            self.config.stream.buffer_size,
        )
        .await
        {
            Ok(events) => self.watch(events).await,
            Err(e) => {
                // Stream-side failure is non-fatal; the watch window still
                // elapses and the process exits clean.
                warn!(error = %e, "lightsocket connect failed");
                sleep(self.config.stream.watch).await;
            }
        }

        Ok(Outcome::Watched)
    }

    /// Drain stream events until the watch window elapses or the stream
    /// reaches a terminal state.
    async fn watch(&self, mut events: tokio::sync::mpsc::Receiver<lightsocket::StreamEvent>) {
        let deadline = Instant::now() + self.config.stream.watch;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match timeout(remaining, events.recv()).await {
                Ok(Some(lightsocket::StreamEvent::Event(payload))) => {
                    info!(payload = %payload, "event received");
                }
                Ok(Some(lightsocket::StreamEvent::Closed)) => {
                    info!("stream closed");
                    break;
                }
                Ok(Some(lightsocket::StreamEvent::Errored(reason))) => {
                    warn!(reason = %reason, "stream errored");
                    break;
                }
                // Reader task ended, or the window elapsed
                Ok(None) | Err(_) => break,
            }
        }
        // Dropping the receiver tears the socket down without a close
        // handshake, matching the fixed-delay exit contract.
    }

    fn gateway_base(&self, hostname: &str) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{scheme}://{hostname}")
    }
}

/// Normalize the configured SSRA host into a base URL and TLS flag.
///
/// Bare hostnames become `https://` origins; an explicit `http://` origin is
/// kept and flips the rest of the chain to plain transports.
pub fn ssra_base_url(host: &str) -> Result<(String, bool)> {
    if let Some(rest) = host.strip_prefix("http://") {
        if rest.is_empty() {
            return Err(Error::Config(format!("invalid ssra.host: {host}")));
        }
        Ok((format!("http://{rest}"), false))
    } else if let Some(rest) = host.strip_prefix("https://") {
        if rest.is_empty() {
            return Err(Error::Config(format!("invalid ssra.host: {host}")));
        }
        Ok((format!("https://{rest}"), true))
    } else if host.contains("://") {
        Err(Error::Config(format!(
            "unsupported scheme in ssra.host: {host}"
        )))
    } else {
        Ok((format!("https://{host}"), true))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bare_host_defaults_to_https() {
        let (base, tls) = ssra_base_url("ssra.example.com").unwrap();
        assert_eq!(base, "https://ssra.example.com");
        assert!(tls);
    }

    #[test]
    fn explicit_http_origin_disables_tls() {
        let (base, tls) = ssra_base_url("http://127.0.0.1:8080").unwrap();
        assert_eq!(base, "http://127.0.0.1:8080");
        assert!(!tls);
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(ssra_base_url("ftp://host").is_err());
        assert!(ssra_base_url("http://").is_err());
    }
}
