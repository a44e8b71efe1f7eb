//! Lightsock Library
//!
//! Client for the SSRA session-relay authority and the lightsocket
//! real-time event stream served by on-premises gateways.
//!
//! The connection flow is a sequential credential handoff:
//!
//! 1. Login to SSRA with email/password → bearer token + `sessionid` cookie
//! 2. Resolve the target gateway by name from the user's gateway directory
//! 3. Exchange the gateway id for a one-time connection URL (SSO token + nonce)
//! 4. Exchange token/nonce/sessionid directly with the gateway → `user` cookie
//! 5. Open `wss://<gateway>/lightsocket/websocket` and subscribe to events

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod session;
pub mod ssra;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
