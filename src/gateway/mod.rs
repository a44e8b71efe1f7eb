//! Gateway-side clients: SSO handoff and the lightsocket event stream

pub mod handoff;
pub mod lightsocket;

pub use handoff::{HandoffClient, SsoHandoff, extract_nonce, extract_token};
pub use lightsocket::{StreamEvent, connect, endpoint_url};
