//! SSRA session-relay authority client

mod client;
pub mod cookies;

pub use client::{Gateway, LoginSession, SsraClient, find_by_name};
