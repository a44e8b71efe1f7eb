//! `Set-Cookie` response header parsing
//!
//! Both SSRA and the gateway return session material as cookies rather than
//! body fields. Only the cookie's own `name=value` pair matters here;
//! attributes (`Path`, `Expires`, `HttpOnly`, ...) are stripped.

use std::collections::HashMap;

use reqwest::header::{HeaderMap, SET_COOKIE};

/// Parse all `Set-Cookie` headers into a name → value map.
///
/// Handles zero, one, or many header lines. Values are percent-decoded.
/// Malformed lines (no `=` in the first segment) are skipped. When the same
/// cookie name appears on multiple lines the last one wins.
#[must_use]
pub fn parse_set_cookie(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();

    for header in headers.get_all(SET_COOKIE) {
        let Ok(line) = header.to_str() else {
            continue;
        };
        // The cookie pair is the first `;`-separated segment
        let Some(pair) = line.split(';').next() else {
            continue;
        };
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        let value = value.trim();
        let decoded = urlencoding::decode(value)
            .map_or_else(|_| value.to_string(), std::borrow::Cow::into_owned);
        cookies.insert(name.to_string(), decoded);
    }

    cookies
}

/// Look up a single cookie's value by name, or `None` if absent.
#[must_use]
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    parse_set_cookie(headers).remove(name)
}
