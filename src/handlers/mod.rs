//! HTTP request handlers.
//!
//! - [`objects`]: the object API over the bound container.
//! - [`links`]: downloads through links minted by the in-memory store.

use std::collections::HashMap;

pub mod links;
pub mod objects;

/// Parse raw query string into a HashMap.
///
/// Keys without a value (`?flag`) map to an empty string.
pub(crate) fn parse_query(raw: Option<String>) -> HashMap<String, String> {
    let mut map = HashMap::new();
    if let Some(qs) = raw {
        for part in qs.split('&').filter(|p| !p.is_empty()) {
            let (k, v) = part.split_once('=').unwrap_or((part, ""));
            map.insert(decode_component(k), decode_component(v));
        }
    }
    map
}

fn decode_component(s: &str) -> String {
    percent_encoding::percent_decode_str(&s.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}
