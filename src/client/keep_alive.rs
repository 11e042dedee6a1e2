//! Connection keep-alive negotiation

use std::time::Duration;

use reqwest::header::{CONNECTION, HeaderMap};

/// Reuse window announced by the server, or `default` when none is given.
///
/// Scans every `Connection` header element for a `timeout=<seconds>`
/// parameter; the first parseable one wins.
pub fn keep_alive_duration(headers: &HeaderMap, default: Duration) -> Duration {
    for value in headers.get_all(CONNECTION) {
        let Ok(value) = value.to_str() else {
            continue;
        };

        for element in value.split(',') {
            let head = element.split(';').next().unwrap_or_default();
            let Some((name, raw)) = head.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("timeout") {
                continue;
            }

            let raw = raw.trim().trim_matches('"');
            match raw.parse::<u64>() {
                Ok(secs) => return Duration::from_secs(secs),
                Err(_) => log::debug!("Ignoring unparseable keep-alive timeout {raw:?}"),
            }
        }
    }

    default
}
