//! Report link extraction from free-form message text

use std::ops::Range;

use url::Url;

use crate::cache::CacheKey;

/// Marker separating the report host from the report id
const ID_MARKER: &str = "?id=";

/// Canonical query form every accepted link must carry
const CANONICAL_QUERY: &str = "/?id=";

/// Legacy query forms rewritten into the canonical one
const LEGACY_QUERIES: [&str; 2] = ["/?d=", "/d="];

/// A normalized link to a timings report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportUrl {
    url: String,
    host: String,
    id: String,
}

impl ReportUrl {
    /// The normalized link as it should be shown to users
    pub fn as_str(&self) -> &str {
        &self.url
    }

    /// Everything before `?id=`, including the trailing slash
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key of the JSON data endpoint behind this report
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::for_report(self.host(), self.id())
    }
}

impl std::fmt::Display for ReportUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Find the last valid report link in `text`.
///
/// Tokens are separated by single spaces and newlines. A token qualifies when
/// it starts with `host_prefix`, carries `/?id=` after legacy rewriting and
/// fragment removal, and is both a well-formed URI and a parseable URL.
/// Anything else is skipped without error.
pub fn extract_report_url(text: &str, host_prefix: &str) -> Option<ReportUrl> {
    text.split([' ', '\n'])
        .filter(|word| word.starts_with(host_prefix))
        .filter_map(normalize)
        .last()
}

fn normalize(word: &str) -> Option<ReportUrl> {
    let mut word = word.to_string();
    for legacy in LEGACY_QUERIES {
        if word.contains(legacy) {
            word = word.replace(legacy, CANONICAL_QUERY);
        }
    }

    let word = word.split('#').next().unwrap_or_default();
    if !word.contains(CANONICAL_QUERY) {
        return None;
    }
    if !is_uri(word) || !is_url(word) {
        log::debug!("Skipping malformed report link {word}");
        return None;
    }

    let mut parts = word.split(ID_MARKER);
    let host = parts.next()?;
    let id = parts.next().filter(|id| !id.is_empty())?;

    Some(ReportUrl {
        url: word.to_string(),
        host: host.to_string(),
        id: id.to_string(),
    })
}

/// Checks every character is legal in a URI.
///
/// RFC 3986 characters and well-formed `%XX` escapes are accepted, as is any
/// non-ASCII character that is neither a control nor whitespace. Brackets are
/// only legal inside the authority, where they delimit an IPv6 host.
fn is_uri(candidate: &str) -> bool {
    let authority = authority_range(candidate);
    let mut chars = candidate.char_indices();
    while let Some((at, c)) = chars.next() {
        let legal = match c {
            '%' => {
                let escaped = candidate.get(at + 1..at + 3);
                if !escaped.is_some_and(|hex| hex.bytes().all(|b| b.is_ascii_hexdigit())) {
                    return false;
                }
                chars.nth(1);
                true
            }
            '[' | ']' => authority.contains(&at),
            c if c.is_ascii_alphanumeric() => true,
            '-' | '.' | '_' | '~' | ':' | '/' | '?' | '#' | '@' => true,
            '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' => true,
            c => !c.is_ascii() && !c.is_control() && !c.is_whitespace(),
        };
        if !legal {
            return false;
        }
    }
    true
}

/// Byte range of the authority after `scheme://`; empty when there is none
fn authority_range(candidate: &str) -> Range<usize> {
    let Some(scheme_end) = candidate.find("://") else {
        return 0..0;
    };
    let start = scheme_end + 3;
    let end = candidate[start..]
        .find(['/', '?', '#'])
        .map_or(candidate.len(), |offset| start + offset);
    start..end
}

fn is_url(candidate: &str) -> bool {
    match Url::parse(candidate) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.has_host(),
        Err(_) => false,
    }
}
