//! Cache keys for report data endpoints

use std::fmt;

/// Path of the JSON document behind a report page
const DATA_ENDPOINT: &str = "data.php?id=";

/// Identifies one report data endpoint.
///
/// The key doubles as the URL that gets fetched, so two links that
/// normalize to the same host and id always share one download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key for report `id` served from `host` (which ends in `/`)
    pub fn for_report(host: &str, id: &str) -> Self {
        Self(format!("{host}{DATA_ENDPOINT}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_deterministic() {
        let key1 = CacheKey::for_report("https://timings.aikar.co/", "abc");
        let key2 = CacheKey::for_report("https://timings.aikar.co/", "abc");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_ids() {
        let key1 = CacheKey::for_report("https://timings.aikar.co/", "abc");
        let key2 = CacheKey::for_report("https://timings.aikar.co/", "abd");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_different_hosts() {
        let key1 = CacheKey::for_report("https://timings.aikar.co/", "abc");
        let key2 = CacheKey::for_report("https://timings.example.net/", "abc");
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_cache_key_format() {
        let key = CacheKey::for_report("https://timings.aikar.co/", "7");
        assert_eq!(key.to_string(), "https://timings.aikar.co/data.php?id=7");
    }
}
