//! Store connection settings.

/// Environment variable holding the `PostgREST` base URL.
pub const STORE_URL_ENV: &str = "CIVIC_MAP_STORE_URL";

/// Environment variable holding the anonymous API key.
pub const STORE_ANON_KEY_ENV: &str = "CIVIC_MAP_STORE_ANON_KEY";

/// Base URL and key of the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Base URL, without a trailing slash.
    pub url: String,
    /// Anonymous API key, sent both as `apikey` and as the bearer token.
    pub anon_key: String,
}

impl StoreConfig {
    /// Builds a config from explicit values. Blank values count as missing.
    #[must_use]
    pub fn new(url: Option<String>, anon_key: Option<String>) -> Option<Self> {
        let url = url.map(|u| u.trim().trim_end_matches('/').to_string());
        let anon_key = anon_key.map(|k| k.trim().to_string());
        match (url, anon_key) {
            (Some(url), Some(anon_key)) if !url.is_empty() && !anon_key.is_empty() => {
                Some(Self { url, anon_key })
            }
            _ => None,
        }
    }

    /// Reads [`STORE_URL_ENV`] and [`STORE_ANON_KEY_ENV`].
    ///
    /// Returns `None` when either is unset or blank.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let config = Self::new(
            std::env::var(STORE_URL_ENV).ok(),
            std::env::var(STORE_ANON_KEY_ENV).ok(),
        );
        if config.is_none() {
            log::warn!("{STORE_URL_ENV} or {STORE_ANON_KEY_ENV} not set, remote store disabled");
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_missing() {
        assert_eq!(StoreConfig::new(Some("  ".into()), Some("key".into())), None);
        assert_eq!(StoreConfig::new(Some("http://x".into()), None), None);
    }

    #[test]
    fn trims_trailing_slash() {
        let config = StoreConfig::new(Some("https://db.example.org/".into()), Some(" k ".into()));
        assert_eq!(
            config,
            Some(StoreConfig {
                url: "https://db.example.org".to_string(),
                anon_key: "k".to_string(),
            })
        );
    }
}
