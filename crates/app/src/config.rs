//! Environment-driven configuration.
//!
//! Every variable is optional. Unparseable values are logged and replaced by
//! the default rather than aborting startup.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use recipeshare_infra::sqlite::default_cache_db_path;
use recipeshare_observability::LogFormat;
use recipeshare_sync::SyncConfig;
use recipeshare_trending::{SpoonacularConfig, client::DEFAULT_BASE_URL, client::DEFAULT_COUNT};

pub const CACHE_DB: &str = "RECIPESHARE_CACHE_DB";
pub const PERSISTENT_CACHE: &str = "RECIPESHARE_PERSISTENT_CACHE";
pub const LOG_FORMAT: &str = "RECIPESHARE_LOG_FORMAT";
pub const API_KEY: &str = "SPOONACULAR_API_KEY";
pub const BASE_URL: &str = "SPOONACULAR_BASE_URL";
pub const TRENDING_COUNT: &str = "RECIPESHARE_TRENDING_COUNT";
pub const AUTO_RETRY: &str = "RECIPESHARE_AUTO_RETRY";
pub const RETRY_INTERVAL_SECS: &str = "RECIPESHARE_RETRY_INTERVAL_SECS";
pub const UPLOAD_DIR: &str = "RECIPESHARE_UPLOAD_DIR";

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// SQLite cache path; `None` when no data directory could be resolved.
    pub cache_db: Option<PathBuf>,
    /// Durable SQLite cache instead of the in-memory one.
    pub persistent_cache: bool,
    pub log_format: LogFormat,
    pub trending: SpoonacularConfig,
    pub sync: SyncConfig,
    /// Root for locally stored uploads; in-memory object store when unset.
    pub upload_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_db: None,
            persistent_cache: false,
            log_format: LogFormat::default(),
            trending: SpoonacularConfig::default(),
            sync: SyncConfig::default(),
            upload_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let cache_db = match get(CACHE_DB) {
            Some(path) => Some(PathBuf::from(path)),
            None => match default_cache_db_path() {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!("no default cache location: {err:#}");
                    None
                }
            },
        };

        let mut trending = SpoonacularConfig::default()
            .with_base_url(get(BASE_URL).unwrap_or_else(|| DEFAULT_BASE_URL.to_string()))
            .with_count(parse_or(TRENDING_COUNT, get(TRENDING_COUNT), DEFAULT_COUNT));
        if let Some(key) = get(API_KEY) {
            trending = trending.with_api_key(key);
        }

        let mut sync = SyncConfig::default().with_auto_retry(parse_or(AUTO_RETRY, get(AUTO_RETRY), false));
        if let Some(secs) = get(RETRY_INTERVAL_SECS) {
            let default = sync.retry_interval.as_secs();
            sync = sync.with_retry_interval(Duration::from_secs(parse_or(
                RETRY_INTERVAL_SECS,
                Some(secs),
                default,
            )));
        }

        Self {
            cache_db,
            persistent_cache: parse_or(PERSISTENT_CACHE, get(PERSISTENT_CACHE), false),
            log_format: parse_or(LOG_FORMAT, get(LOG_FORMAT), LogFormat::default()),
            trending,
            sync,
            upload_dir: get(UPLOAD_DIR).map(PathBuf::from),
        }
    }
}

fn parse_or<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "invalid value; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> AppConfig {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let cfg = config(&[]);
        assert!(!cfg.persistent_cache);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.trending.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.trending.count, 10);
        assert!(cfg.trending.api_key.is_none());
        assert!(!cfg.sync.auto_retry);
        assert!(cfg.upload_dir.is_none());
    }

    #[test]
    fn reads_every_variable() {
        let cfg = config(&[
            (CACHE_DB, "/tmp/rs/cache.db"),
            (PERSISTENT_CACHE, "true"),
            (LOG_FORMAT, "pretty"),
            (API_KEY, "k"),
            (BASE_URL, "http://localhost:9000/"),
            (TRENDING_COUNT, "25"),
            (AUTO_RETRY, "true"),
            (RETRY_INTERVAL_SECS, "5"),
            (UPLOAD_DIR, "/tmp/rs/uploads"),
        ]);
        assert_eq!(cfg.cache_db, Some(PathBuf::from("/tmp/rs/cache.db")));
        assert!(cfg.persistent_cache);
        assert_eq!(cfg.log_format, LogFormat::Pretty);
        assert_eq!(cfg.trending.api_key.as_deref(), Some("k"));
        assert_eq!(cfg.trending.base_url, "http://localhost:9000/");
        assert_eq!(cfg.trending.count, 25);
        assert!(cfg.sync.auto_retry);
        assert_eq!(cfg.sync.retry_interval, Duration::from_secs(5));
        assert_eq!(cfg.upload_dir, Some(PathBuf::from("/tmp/rs/uploads")));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let cfg = config(&[
            (PERSISTENT_CACHE, "yes please"),
            (LOG_FORMAT, "xml"),
            (TRENDING_COUNT, "-3"),
            (AUTO_RETRY, ""),
        ]);
        assert!(!cfg.persistent_cache);
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.trending.count, 10);
        assert!(!cfg.sync.auto_retry);
    }
}
