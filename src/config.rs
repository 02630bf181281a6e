//! Runtime configuration for unidir.
//!
//! Configuration comes from the environment or from a YAML document with the
//! same keys:
//!
//! ```yaml
//! database_url: postgres://localhost/unidir
//! max_connections: 5
//! default_page_size: 20
//! max_page_size: 100
//! ```
//!
//! | Variable                   | Key                 | Default |
//! |----------------------------|---------------------|---------|
//! | `UNIDIR_DATABASE_URL`      | `database_url`      | `DATABASE_URL`, else unset |
//! | `UNIDIR_MAX_CONNECTIONS`   | `max_connections`   | 5       |
//! | `UNIDIR_DEFAULT_PAGE_SIZE` | `default_page_size` | 20      |
//! | `UNIDIR_MAX_PAGE_SIZE`     | `max_page_size`     | 100     |

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use crate::{PageRequest, SortOrder};

/// Errors raised while loading configuration or connecting.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No database URL was configured.
    #[error("no database url configured; set UNIDIR_DATABASE_URL or DATABASE_URL")]
    MissingDatabaseUrl,
    /// A setting has a value that cannot be used.
    #[error("invalid value for {key}: {value:?}")]
    Invalid {
        /// The offending setting.
        key: &'static str,
        /// The value as given.
        value: String,
    },
    /// The YAML document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Yaml(#[from] serde_yml::Error),
    /// The database could not be reached.
    #[error("cannot connect to database: {0}")]
    Connect(#[from] sqlx::Error),
}

/// Settings for the store and for paging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: Option<String>,
    /// Size of the connection pool.
    pub max_connections: u32,
    /// Page size used when a request asks for zero records.
    pub default_page_size: u64,
    /// Upper bound on any requested page size.
    pub max_page_size: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            max_connections: 5,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl Config {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, which maps variable names to values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Config {
            database_url: lookup("UNIDIR_DATABASE_URL").or_else(|| lookup("DATABASE_URL")),
            ..Config::default()
        };
        if let Some(value) = lookup("UNIDIR_MAX_CONNECTIONS") {
            config.max_connections = parse("max_connections", &value)?;
        }
        if let Some(value) = lookup("UNIDIR_DEFAULT_PAGE_SIZE") {
            config.default_page_size = parse("default_page_size", &value)?;
        }
        if let Some(value) = lookup("UNIDIR_MAX_PAGE_SIZE") {
            config.max_page_size = parse("max_page_size", &value)?;
        }
        config.validated()
    }

    /// Parses a YAML document; missing keys take their defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yml::from_str(yaml)?;
        config.validated()
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let invalid = |key, value: &dyn ToString| ConfigError::Invalid {
            key,
            value: value.to_string(),
        };
        if self.max_connections == 0 {
            return Err(invalid("max_connections", &self.max_connections));
        }
        if self.default_page_size == 0 {
            return Err(invalid("default_page_size", &self.default_page_size));
        }
        if self.max_page_size < self.default_page_size {
            return Err(invalid("max_page_size", &self.max_page_size));
        }
        Ok(self)
    }

    /// Builds a page request, substituting the default for a zero limit and
    /// clamping the limit to the maximum page size.
    pub fn page_request(&self, offset: u64, limit: u64, sort: SortOrder) -> PageRequest {
        let limit = if limit == 0 {
            self.default_page_size
        } else {
            limit.min(self.max_page_size)
        };
        PageRequest::new(offset, limit).sorted(sort)
    }

    /// Connects a pool to the configured database.
    pub async fn connect(&self) -> Result<PgPool, ConfigError> {
        let url = self
            .database_url
            .as_deref()
            .ok_or(ConfigError::MissingDatabaseUrl)?;
        let pool = PgPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(url)
            .await?;
        tracing::info!(max_connections = self.max_connections, "connected to database");
        Ok(pool)
    }
}

fn parse<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = Config::from_lookup(env(&[])).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn prefixed_url_wins_over_fallback() {
        let config = Config::from_lookup(env(&[
            ("DATABASE_URL", "postgres://fallback"),
            ("UNIDIR_DATABASE_URL", "postgres://primary"),
        ]))
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://primary"));

        let config = Config::from_lookup(env(&[("DATABASE_URL", "postgres://fallback")])).unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://fallback"));
    }

    #[test]
    fn numeric_settings_are_parsed() {
        let config = Config::from_lookup(env(&[
            ("UNIDIR_MAX_CONNECTIONS", "12"),
            ("UNIDIR_DEFAULT_PAGE_SIZE", "10"),
            ("UNIDIR_MAX_PAGE_SIZE", "50"),
        ]))
        .unwrap();
        assert_eq!(config.max_connections, 12);
        assert_eq!(config.default_page_size, 10);
        assert_eq!(config.max_page_size, 50);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            Config::from_lookup(env(&[("UNIDIR_MAX_CONNECTIONS", "many")])),
            Err(ConfigError::Invalid {
                key: "max_connections",
                ..
            })
        ));
        assert!(matches!(
            Config::from_lookup(env(&[("UNIDIR_MAX_PAGE_SIZE", "5")])),
            Err(ConfigError::Invalid {
                key: "max_page_size",
                ..
            })
        ));
    }

    #[test]
    fn yaml_fills_missing_keys() {
        let config = Config::from_yaml("database_url: postgres://localhost/unidir\nmax_page_size: 500\n")
            .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://localhost/unidir")
        );
        assert_eq!(config.max_page_size, 500);
        assert_eq!(config.default_page_size, 20);
    }

    #[test]
    fn yaml_rejects_garbage() {
        assert!(matches!(
            Config::from_yaml("max_connections: [1, 2]"),
            Err(ConfigError::Yaml(_))
        ));
    }

    #[test]
    fn page_requests_are_clamped() {
        let config = Config::default();
        assert_eq!(config.page_request(0, 0, SortOrder::IdAsc).limit, 20);
        assert_eq!(config.page_request(0, 1000, SortOrder::IdAsc).limit, 100);
        let page = config.page_request(40, 10, SortOrder::IdDesc);
        assert_eq!(page, PageRequest::new(40, 10).sorted(SortOrder::IdDesc));
    }

    #[tokio::test]
    async fn connect_requires_url() {
        assert!(matches!(
            Config::default().connect().await,
            Err(ConfigError::MissingDatabaseUrl)
        ));
    }
}
