//! Service configuration.
//!
//! Settings come from an optional YAML file; command-line flags override it.
//!
//! ```yaml
//! database: chinook.db
//! addr: 0.0.0.0:8080
//! base_path: /api
//! page_size: 20
//! busy_timeout_ms: 5000
//! watch: true
//! stack_size: 0x10000
//! ```

use crate::runtime_config::parse_stack_size;
use crate::store::DEFAULT_PAGE_SIZE;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub database: Option<PathBuf>,
    pub addr: String,
    /// Prefix for every table route, e.g. `/api`
    pub base_path: String,
    pub page_size: u32,
    pub busy_timeout_ms: u64,
    /// Reload the schema when the database file changes
    pub watch: bool,
    #[serde(deserialize_with = "deserialize_stack_size")]
    pub stack_size: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: None,
            addr: DEFAULT_ADDR.to_string(),
            base_path: String::new(),
            page_size: DEFAULT_PAGE_SIZE,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            watch: false,
            stack_size: None,
        }
    }
}

/// Accepts `65536`, `"65536"` or `"0x10000"`
fn deserialize_stack_size<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(usize),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => parse_stack_size(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid stack size: {s}"))),
    }
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub database: Option<PathBuf>,
    pub addr: Option<String>,
    pub base_path: Option<String>,
    pub page_size: Option<u32>,
    pub watch: bool,
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("invalid configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Apply command-line overrides. `watch` can only be switched on.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if let Some(db) = overrides.database {
            self.database = Some(db);
        }
        if let Some(addr) = overrides.addr {
            self.addr = addr;
        }
        if let Some(base) = overrides.base_path {
            self.base_path = base;
        }
        if let Some(size) = overrides.page_size {
            self.page_size = size;
        }
        self.watch |= overrides.watch;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.is_none() {
            return Err(anyhow!("no database given; pass --database or set `database` in the config file"));
        }
        if self.page_size == 0 {
            return Err(anyhow!("page_size must be at least 1"));
        }
        Ok(())
    }

    #[must_use]
    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.addr, "0.0.0.0:8080");
        assert_eq!(config.page_size, 20);
    }

    #[test]
    fn test_full_file() {
        let config = AppConfig::from_yaml(
            "database: /data/chinook.db\naddr: 127.0.0.1:9000\nbase_path: /api\npage_size: 50\nwatch: true\nstack_size: \"0x20000\"\n",
        )
        .unwrap();
        assert_eq!(config.database, Some(PathBuf::from("/data/chinook.db")));
        assert_eq!(config.base_path, "/api");
        assert_eq!(config.page_size, 50);
        assert!(config.watch);
        assert_eq!(config.stack_size, Some(0x20000));
        assert_eq!(config.busy_timeout(), Duration::from_millis(5000));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(AppConfig::from_yaml("pagesize: 3").is_err());
    }

    #[test]
    fn test_overrides_win() {
        let config = AppConfig::from_yaml("addr: 127.0.0.1:1\npage_size: 5").unwrap();
        let config = config.with_overrides(Overrides {
            database: Some(PathBuf::from("x.db")),
            addr: Some("127.0.0.1:2".to_string()),
            page_size: None,
            ..Overrides::default()
        });
        assert_eq!(config.addr, "127.0.0.1:2");
        assert_eq!(config.page_size, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_requires_database() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("--database"));
    }
}
