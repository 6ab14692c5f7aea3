//! Store configuration.
//!
//! Loaded from a TOML file (`h4ul.toml` by convention), with environment
//! variables taking precedence so deployments can override a checked-in
//! file without editing it.

use std::path::Path;

use serde::Deserialize;

use crate::errors::StoreError;

pub const ENV_REDIS_URL: &str = "H4UL_REDIS_URL";
pub const ENV_KEY_PREFIX: &str = "H4UL_KEY_PREFIX";

const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_KEY_PREFIX: &str = "h4ul";

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Connection URL for the Redis backend.
    pub redis_url: String,
    /// Namespace prepended to every key. Lets several deployments (or test
    /// runs) share one server.
    pub key_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
        }
    }
}

impl StoreConfig {
    /// Defaults overlaid with any `H4UL_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// Reads a TOML config file, then applies environment overrides.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|err| StoreError::internal(format!("cannot read {}: {err}", path.display())))?;
        let config: Self = toml::from_str(&raw)
            .map_err(|err| StoreError::internal(format!("cannot parse {}: {err}", path.display())))?;
        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var(ENV_REDIS_URL)
            && !url.is_empty()
        {
            self.redis_url = url;
        }
        if let Ok(prefix) = std::env::var(ENV_KEY_PREFIX)
            && !prefix.is_empty()
        {
            self.key_prefix = prefix;
        }
        self
    }
}
