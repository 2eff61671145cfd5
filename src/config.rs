//! Engine configuration, from a JSON file or the environment.

use crate::crypto::Pepper;
use crate::error::{CertError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const ENV_PEPPER: &str = "CSL_PEPPER";
pub const ENV_STORE_TIMEOUT_MS: &str = "CSL_STORE_TIMEOUT_MS";
pub const ENV_CACHE_CAPACITY: &str = "CSL_CACHE_CAPACITY";

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Secret mixed into every verification digest.
    pub pepper: Pepper,
    /// Upper bound on any single store call.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Entries kept by the lookup cache.
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

fn default_store_timeout_ms() -> u64 {
    2_000
}

fn default_cache_capacity() -> usize {
    1_000
}

impl EngineConfig {
    pub fn new(pepper: Pepper) -> Self {
        Self {
            pepper,
            store_timeout_ms: default_store_timeout_ms(),
            cache_capacity: default_cache_capacity(),
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| CertError::Config(format!("{}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let pepper = lookup(ENV_PEPPER)
            .ok_or_else(|| CertError::Config(format!("{ENV_PEPPER} is not set")))?;
        let mut config = Self::new(Pepper::new(pepper)?);

        if let Some(raw) = lookup(ENV_STORE_TIMEOUT_MS) {
            config.store_timeout_ms = parse_number(ENV_STORE_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_CACHE_CAPACITY) {
            config.cache_capacity = parse_number(ENV_CACHE_CAPACITY, &raw)?;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.store_timeout_ms == 0 {
            return Err(CertError::Config("store_timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| CertError::Config(format!("{key} must be a number, got {raw:?}")))
}
