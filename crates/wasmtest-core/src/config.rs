//! Runner configuration
//!
//! Loaded from a TOML file passed with `--config`. Every key is optional:
//!
//! ```toml
//! admin = "AUaJb9oLGfZzaVZM6pdKZrKa8HfDiQ193J"
//! admin_always_signs = false
//! block_height = 1
//! block_timestamp = 1530316800
//! groups = [0, 2]
//! ```

use std::path::Path;

use crate::address::Address;
use crate::engine::memory::{BlockEnv, MemoryEngine, DEFAULT_TIMESTAMP};
use crate::executor::RunOptions;
use crate::{Error, Result};

/// Seed the default admin address is derived from
pub const DEFAULT_ADMIN_SEED: &[u8] = b"admin";

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Base58 admin address; derived from [`DEFAULT_ADMIN_SEED`] when unset
    pub admin: Option<String>,
    pub admin_always_signs: bool,
    pub block_height: u32,
    pub block_timestamp: u64,
    /// Group indexes to run; all groups when unset
    pub groups: Option<Vec<usize>>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            admin: None,
            admin_always_signs: false,
            block_height: 1,
            block_timestamp: DEFAULT_TIMESTAMP,
            groups: None,
        }
    }
}

impl RunnerConfig {
    /// Read a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&text).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RunnerConfig =
            toml::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.admin_address()?;
        Ok(config)
    }

    pub fn admin_address(&self) -> Result<Address> {
        match &self.admin {
            Some(text) => Address::from_base58(text.trim())
                .map_err(|reason| Error::Config(format!("invalid admin address: {}", reason))),
            None => Ok(Address::from_code(DEFAULT_ADMIN_SEED)),
        }
    }

    pub fn block_env(&self) -> BlockEnv {
        BlockEnv {
            height: self.block_height,
            timestamp: self.block_timestamp,
        }
    }

    pub fn run_options(&self) -> RunOptions {
        RunOptions {
            admin_always_signs: self.admin_always_signs,
            groups: self.groups.clone(),
        }
    }

    /// An in-memory host with every reference contract deployed
    pub fn build_engine(&self) -> Result<MemoryEngine> {
        let mut engine = MemoryEngine::new(self.admin_address()?).with_block(self.block_env());
        crate::contracts::deploy_all(&mut engine);
        Ok(engine)
    }
}
