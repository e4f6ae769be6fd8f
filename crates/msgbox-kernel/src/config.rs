//! Kernel configuration.

use serde::{Deserialize, Serialize};

use crate::error::{KernelError, Result};

/// Configuration for the Kernel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Messages per chunk when building batch attestations.
    pub chunk_size: usize,
    /// Build batches as a combination tree instead of one sequential chain.
    pub parallel_tree: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            chunk_size: 16,
            parallel_tree: false,
        }
    }
}

impl KernelConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KernelError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(KernelError::Config("chunk_size must be at least 1".into()));
        }
        Ok(())
    }
}
