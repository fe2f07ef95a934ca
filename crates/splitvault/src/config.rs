//! CLI configuration
//!
//! One JSON file holds the payment link settings and the wallet KDF cost
//! side by side:
//!
//! ```json
//! {
//!   "otc_secret_hex": "...",
//!   "default_ttl_secs": 604800,
//!   "transfer_timeout_ms": 30000,
//!   "kdf_iterations": 100000
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use splitvault_crypto::{KdfParams, DEFAULT_ITERATIONS};
use splitvault_links::LinkConfig;
use std::path::Path;

fn default_kdf_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// Settings for every CLI command
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Payment link settings
    #[serde(flatten)]
    pub links: LinkConfig,

    /// PBKDF2 iterations for newly created wallets
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            links: LinkConfig::default(),
            kdf_iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl CliConfig {
    /// Defaults with a fresh OTC secret
    pub fn generate() -> Self {
        Self {
            links: LinkConfig::generate(),
            ..Self::default()
        }
    }

    /// Load from `path` if it exists, otherwise defaults.
    ///
    /// Link environment overrides apply in both cases.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str::<Self>(&json)
                .with_context(|| format!("Failed to parse config {}", path.display()))?
        } else {
            Self::default()
        };
        config.links.apply_env_overrides()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }

    /// Validated KDF parameters for new wallets
    pub fn kdf_params(&self) -> Result<KdfParams> {
        let kdf = KdfParams::new(self.kdf_iterations);
        kdf.validate()?;
        Ok(kdf)
    }
}
