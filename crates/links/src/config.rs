//! Payment link configuration
//!
//! Resolution order (highest priority first):
//! 1. Environment variables ([`OTC_SECRET_ENV`], [`TRANSFER_TIMEOUT_ENV`])
//! 2. Values in the JSON config file
//! 3. Defaults

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{LinkError, LinkResult};

/// Overrides `otc_secret_hex`
///
/// ```bash
/// SPLITVAULT_OTC_SECRET=$(openssl rand -hex 32) splitvault otc issue ...
/// ```
pub const OTC_SECRET_ENV: &str = "SPLITVAULT_OTC_SECRET";

/// Overrides `transfer_timeout_ms`
pub const TRANSFER_TIMEOUT_ENV: &str = "SPLITVAULT_TRANSFER_TIMEOUT_MS";

/// Shortest accepted OTC secret in bytes
pub const MIN_OTC_SECRET_LEN: usize = 16;

/// Default link lifetime: 7 days
pub const DEFAULT_TTL_SECS: u64 = 7 * 24 * 60 * 60;

/// Default executor timeout
pub const DEFAULT_TRANSFER_TIMEOUT_MS: u64 = 30_000;

fn default_ttl_secs() -> u64 {
    DEFAULT_TTL_SECS
}

fn default_transfer_timeout_ms() -> u64 {
    DEFAULT_TRANSFER_TIMEOUT_MS
}

/// Deployment configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Hex deployment secret for one-time codes
    #[serde(default)]
    pub otc_secret_hex: String,

    /// Lifetime of new links in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Executor call timeout in milliseconds
    #[serde(default = "default_transfer_timeout_ms")]
    pub transfer_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            otc_secret_hex: String::new(),
            default_ttl_secs: DEFAULT_TTL_SECS,
            transfer_timeout_ms: DEFAULT_TRANSFER_TIMEOUT_MS,
        }
    }
}

impl LinkConfig {
    /// Config with a freshly generated 32-byte OTC secret
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut secret = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut secret);
        let config = Self {
            otc_secret_hex: hex::encode(secret),
            ..Self::default()
        };
        zeroize::Zeroize::zeroize(&mut secret);
        config
    }

    /// Load from a JSON file, then apply environment overrides
    pub fn load(path: &Path) -> LinkResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| LinkError::Config(format!("{}: {e}", path.display())))?;
        let mut config: Self = serde_json::from_str(&json)
            .map_err(|e| LinkError::Config(format!("{}: {e}", path.display())))?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> LinkResult<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> LinkResult<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| LinkError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| LinkError::Config(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(path, json)
            .map_err(|e| LinkError::Config(format!("{}: {e}", path.display())))?;
        Ok(())
    }

    /// Apply [`OTC_SECRET_ENV`] and [`TRANSFER_TIMEOUT_ENV`] if set
    pub fn apply_env_overrides(&mut self) -> LinkResult<()> {
        if let Ok(secret) = std::env::var(OTC_SECRET_ENV) {
            self.otc_secret_hex = secret;
        }
        if let Ok(timeout) = std::env::var(TRANSFER_TIMEOUT_ENV) {
            self.transfer_timeout_ms = timeout.trim().parse().map_err(|_| {
                LinkError::Config(format!("{TRANSFER_TIMEOUT_ENV}: not a number: {timeout}"))
            })?;
        }
        Ok(())
    }

    /// Reject a short or malformed secret and a zero timeout or TTL
    pub fn validate(&self) -> LinkResult<()> {
        let secret = self.otc_secret()?;
        if secret.len() < MIN_OTC_SECRET_LEN {
            return Err(LinkError::Config(format!(
                "otc secret must be at least {MIN_OTC_SECRET_LEN} bytes, got {}",
                secret.len()
            )));
        }
        if self.transfer_timeout_ms == 0 {
            return Err(LinkError::Config("transfer_timeout_ms must be positive".into()));
        }
        if self.default_ttl_secs == 0 {
            return Err(LinkError::Config("default_ttl_secs must be positive".into()));
        }
        Ok(())
    }

    /// Decoded OTC secret
    pub fn otc_secret(&self) -> LinkResult<Vec<u8>> {
        hex::decode(self.otc_secret_hex.trim())
            .map_err(|e| LinkError::Config(format!("otc_secret_hex: {e}")))
    }

    /// Default link lifetime
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    /// Executor call timeout
    pub fn transfer_timeout(&self) -> Duration {
        Duration::from_millis(self.transfer_timeout_ms)
    }
}

impl std::fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkConfig")
            .field("otc_secret_hex", &"[REDACTED]")
            .field("default_ttl_secs", &self.default_ttl_secs)
            .field("transfer_timeout_ms", &self.transfer_timeout_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = LinkConfig::default();
        assert_eq!(config.default_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.transfer_timeout(), Duration::from_secs(30));
        // No secret yet
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_generate_validates() {
        let config = LinkConfig::generate();
        config.validate().unwrap();
        assert_eq!(config.otc_secret().unwrap().len(), 32);
    }

    #[test]
    fn test_validate_rejections() {
        let mut config = LinkConfig::generate();
        config.otc_secret_hex = hex::encode([1u8; 8]);
        assert!(matches!(config.validate(), Err(LinkError::Config(_))));

        let mut config = LinkConfig::generate();
        config.otc_secret_hex = "xyz".into();
        assert!(matches!(config.validate(), Err(LinkError::Config(_))));

        let mut config = LinkConfig::generate();
        config.transfer_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(LinkError::Config(_))));

        let mut config = LinkConfig::generate();
        config.default_ttl_secs = 0;
        assert!(matches!(config.validate(), Err(LinkError::Config(_))));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("links.json");
        let config = LinkConfig {
            default_ttl_secs: 60,
            ..LinkConfig::generate()
        };
        config.save(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        let loaded: LinkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: LinkConfig = serde_json::from_str(r#"{"otc_secret_hex":"00"}"#).unwrap();
        assert_eq!(config.default_ttl_secs, DEFAULT_TTL_SECS);
        assert_eq!(config.transfer_timeout_ms, DEFAULT_TRANSFER_TIMEOUT_MS);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = LinkConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, LinkError::Config(_)));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = LinkConfig::generate();
        assert!(!format!("{:?}", config).contains(&config.otc_secret_hex));
    }
}
