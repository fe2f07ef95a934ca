//! On-disk wallet file: the share record plus public chain wallets

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use splitvault_crypto::ShareRecord;
use splitvault_types::{Chain, ChainWallet};
use std::fs;
use std::path::Path;

use crate::common::ensure_private_dir;

/// Current wallet file format version
pub const WALLET_FILE_VERSION: u32 = 1;

/// Persisted wallet state. Holds no secret that alone unlocks the wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletFile {
    /// Format version
    pub version: u32,
    /// Encrypted server share, backup share and salt
    pub record: ShareRecord,
    /// Public wallets derived at creation (and added later)
    pub wallets: Vec<ChainWallet>,
}

impl WalletFile {
    /// New file for a freshly created wallet
    pub fn new(record: ShareRecord, wallets: Vec<ChainWallet>) -> Self {
        Self {
            version: WALLET_FILE_VERSION,
            record,
            wallets,
        }
    }

    /// Load and validate
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("Failed to read wallet file {}", path.display()))?;
        let file: Self = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse wallet file {}", path.display()))?;
        if file.version != WALLET_FILE_VERSION {
            bail!(
                "Unsupported wallet file version {} (expected {})",
                file.version,
                WALLET_FILE_VERSION
            );
        }
        file.record.validate()?;
        if file.wallets.is_empty() {
            bail!("Wallet file {} lists no chain wallets", path.display());
        }
        Ok(file)
    }

    /// Write with owner-only permissions on unix
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            ensure_private_dir(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write wallet file {}", path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(path, fs::Permissions::from_mode(0o600))
                .context("Failed to set wallet file permissions")?;
        }
        Ok(())
    }

    /// Stored wallet for `chain`, if derived
    pub fn wallet(&self, chain: Chain) -> Option<&ChainWallet> {
        self.wallets.iter().find(|w| w.chain == chain)
    }

    /// Wallet used to check a passcode before any other derivation
    pub fn anchor(&self) -> Result<&ChainWallet> {
        self.wallets
            .first()
            .ok_or_else(|| anyhow!("Wallet file lists no chain wallets"))
    }
}
