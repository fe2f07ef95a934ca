//! Shared helpers for CLI commands

use anyhow::{anyhow, bail, Context, Result};
use splitvault_crypto::Passcode;
use std::fs;
use std::path::{Path, PathBuf};
use zeroize::Zeroize;

/// Environment variable overriding the home directory
pub const SPLITVAULT_HOME_ENV: &str = "SPLITVAULT_HOME";

/// Home directory name under the user's home
pub const DEFAULT_HOME_DIR: &str = ".splitvault";

/// Directory holding wallet files within home
pub const WALLETS_DIR: &str = "wallets";

/// Default home directory.
///
/// Resolution order:
/// 1. `SPLITVAULT_HOME` environment variable (if set)
/// 2. `~/.splitvault`
pub fn default_home_dir() -> PathBuf {
    if let Ok(home) = std::env::var(SPLITVAULT_HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_HOME_DIR)
}

/// Location of the JSON config within home
pub fn config_path(home: &Path) -> PathBuf {
    home.join("config").join("splitvault.json")
}

/// Location of a named wallet file within home
pub fn wallet_path(home: &Path, name: &str) -> Result<PathBuf> {
    let valid = !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if !valid {
        bail!("Invalid wallet name '{}': use letters, digits, '-' or '_'", name);
    }
    Ok(home.join(WALLETS_DIR).join(format!("{name}.json")))
}

/// Ensure a directory exists, owner-only on unix
pub fn ensure_private_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o700);
            fs::set_permissions(dir, perms).context("Failed to set directory permissions")?;
        }
    }
    Ok(())
}

/// Read a passcode from file or prompt interactively
pub fn get_passcode(passcode_file: Option<&Path>, prompt: &str, confirm: bool) -> Result<Passcode> {
    match passcode_file {
        Some(file) => read_passcode_from_file(file),
        None => prompt_passcode(prompt, confirm),
    }
}

/// Read a passcode from the first line of a file
pub fn read_passcode_from_file(path: &Path) -> Result<Passcode> {
    let mut content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read passcode file: {}", path.display()))?;
    let passcode = Passcode::new(content.trim());
    content.zeroize();
    passcode.map_err(|e| anyhow!("{}: {}", path.display(), e))
}

/// Prompt for a passcode with optional confirmation
pub fn prompt_passcode(prompt: &str, confirm: bool) -> Result<Passcode> {
    let mut entered = rpassword::prompt_password(prompt).context("Failed to read passcode")?;
    let passcode = Passcode::new(entered.trim());

    if confirm {
        let mut confirmation = rpassword::prompt_password("Confirm passcode: ")
            .context("Failed to read passcode confirmation")?;
        let matches = confirmation.trim() == entered.trim();
        confirmation.zeroize();
        if !matches {
            entered.zeroize();
            bail!("Passcodes do not match");
        }
    }

    entered.zeroize();
    Ok(passcode?)
}
