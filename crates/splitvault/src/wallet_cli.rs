//! `splitvault wallet` subcommands

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use splitvault_crypto::{
    setup_wallet, KdfParams, SecretSharingEngine, ShareCipherKind,
    SigningKeypairReconstructor, SigningRequest,
};
use splitvault_types::Chain;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::common::{get_passcode, wallet_path};
use crate::wallet_file::WalletFile;

/// Manage passcode-protected wallets
#[derive(Debug, Subcommand)]
pub enum WalletCommand {
    /// Create a wallet and print its backup share once
    Create {
        /// Wallet name
        #[arg(long, default_value = "default")]
        name: String,

        /// Chains to derive addresses for (comma separated, default: all)
        #[arg(long, value_delimiter = ',')]
        chains: Vec<Chain>,

        /// Read the passcode from a file instead of prompting
        #[arg(long)]
        passcode_file: Option<PathBuf>,

        /// Encrypt the server share with the unauthenticated XOR stream
        #[arg(long, default_value = "false")]
        legacy_cipher: bool,

        /// Overwrite an existing wallet of the same name
        #[arg(long, default_value = "false")]
        overwrite: bool,
    },

    /// Show a wallet's address for a chain, re-deriving it with the passcode
    /// when it is not stored yet or when --verify is given
    Address {
        /// Wallet name
        #[arg(long, default_value = "default")]
        name: String,

        /// Chain
        #[arg(long)]
        chain: Chain,

        /// Re-derive and check against the stored address
        #[arg(long, default_value = "false")]
        verify: bool,

        /// Read the passcode from a file instead of prompting
        #[arg(long)]
        passcode_file: Option<PathBuf>,
    },

    /// Sign a message with a chain key
    Sign {
        /// Wallet name
        #[arg(long, default_value = "default")]
        name: String,

        /// Chain
        #[arg(long)]
        chain: Chain,

        /// Message (UTF-8, or hex with --hex)
        message: String,

        /// Treat the message as hex
        #[arg(long, default_value = "false")]
        hex: bool,

        /// Read the passcode from a file instead of prompting
        #[arg(long)]
        passcode_file: Option<PathBuf>,
    },

    /// Change the passcode; addresses stay the same
    Rotate {
        /// Wallet name
        #[arg(long, default_value = "default")]
        name: String,

        /// Read the current passcode from a file instead of prompting
        #[arg(long)]
        old_passcode_file: Option<PathBuf>,

        /// Read the new passcode from a file instead of prompting
        #[arg(long)]
        new_passcode_file: Option<PathBuf>,
    },
}

/// Run a wallet subcommand against wallets under `home`
pub fn execute_wallet_command(
    home: &Path,
    kdf: KdfParams,
    command: WalletCommand,
) -> Result<()> {
    match command {
        WalletCommand::Create {
            name,
            chains,
            passcode_file,
            legacy_cipher,
            overwrite,
        } => cmd_create(
            home,
            kdf,
            &name,
            &chains,
            passcode_file.as_deref(),
            legacy_cipher,
            overwrite,
        ),
        WalletCommand::Address {
            name,
            chain,
            verify,
            passcode_file,
        } => cmd_address(home, &name, chain, verify, passcode_file.as_deref()),
        WalletCommand::Sign {
            name,
            chain,
            message,
            hex,
            passcode_file,
        } => cmd_sign(home, &name, chain, &message, hex, passcode_file.as_deref()),
        WalletCommand::Rotate {
            name,
            old_passcode_file,
            new_passcode_file,
        } => cmd_rotate(
            home,
            kdf,
            &name,
            old_passcode_file.as_deref(),
            new_passcode_file.as_deref(),
        ),
    }
}

fn cmd_create(
    home: &Path,
    kdf: KdfParams,
    name: &str,
    chains: &[Chain],
    passcode_file: Option<&Path>,
    legacy_cipher: bool,
    overwrite: bool,
) -> Result<()> {
    let path = wallet_path(home, name)?;
    if path.exists() && !overwrite {
        bail!(
            "Wallet '{}' already exists at {}. Use --overwrite to replace.",
            name,
            path.display()
        );
    }

    let passcode = get_passcode(passcode_file, "Enter a 6-digit passcode: ", true)?;
    let cipher = if legacy_cipher {
        ShareCipherKind::LegacyXorStream
    } else {
        ShareCipherKind::Aes256Gcm
    };
    let engine = SecretSharingEngine::new(kdf).with_cipher(cipher);
    let setup = setup_wallet(&engine, &passcode, chains)?;

    WalletFile::new(setup.record, setup.wallets.clone()).save(&path)?;
    info!(wallet = name, path = %path.display(), "Saved wallet");

    println!("Created wallet '{}'", name);
    println!();
    for wallet in &setup.wallets {
        println!("  {:<10} {}", wallet.chain, wallet.address);
    }
    println!();
    println!("Backup share (shown once, store it offline):");
    println!("  {}", setup.backup_share_hex);
    Ok(())
}

fn cmd_address(
    home: &Path,
    name: &str,
    chain: Chain,
    verify: bool,
    passcode_file: Option<&Path>,
) -> Result<()> {
    let path = wallet_path(home, name)?;
    let mut file = WalletFile::load(&path)?;

    if let (Some(stored), false) = (file.wallet(chain), verify) {
        println!("{}", stored.address);
        return Ok(());
    }

    let passcode = get_passcode(passcode_file, "Passcode: ", false)?;
    let reconstructor = SigningKeypairReconstructor::new(engine_for(&file));
    let anchor = file.wallet(chain).unwrap_or(file.anchor()?).clone();
    let request = SigningRequest::new(&passcode, &file.record, &anchor);
    let derived = reconstructor.derive_wallets(request, &[chain])?;

    let Some(wallet) = derived.into_iter().next() else {
        bail!("No wallet derived for {}", chain);
    };
    if file.wallet(chain).is_none() {
        file.wallets.push(wallet.clone());
        file.save(&path)?;
        info!(wallet = name, chain = %chain, "Added chain wallet");
    }
    println!("{}", wallet.address);
    Ok(())
}

fn cmd_sign(
    home: &Path,
    name: &str,
    chain: Chain,
    message: &str,
    is_hex: bool,
    passcode_file: Option<&Path>,
) -> Result<()> {
    let file = WalletFile::load(&wallet_path(home, name)?)?;
    let Some(wallet) = file.wallet(chain) else {
        bail!(
            "Wallet '{}' has no {} address yet. Run 'splitvault wallet address --chain {}' first.",
            name,
            chain,
            chain
        );
    };
    let msg = if is_hex {
        hex::decode(message.trim_start_matches("0x")).context("Message is not valid hex")?
    } else {
        message.as_bytes().to_vec()
    };

    let passcode = get_passcode(passcode_file, "Passcode: ", false)?;
    let reconstructor = SigningKeypairReconstructor::new(engine_for(&file));
    let signature = reconstructor
        .sign(SigningRequest::new(&passcode, &file.record, wallet), &msg)?;

    println!("{}", signature.encode());
    Ok(())
}

fn cmd_rotate(
    home: &Path,
    kdf: KdfParams,
    name: &str,
    old_passcode_file: Option<&Path>,
    new_passcode_file: Option<&Path>,
) -> Result<()> {
    let path = wallet_path(home, name)?;
    let mut file = WalletFile::load(&path)?;

    let old = get_passcode(old_passcode_file, "Current passcode: ", false)?;
    let new = get_passcode(new_passcode_file, "New passcode: ", true)?;

    // New records always use the configured iterations and the AEAD cipher
    let engine = SecretSharingEngine::new(kdf);
    let record = engine.rotate(&old, &new, &file.record, file.anchor()?)?;

    let backup = record.backup_share_hex();
    file.record = record;
    file.save(&path)?;
    info!(wallet = name, "Rotated wallet passcode");

    println!("Passcode changed for wallet '{}'. Addresses are unchanged.", name);
    println!();
    println!("New backup share (the previous one no longer works):");
    println!("  {}", backup);
    Ok(())
}

/// Engine matching how `file`'s record was written
fn engine_for(file: &WalletFile) -> SecretSharingEngine {
    SecretSharingEngine::new(file.record.kdf_params()).with_cipher(file.record.cipher)
}
