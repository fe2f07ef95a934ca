//! splitvault CLI
//!
//! Local operator tool for passcode-protected wallets and payment link codes.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use splitvault::common::default_home_dir;
use splitvault::{
    config_path, execute_otc_command, execute_wallet_command, CliConfig, OtcCommand,
    WalletCommand,
};
use std::path::{Path, PathBuf};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

/// splitvault
#[derive(Parser)]
#[command(name = "splitvault")]
#[command(version)]
#[command(about = "Passcode-protected wallets and payment link codes", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    /// Directory for config and wallets
    #[arg(long, global = true, default_value_os_t = default_home_dir())]
    home: PathBuf,

    /// Path to configuration file (overrides --home)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// The logging level (trace|debug|info|warn|error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// The logging format (json|plain)
    #[arg(long, global = true, default_value = "plain")]
    log_format: String,

    /// Print out full error chain on errors
    #[arg(long, global = true, default_value = "false")]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create, inspect and use passcode-protected wallets
    Wallet {
        #[command(subcommand)]
        command: WalletCommand,
    },

    /// Issue and verify payment link one-time codes
    Otc {
        #[command(subcommand)]
        command: OtcCommand,
    },

    /// Utilities for managing configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Write a configuration file with a fresh OTC secret
    Init {
        /// Overwrite existing configuration
        #[arg(long, default_value = "false")]
        overwrite: bool,
    },

    /// Show the effective configuration (secret redacted)
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, &cli.log_format);

    let config_file = cli.config.clone().unwrap_or_else(|| config_path(&cli.home));

    let result = match cli.command {
        Commands::Wallet { command } => CliConfig::load(&config_file)
            .and_then(|config| config.kdf_params())
            .and_then(|kdf| execute_wallet_command(&cli.home, kdf, command)),

        Commands::Otc { command } => CliConfig::load(&config_file)
            .and_then(|config| execute_otc_command(&config.links, command)),

        Commands::Config { command } => cmd_config(&config_file, command),
    };

    if let Err(e) = &result {
        if cli.trace {
            eprintln!("Error: {:?}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn init_tracing(log_level: &str, log_format: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    // Logs go to stderr so command output stays pipeable
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    match log_format {
        "json" => subscriber.json().init(),
        _ => subscriber.init(),
    }
}

fn cmd_config(config_file: &Path, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { overwrite } => {
            if config_file.exists() && !overwrite {
                bail!(
                    "Configuration already exists at {}. Use --overwrite to replace.",
                    config_file.display()
                );
            }
            let config = CliConfig::generate();
            config.save(config_file)?;
            info!(path = %config_file.display(), "Wrote configuration");

            println!("Successfully initialized configuration");
            println!();
            println!("  Config:         {}", config_file.display());
            println!("  Link TTL:       {}s", config.links.default_ttl_secs);
            println!("  Transfer limit: {}ms", config.links.transfer_timeout_ms);
            println!("  KDF iterations: {}", config.kdf_iterations);
        }

        ConfigCommands::Show => {
            let config = CliConfig::load(config_file)?;
            let mut value = serde_json::to_value(&config)?;
            value["otc_secret_hex"] = serde_json::Value::String(if config.links.otc_secret_hex.is_empty() {
                String::new()
            } else {
                "[REDACTED]".to_string()
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }

    Ok(())
}
