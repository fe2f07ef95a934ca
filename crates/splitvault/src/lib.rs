//! splitvault operator CLI library
//!
//! Command implementations live here so they can be driven from
//! integration tests; `main.rs` only parses arguments and sets up logging.

pub mod common;
pub mod config;
pub mod otc_cli;
pub mod wallet_cli;
pub mod wallet_file;

pub use common::{config_path, SPLITVAULT_HOME_ENV, DEFAULT_HOME_DIR};
pub use config::CliConfig;
pub use otc_cli::{execute_otc_command, OtcCommand};
pub use wallet_cli::{execute_wallet_command, WalletCommand};
pub use wallet_file::{WalletFile, WALLET_FILE_VERSION};
