//! `splitvault otc` subcommands

use anyhow::{bail, Result};
use clap::Subcommand;
use rand::rngs::OsRng;
use serde::Serialize;
use splitvault_links::{LinkConfig, OneTimeCodeCodec, OtcRecord};
use splitvault_types::{Amount, LinkId, TimestampMillis};

/// Issue and check payment link one-time codes
#[derive(Debug, Subcommand)]
pub enum OtcCommand {
    /// Generate the code and verification data for a link
    Issue {
        /// Link identifier
        #[arg(long)]
        link_id: LinkId,

        /// Decimal amount, exactly as stored with the link
        #[arg(long)]
        amount: Amount,

        /// Creation time in Unix milliseconds (default: now)
        #[arg(long)]
        created_at: Option<i64>,

        /// Key the code with a fresh random per-link key
        #[arg(long, default_value = "false")]
        per_link_key: bool,
    },

    /// Check a code against a stored link record
    Verify {
        /// Link identifier
        #[arg(long)]
        link_id: LinkId,

        /// Decimal amount, exactly as stored with the link
        #[arg(long)]
        amount: Amount,

        /// Creation time in Unix milliseconds
        #[arg(long)]
        created_at: i64,

        /// Stored verification data (`digest:code`)
        #[arg(long, default_value = "")]
        verification_data: String,

        /// Per-link key (hex), if the link was issued with one
        #[arg(long)]
        link_key: Option<String>,

        /// Code supplied by the redeemer
        code: String,
    },
}

#[derive(Serialize)]
struct IssueOutput<'a> {
    record: &'a OtcRecord,
    code: &'a str,
}

/// Run an OTC subcommand with the deployment secret from `config`
pub fn execute_otc_command(config: &LinkConfig, command: OtcCommand) -> Result<()> {
    config.validate()?;
    let codec = OneTimeCodeCodec::new(config.otc_secret()?)?;

    match command {
        OtcCommand::Issue {
            link_id,
            amount,
            created_at,
            per_link_key,
        } => {
            let created_at = created_at
                .map(TimestampMillis::new)
                .unwrap_or_else(TimestampMillis::now);
            let (record, generated) = if per_link_key {
                codec.generate_with_link_key(&link_id, &amount, created_at, &mut OsRng)?
            } else {
                codec.issue(&link_id, &amount, created_at)?
            };
            let output = IssueOutput {
                record: &record,
                code: &generated.code,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        OtcCommand::Verify {
            link_id,
            amount,
            created_at,
            verification_data,
            link_key,
            code,
        } => {
            let record = OtcRecord {
                link_id,
                amount,
                created_at: TimestampMillis::new(created_at),
                verification_data,
                link_key,
            };
            if !codec.verify_record(&code, &record) {
                bail!("Code does not match link {}", record.link_id);
            }
            println!("Code is valid for link {}", record.link_id);
        }
    }

    Ok(())
}
