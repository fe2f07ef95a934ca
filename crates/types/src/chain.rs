//! Supported ledgers and the public half of a derived wallet
//!
//! Every chain belongs to exactly one [`CurveFamily`]. All secp256k1 networks
//! share one derivation tag ([`CANONICAL_EVM_TAG`]) and therefore one address.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Derivation tag used for every secp256k1-family network.
pub const CANONICAL_EVM_TAG: &str = "ethereum";

/// Curve family a chain's signing keys live on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CurveFamily {
    /// Ed25519 (SLIP-10 derived, base58 addresses)
    Ed25519,
    /// Secp256k1 (tag derived, keccak256 20-byte addresses)
    Secp256k1,
}

impl fmt::Display for CurveFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CurveFamily::Ed25519 => write!(f, "ed25519"),
            CurveFamily::Secp256k1 => write!(f, "secp256k1"),
        }
    }
}

/// A ledger a wallet can hold funds on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    /// Solana mainnet
    Solana,
    /// Ethereum mainnet
    Ethereum,
    /// Polygon PoS
    Polygon,
    /// Base
    Base,
    /// Arbitrum One
    Arbitrum,
    /// OP Mainnet
    Optimism,
}

impl Chain {
    /// Every supported chain, ed25519 first
    pub const ALL: [Chain; 6] = [
        Chain::Solana,
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Base,
        Chain::Arbitrum,
        Chain::Optimism,
    ];

    /// Curve family used to derive keys for this chain
    pub const fn family(&self) -> CurveFamily {
        match self {
            Chain::Solana => CurveFamily::Ed25519,
            Chain::Ethereum | Chain::Polygon | Chain::Base | Chain::Arbitrum | Chain::Optimism => {
                CurveFamily::Secp256k1
            }
        }
    }

    /// Lowercase canonical name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Chain::Solana => "solana",
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Base => "base",
            Chain::Arbitrum => "arbitrum",
            Chain::Optimism => "optimism",
        }
    }

    /// True for every secp256k1 (EVM-compatible) network
    pub const fn is_evm(&self) -> bool {
        matches!(self.family(), CurveFamily::Secp256k1)
    }

    /// Derivation tag for secp256k1 chains, `None` for ed25519 chains.
    ///
    /// Always [`CANONICAL_EVM_TAG`] so that all EVM networks resolve to one
    /// address.
    pub const fn derivation_tag(&self) -> Option<&'static str> {
        match self.family() {
            CurveFamily::Secp256k1 => Some(CANONICAL_EVM_TAG),
            CurveFamily::Ed25519 => None,
        }
    }

    /// Compare two address strings using this chain's address rules.
    ///
    /// EVM addresses are hex and compared case-insensitively with an optional
    /// `0x` prefix; base58 addresses are case-sensitive and compared verbatim.
    pub fn addresses_match(&self, a: &str, b: &str) -> bool {
        match self.family() {
            CurveFamily::Secp256k1 => {
                let a = a.trim().trim_start_matches("0x").trim_start_matches("0X");
                let b = b.trim().trim_start_matches("0x").trim_start_matches("0X");
                !a.is_empty() && a.eq_ignore_ascii_case(b)
            }
            CurveFamily::Ed25519 => {
                let a = a.trim();
                !a.is_empty() && a == b.trim()
            }
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "solana" | "sol" => Ok(Chain::Solana),
            "ethereum" | "eth" => Ok(Chain::Ethereum),
            "polygon" | "matic" => Ok(Chain::Polygon),
            "base" => Ok(Chain::Base),
            "arbitrum" | "arb" => Ok(Chain::Arbitrum),
            "optimism" | "op" => Ok(Chain::Optimism),
            other => Err(TypesError::UnsupportedChain(other.to_string())),
        }
    }
}

/// Public, persistable part of a derived chain keypair.
///
/// The private key is never stored; it is re-derived from the reconstructed
/// root secret whenever a signature is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainWallet {
    /// Chain the wallet belongs to
    pub chain: Chain,
    /// Ledger-native address (base58 or 0x-prefixed checksummed hex)
    pub address: String,
    /// Hex-encoded public key (32 bytes ed25519, 33 bytes compressed secp256k1)
    pub public_key: String,
}

impl ChainWallet {
    /// Check a candidate address against the stored one
    pub fn matches_address(&self, candidate: &str) -> bool {
        self.chain.addresses_match(&self.address, candidate)
    }
}
