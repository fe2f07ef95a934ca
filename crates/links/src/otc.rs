//! Six-digit one-time codes bound to a payment link
//!
//! ```text
//! key    = secret || amount || created_at (decimal millis)
//! digest = HMAC-SHA256(key, link_id)
//! code   = int(hex(digest)[..12]) mod 10^6, zero-padded to 6 digits
//! data   = hex(digest) ":" code
//! ```
//!
//! `secret` is the deployment secret, or a random per-link key when the
//! link was issued with [`OneTimeCodeCodec::generate_with_link_key`].
//!
//! Verification always recomputes the digest from the triple and compares
//! in constant time, so a code is only accepted for the exact link id,
//! amount and creation time it was issued for. There is no time-based
//! rotation; freshness comes from the link's expiry.

use hmac::{Hmac, Mac};
use rand::{CryptoRng, RngCore};
use secrecy::{ExposeSecret, SecretBox};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use splitvault_types::{Amount, LinkId, TimestampMillis};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::{LinkError, LinkResult};

/// Digits in a one-time code
pub const CODE_LENGTH: usize = 6;

/// Per-link key length in bytes
pub const LINK_KEY_LENGTH: usize = 32;

/// Code space size
const CODE_MODULUS: u64 = 1_000_000;

/// Leading digest bytes behind the code (12 hex characters)
const CODE_PREFIX_BYTES: usize = 6;

type HmacSha256 = Hmac<Sha256>;

/// A freshly generated code and the data to persist with the link
#[derive(Clone, PartialEq, Eq)]
pub struct GeneratedCode {
    /// Six-digit code to hand to the creator; never persisted on its own
    pub code: String,
    /// `digest_hex:code`
    pub verification_data: String,
}

impl std::fmt::Debug for GeneratedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedCode")
            .field("code", &"[REDACTED]")
            .field("verification_data", &"[REDACTED]")
            .finish()
    }
}

/// Persisted one-time-code record of a link; never mutated after creation
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtcRecord {
    /// Link identifier (the HMAC message)
    pub link_id: LinkId,
    /// Exact amount string
    pub amount: Amount,
    /// Creation time in Unix milliseconds
    pub created_at: TimestampMillis,
    /// `digest_hex:code`, or just `digest_hex` for older records
    pub verification_data: String,
    /// Hex per-link key, when the link does not use the deployment secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_key: Option<String>,
}

impl std::fmt::Debug for OtcRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtcRecord")
            .field("link_id", &self.link_id)
            .field("amount", &self.amount)
            .field("created_at", &self.created_at)
            .field("verification_data", &"[REDACTED]")
            .field("link_key", &self.link_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Generates and verifies one-time codes
pub struct OneTimeCodeCodec {
    secret: SecretBox<Vec<u8>>,
}

impl OneTimeCodeCodec {
    /// Codec keyed by the deployment secret
    pub fn new(secret: Vec<u8>) -> LinkResult<Self> {
        if secret.is_empty() {
            return Err(LinkError::Config("OTC secret must not be empty".into()));
        }
        Ok(Self {
            secret: SecretBox::new(Box::new(secret)),
        })
    }

    /// Code for `(link_id, amount, created_at)` under the deployment secret.
    ///
    /// Deterministic: the same triple always yields the same code.
    pub fn generate(
        &self,
        link_id: &LinkId,
        amount: &Amount,
        created_at: TimestampMillis,
    ) -> LinkResult<GeneratedCode> {
        generate_with_secret(self.secret.expose_secret(), link_id, amount, created_at)
    }

    /// Code under a fresh random per-link key.
    ///
    /// Returns the record to persist (including the hex key) and the code.
    pub fn generate_with_link_key<R: CryptoRng + RngCore>(
        &self,
        link_id: &LinkId,
        amount: &Amount,
        created_at: TimestampMillis,
        rng: &mut R,
    ) -> LinkResult<(OtcRecord, GeneratedCode)> {
        let mut key = Zeroizing::new([0u8; LINK_KEY_LENGTH]);
        rng.fill_bytes(&mut key[..]);
        let generated = generate_with_secret(&key[..], link_id, amount, created_at)?;
        let record = OtcRecord {
            link_id: link_id.clone(),
            amount: amount.clone(),
            created_at,
            verification_data: generated.verification_data.clone(),
            link_key: Some(hex::encode(&key[..])),
        };
        Ok((record, generated))
    }

    /// Record for a deployment-secret code
    pub fn issue(
        &self,
        link_id: &LinkId,
        amount: &Amount,
        created_at: TimestampMillis,
    ) -> LinkResult<(OtcRecord, GeneratedCode)> {
        let generated = self.generate(link_id, amount, created_at)?;
        let record = OtcRecord {
            link_id: link_id.clone(),
            amount: amount.clone(),
            created_at,
            verification_data: generated.verification_data.clone(),
            link_key: None,
        };
        Ok((record, generated))
    }

    /// Check `provided` against the triple and its stored verification data.
    ///
    /// Non-digit characters in `provided` are ignored (`"123 456"` is
    /// accepted); anything other than exactly six digits is rejected.
    pub fn verify(
        &self,
        provided: &str,
        link_id: &LinkId,
        amount: &Amount,
        created_at: TimestampMillis,
        verification_data: &str,
    ) -> bool {
        verify_with_secret(
            self.secret.expose_secret(),
            provided,
            link_id,
            amount,
            created_at,
            verification_data,
        )
    }

    /// Verify against a stored record, using its per-link key when present
    pub fn verify_record(&self, provided: &str, record: &OtcRecord) -> bool {
        match &record.link_key {
            Some(key_hex) => {
                let Ok(key) = hex::decode(key_hex).map(Zeroizing::new) else {
                    tracing::warn!(link_id = %record.link_id, "undecodable per-link key");
                    return false;
                };
                verify_with_secret(
                    &key,
                    provided,
                    &record.link_id,
                    &record.amount,
                    record.created_at,
                    &record.verification_data,
                )
            }
            None => self.verify(
                provided,
                &record.link_id,
                &record.amount,
                record.created_at,
                &record.verification_data,
            ),
        }
    }
}

impl std::fmt::Debug for OneTimeCodeCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OneTimeCodeCodec")
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

fn digest(
    secret: &[u8],
    link_id: &LinkId,
    amount: &Amount,
    created_at: TimestampMillis,
) -> LinkResult<[u8; 32]> {
    let mut key = Zeroizing::new(Vec::with_capacity(secret.len() + 32));
    key.extend_from_slice(secret);
    key.extend_from_slice(amount.as_str().as_bytes());
    key.extend_from_slice(created_at.to_string().as_bytes());

    let mut mac = HmacSha256::new_from_slice(&key)
        .map_err(|e| LinkError::Config(format!("invalid OTC key: {e}")))?;
    mac.update(link_id.as_str().as_bytes());
    Ok(mac.finalize().into_bytes().into())
}

fn code_from_digest(digest: &[u8; 32]) -> String {
    let value = digest[..CODE_PREFIX_BYTES]
        .iter()
        .fold(0u64, |acc, b| (acc << 8) | u64::from(*b));
    format!("{:0width$}", value % CODE_MODULUS, width = CODE_LENGTH)
}

fn generate_with_secret(
    secret: &[u8],
    link_id: &LinkId,
    amount: &Amount,
    created_at: TimestampMillis,
) -> LinkResult<GeneratedCode> {
    let digest = digest(secret, link_id, amount, created_at)?;
    let code = code_from_digest(&digest);
    Ok(GeneratedCode {
        verification_data: format!("{}:{}", hex::encode(digest), code),
        code,
    })
}

/// Keep only ASCII digits
fn normalize_code(provided: &str) -> Option<String> {
    let digits: String = provided.chars().filter(char::is_ascii_digit).collect();
    (digits.len() == CODE_LENGTH).then_some(digits)
}

fn verify_with_secret(
    secret: &[u8],
    provided: &str,
    link_id: &LinkId,
    amount: &Amount,
    created_at: TimestampMillis,
    verification_data: &str,
) -> bool {
    let Some(candidate) = normalize_code(provided) else {
        return false;
    };

    let Ok(expected) = digest(secret, link_id, amount, created_at) else {
        return false;
    };
    let expected_code = code_from_digest(&expected);

    let (stored_digest, stored_code) = match verification_data.split_once(':') {
        Some((digest_hex, code)) => (digest_hex, Some(code)),
        None => (verification_data, None),
    };

    // Records without stored data fall back to recomputation alone
    if !stored_digest.is_empty() {
        let Ok(stored) = hex::decode(stored_digest) else {
            return false;
        };
        if !bool::from(stored.as_slice().ct_eq(expected.as_slice())) {
            return false;
        }
    }
    if let Some(stored_code) = stored_code {
        if !bool::from(stored_code.as_bytes().ct_eq(expected_code.as_bytes())) {
            return false;
        }
    }

    candidate.as_bytes().ct_eq(expected_code.as_bytes()).into()
}
