//! Shared types for the co-signing collector.
//!
//! Everything keyed by a transaction goes through [`TxIdentity`], and every
//! signed transaction that crosses a crate boundary is an [`Envelope`].

pub mod envelope;

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub use envelope::{signature_bytes, Envelope, MAX_ENVELOPE_BYTES, MAX_SIGNATURES};

#[derive(Error, Debug)]
pub enum CosignError {
    /// Signatures gathered so far do not meet the threshold rule. Expected and non-fatal.
    #[error("Transaction {identity} not yet authorized")]
    NotAuthorized { identity: TxIdentity },

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Unsupported transaction: {0}")]
    UnsupportedTransaction(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Corrupt record for tx {identity}: {reason}")]
    CorruptRecord { identity: TxIdentity, reason: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Ledger error: {0}")]
    LedgerError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Gossip subscription closed")]
    SubscriptionClosed,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid state transition: {0}")]
    InvalidTransition(String),
}

impl CosignError {
    pub fn is_not_authorized(&self) -> bool {
        matches!(self, CosignError::NotAuthorized { .. })
    }

    /// Errors that only affect the message being processed.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            CosignError::MalformedEnvelope(_)
                | CosignError::UnsupportedTransaction(_)
                | CosignError::Encode(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CosignError>;

/// SHA-256 of a transaction's signature payload. Signatures never affect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxIdentity(pub [u8; 32]);

impl TxIdentity {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(TxIdentity(arr))
    }
}

impl fmt::Display for TxIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for TxIdentity {
    fn from(bytes: [u8; 32]) -> Self {
        TxIdentity(bytes)
    }
}

impl FromStr for TxIdentity {
    type Err = CosignError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim())
            .map_err(|e| CosignError::ConfigError(format!("Invalid tx identity '{}': {}", s, e)))?;
        TxIdentity::from_slice(&bytes).ok_or_else(|| {
            CosignError::ConfigError(format!(
                "Invalid tx identity '{}': expected 32 bytes, got {}",
                s,
                bytes.len()
            ))
        })
    }
}
