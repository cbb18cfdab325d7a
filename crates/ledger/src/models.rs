use cosign_types::{CosignError, Result};
use serde::Deserialize;
use stellar_strkey::Strkey;
use tracing::warn;

/// Weight class of an operation, ordered so that `max` picks the strictest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThresholdLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignerKey {
    Ed25519([u8; 32]),
    PreAuthTx([u8; 32]),
    HashX([u8; 32]),
}

impl SignerKey {
    pub fn from_strkey(key: &str) -> Result<Self> {
        match Strkey::from_string(key) {
            Ok(Strkey::PublicKeyEd25519(pk)) => Ok(SignerKey::Ed25519(pk.0)),
            Ok(Strkey::PreAuthTx(hash)) => Ok(SignerKey::PreAuthTx(hash.0)),
            Ok(Strkey::HashX(hash)) => Ok(SignerKey::HashX(hash.0)),
            Ok(_) => Err(CosignError::LedgerError(format!(
                "Unsupported signer key type: {}",
                key
            ))),
            Err(e) => Err(CosignError::LedgerError(format!(
                "Invalid signer key {}: {:?}",
                key, e
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountSigner {
    pub key: SignerKey,
    pub weight: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountThresholds {
    pub account_id: String,
    pub low: u8,
    pub medium: u8,
    pub high: u8,
    pub signers: Vec<AccountSigner>,
}

impl AccountThresholds {
    pub fn threshold(&self, level: ThresholdLevel) -> u8 {
        match level {
            ThresholdLevel::Low => self.low,
            ThresholdLevel::Medium => self.medium,
            ThresholdLevel::High => self.high,
        }
    }
}

/// What the ledger said about a submitted transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub successful: bool,
    pub hash: Option<String>,
    pub result_codes: Option<serde_json::Value>,
}

/// Strkey account id (`G...`) for a raw ed25519 public key.
pub fn account_id(public_key: &[u8; 32]) -> String {
    stellar_strkey::ed25519::PublicKey(*public_key).to_string()
}

#[derive(Debug, Deserialize)]
pub(crate) struct RootResponse {
    pub network_passphrase: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountResponse {
    pub account_id: String,
    pub thresholds: ThresholdsResponse,
    #[serde(default)]
    pub signers: Vec<SignerResponse>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ThresholdsResponse {
    pub low_threshold: u8,
    pub med_threshold: u8,
    pub high_threshold: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SignerResponse {
    pub key: String,
    pub weight: u32,
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitResponse {
    #[serde(default)]
    pub successful: bool,
    pub hash: Option<String>,
    pub extras: Option<SubmitExtras>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmitExtras {
    pub result_codes: Option<serde_json::Value>,
}

impl From<AccountResponse> for AccountThresholds {
    fn from(account: AccountResponse) -> Self {
        let signers = account
            .signers
            .into_iter()
            .filter_map(|signer| match SignerKey::from_strkey(&signer.key) {
                Ok(key) => Some(AccountSigner {
                    key,
                    weight: signer.weight,
                }),
                Err(e) => {
                    warn!(
                        "Skipping signer of type {:?} on account {}: {}",
                        signer.kind, account.account_id, e
                    );
                    None
                }
            })
            .collect();

        Self {
            account_id: account.account_id,
            low: account.thresholds.low_threshold,
            medium: account.thresholds.med_threshold,
            high: account.thresholds.high_threshold,
            signers,
        }
    }
}

impl From<SubmitResponse> for SubmitOutcome {
    fn from(response: SubmitResponse) -> Self {
        Self {
            successful: response.successful,
            hash: response.hash,
            result_codes: response.extras.and_then(|extras| extras.result_codes),
        }
    }
}
