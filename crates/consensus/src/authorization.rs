//! Decides whether the signatures gathered so far satisfy the ledger's
//! threshold rules for every account the transaction touches.

use async_trait::async_trait;
use cosign_crypto::{verify_ed25519, verify_hash_x};
use cosign_ledger::{account_id, AccountThresholds, LedgerClient, SignerKey, ThresholdLevel};
use cosign_types::{CosignError, Envelope, Result, TxIdentity};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use stellar_xdr::curr::{
    DecoratedSignature, MuxedAccount, Operation, OperationBody, SetOptionsOp, TransactionEnvelope,
};
use tracing::debug;

#[async_trait]
pub trait AuthorizationGate: Send + Sync {
    /// Returns the envelope unchanged when it is ready to submit, or
    /// `CosignError::NotAuthorized` when more signatures are needed.
    async fn check_authorized(&self, identity: &TxIdentity, envelope: Envelope) -> Result<Envelope>;
}

/// Gate backed by live account data from the ledger. Nothing is cached, so
/// every check sees current thresholds.
pub struct LedgerAuthorizer {
    ledger: Arc<dyn LedgerClient>,
}

impl LedgerAuthorizer {
    pub fn new(ledger: Arc<dyn LedgerClient>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl AuthorizationGate for LedgerAuthorizer {
    async fn check_authorized(&self, identity: &TxIdentity, envelope: Envelope) -> Result<Envelope> {
        for (account, level) in required_levels(&envelope)? {
            let thresholds = self.ledger.account_thresholds(&account_id(&account)).await?;
            let needed = u32::from(thresholds.threshold(level)).max(1);
            let weight = signed_weight(&thresholds, identity, envelope.signatures());

            debug!(
                "tx {}: account {} needs {:?} weight {}, has {}",
                identity, thresholds.account_id, level, needed, weight
            );

            if weight < needed {
                return Err(CosignError::NotAuthorized {
                    identity: *identity,
                });
            }
        }

        Ok(envelope)
    }
}

fn muxed_key(account: &MuxedAccount) -> [u8; 32] {
    match account {
        MuxedAccount::Ed25519(key) => key.0,
        MuxedAccount::MuxedEd25519(muxed) => muxed.ed25519.0,
    }
}

fn source_and_operations(envelope: &Envelope) -> Result<([u8; 32], &[Operation])> {
    match envelope.as_xdr() {
        TransactionEnvelope::TxV0(e) => Ok((e.tx.source_account_ed25519.0, e.tx.operations.as_slice())),
        TransactionEnvelope::Tx(e) => Ok((muxed_key(&e.tx.source_account), e.tx.operations.as_slice())),
        TransactionEnvelope::TxFeeBump(_) => Err(CosignError::UnsupportedTransaction(
            "fee bump transactions are not supported".to_string(),
        )),
    }
}

fn changes_signing_setup(op: &SetOptionsOp) -> bool {
    op.master_weight.is_some()
        || op.low_threshold.is_some()
        || op.med_threshold.is_some()
        || op.high_threshold.is_some()
        || op.signer.is_some()
}

/// Threshold class the ledger applies to an operation.
pub fn operation_level(body: &OperationBody) -> ThresholdLevel {
    match body {
        OperationBody::AllowTrust(_)
        | OperationBody::SetTrustLineFlags(_)
        | OperationBody::BumpSequence(_)
        | OperationBody::Inflation
        | OperationBody::ClaimClaimableBalance(_)
        | OperationBody::ExtendFootprintTtl(_)
        | OperationBody::RestoreFootprint(_) => ThresholdLevel::Low,
        OperationBody::AccountMerge(_) => ThresholdLevel::High,
        OperationBody::SetOptions(op) if changes_signing_setup(op) => ThresholdLevel::High,
        _ => ThresholdLevel::Medium,
    }
}

/// Accounts whose signers must approve the transaction, each with the
/// strictest threshold any of its operations needs.
pub fn required_levels(envelope: &Envelope) -> Result<BTreeMap<[u8; 32], ThresholdLevel>> {
    let (source, operations) = source_and_operations(envelope)?;

    let mut levels = BTreeMap::new();
    levels.insert(source, ThresholdLevel::Low);

    for op in operations {
        let account = op.source_account.as_ref().map(muxed_key).unwrap_or(source);
        let level = operation_level(&op.body);
        levels
            .entry(account)
            .and_modify(|current: &mut ThresholdLevel| *current = (*current).max(level))
            .or_insert(level);
    }

    Ok(levels)
}

/// Total weight of the account's signers that approved `identity`. Each
/// signer counts once however many matching signatures it has.
pub fn signed_weight(
    account: &AccountThresholds,
    identity: &TxIdentity,
    signatures: &[DecoratedSignature],
) -> u32 {
    let mut counted = HashSet::new();

    account
        .signers
        .iter()
        .filter(|signer| {
            let approved = match &signer.key {
                SignerKey::Ed25519(key) => signatures
                    .iter()
                    .any(|sig| verify_ed25519(key, identity.as_bytes(), sig)),
                SignerKey::HashX(hash) => signatures.iter().any(|sig| verify_hash_x(hash, sig)),
                SignerKey::PreAuthTx(hash) => hash == identity.as_bytes(),
            };
            approved && counted.insert(signer.key)
        })
        .map(|signer| signer.weight)
        .sum()
}
