//! Shared fakes and fixtures for collector integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use cosign_consensus::{AuthorizationGate, Collector, LedgerAuthorizer, Submitter};
use cosign_crypto::{transaction_identity, KeyPair};
use cosign_ledger::{
    account_id, AccountSigner, AccountThresholds, LedgerClient, SignerKey, SubmitOutcome,
};
use cosign_storage::{MemorySignatureStore, SignatureStore};
use cosign_types::{CosignError, Envelope, Result, TxIdentity};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use stellar_xdr::curr::{
    Asset, DecoratedSignature, Memo, MuxedAccount, Operation, OperationBody, PaymentOp,
    Preconditions, SequenceNumber, Transaction, TransactionEnvelope, TransactionExt,
    TransactionV1Envelope, Uint256,
};

pub const PASSPHRASE: &str = "Test SDF Network ; September 2015";

/// In-process ledger: static account data, records every submission.
#[derive(Default)]
pub struct FakeLedger {
    accounts: Mutex<HashMap<String, AccountThresholds>>,
    submissions: Mutex<Vec<Envelope>>,
    reject_submissions: bool,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting() -> Self {
        Self {
            reject_submissions: true,
            ..Self::default()
        }
    }

    /// Registers an account whose medium threshold is `med` and whose
    /// signers are the given keys with weight 1 each.
    pub fn with_account(self, account: [u8; 32], med: u8, signers: &[[u8; 32]]) -> Self {
        let id = account_id(&account);
        self.accounts.lock().unwrap().insert(
            id.clone(),
            AccountThresholds {
                account_id: id,
                low: 1,
                medium: med,
                high: med,
                signers: signers
                    .iter()
                    .map(|key| AccountSigner {
                        key: SignerKey::Ed25519(*key),
                        weight: 1,
                    })
                    .collect(),
            },
        );
        self
    }

    pub fn submissions(&self) -> Vec<Envelope> {
        self.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn network_passphrase(&self) -> Result<String> {
        Ok(PASSPHRASE.to_string())
    }

    async fn account_thresholds(&self, account_id: &str) -> Result<AccountThresholds> {
        self.accounts
            .lock()
            .unwrap()
            .get(account_id)
            .cloned()
            .ok_or_else(|| CosignError::LedgerError(format!("account {} not found", account_id)))
    }

    async fn submit_transaction(&self, envelope: &Envelope) -> Result<SubmitOutcome> {
        self.submissions.lock().unwrap().push(envelope.clone());

        if self.reject_submissions {
            return Ok(SubmitOutcome {
                successful: false,
                hash: None,
                result_codes: Some(serde_json::json!({ "transaction": "tx_bad_seq" })),
            });
        }

        Ok(SubmitOutcome {
            successful: true,
            hash: Some("fake".to_string()),
            result_codes: None,
        })
    }
}

/// Gate that answers from a script, then with `fallback` once the script runs out.
pub struct ScriptedGate {
    verdicts: Mutex<VecDeque<bool>>,
    fallback: bool,
    pub checks: Mutex<Vec<usize>>,
}

impl ScriptedGate {
    pub fn new(verdicts: &[bool]) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.iter().copied().collect()),
            fallback: true,
            checks: Mutex::new(Vec::new()),
        }
    }

    /// Never authorizes anything.
    pub fn never_ready() -> Self {
        Self {
            fallback: false,
            ..Self::new(&[])
        }
    }
}

#[async_trait]
impl AuthorizationGate for ScriptedGate {
    async fn check_authorized(&self, identity: &TxIdentity, envelope: Envelope) -> Result<Envelope> {
        self.checks.lock().unwrap().push(envelope.signature_count());
        let ready = self.verdicts.lock().unwrap().pop_front().unwrap_or(self.fallback);
        if ready {
            Ok(envelope)
        } else {
            Err(CosignError::NotAuthorized {
                identity: *identity,
            })
        }
    }
}

/// Source account used by every fixture transaction.
pub const SOURCE: [u8; 32] = [7; 32];

pub fn payment_tx(seq: i64) -> Transaction {
    Transaction {
        source_account: MuxedAccount::Ed25519(Uint256(SOURCE)),
        fee: 100,
        seq_num: SequenceNumber(seq),
        cond: Preconditions::None,
        memo: Memo::None,
        operations: vec![Operation {
            source_account: None,
            body: OperationBody::Payment(PaymentOp {
                destination: MuxedAccount::Ed25519(Uint256([8; 32])),
                asset: Asset::Native,
                amount: 5_000_000,
            }),
        }]
        .try_into()
        .unwrap(),
        ext: TransactionExt::V0,
    }
}

pub fn envelope(tx: Transaction, signatures: Vec<DecoratedSignature>) -> Envelope {
    Envelope::new(TransactionEnvelope::Tx(TransactionV1Envelope {
        tx,
        signatures: signatures.try_into().unwrap(),
    }))
    .unwrap()
}

pub fn identity_of(tx: &Transaction) -> TxIdentity {
    transaction_identity(&envelope(tx.clone(), vec![]), PASSPHRASE).unwrap()
}

/// Envelope of `tx` carrying one signature from each of `signers`.
pub fn signed_by(tx: &Transaction, signers: &[&KeyPair]) -> Envelope {
    let identity = identity_of(tx);
    envelope(
        tx.clone(),
        signers.iter().map(|k| k.sign_decorated(&identity).unwrap()).collect(),
    )
}

/// Two co-signers, each weight 1, on an account needing weight 2.
pub struct Parties {
    pub alice: KeyPair,
    pub bob: KeyPair,
}

impl Parties {
    pub fn new() -> Self {
        Self {
            alice: KeyPair::generate(),
            bob: KeyPair::generate(),
        }
    }

    pub fn ledger(&self) -> FakeLedger {
        FakeLedger::new().with_account(SOURCE, 2, &[self.alice.public_key(), self.bob.public_key()])
    }
}

pub struct Harness {
    pub ledger: Arc<FakeLedger>,
    pub store: Arc<dyn SignatureStore>,
    pub collector: Collector,
}

impl Harness {
    pub fn new(ledger: FakeLedger) -> Self {
        Self::with_store(ledger, Arc::new(MemorySignatureStore::new()))
    }

    pub fn with_store(ledger: FakeLedger, store: Arc<dyn SignatureStore>) -> Self {
        let ledger = Arc::new(ledger);
        let gate = Arc::new(LedgerAuthorizer::new(ledger.clone()));
        let submitter = Submitter::new(ledger.clone(), 4);
        let collector = Collector::new(PASSPHRASE, Arc::clone(&store), gate, submitter);

        Self {
            ledger,
            store,
            collector,
        }
    }

    pub fn with_gate(ledger: FakeLedger, gate: Arc<dyn AuthorizationGate>) -> Self {
        let ledger = Arc::new(ledger);
        let store: Arc<dyn SignatureStore> = Arc::new(MemorySignatureStore::new());
        let submitter = Submitter::new(ledger.clone(), 4);
        let collector = Collector::new(PASSPHRASE, Arc::clone(&store), gate, submitter);

        Self {
            ledger,
            store,
            collector,
        }
    }

    pub async fn deliver(&self, envelope: &Envelope) -> Result<cosign_consensus::CycleOutcome> {
        self.collector
            .process_message(&envelope.to_xdr().unwrap())
            .await
    }

    /// Submissions observed once every spawned submit has finished.
    pub async fn settled_submissions(&self) -> Vec<Envelope> {
        self.collector.submitter().wait_idle().await;
        self.ledger.submissions()
    }
}
