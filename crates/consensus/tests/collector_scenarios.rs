mod common;

use common::*;
use cosign_consensus::CycleOutcome;
use cosign_network::{GossipMessage, Subscription};
use cosign_storage::{SignatureStore, SqliteSignatureStore};
use cosign_types::CosignError;
use std::sync::Arc;

#[tokio::test]
async fn test_partial_signature_is_stored_not_submitted() {
    let parties = Parties::new();
    let harness = Harness::new(parties.ledger());
    let tx = payment_tx(1);

    let outcome = harness.deliver(&signed_by(&tx, &[&parties.alice])).await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::NotYetAuthorized {
            identity: identity_of(&tx),
            signatures: 1
        }
    );
    let stored = harness.store.get(&identity_of(&tx)).await.unwrap().unwrap();
    assert_eq!(stored.signature_count(), 1);
    assert!(harness.settled_submissions().await.is_empty());
}

#[tokio::test]
async fn test_second_signature_triggers_one_submission() {
    let parties = Parties::new();
    let harness = Harness::new(parties.ledger());
    let tx = payment_tx(1);

    harness.deliver(&signed_by(&tx, &[&parties.alice])).await.unwrap();
    let outcome = harness.deliver(&signed_by(&tx, &[&parties.bob])).await.unwrap();

    assert_eq!(
        outcome,
        CycleOutcome::Submitted {
            identity: identity_of(&tx),
            signatures: 2
        }
    );

    let submissions = harness.settled_submissions().await;
    assert_eq!(submissions.len(), 1);

    let submitted = &submissions[0];
    assert_eq!(submitted.signature_count(), 2);
    let identity = identity_of(&tx);
    for key in [&parties.alice, &parties.bob] {
        assert!(submitted.signatures().contains(&key.sign_decorated(&identity).unwrap()));
    }
}

#[tokio::test]
async fn test_duplicate_delivery_keeps_signature_count() {
    let parties = Parties::new();
    let harness = Harness::new(parties.ledger());
    let tx = payment_tx(1);
    let partial = signed_by(&tx, &[&parties.alice]);

    harness.deliver(&partial).await.unwrap();
    let outcome = harness.deliver(&partial).await.unwrap();

    assert!(matches!(
        outcome,
        CycleOutcome::NotYetAuthorized { signatures: 1, .. }
    ));
    assert_eq!(harness.store.len().await.unwrap(), 1);
    assert!(harness.settled_submissions().await.is_empty());
}

#[tokio::test]
async fn test_loop_survives_malformed_payload() {
    let parties = Parties::new();
    let harness = Harness::new(parties.ledger());
    let tx = payment_tx(1);

    let (feed, subscription) = Subscription::channel();
    feed.send(GossipMessage::new(None, b"not an envelope".to_vec()))
        .unwrap();
    feed.send(GossipMessage::new(
        Some("peer".to_string()),
        signed_by(&tx, &[&parties.alice, &parties.bob]).to_xdr().unwrap(),
    ))
    .unwrap();
    drop(feed);

    let err = harness.collector.run(subscription).await.unwrap_err();
    assert!(matches!(err, CosignError::SubscriptionClosed));

    assert_eq!(harness.store.len().await.unwrap(), 1);
    assert_eq!(harness.settled_submissions().await.len(), 1);
}

#[tokio::test]
async fn test_malformed_payload_is_dropped() {
    let harness = Harness::new(FakeLedger::new());
    let outcome = harness.collector.process_message(&[0xde, 0xad]).await.unwrap();
    assert_eq!(outcome, CycleOutcome::Dropped);
    assert_eq!(harness.store.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_submission_waits_for_authorized_verdict() {
    let parties = Parties::new();
    let gate = Arc::new(ScriptedGate::new(&[false, true]));
    let harness = Harness::with_gate(FakeLedger::new(), gate.clone());
    let tx = payment_tx(1);

    harness.deliver(&signed_by(&tx, &[&parties.alice])).await.unwrap();
    assert!(harness.settled_submissions().await.is_empty());

    harness.deliver(&signed_by(&tx, &[&parties.bob])).await.unwrap();
    let submissions = harness.settled_submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].signature_count(), 2);

    // The gate saw the merged record each time, not the single delivery.
    assert_eq!(*gate.checks.lock().unwrap(), vec![1, 2]);
}

#[tokio::test]
async fn test_never_ready_gate_never_submits() {
    let gate = Arc::new(ScriptedGate::never_ready());
    let harness = Harness::with_gate(FakeLedger::new(), gate.clone());

    for seq in 1..=10 {
        let tx = payment_tx(seq);
        for _ in 0..3 {
            let signer = cosign_crypto::KeyPair::generate();
            let outcome = harness.deliver(&signed_by(&tx, &[&signer])).await.unwrap();
            assert!(matches!(outcome, CycleOutcome::NotYetAuthorized { .. }));
        }
    }

    assert_eq!(gate.checks.lock().unwrap().len(), 30);
    assert_eq!(harness.store.len().await.unwrap(), 10);
    assert!(harness.settled_submissions().await.is_empty());
}

#[tokio::test]
async fn test_no_submission_until_threshold_met() {
    let parties = Parties::new();
    let carol = cosign_crypto::KeyPair::generate();
    let ledger = FakeLedger::new().with_account(
        SOURCE,
        3,
        &[
            parties.alice.public_key(),
            parties.bob.public_key(),
            carol.public_key(),
        ],
    );
    let harness = Harness::new(ledger);
    let tx = payment_tx(9);

    for key in [&parties.alice, &parties.bob] {
        let outcome = harness.deliver(&signed_by(&tx, &[key])).await.unwrap();
        assert!(matches!(outcome, CycleOutcome::NotYetAuthorized { .. }));
    }
    // A stranger's signature adds nothing.
    let stranger = cosign_crypto::KeyPair::generate();
    harness.deliver(&signed_by(&tx, &[&stranger])).await.unwrap();
    assert!(harness.settled_submissions().await.is_empty());

    let outcome = harness.deliver(&signed_by(&tx, &[&carol])).await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Submitted { signatures: 4, .. }));
    assert_eq!(harness.settled_submissions().await.len(), 1);
}

#[tokio::test]
async fn test_ledger_errors_do_not_lose_signatures() {
    let parties = Parties::new();
    // No account registered: every threshold lookup fails.
    let harness = Harness::new(FakeLedger::new());
    let tx = payment_tx(1);

    let err = harness
        .deliver(&signed_by(&tx, &[&parties.alice]))
        .await
        .unwrap_err();
    assert!(matches!(err, CosignError::LedgerError(_)));

    let stored = harness.store.get(&identity_of(&tx)).await.unwrap().unwrap();
    assert_eq!(stored.signature_count(), 1);
}

#[tokio::test]
async fn test_rejected_submission_is_only_logged() {
    let parties = Parties::new();
    let ledger = FakeLedger::rejecting().with_account(
        SOURCE,
        2,
        &[parties.alice.public_key(), parties.bob.public_key()],
    );
    let harness = Harness::new(ledger);
    let tx = payment_tx(1);

    let ready = signed_by(&tx, &[&parties.alice, &parties.bob]);
    harness.deliver(&ready).await.unwrap();
    let outcome = harness.deliver(&ready).await.unwrap();

    // Each delivery of a ready record is submitted again; nothing is remembered.
    assert!(matches!(outcome, CycleOutcome::Submitted { signatures: 2, .. }));
    assert_eq!(harness.settled_submissions().await.len(), 2);
    assert_eq!(
        harness.store.get(&identity_of(&tx)).await.unwrap().unwrap().signature_count(),
        2
    );
}

#[tokio::test]
async fn test_pipeline_over_sqlite_store() {
    let parties = Parties::new();
    let store: Arc<dyn SignatureStore> = Arc::new(SqliteSignatureStore::open_in_memory().unwrap());
    let harness = Harness::with_store(parties.ledger(), store);
    let tx = payment_tx(3);

    harness.deliver(&signed_by(&tx, &[&parties.bob])).await.unwrap();
    harness.deliver(&signed_by(&tx, &[&parties.alice])).await.unwrap();

    let submissions = harness.settled_submissions().await;
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0].signature_count(), 2);
}

#[tokio::test]
async fn test_distinct_transactions_are_tracked_separately() {
    let parties = Parties::new();
    let harness = Harness::new(parties.ledger());

    harness.deliver(&signed_by(&payment_tx(1), &[&parties.alice])).await.unwrap();
    harness.deliver(&signed_by(&payment_tx(2), &[&parties.bob])).await.unwrap();

    assert_eq!(harness.store.len().await.unwrap(), 2);
    assert!(harness.settled_submissions().await.is_empty());
}
