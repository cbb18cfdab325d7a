use cosign_types::{CosignError, Envelope, Result, TxIdentity};
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use stellar_xdr::curr::{
    DecoratedSignature, Hash, Limits, MuxedAccount, Preconditions, Signature, SignatureHint,
    Transaction, TransactionEnvelope, TransactionExt, TransactionSignaturePayload,
    TransactionSignaturePayloadTaggedTransaction, WriteXdr,
};

pub fn hash_data(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Network id as used in every signature payload: SHA-256 of the passphrase.
pub fn network_id(passphrase: &str) -> Hash {
    Hash(hash_data(passphrase.as_bytes()))
}

/// Computes the identity of an envelope's unsigned transaction on a network.
///
/// V0 envelopes are hashed as the equivalent v1 transaction, so the same
/// logical transaction has one identity regardless of the envelope version.
pub fn transaction_identity(envelope: &Envelope, passphrase: &str) -> Result<TxIdentity> {
    let tagged_transaction = match envelope.as_xdr() {
        TransactionEnvelope::Tx(e) => TransactionSignaturePayloadTaggedTransaction::Tx(e.tx.clone()),
        TransactionEnvelope::TxV0(e) => {
            let v0 = &e.tx;
            TransactionSignaturePayloadTaggedTransaction::Tx(Transaction {
                source_account: MuxedAccount::Ed25519(v0.source_account_ed25519.clone()),
                fee: v0.fee,
                seq_num: v0.seq_num.clone(),
                cond: match &v0.time_bounds {
                    Some(bounds) => Preconditions::Time(bounds.clone()),
                    None => Preconditions::None,
                },
                memo: v0.memo.clone(),
                operations: v0.operations.clone(),
                ext: TransactionExt::V0,
            })
        }
        TransactionEnvelope::TxFeeBump(e) => {
            TransactionSignaturePayloadTaggedTransaction::TxFeeBump(e.tx.clone())
        }
    };

    let payload = TransactionSignaturePayload {
        network_id: network_id(passphrase),
        tagged_transaction,
    };
    let bytes = payload
        .to_xdr(Limits::none())
        .map_err(|e| CosignError::Encode(format!("encoding signature payload: {}", e)))?;

    Ok(TxIdentity(hash_data(&bytes)))
}

/// The last four bytes of a key, which signatures carry as a lookup hint.
pub fn signature_hint(key: &[u8; 32]) -> [u8; 4] {
    [key[28], key[29], key[30], key[31]]
}

/// True if `signature` is a valid ed25519 signature by `public_key` over `payload`.
pub fn verify_ed25519(public_key: &[u8; 32], payload: &[u8], signature: &DecoratedSignature) -> bool {
    if signature.hint.0 != signature_hint(public_key) {
        return false;
    }

    let Ok(verifying_key) = VerifyingKey::from_bytes(public_key) else {
        return false;
    };
    let Ok(sig_bytes) = <[u8; 64]>::try_from(signature.signature.0.as_slice()) else {
        return false;
    };

    verifying_key
        .verify(payload, &DalekSignature::from_bytes(&sig_bytes))
        .is_ok()
}

/// True if the signature body is a preimage of `hash` (hash-x signers).
pub fn verify_hash_x(hash: &[u8; 32], signature: &DecoratedSignature) -> bool {
    signature.hint.0 == signature_hint(hash) && hash_data(signature.signature.0.as_slice()) == *hash
}

/// An ed25519 signing key able to produce decorated signatures.
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }

    /// Signs a transaction identity the way the ledger expects.
    pub fn sign_decorated(&self, identity: &TxIdentity) -> Result<DecoratedSignature> {
        let signature = self.sign(identity.as_bytes());
        Ok(DecoratedSignature {
            hint: SignatureHint(signature_hint(&self.public_key())),
            signature: Signature(
                signature
                    .to_vec()
                    .try_into()
                    .map_err(|e| CosignError::Encode(format!("encoding signature: {}", e)))?,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stellar_xdr::curr::{
        Memo, Operation, OperationBody, PaymentOp, Asset, SequenceNumber, TimeBounds, TimePoint,
        TransactionV0, TransactionV0Envelope, TransactionV0Ext, TransactionV1Envelope, Uint256,
    };

    const TESTNET: &str = "Test SDF Network ; September 2015";

    fn payment_tx(time_bounds: Option<TimeBounds>) -> Transaction {
        Transaction {
            source_account: MuxedAccount::Ed25519(Uint256([3; 32])),
            fee: 200,
            seq_num: SequenceNumber(1001),
            cond: match &time_bounds {
                Some(bounds) => Preconditions::Time(bounds.clone()),
                None => Preconditions::None,
            },
            memo: Memo::Text("rent".as_bytes().to_vec().try_into().unwrap()),
            operations: vec![Operation {
                source_account: None,
                body: OperationBody::Payment(PaymentOp {
                    destination: MuxedAccount::Ed25519(Uint256([4; 32])),
                    asset: Asset::Native,
                    amount: 10_000_000,
                }),
            }]
            .try_into()
            .unwrap(),
            ext: TransactionExt::V0,
        }
    }

    fn v1(tx: Transaction, signatures: Vec<DecoratedSignature>) -> Envelope {
        Envelope::new(TransactionEnvelope::Tx(TransactionV1Envelope {
            tx,
            signatures: signatures.try_into().unwrap(),
        }))
        .unwrap()
    }

    #[test]
    fn test_hash_data() {
        let hash1 = hash_data(b"test data");
        let hash2 = hash_data(b"test data");
        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash_data(b"other data"));
    }

    #[test]
    fn test_identity_is_deterministic() {
        let a = transaction_identity(&v1(payment_tx(None), vec![]), TESTNET).unwrap();
        let b = transaction_identity(&v1(payment_tx(None), vec![]), TESTNET).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_identity_ignores_signatures() {
        let keypair = KeyPair::generate();
        let unsigned = v1(payment_tx(None), vec![]);
        let identity = transaction_identity(&unsigned, TESTNET).unwrap();

        let signed = v1(payment_tx(None), vec![keypair.sign_decorated(&identity).unwrap()]);
        assert_eq!(transaction_identity(&signed, TESTNET).unwrap(), identity);
    }

    #[test]
    fn test_identity_depends_on_network_and_body() {
        let envelope = v1(payment_tx(None), vec![]);
        let testnet = transaction_identity(&envelope, TESTNET).unwrap();
        let public = transaction_identity(
            &envelope,
            "Public Global Stellar Network ; September 2015",
        )
        .unwrap();
        assert_ne!(testnet, public);

        let mut other = payment_tx(None);
        other.seq_num = SequenceNumber(1002);
        assert_ne!(transaction_identity(&v1(other, vec![]), TESTNET).unwrap(), testnet);
    }

    #[test]
    fn test_v0_and_v1_share_identity() {
        let bounds = TimeBounds {
            min_time: TimePoint(0),
            max_time: TimePoint(1_900_000_000),
        };
        let tx = payment_tx(Some(bounds.clone()));

        let v0 = Envelope::new(TransactionEnvelope::TxV0(TransactionV0Envelope {
            tx: TransactionV0 {
                source_account_ed25519: Uint256([3; 32]),
                fee: tx.fee,
                seq_num: tx.seq_num.clone(),
                time_bounds: Some(bounds),
                memo: tx.memo.clone(),
                operations: tx.operations.clone(),
                ext: TransactionV0Ext::V0,
            },
            signatures: Default::default(),
        }))
        .unwrap();

        assert_eq!(
            transaction_identity(&v0, TESTNET).unwrap(),
            transaction_identity(&v1(tx, vec![]), TESTNET).unwrap()
        );
    }

    #[test]
    fn test_sign_and_verify() {
        let keypair = KeyPair::generate();
        let identity = TxIdentity([5; 32]);
        let signature = keypair.sign_decorated(&identity).unwrap();

        assert!(verify_ed25519(&keypair.public_key(), identity.as_bytes(), &signature));
        assert!(!verify_ed25519(&keypair.public_key(), &[6; 32], &signature));

        let other = KeyPair::generate();
        assert!(!verify_ed25519(&other.public_key(), identity.as_bytes(), &signature));
    }

    #[test]
    fn test_invalid_signature() {
        let keypair = KeyPair::generate();
        let identity = TxIdentity([5; 32]);
        let mut signature = keypair.sign_decorated(&identity).unwrap();

        let mut body = signature.signature.0.to_vec();
        body[0] ^= 1;
        signature.signature = Signature(body.try_into().unwrap());

        assert!(!verify_ed25519(&keypair.public_key(), identity.as_bytes(), &signature));
    }

    #[test]
    fn test_hash_x_preimage() {
        let preimage = b"open sesame".to_vec();
        let hash = hash_data(&preimage);
        let signature = DecoratedSignature {
            hint: SignatureHint(signature_hint(&hash)),
            signature: Signature(preimage.try_into().unwrap()),
        };
        assert!(verify_hash_x(&hash, &signature));
        assert!(!verify_hash_x(&hash_data(b"other"), &signature));
    }
}
