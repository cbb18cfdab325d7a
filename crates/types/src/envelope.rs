use crate::{CosignError, Result};
use stellar_xdr::curr::{DecoratedSignature, Limits, ReadXdr, TransactionEnvelope, WriteXdr};

/// Ledger-imposed cap on the signature list of a single envelope.
pub const MAX_SIGNATURES: usize = 20;

/// Upper bound on an encoded envelope accepted from the wire.
pub const MAX_ENVELOPE_BYTES: usize = 256 * 1024;

fn decode_limits() -> Limits {
    Limits {
        depth: 500,
        len: MAX_ENVELOPE_BYTES,
    }
}

/// A signed transaction whose shape the collector knows how to merge.
///
/// Only `TxV0` and `Tx` envelopes are accepted; fee-bump envelopes carry an
/// inner transaction with its own signature set and are rejected up front.
/// The unsigned body is never exposed mutably, only the signature list grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope(TransactionEnvelope);

impl Envelope {
    pub fn new(inner: TransactionEnvelope) -> Result<Self> {
        match inner {
            TransactionEnvelope::TxV0(_) | TransactionEnvelope::Tx(_) => Ok(Self(inner)),
            TransactionEnvelope::TxFeeBump(_) => Err(CosignError::UnsupportedTransaction(
                "fee bump transactions are not supported".to_string(),
            )),
        }
    }

    pub fn from_xdr(bytes: &[u8]) -> Result<Self> {
        let inner = TransactionEnvelope::from_xdr(bytes, decode_limits())
            .map_err(|e| CosignError::MalformedEnvelope(format!("decoding XDR: {}", e)))?;
        Self::new(inner)
    }

    pub fn from_base64(b64: &str) -> Result<Self> {
        let inner = TransactionEnvelope::from_xdr_base64(b64.trim(), decode_limits())
            .map_err(|e| CosignError::MalformedEnvelope(format!("decoding base64 XDR: {}", e)))?;
        Self::new(inner)
    }

    pub fn to_xdr(&self) -> Result<Vec<u8>> {
        self.0
            .to_xdr(Limits::none())
            .map_err(|e| CosignError::Encode(format!("encoding envelope to XDR: {}", e)))
    }

    pub fn to_base64(&self) -> Result<String> {
        self.0
            .to_xdr_base64(Limits::none())
            .map_err(|e| CosignError::Encode(format!("encoding envelope to base64 XDR: {}", e)))
    }

    pub fn signatures(&self) -> &[DecoratedSignature] {
        match &self.0 {
            TransactionEnvelope::TxV0(e) => e.signatures.as_slice(),
            TransactionEnvelope::Tx(e) => e.signatures.as_slice(),
            TransactionEnvelope::TxFeeBump(e) => e.signatures.as_slice(),
        }
    }

    pub fn signature_count(&self) -> usize {
        self.signatures().len()
    }

    /// Appends a signature. Callers are responsible for deduplication.
    pub fn push_signature(&mut self, signature: DecoratedSignature) -> Result<()> {
        let signatures = match &mut self.0 {
            TransactionEnvelope::TxV0(e) => &mut e.signatures,
            TransactionEnvelope::Tx(e) => &mut e.signatures,
            TransactionEnvelope::TxFeeBump(e) => &mut e.signatures,
        };

        let mut grown = signatures.to_vec();
        grown.push(signature);
        *signatures = grown.try_into().map_err(|_| {
            CosignError::Encode(format!(
                "signature limit of {} exceeded",
                MAX_SIGNATURES
            ))
        })?;

        Ok(())
    }

    pub fn as_xdr(&self) -> &TransactionEnvelope {
        &self.0
    }
}

/// Canonical bytes of a signature, used as its equality key.
pub fn signature_bytes(signature: &DecoratedSignature) -> Result<Vec<u8>> {
    signature
        .to_xdr(Limits::none())
        .map_err(|e| CosignError::Encode(format!("encoding signature: {}", e)))
}
