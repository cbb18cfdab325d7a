use cosign_types::{signature_bytes, Envelope, Result};
use std::collections::HashSet;

/// Appends to `incoming` every signature of `stored` it does not already hold.
///
/// Equality is by encoded bytes only. The body of `incoming` is kept as is;
/// callers guarantee both envelopes share an identity.
pub fn merge_signatures(mut incoming: Envelope, stored: &Envelope) -> Result<Envelope> {
    let mut seen = incoming
        .signatures()
        .iter()
        .map(signature_bytes)
        .collect::<Result<HashSet<Vec<u8>>>>()?;

    for signature in stored.signatures() {
        let bytes = signature_bytes(signature)?;
        if seen.insert(bytes) {
            incoming.push_signature(signature.clone())?;
        }
    }

    Ok(incoming)
}
