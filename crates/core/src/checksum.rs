use crate::change::CommittedLineItem;
use crate::CoreError;

/// BLAKE3 digest over the MessagePack encoding of `items`, in the order given.
/// Callers pass items sorted by product id so the digest is stable.
pub fn committed_checksum(items: &[CommittedLineItem]) -> Result<[u8; 32], CoreError> {
    let mut hasher = blake3::Hasher::new();
    for item in items {
        let bytes = rmp_serde::to_vec(item).map_err(|e| CoreError::Serialization(e.to_string()))?;
        hasher.update(&bytes);
    }
    Ok(*hasher.finalize().as_bytes())
}
