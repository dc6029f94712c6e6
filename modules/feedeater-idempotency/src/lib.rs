//! Deterministic derivation of canonical `Message.id` values from a
//! module's natural key, per the contract in spec §4.7: the mapping only
//! needs to be pure and collision-resistant, not any particular algorithm.
//!
//! Grounded on `rootsignal-graph::embedding_store::EmbeddingStore::hash_key`,
//! which SHA-256-hashes `(model_version, text)` for a deterministic cache
//! key — the same recipe applied here to `(namespace, source_id)`.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Derives a deterministic `Uuid` from a module namespace and a source id
/// string (e.g. `"bitfinex:tBTCUSD:tradeId=12345"`). Same inputs always
/// produce the same id, across processes and restarts.
pub fn derive_message_id(namespace: &str, source_id: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(namespace.as_bytes());
    hasher.update(b"\0");
    hasher.update(source_id.as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_produce_same_id() {
        let a = derive_message_id("bitfinex", "tBTCUSD:tradeId=12345");
        let b = derive_message_id("bitfinex", "tBTCUSD:tradeId=12345");
        assert_eq!(a, b);
    }

    #[test]
    fn different_namespaces_produce_different_ids() {
        let a = derive_message_id("bitfinex", "tBTCUSD:tradeId=12345");
        let b = derive_message_id("bybit", "tBTCUSD:tradeId=12345");
        assert_ne!(a, b);
    }

    #[test]
    fn different_source_ids_produce_different_ids() {
        let a = derive_message_id("bitfinex", "tBTCUSD:tradeId=1");
        let b = derive_message_id("bitfinex", "tBTCUSD:tradeId=2");
        assert_ne!(a, b);
    }
}
