//! Hashing helpers used for cache keys and content fingerprints.
//!
//! Two distinct hash functions are used deliberately:
//!
//! - [`embedding_cache_key`] uses SHA-256 over NFC-normalised text, because the embedding
//!   cache key is part of this crate's external contract (two independent deployments must
//!   derive the same key for the same text) and SHA-256 is specified explicitly for it.
//! - Everything else (query-result cache keys) uses BLAKE3, which is faster and has no
//!   external-compatibility requirement.

use unicode_normalization::UnicodeNormalization;

/// Normalises text the way the embedding cache key requires: Unicode NFC, trimmed,
/// case preserved (embeddings are case-sensitive).
pub fn normalize_cache_text(text: &str) -> String {
    text.trim().nfc().collect()
}

/// Computes the embedding-cache key for `(provider_id, text)`.
///
/// Key is `sha256(provider_id || 0x00 || normalize_cache_text(text))`, hex-encoded.
pub fn embedding_cache_key(provider_id: &str, text: &str) -> String {
    use sha2::{Digest, Sha256};

    let normalized = normalize_cache_text(text);
    let mut hasher = Sha256::new();
    hasher.update(provider_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();
    hex_encode(&digest)
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{:02x}", b);
    }
    s
}

/// Computes a 64-bit BLAKE3-derived hash of arbitrary bytes, for fast non-cryptographic
/// keying (query-result cache keys, vector fingerprints, deduplication).
#[inline]
pub fn hash_to_u64(data: &[u8]) -> u64 {
    let hash = blake3::hash(data);
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

/// Computes the query-result cache key for `(collection, strategy, text, k, filters)`.
///
/// `filters` must already be in a canonical (e.g. sorted) serialized form so that
/// equivalent filter sets hash identically.
pub fn query_cache_key(collection: &str, strategy: &str, text: &str, k: usize, filters: &str) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(collection.as_bytes());
    hasher.update(b"|");
    hasher.update(strategy.as_bytes());
    hasher.update(b"|");
    hasher.update(text.as_bytes());
    hasher.update(b"|");
    hasher.update(&(k as u64).to_le_bytes());
    hasher.update(b"|");
    hasher.update(filters.as_bytes());

    let hash = hasher.finalize();
    let bytes: [u8; 8] = hash.as_bytes()[0..8]
        .try_into()
        .expect("BLAKE3 always produces at least 8 bytes");
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_embedding_cache_key_determinism() {
        let k1 = embedding_cache_key("mock", "What is the capital of France?");
        let k2 = embedding_cache_key("mock", "What is the capital of France?");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_embedding_cache_key_provider_isolation() {
        let k1 = embedding_cache_key("mock", "hello");
        let k2 = embedding_cache_key("remote", "hello");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_embedding_cache_key_trims_whitespace() {
        let k1 = embedding_cache_key("mock", "hello");
        let k2 = embedding_cache_key("mock", "  hello  ");
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_embedding_cache_key_case_sensitive() {
        let k1 = embedding_cache_key("mock", "Hello");
        let k2 = embedding_cache_key("mock", "hello");
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_embedding_cache_key_nfc_equivalence() {
        // "é" as a single codepoint vs. "e" + combining acute accent.
        let composed = "caf\u{00e9}";
        let decomposed = "cafe\u{0301}";
        assert_eq!(
            embedding_cache_key("mock", composed),
            embedding_cache_key("mock", decomposed)
        );
    }

    #[test]
    fn test_hash_to_u64_determinism() {
        assert_eq!(hash_to_u64(b"tenant"), hash_to_u64(b"tenant"));
    }

    #[test]
    fn test_query_cache_key_sensitivity() {
        let base = query_cache_key("docs", "auto", "violence", 5, "");
        let diff_strategy = query_cache_key("docs", "hybrid", "violence", 5, "");
        let diff_k = query_cache_key("docs", "auto", "violence", 6, "");
        let diff_text = query_cache_key("docs", "auto", "romance", 5, "");

        let all = [base, diff_strategy, diff_k, diff_text];
        let unique: HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }
}
