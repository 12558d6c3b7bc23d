//! Query fingerprints used as cache keys

use sha2::{Digest, Sha256};

/// Namespace prefix for chat cache keys
pub const FINGERPRINT_PREFIX: &str = "chat:";

/// Deterministic cache key for a query: `chat:` + hex SHA-256 of its bytes.
///
/// Unsalted, so identical queries keep hitting the cache across restarts.
pub fn fingerprint(query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(query.as_bytes());
    format!("{}{:x}", FINGERPRINT_PREFIX, hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        let q = "Which vendors leaked credentials this week?";
        assert_eq!(fingerprint(q), fingerprint(q));
        assert_eq!(fingerprint(q), fingerprint(&q.to_string()));
    }

    #[test]
    fn test_fingerprint_known_value() {
        // Fixed digest guards against accidental salting or algorithm swaps
        assert_eq!(
            fingerprint(""),
            "chat:e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_queries() {
        assert_ne!(fingerprint("is this bad?"), fingerprint("is this bad? "));
        assert_ne!(fingerprint("Acme"), fingerprint("acme"));
        assert_eq!(fingerprint("x").len(), FINGERPRINT_PREFIX.len() + 64);
    }
}
