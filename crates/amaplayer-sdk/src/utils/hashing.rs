//! Hashing Utilities

use sha2::{Digest, Sha256};

/// Derive the idempotency key for a queued like action.
///
/// Retries of the same action hash to the same key; a new toggle (new
/// enqueue timestamp) gets a fresh one.
pub fn idempotency_key(entity_id: &str, actor_id: &str, desired: &str, enqueued_at: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [entity_id, actor_id, desired, enqueued_at] {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_key() {
        let key = idempotency_key("post-1", "user-1", "liked", "2024-01-01T00:00:00.000Z");
        assert_eq!(key.len(), 64); // SHA-256 produces 64 hex chars

        // Same input should produce same key
        assert_eq!(key, idempotency_key("post-1", "user-1", "liked", "2024-01-01T00:00:00.000Z"));

        // Any differing component changes it
        assert_ne!(key, idempotency_key("post-1", "user-1", "unliked", "2024-01-01T00:00:00.000Z"));
        assert_ne!(key, idempotency_key("post-1", "user-1", "liked", "2024-01-01T00:00:00.001Z"));
    }

    #[test]
    fn test_components_are_separated() {
        assert_ne!(
            idempotency_key("ab", "c", "liked", "t"),
            idempotency_key("a", "bc", "liked", "t")
        );
    }
}
