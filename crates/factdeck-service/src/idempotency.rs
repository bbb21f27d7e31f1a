use std::collections::HashSet;

use parking_lot::Mutex;

/// Set of previously-completed request tokens
///
/// Consulted by the service before executing a write: a token that is
/// already recorded means the logical write ran before, and the retried
/// delivery must be side-effect-free. Tokens are opaque. The set is private
/// to one service instance and is not persisted across restarts; it has no
/// expiry, so it grows for the process lifetime.
#[derive(Debug, Default)]
pub struct IdempotencyLedger {
    keys: Mutex<HashSet<String>>,
}

impl IdempotencyLedger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a token was already recorded
    pub fn seen(&self, key: &str) -> bool {
        self.keys.lock().contains(key)
    }

    /// Record a completed token; returns false if it was already present
    pub fn record(&self, key: &str) -> bool {
        self.keys.lock().insert(key.to_string())
    }

    /// Drop every recorded token (test hook)
    pub fn clear(&self) {
        self.keys.lock().clear();
    }

    /// Number of recorded tokens
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    /// Whether no token has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_then_seen() {
        let ledger = IdempotencyLedger::new();
        assert!(!ledger.seen("req-1"));

        assert!(ledger.record("req-1"));
        assert!(ledger.seen("req-1"));
        assert!(!ledger.record("req-1"));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_clear_empties_the_set() {
        let ledger = IdempotencyLedger::new();
        ledger.record("req-1");
        ledger.record("req-2");

        ledger.clear();
        assert!(ledger.is_empty());
        assert!(!ledger.seen("req-1"));
    }
}
