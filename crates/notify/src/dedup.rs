//! In-memory deduplication of handled checkout sessions
//!
//! Process-lifetime set of session ids that have already produced
//! notifications. There is no eviction and no persistence: a restart forgets
//! everything and relies on Stripe's own redelivery window being short.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to the shared seen-set
#[derive(Clone, Default)]
pub struct DedupSet {
    inner: Arc<Mutex<HashSet<String>>>,
}

impl DedupSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        // A poisoned lock only means another thread panicked mid-insert;
        // the set itself is still usable.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Has this id already been processed?
    pub fn was_handled(&self, id: &str) -> bool {
        self.lock().contains(id)
    }

    /// Record an id as processed.
    pub fn mark_handled(&self, id: impl Into<String>) {
        self.lock().insert(id.into());
    }

    /// Atomically check and mark in one lock acquisition. Returns `true` if
    /// the caller won the claim, `false` if the id was already present.
    pub fn claim(&self, id: &str) -> bool {
        self.lock().insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn unseen_id_is_not_handled() {
        let set = DedupSet::new();
        assert!(!set.was_handled("cs_test_abc"));
    }

    #[test]
    fn marked_id_is_handled() {
        let set = DedupSet::new();
        set.mark_handled("cs_test_abc");
        assert!(set.was_handled("cs_test_abc"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn claim_succeeds_once() {
        let set = DedupSet::new();
        assert!(set.claim("cs_test_abc"));
        assert!(!set.claim("cs_test_abc"));
        assert!(set.was_handled("cs_test_abc"));
    }

    #[test]
    fn clones_share_state() {
        let set = DedupSet::new();
        let other = set.clone();
        set.mark_handled("cs_test_abc");
        assert!(other.was_handled("cs_test_abc"));
    }
}
