//! Guard against double-firing a job across overlapping ticks

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use zaprust_common::types::JobId;

/// Shared set of job ids currently being processed
#[derive(Clone, Default)]
pub struct InFlightSet {
    inner: Arc<Mutex<HashSet<JobId>>>,
}

impl InFlightSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a job for processing
    ///
    /// Returns a guard that releases the claim on drop, or None when the
    /// job is already in flight.
    pub fn try_claim(&self, id: JobId) -> Option<InFlightGuard> {
        let mut set = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if set.insert(id) {
            Some(InFlightGuard {
                set: self.inner.clone(),
                id,
            })
        } else {
            None
        }
    }

    pub fn contains(&self, id: JobId) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }
}

pub struct InFlightGuard {
    set: Arc<Mutex<HashSet<JobId>>>,
    id: JobId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(PoisonError::into_inner);
        set.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_claim_is_exclusive() {
        let set = InFlightSet::new();
        let id = Uuid::new_v4();

        let guard = set.try_claim(id);
        assert!(guard.is_some());
        assert!(set.try_claim(id).is_none());

        drop(guard);
        assert!(set.try_claim(id).is_some());
    }

    #[test]
    fn test_distinct_jobs_do_not_block_each_other() {
        let set = InFlightSet::new();
        let _a = set.try_claim(Uuid::new_v4()).unwrap();
        assert!(set.try_claim(Uuid::new_v4()).is_some());
    }

    #[test]
    fn test_claim_released_after_panic() {
        let set = InFlightSet::new();
        let id = Uuid::new_v4();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = set.try_claim(id).unwrap();
            panic!("processing blew up");
        }));

        assert!(result.is_err());
        assert!(!set.contains(id));
        assert!(set.try_claim(id).is_some());
    }
}
