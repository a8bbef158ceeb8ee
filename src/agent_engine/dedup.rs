use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::protocol::message::{CorrelationKey, Task};

/// Fingerprints of Tasks the Agent is currently executing.
///
/// A retry that re-sends a Task already in flight is dropped. Entries leave
/// the ledger when their [`InFlightGuard`] drops, whichever way execution ends.
#[derive(Debug, Clone, Default)]
pub struct DedupLedger {
    in_flight: Arc<Mutex<HashSet<CorrelationKey>>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashSet<CorrelationKey>> {
        self.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `Some(guard)` if the Task should run; `None` if an identical one is in flight.
    pub fn should_process(&self, task: &Task) -> Option<InFlightGuard> {
        self.try_begin(task.correlation_key())
    }

    pub fn try_begin(&self, key: CorrelationKey) -> Option<InFlightGuard> {
        if !self.entries().insert(key) {
            return None;
        }
        Some(InFlightGuard {
            key,
            ledger: self.clone(),
        })
    }

    pub fn contains(&self, key: &CorrelationKey) -> bool {
        self.entries().contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes its key from the ledger on drop, including during a panic unwind.
#[derive(Debug)]
pub struct InFlightGuard {
    key: CorrelationKey,
    ledger: DedupLedger,
}

impl InFlightGuard {
    pub fn key(&self) -> CorrelationKey {
        self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.ledger.entries().remove(&self.key);
    }
}
