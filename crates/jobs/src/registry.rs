// crates/jobs/src/registry.rs
//! Single-flight map from owner to in-flight job.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::types::{Job, OwnerKey};

/// At most one in-flight [`Job`] per [`OwnerKey`].
///
/// Every operation holds one `Mutex` for its whole check-and-mutate, so two
/// simultaneous `try_acquire` calls for the same owner cannot both win.
/// The lock is never held across an `.await`.
#[derive(Debug, Default)]
pub struct JobRegistry {
    jobs: Mutex<HashMap<OwnerKey, Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `job` only if `owner` has no entry. Returns `false` (and leaves
    /// the map untouched) when one already exists.
    pub fn try_acquire(&self, owner: OwnerKey, job: Job) -> bool {
        let mut jobs = self.lock();
        if jobs.contains_key(&owner) {
            return false;
        }
        jobs.insert(owner, job);
        true
    }

    /// Current job for `owner`, if any.
    pub fn lookup(&self, owner: OwnerKey) -> Option<Job> {
        self.lock().get(&owner).cloned()
    }

    /// Remove the entry for `owner`. Safe to call when there is none.
    pub fn release(&self, owner: OwnerKey) -> bool {
        self.lock().remove(&owner).is_some()
    }

    /// All in-flight jobs, oldest first.
    pub fn active(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.lock().values().cloned().collect();
        jobs.sort_by_key(|job| job.id);
        jobs
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Every critical section is a single insert or remove, so a poisoned
    // map is still consistent.
    fn lock(&self) -> MutexGuard<'_, HashMap<OwnerKey, Job>> {
        self.jobs.lock().unwrap_or_else(|poisoned| {
            tracing::error!("Job registry mutex poisoned; recovering");
            poisoned.into_inner()
        })
    }
}
