//! Thread-safe grouping of jobs by their routed name.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::WorkflowJob;

pub type JobGroups = BTreeMap<String, Vec<WorkflowJob>>;

#[derive(Debug, Default)]
pub struct JobGroupMap {
    groups: Mutex<JobGroups>,
}

impl JobGroupMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, name: impl Into<String>, job: WorkflowJob) {
        self.lock().entry(name.into()).or_default().push(job);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the current contents. Only meaningful once every writer has
    /// been joined.
    pub fn snapshot(&self) -> JobGroups {
        self.lock().clone()
    }

    pub fn into_groups(self) -> JobGroups {
        self.groups
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // Groups are append-only, so a panicked writer cannot leave a half-applied update.
    fn lock(&self) -> MutexGuard<'_, JobGroups> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
