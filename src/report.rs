//! Final report structure handed to the formatters.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::TaskStepProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobProfile {
    pub name: String,
    pub profile: Vec<TaskStepProfile>,
}

/// Orders job groups by name so output is stable regardless of the order
/// runs were collected in.
pub fn assemble_report<I>(groups: I) -> Vec<JobProfile>
where
    I: IntoIterator<Item = (String, Vec<TaskStepProfile>)>,
{
    let ordered: BTreeMap<String, Vec<TaskStepProfile>> = groups.into_iter().collect();
    ordered
        .into_iter()
        .map(|(name, profile)| JobProfile { name, profile })
        .collect()
}
