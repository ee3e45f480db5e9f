//! Per-step latency profiles aggregated across job instances.

use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::{ProfilerError, ProfilerResult, StepStatistics, TaskStep};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStepProfile {
    pub name: String,
    pub number: i64,
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub mean: f64,
    /// Keyed by the percentile, e.g. `95 -> p95 seconds`.
    pub percentiles: BTreeMap<u8, f64>,
}

impl TaskStepProfile {
    pub fn percentile(&self, p: u8) -> Option<f64> {
        self.percentiles.get(&p).copied()
    }
}

#[derive(Debug)]
struct StepBucket {
    name: String,
    samples: Vec<f64>,
}

/// Buckets `steps` by step number and computes one profile per bucket.
///
/// The bucket name comes from the first step seen with that number. Steps
/// missing a start or completion time contribute no sample. The returned
/// profiles are in no particular order.
pub fn profile_task_steps<'a, I>(steps: I, ladder: &[u8]) -> ProfilerResult<Vec<TaskStepProfile>>
where
    I: IntoIterator<Item = &'a TaskStep>,
{
    let mut buckets = BTreeMap::<i64, StepBucket>::new();
    for step in steps {
        let Some(elapsed) = step.elapsed_seconds() else {
            tracing::debug!(
                "step #{} {:?} has no complete timestamps, skipping",
                step.number,
                step.name
            );
            continue;
        };
        buckets
            .entry(step.number)
            .or_insert_with(|| StepBucket {
                name: step.name.clone(),
                samples: Vec::new(),
            })
            .samples
            .push(elapsed);
    }

    buckets
        .into_iter()
        .map(|(number, bucket)| {
            let stats = StepStatistics::compute(&bucket.samples, ladder).map_err(|e| {
                ProfilerError::Compute(format!("step #{number} {:?}: {e}", bucket.name))
            })?;
            Ok(TaskStepProfile {
                name: bucket.name,
                number,
                count: stats.count,
                min: stats.min,
                max: stats.max,
                median: stats.median,
                mean: stats.mean,
                percentiles: stats.percentiles,
            })
        })
        .collect()
}
