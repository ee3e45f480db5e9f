//! In-memory `ActionsApi` with scripted jobs, failures and latency, for tests.

use time::{Duration as TimeDuration, OffsetDateTime, macros::datetime};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{ActionsApi, ProfilerError, ProfilerResult, RepoRef, TaskStep, WorkflowJob, WorkflowRun};

#[derive(Debug, Default)]
pub struct FakeActions {
    runs: Vec<WorkflowRun>,
    jobs: BTreeMap<u64, Vec<WorkflowJob>>,
    failing_runs: BTreeSet<u64>,
    fail_run_listing: bool,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl FakeActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn repo() -> RepoRef {
        RepoRef::new("octo", "widgets")
    }

    pub fn run(id: u64) -> WorkflowRun {
        WorkflowRun {
            id,
            name: Some("CI".to_string()),
            status: Some("completed".to_string()),
            conclusion: Some("success".to_string()),
            created_at: None,
        }
    }

    /// Job whose steps are `(number, name, elapsed seconds)`.
    pub fn job(id: u64, name: &str, steps: &[(i64, &str, f64)]) -> WorkflowJob {
        let start: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);
        WorkflowJob {
            id,
            run_id: 0,
            name: name.to_string(),
            steps: steps
                .iter()
                .map(|(number, step_name, seconds)| TaskStep {
                    name: (*step_name).to_string(),
                    number: *number,
                    status: Some("completed".to_string()),
                    conclusion: Some("success".to_string()),
                    started_at: Some(start),
                    completed_at: Some(start + TimeDuration::seconds_f64(*seconds)),
                })
                .collect(),
        }
    }

    pub fn with_jobs(mut self, run_id: u64, jobs: Vec<WorkflowJob>) -> Self {
        self.add_run(run_id);
        self.jobs.entry(run_id).or_default().extend(jobs);
        self
    }

    /// Listing the jobs of `run_id` fails.
    pub fn with_failure(mut self, run_id: u64) -> Self {
        self.add_run(run_id);
        self.failing_runs.insert(run_id);
        self
    }

    pub fn with_failing_run_listing(mut self) -> Self {
        self.fail_run_listing = true;
        self
    }

    /// Every job listing sleeps this long.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    fn add_run(&mut self, run_id: u64) {
        if !self.runs.iter().any(|r| r.id == run_id) {
            self.runs.push(Self::run(run_id));
        }
    }
}

impl ActionsApi for FakeActions {
    fn list_workflow_runs(
        &self,
        repo: &RepoRef,
        workflow_file: &str,
        per_page: u32,
    ) -> ProfilerResult<Vec<WorkflowRun>> {
        if self.fail_run_listing {
            return Err(ProfilerError::Fetch(format!(
                "listing runs of {workflow_file} in {repo} failed"
            )));
        }
        Ok(self.runs.iter().take(per_page as usize).cloned().collect())
    }

    fn list_workflow_jobs(&self, repo: &RepoRef, run_id: u64) -> ProfilerResult<Vec<WorkflowJob>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            std::thread::sleep(latency);
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_runs.contains(&run_id) {
            return Err(ProfilerError::Fetch(format!(
                "listing jobs of run {run_id} in {repo} failed"
            )));
        }
        let mut jobs = self.jobs.get(&run_id).cloned().unwrap_or_default();
        for job in &mut jobs {
            job.run_id = run_id;
        }
        Ok(jobs)
    }
}
