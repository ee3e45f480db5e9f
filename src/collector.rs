//! Bounded-parallel collection of jobs for a set of workflow runs.

use std::sync::{Mutex, PoisonError};

use crate::{
    ActionsApi, JobGroupMap, JobNameRouter, Permits, ProfilerError, ProfilerResult, RepoRef,
    WorkflowRun,
};

pub const DEFAULT_CONCURRENCY: usize = 2;

#[derive(Debug)]
pub struct Collector {
    permits: Permits,
}

impl Collector {
    pub fn new(concurrency: usize) -> Self {
        Self {
            permits: Permits::new(concurrency),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.permits.capacity()
    }

    /// Free permits; equals `concurrency()` whenever no collection is running.
    pub fn available_permits(&self) -> usize {
        self.permits.available()
    }

    /// Fetches the jobs of every run on at most `concurrency()` threads and
    /// groups them by routed name.
    ///
    /// The first failure stops further runs from being scheduled; in-flight
    /// fetches finish and that failure is returned.
    pub fn collect(
        &self,
        api: &dyn ActionsApi,
        repo: &RepoRef,
        runs: &[WorkflowRun],
        router: &JobNameRouter,
    ) -> ProfilerResult<JobGroupMap> {
        let groups = JobGroupMap::new();
        let first_error = Mutex::new(None::<ProfilerError>);

        std::thread::scope(|scope| {
            let mut workers = Vec::with_capacity(runs.len());
            for run in runs {
                let permit = self.permits.acquire();
                if has_failed(&first_error) {
                    break;
                }
                let groups = &groups;
                let first_error = &first_error;
                let worker = scope.spawn(move || {
                    let _permit = permit;
                    if let Err(err) = collect_run(api, repo, run, router, groups) {
                        record_failure(first_error, err);
                    }
                });
                workers.push((run.id, worker));
            }
            for (run_id, worker) in workers {
                if worker.join().is_err() {
                    record_failure(
                        &first_error,
                        ProfilerError::Fetch(format!("worker for run {run_id} panicked")),
                    );
                }
            }
        });

        match first_error.into_inner().unwrap_or_else(PoisonError::into_inner) {
            Some(err) => Err(err),
            None => Ok(groups),
        }
    }
}

fn collect_run(
    api: &dyn ActionsApi,
    repo: &RepoRef,
    run: &WorkflowRun,
    router: &JobNameRouter,
    groups: &JobGroupMap,
) -> ProfilerResult<()> {
    tracing::debug!("list jobs start: run_id={}", run.id);
    let jobs = api.list_workflow_jobs(repo, run.id)?;
    tracing::debug!("list jobs finish: run_id={} jobs={}", run.id, jobs.len());

    for job in jobs {
        let Some(name) = router.route(&job.name) else {
            tracing::debug!("job {:?} filtered out", job.name);
            continue;
        };
        tracing::debug!("job name {:?} routed to {:?}", job.name, name);
        groups.append(name, job);
    }
    Ok(())
}

fn has_failed(first_error: &Mutex<Option<ProfilerError>>) -> bool {
    first_error
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .is_some()
}

fn record_failure(first_error: &Mutex<Option<ProfilerError>>, err: ProfilerError) {
    let mut slot = first_error.lock().unwrap_or_else(PoisonError::into_inner);
    if slot.is_none() {
        tracing::debug!("collection failed: {err}");
        *slot = Some(err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeActions;
    use crate::ReplaceRule;

    fn runs(ids: impl IntoIterator<Item = u64>) -> Vec<WorkflowRun> {
        ids.into_iter().map(FakeActions::run).collect()
    }

    #[test]
    fn groups_jobs_across_runs() {
        let api = FakeActions::new()
            .with_jobs(1, vec![FakeActions::job(10, "build", &[(1, "compile", 2.0)])])
            .with_jobs(2, vec![FakeActions::job(20, "build", &[(1, "compile", 4.0)])])
            .with_jobs(3, vec![FakeActions::job(30, "lint", &[(1, "clippy", 1.0)])]);
        let collector = Collector::new(2);
        let groups = collector
            .collect(&api, &FakeActions::repo(), &runs([1, 2, 3]), &JobNameRouter::match_all())
            .expect("collect")
            .into_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups["build"].len(), 2);
        assert_eq!(groups["lint"].len(), 1);
        assert_eq!(collector.available_permits(), 2);
    }

    #[test]
    fn routing_filters_and_rewrites() {
        let api = FakeActions::new().with_jobs(
            1,
            vec![
                FakeActions::job(1, "test (3.11)", &[(1, "pytest", 5.0)]),
                FakeActions::job(2, "test (3.12)", &[(1, "pytest", 6.0)]),
                FakeActions::job(3, "lint", &[(1, "ruff", 1.0)]),
            ],
        );
        let router = JobNameRouter::new(
            "^test",
            vec![ReplaceRule::new(r" \(3\.\d+\)", "").expect("rule")],
        )
        .expect("router");
        let groups = Collector::new(4)
            .collect(&api, &FakeActions::repo(), &runs([1]), &router)
            .expect("collect")
            .into_groups();
        assert_eq!(groups.keys().collect::<Vec<_>>(), vec!["test"]);
        assert_eq!(groups["test"].len(), 2);
    }

    #[test]
    fn failed_run_fails_collection_and_releases_permits() {
        let collector = Collector::new(2);
        for _ in 0..5 {
            let api = FakeActions::new()
                .with_jobs(1, vec![FakeActions::job(1, "build", &[(1, "compile", 2.0)])])
                .with_failure(2)
                .with_jobs(3, vec![FakeActions::job(3, "build", &[(1, "compile", 3.0)])])
                .with_jobs(4, vec![FakeActions::job(4, "build", &[(1, "compile", 3.0)])]);
            let err = collector
                .collect(&api, &FakeActions::repo(), &runs(1..=4), &JobNameRouter::match_all())
                .expect_err("must fail");
            assert!(matches!(err, ProfilerError::Fetch(_)), "got {err:?}");
            assert_eq!(collector.available_permits(), 2);
        }
    }

    #[test]
    fn empty_run_list_yields_empty_groups() {
        let groups = Collector::new(3)
            .collect(&FakeActions::new(), &FakeActions::repo(), &[], &JobNameRouter::match_all())
            .expect("collect");
        assert!(groups.is_empty());
    }

    #[test]
    fn respects_concurrency_limit() {
        let api = FakeActions::new().with_latency(std::time::Duration::from_millis(5));
        let collector = Collector::new(3);
        collector
            .collect(&api, &FakeActions::repo(), &runs(1..=20), &JobNameRouter::match_all())
            .expect("collect");
        assert!(api.peak_in_flight() <= 3, "peak {}", api.peak_in_flight());
        assert_eq!(collector.concurrency(), 3);
    }
}
