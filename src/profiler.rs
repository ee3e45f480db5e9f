//! End-to-end profiling of one workflow.

use std::collections::BTreeMap;

use crate::{
    ActionsApi, Collector, JobGroups, JobProfile, ProfileSettings, ProfilerResult, TaskStepProfile,
    assemble_report, profile_task_steps, sort_profiles,
};

/// Lists recent runs, collects and groups their jobs, and returns one sorted
/// profile per job group ordered by group name. Any failure aborts the whole
/// profile.
pub fn profile_workflow(
    api: &dyn ActionsApi,
    settings: &ProfileSettings,
) -> ProfilerResult<Vec<JobProfile>> {
    tracing::debug!(
        "list workflow runs start: repo={} workflow={} count={}",
        settings.repo,
        settings.workflow_file,
        settings.count
    );
    let runs = api.list_workflow_runs(&settings.repo, &settings.workflow_file, settings.count)?;
    tracing::debug!("list workflow runs finish: runs={}", runs.len());

    let collector = Collector::new(settings.concurrency);
    let groups = collector
        .collect(api, &settings.repo, &runs, &settings.router)?
        .into_groups();

    profile_groups(groups, settings)
}

/// Aggregates, sorts and orders already collected job groups.
pub fn profile_groups(
    groups: JobGroups,
    settings: &ProfileSettings,
) -> ProfilerResult<Vec<JobProfile>> {
    let mut results = BTreeMap::<String, Vec<TaskStepProfile>>::new();
    for (name, jobs) in groups {
        if jobs.is_empty() {
            continue;
        }
        let steps = jobs.iter().flat_map(|job| job.steps.iter());
        let mut profile = profile_task_steps(steps, &settings.percentiles)?;
        sort_profiles(&mut profile, settings.sort, settings.reverse);
        tracing::debug!("job group {name:?}: {} jobs, {} steps", jobs.len(), profile.len());
        results.insert(name, profile);
    }
    Ok(assemble_report(results))
}
