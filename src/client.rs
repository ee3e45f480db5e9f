//! GitHub Actions REST client.

use std::time::Duration;

use crate::model::{WorkflowJobsPage, WorkflowRunsPage};
use crate::{CacheEntry, DiskCache, ProfilerError, ProfilerResult, RepoRef, WorkflowJob, WorkflowRun};

pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("gha-profiler/", env!("CARGO_PKG_VERSION"));
const JOBS_PER_PAGE: u32 = 100;

/// Listing calls the profiler needs from the CI service.
pub trait ActionsApi: Sync {
    fn list_workflow_runs(
        &self,
        repo: &RepoRef,
        workflow_file: &str,
        per_page: u32,
    ) -> ProfilerResult<Vec<WorkflowRun>>;

    fn list_workflow_jobs(&self, repo: &RepoRef, run_id: u64) -> ProfilerResult<Vec<WorkflowJob>>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub api_base_url: Option<String>,
    pub access_token: Option<String>,
    pub cache_dir: Option<std::path::PathBuf>,
    pub timeout: Option<Duration>,
}

#[derive(Debug)]
pub struct GithubClient {
    agent: ureq::Agent,
    base_url: String,
    access_token: Option<String>,
    cache: Option<DiskCache>,
}

impl GithubClient {
    pub fn new(config: ClientConfig) -> Self {
        let mut builder = ureq::AgentBuilder::new().user_agent(USER_AGENT);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let base_url = config
            .api_base_url
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        Self {
            agent: builder.build(),
            base_url,
            access_token: config.access_token.filter(|t| !t.is_empty()),
            cache: config.cache_dir.map(DiskCache::new),
        }
    }

    fn get(&self, url: &str) -> ProfilerResult<String> {
        let cached = self.cache.as_ref().and_then(|c| c.load(url));

        let mut request = self
            .agent
            .get(url)
            .set("Accept", "application/vnd.github+json")
            .set("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.access_token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        if let Some(etag) = cached.as_ref().and_then(|e| e.etag.as_deref()) {
            request = request.set("If-None-Match", etag);
        }

        let response = request.call()?;
        if response.status() == 304 {
            return match cached {
                Some(entry) => {
                    tracing::debug!("cache revalidated: {url}");
                    Ok(entry.body)
                }
                None => Err(ProfilerError::Http(format!(
                    "{url} returned 304 without a cached body"
                ))),
            };
        }

        let etag = response.header("ETag").map(str::to_string);
        let body = response.into_string()?;
        if let Some(cache) = &self.cache {
            let entry = CacheEntry {
                url: url.to_string(),
                etag,
                body: body.clone(),
            };
            if let Err(err) = cache.store(&entry) {
                tracing::warn!("failed to write cache entry for {url}: {err}");
            }
        }
        Ok(body)
    }
}

impl ActionsApi for GithubClient {
    fn list_workflow_runs(
        &self,
        repo: &RepoRef,
        workflow_file: &str,
        per_page: u32,
    ) -> ProfilerResult<Vec<WorkflowRun>> {
        let url = format!(
            "{}/repos/{}/{}/actions/workflows/{workflow_file}/runs?per_page={per_page}",
            self.base_url, repo.owner, repo.repo
        );
        let page: WorkflowRunsPage = serde_json::from_str(&self.get(&url)?)?;
        Ok(page.workflow_runs)
    }

    fn list_workflow_jobs(&self, repo: &RepoRef, run_id: u64) -> ProfilerResult<Vec<WorkflowJob>> {
        let url = format!(
            "{}/repos/{}/{}/actions/runs/{run_id}/jobs?per_page={JOBS_PER_PAGE}",
            self.base_url, repo.owner, repo.repo
        );
        let page: WorkflowJobsPage = serde_json::from_str(&self.get(&url)?)?;
        Ok(page.jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = GithubClient::new(ClientConfig {
            api_base_url: Some("https://ghe.example.com/api/v3/".to_string()),
            ..ClientConfig::default()
        });
        assert_eq!(client.base_url, "https://ghe.example.com/api/v3");
    }

    #[test]
    fn empty_token_is_ignored() {
        let client = GithubClient::new(ClientConfig {
            access_token: Some(String::new()),
            ..ClientConfig::default()
        });
        assert!(client.access_token.is_none());
        assert!(client.cache.is_none());
    }
}
