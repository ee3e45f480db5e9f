//! Profile configuration: TOML file, command-line overrides and validation.

use serde::{Deserialize, Serialize};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{
    ClientConfig, DEFAULT_CONCURRENCY, DEFAULT_PERCENTILES, DiskCache, FieldFilter, JobNameRouter,
    OutputFormat, ProfilerError, ProfilerResult, RepoRef, ReplaceRule, SortField,
};

pub const ACCESS_TOKEN_ENV: &str = "GITHUB_ACTIONS_PROFILER_TOKEN";
pub const FALLBACK_ACCESS_TOKEN_ENV: &str = "GITHUB_TOKEN";

const DEFAULT_COUNT: u32 = 20;
const MAX_COUNT: u32 = 100;
const DEFAULT_JOB_NAME_REGEXP: &str = ".*";

/// Every key is optional so a file and the command line can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProfileConfig {
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub workflow_file: Option<String>,
    /// Number of most recent workflow runs to analyze.
    pub count: Option<u32>,
    pub access_token: Option<String>,
    pub format: Option<OutputFormat>,
    pub sort: Option<String>,
    pub reverse: Option<bool>,
    pub verbose: Option<bool>,
    pub concurrency: Option<usize>,
    pub job_name_regexp: Option<String>,
    pub percentiles: Option<Vec<u8>>,
    pub cache: Option<bool>,
    pub cache_dir: Option<PathBuf>,
    pub api_base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub fields: Option<Vec<String>>,
    pub exclude_fields: Option<Vec<String>>,
    pub hide_percentiles: Option<bool>,
    pub replace: Vec<ReplaceRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplaceRuleConfig {
    pub regexp: String,
    pub replace: String,
}

/// Validated settings the profiler runs with.
#[derive(Debug, Clone)]
pub struct ProfileSettings {
    pub repo: RepoRef,
    pub workflow_file: String,
    pub count: u32,
    pub concurrency: usize,
    pub router: JobNameRouter,
    pub percentiles: Vec<u8>,
    pub sort: SortField,
    pub reverse: bool,
    pub format: OutputFormat,
    pub field_filter: FieldFilter,
    pub verbose: bool,
    pub client: ClientConfig,
}

impl ProfileConfig {
    pub fn load(path: &Path) -> ProfilerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| {
            ProfilerError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> ProfilerResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Values set in `overrides` win; `replace` rules only come from `self`.
    pub fn merge(self, overrides: ProfileConfig) -> Self {
        Self {
            owner: overrides.owner.or(self.owner),
            repo: overrides.repo.or(self.repo),
            workflow_file: overrides.workflow_file.or(self.workflow_file),
            count: overrides.count.or(self.count),
            access_token: overrides.access_token.or(self.access_token),
            format: overrides.format.or(self.format),
            sort: overrides.sort.or(self.sort),
            reverse: overrides.reverse.or(self.reverse),
            verbose: overrides.verbose.or(self.verbose),
            concurrency: overrides.concurrency.or(self.concurrency),
            job_name_regexp: overrides.job_name_regexp.or(self.job_name_regexp),
            percentiles: overrides.percentiles.or(self.percentiles),
            cache: overrides.cache.or(self.cache),
            cache_dir: overrides.cache_dir.or(self.cache_dir),
            api_base_url: overrides.api_base_url.or(self.api_base_url),
            timeout_secs: overrides.timeout_secs.or(self.timeout_secs),
            fields: overrides.fields.or(self.fields),
            exclude_fields: overrides.exclude_fields.or(self.exclude_fields),
            hide_percentiles: overrides.hide_percentiles.or(self.hide_percentiles),
            replace: self.replace,
        }
    }

    /// Fills the access token from the environment when none is configured.
    pub fn with_env_token(mut self) -> Self {
        if self.access_token.as_deref().is_none_or(str::is_empty) {
            self.access_token = [ACCESS_TOKEN_ENV, FALLBACK_ACCESS_TOKEN_ENV]
                .iter()
                .filter_map(|name| std::env::var(name).ok())
                .find(|token| !token.is_empty());
        }
        self
    }

    /// Fills owner and repository from the `origin` remote of `dir` when
    /// either is missing.
    pub fn with_repository_from(mut self, dir: &Path) -> Self {
        if self.owner.is_some() && self.repo.is_some() {
            return self;
        }
        match crate::detect_origin_repository(dir) {
            Ok(detected) => {
                tracing::debug!("repository detected from git remote: {detected}");
                if self.owner.is_none() {
                    self.owner = Some(detected.owner);
                }
                if self.repo.is_none() {
                    self.repo = Some(detected.repo);
                }
            }
            Err(err) => tracing::debug!("repository detection skipped: {err}"),
        }
        self
    }

    pub fn validate(&self) -> ProfilerResult<ProfileSettings> {
        let owner = required(&self.owner, "repository owner name required")?;
        let repo = required(&self.repo, "repository name required")?;
        let workflow_file = required(&self.workflow_file, "workflow file name required")?;

        let count = self.count.unwrap_or(DEFAULT_COUNT);
        if count == 0 || count > MAX_COUNT {
            return Err(ProfilerError::Config(format!(
                "count must be between 1 and {MAX_COUNT}, got {count}"
            )));
        }
        let concurrency = self.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(ProfilerError::Config(
                "concurrency must be a positive integer".to_string(),
            ));
        }

        let percentiles = self
            .percentiles
            .clone()
            .unwrap_or_else(|| DEFAULT_PERCENTILES.to_vec());
        validate_percentiles(&percentiles)?;

        let sort = self
            .sort
            .as_deref()
            .unwrap_or("number")
            .parse::<SortField>()?
            .validate(&percentiles)?;

        let rules = self
            .replace
            .iter()
            .map(|rule| ReplaceRule::new(&rule.regexp, rule.replace.clone()))
            .collect::<ProfilerResult<Vec<_>>>()?;
        let router = JobNameRouter::new(
            self.job_name_regexp.as_deref().unwrap_or(DEFAULT_JOB_NAME_REGEXP),
            rules,
        )?;

        let field_filter = FieldFilter::new(
            self.fields.clone(),
            self.exclude_fields.clone().unwrap_or_default(),
            self.hide_percentiles.unwrap_or(false),
        );
        field_filter.validate(&percentiles)?;

        let cache_dir = if self.cache.unwrap_or(true) {
            Some(self.cache_dir.clone().unwrap_or_else(DiskCache::default_dir))
        } else {
            None
        };

        Ok(ProfileSettings {
            repo: RepoRef::new(owner, repo),
            workflow_file,
            count,
            concurrency,
            router,
            percentiles,
            sort,
            reverse: self.reverse.unwrap_or(false),
            format: self.format.unwrap_or_default(),
            field_filter,
            verbose: self.verbose.unwrap_or(false),
            client: ClientConfig {
                api_base_url: self.api_base_url.clone(),
                access_token: self.access_token.clone(),
                cache_dir,
                timeout: self.timeout_secs.filter(|s| *s > 0).map(Duration::from_secs),
            },
        })
    }

    /// Configuration dump for verbose logging, with the token redacted.
    pub fn redacted(&self) -> Self {
        let mut out = self.clone();
        if out.access_token.is_some() {
            out.access_token = Some("<redacted>".to_string());
        }
        out
    }
}

fn required(value: &Option<String>, message: &str) -> ProfilerResult<String> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| ProfilerError::Config(message.to_string()))
}

fn validate_percentiles(percentiles: &[u8]) -> ProfilerResult<()> {
    for (idx, p) in percentiles.iter().enumerate() {
        if *p > 100 {
            return Err(ProfilerError::Config(format!(
                "percentile {p} is outside 0..=100"
            )));
        }
        if percentiles[..idx].contains(p) {
            return Err(ProfilerError::Config(format!("percentile {p} listed twice")));
        }
    }
    Ok(())
}
