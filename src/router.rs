//! Job name filtering and rewriting.

use regex::{NoExpand, Regex};

use crate::{ProfilerError, ProfilerResult};

/// One `[[replace]]` rule: every match of `pattern` is replaced by the
/// literal `replacement` text.
#[derive(Debug, Clone)]
pub struct ReplaceRule {
    pattern: Regex,
    replacement: String,
}

impl ReplaceRule {
    pub fn new(pattern: &str, replacement: impl Into<String>) -> ProfilerResult<Self> {
        Ok(Self {
            pattern: compile(pattern)?,
            replacement: replacement.into(),
        })
    }

    pub fn apply(&self, job_name: &str) -> String {
        self.pattern
            .replace_all(job_name, NoExpand(&self.replacement))
            .into_owned()
    }
}

/// Maps raw job names onto the group name their steps are aggregated under.
#[derive(Debug, Clone)]
pub struct JobNameRouter {
    filter: Regex,
    rules: Vec<ReplaceRule>,
}

impl JobNameRouter {
    pub fn new(filter: &str, rules: Vec<ReplaceRule>) -> ProfilerResult<Self> {
        Ok(Self {
            filter: compile(filter)?,
            rules,
        })
    }

    /// Router that accepts every job name unchanged.
    pub fn match_all() -> Self {
        Self {
            filter: Regex::new(".*").expect("static pattern"),
            rules: Vec::new(),
        }
    }

    /// Returns the group name for `raw`, or `None` when the filter drops it.
    pub fn route(&self, raw: &str) -> Option<String> {
        if !self.filter.is_match(raw) {
            return None;
        }
        let routed = self
            .rules
            .iter()
            .fold(raw.to_string(), |name, rule| rule.apply(&name));
        Some(routed)
    }
}

fn compile(pattern: &str) -> ProfilerResult<Regex> {
    Regex::new(pattern).map_err(|source| ProfilerError::Regex {
        pattern: pattern.to_string(),
        source,
    })
}
