//! Owner/repository detection from a local git checkout.

use git2::Repository;

use std::path::Path;

use crate::{ProfilerError, ProfilerResult, RepoRef};

/// Resolves owner/repository from the `origin` remote of the checkout at
/// `dir`. Linked worktrees and submodules (a `.git` file) are followed.
pub fn detect_origin_repository(dir: &Path) -> ProfilerResult<RepoRef> {
    let repo = Repository::open(dir)?;
    let remote = repo.find_remote("origin")?;
    let url = remote.url().ok_or_else(|| {
        ProfilerError::InvalidArgument(format!(
            "origin remote url in {} is not valid utf-8",
            dir.display()
        ))
    })?;
    parse_remote_url(url)
        .ok_or_else(|| ProfilerError::InvalidArgument(format!("unrecognized remote url {url:?}")))
}

/// Accepts `https://host/owner/repo(.git)`, `ssh://git@host/owner/repo` and
/// `git@host:owner/repo(.git)`.
pub fn parse_remote_url(url: &str) -> Option<RepoRef> {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.split_once('/')?.1,
        None => url.split_once(':')?.1,
    };
    let mut parts = path.trim_end_matches('/').rsplit('/');
    let repo = parts.next()?;
    let owner = parts.next()?;
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some(RepoRef::new(owner, repo))
}
