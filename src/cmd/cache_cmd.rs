//! Response cache maintenance (`gha-profiler cache ...`).

use clap::Subcommand;

use gha_profiler::{CachedFile, DiskCache, ProfilerResult};

#[derive(Debug, Subcommand)]
pub enum CacheCommand {
    /// List cached API responses.
    List,
    /// Delete every cached API response.
    Clear,
}

#[derive(Debug)]
pub enum CacheOutcome {
    Listed(Vec<CachedFile>),
    Cleared(usize),
}

pub fn cache_command(cache: &DiskCache, command: &CacheCommand) -> ProfilerResult<CacheOutcome> {
    match command {
        CacheCommand::List => Ok(CacheOutcome::Listed(cache.list()?)),
        CacheCommand::Clear => {
            let removed = cache.clear()?;
            tracing::info!("removed {removed} entries from {}", cache.dir().display());
            Ok(CacheOutcome::Cleared(removed))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gha_profiler::CacheEntry;

    #[test]
    fn list_then_clear() {
        let dir = std::env::temp_dir().join(format!("gha-profiler-cmd-{}", uuid::Uuid::new_v4()));
        let cache = DiskCache::new(&dir);
        cache
            .store(&CacheEntry {
                url: "https://api.github.com/a".to_string(),
                etag: None,
                body: "{}".to_string(),
            })
            .expect("store");

        match cache_command(&cache, &CacheCommand::List).expect("list") {
            CacheOutcome::Listed(files) => assert_eq!(files.len(), 1),
            other => panic!("expected listing, got {other:?}"),
        }
        match cache_command(&cache, &CacheCommand::Clear).expect("clear") {
            CacheOutcome::Cleared(n) => assert_eq!(n, 1),
            other => panic!("expected clear, got {other:?}"),
        }
    }
}
