//! On-disk cache of API responses, revalidated with ETags.

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use std::path::{Path, PathBuf};

use crate::{ProfilerError, ProfilerResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub url: String,
    #[serde(default)]
    pub etag: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CachedFile {
    pub path: String,
    pub url: Option<String>,
    pub bytes: u64,
}

#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `gha-profiler` under the platform cache directory, or under the
    /// temp directory when the platform has none.
    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("gha-profiler")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, url: &str) -> PathBuf {
        let key = blake3::hash(url.as_bytes()).to_hex();
        self.dir.join(format!("{key}.json"))
    }

    /// Unreadable or mismatched entries count as misses.
    pub fn load(&self, url: &str) -> Option<CacheEntry> {
        let path = self.entry_path(url);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::debug!("failed to read cache entry {}: {err}", path.display());
                return None;
            }
        };
        match serde_json::from_slice::<CacheEntry>(&bytes) {
            Ok(entry) if entry.url == url => Some(entry),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!("ignoring corrupt cache entry {}: {err}", path.display());
                None
            }
        }
    }

    pub fn store(&self, entry: &CacheEntry) -> ProfilerResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.entry_path(&entry.url);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec(entry)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    pub fn list(&self) -> ProfilerResult<Vec<CachedFile>> {
        let mut out = Vec::new();
        for path in self.entry_files()? {
            let bytes = std::fs::metadata(&path)?.len();
            let url = std::fs::read(&path)
                .ok()
                .and_then(|b| serde_json::from_slice::<CacheEntry>(&b).ok())
                .map(|e| e.url);
            out.push(CachedFile {
                path: path.to_string_lossy().to_string(),
                url,
                bytes,
            });
        }
        Ok(out)
    }

    /// Removes every cache entry and returns how many were deleted.
    pub fn clear(&self) -> ProfilerResult<usize> {
        let files = self.entry_files()?;
        for path in &files {
            std::fs::remove_file(path)?;
        }
        Ok(files.len())
    }

    fn entry_files(&self) -> ProfilerResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        if !self.dir.exists() {
            return Ok(files);
        }
        for entry in WalkDir::new(&self.dir).min_depth(1).max_depth(1) {
            let entry = entry.map_err(|e| {
                let msg = e.to_string();
                ProfilerError::Io(e.into_io_error().unwrap_or_else(|| std::io::Error::other(msg)))
            })?;
            let path = entry.path();
            if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
                files.push(path.to_path_buf());
            }
        }
        files.sort();
        Ok(files)
    }
}
