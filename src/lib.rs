//! gha-profiler core library: step latency profiling for GitHub Actions workflows.

mod cache;
mod client;
mod collector;
mod config;
mod error;
mod formatter;
mod group_map;
mod model;
mod profiler;
mod repo_detect;
mod report;
mod router;
mod runtime;
mod sorter;
mod stats;
mod step_profiler;

pub mod testing;

pub use cache::*;
pub use client::*;
pub use collector::*;
pub use config::*;
pub use error::*;
pub use formatter::*;
pub use group_map::*;
pub use model::*;
pub use profiler::*;
pub use repo_detect::*;
pub use report::*;
pub use router::*;
pub use runtime::*;
pub use sorter::*;
pub use stats::*;
pub use step_profiler::*;
