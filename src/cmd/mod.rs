mod cache_cmd;

pub use cache_cmd::*;
