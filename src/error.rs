//! Crate-wide error types.

use thiserror::Error;

pub type ProfilerResult<T> = Result<T, ProfilerError>;

#[derive(Debug, Error)]
pub enum ProfilerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid sort field: {0}")]
    InvalidSortField(String),

    #[error("invalid regular expression {pattern:?}: {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("http error: {0}")]
    Http(String),

    #[error("fetch error: {0}")]
    Fetch(String),

    #[error("computation error: {0}")]
    Compute(String),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<ureq::Error> for ProfilerError {
    fn from(value: ureq::Error) -> Self {
        match value {
            ureq::Error::Status(code, response) => {
                Self::Http(format!("{} returned status {code}", response.get_url()))
            }
            ureq::Error::Transport(transport) => Self::Http(transport.to_string()),
        }
    }
}
