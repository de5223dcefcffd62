use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Feed fetch error: {0}")]
    FeedFetch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl From<crate::config::ConfigError> for RelayError {
    fn from(e: crate::config::ConfigError) -> Self {
        RelayError::Config(e.to_string())
    }
}
