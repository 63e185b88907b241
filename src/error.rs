use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid OPML document: {0}")]
    Opml(#[from] opml::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// Failures of the item store. A rejected duplicate is not one of them.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store is not connected")]
    NotConnected,

    #[error("Database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("Failed to encode item field: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid collection name: {0:?}")]
    InvalidCollection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A feed could not be fetched or parsed. Always names the feed.
#[derive(Error, Debug)]
#[error("Failed to fetch feed {url}: {source}")]
pub struct FetchError {
    pub url: String,
    #[source]
    pub source: FetchFailure,
}

impl FetchError {
    pub fn new(url: impl Into<String>, source: impl Into<FetchFailure>) -> Self {
        Self {
            url: url.into(),
            source: source.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum FetchFailure {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),

    #[error("Feed too large: {size} bytes (max {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("Invalid feed document: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),

    #[error("{0}")]
    Other(String),
}
