use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodashError {
    #[error("Config directory not found at {0}. Run 'podash init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("Could not decode {what}: {reason}")]
    Decode { what: String, reason: String },

    #[error("Could not encode {what}: {reason}")]
    Encode { what: String, reason: String },

    #[error("Invalid record at position {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },

    #[error("Invalid time frame '{0}'. Use 'all', '3months', '6months' or '1year'.")]
    InvalidTimeFrame(String),

    #[error("Invalid status '{0}'")]
    InvalidStatus(String),

    #[error("Page {page} is out of range (1..={total})")]
    InvalidPage { page: usize, total: usize },

    #[error("No API source configured. Set [api] base_url in config.toml or pass --from-file.")]
    NoApiSource,

    #[error("Failed to fetch {what} after {attempts} attempt(s): {reason}")]
    FetchFailed {
        what: String,
        attempts: u32,
        reason: String,
    },

    #[error("Could not start lookup workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, PodashError>;
