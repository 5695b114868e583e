use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a run rather than being recorded as probe data.
///
/// Unreachable hosts, refused connections and HTTP timeouts are not errors at
/// this level; they end up in `PingOutcome::error` / `HttpOutcome::error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),

    #[error("invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("URL has no host: {0}")]
    MissingHost(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
