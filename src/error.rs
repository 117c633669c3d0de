use std::error::Error as StdError;
use thiserror::Error;

/// Failure that aborts the whole fetch-and-parse stage of a run.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to fetch {url}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("failed to read saved page {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ScrapeError {
    /// Message recorded in the report: this error followed by its causes.
    pub fn report_message(&self) -> String {
        let mut message = self.to_string();
        let mut cause = self.source();
        while let Some(err) = cause {
            message.push_str(": ");
            message.push_str(&err.to_string());
            cause = err.source();
        }
        message
    }
}

/// Failure confined to one structured-data block; the block is skipped.
#[derive(Debug, Error)]
pub enum BlockError {
    #[error("invalid JSON in structured-data block: {0}")]
    Json(#[from] serde_json::Error),
}
