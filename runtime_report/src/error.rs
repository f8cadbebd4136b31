use std::io;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ReportError>;

/// Everything that can go wrong while building the runtime report.
///
/// `Fetch`, `Decompress` and `Parse` are scoped to a single log object and
/// never abort a run on their own; the driver records them and moves on.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("listing objects under '{prefix}' failed: {reason}")]
    Listing { prefix: String, reason: String },
    #[error("fetching '{key}' failed: {reason}")]
    Fetch { key: String, reason: String },
    #[error("decompressing '{key}' failed: {source}")]
    Decompress {
        key: String,
        #[source]
        source: io::Error,
    },
    #[error("parsing '{key}' failed: {source}")]
    Parse {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("adding creates for runtime '{runtime}' failed: {reason}")]
    Persist { runtime: String, reason: String },
    #[error("{failed} of {attempted} runtime counters could not be persisted")]
    PersistIncomplete { failed: usize, attempted: usize },
    #[error("{operation} did not finish within {after:?}")]
    Timeout {
        operation: String,
        after: Duration,
    },
}

/// Runs `future` under `deadline`, turning an elapsed timer into `ReportError::Timeout`.
pub async fn with_deadline<T, F>(operation: &str, deadline: Duration, future: F) -> Result<T>
where
    F: std::future::Future<Output = Result<T>>,
{
    match tokio::time::timeout(deadline, future).await {
        Ok(result) => result,
        Err(_) => Err(ReportError::Timeout {
            operation: operation.to_string(),
            after: deadline,
        }),
    }
}
