use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a run or reject its configuration.
///
/// Sleep interruptions are deliberately absent: they are logged and the
/// interrupted task keeps going.
#[derive(Debug, Error)]
pub enum Error {
    /// A configuration value could not be parsed or loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The sink kept rejecting an item after every allowed retry.
    #[error("sink rejected item {id} after {attempts} attempt(s): {source}")]
    Sink {
        id: String,
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A reporter could not emit a throughput report.
    #[error("failed to emit report: {0}")]
    Report(String),

    /// The dispatcher or reporter task panicked or was aborted.
    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
