//! Error types for the store layer.

/// Errors a store backend can report.
///
/// The room never retries a failed store call. The error is reported to
/// the participant whose frame triggered it and the room carries on.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The backing file holds something other than a JSON object.
    #[error("store data is corrupt: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend cannot serve requests right now.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
