use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store task is gone or dropped the request.
    #[error("document store unavailable")]
    Unavailable,
    #[error("backend error: {0}")]
    Backend(#[from] sqlx::Error),
    #[error("invalid stored value: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Transport-level faults that may succeed on a later request.
    /// Nothing retries automatically; this only shapes the response.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Backend(_))
    }
}
