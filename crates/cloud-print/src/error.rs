//! Error types for cloud print operations

/// Failure talking to the cloud print interface.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// No usable response: connection, timeout or body read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-2xx status or `success: false`.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The response did not have the expected shape.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The provider accepted the job but reported it failed.
    #[error("job failed: {0}")]
    JobFailed(String),
}

/// Errors from [`crate::CloudPrintGateway`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Submitting or confirming a job failed.
    #[error("job submission failed: {0}")]
    JobSubmission(#[source] ApiError),

    /// Any other call to the provider failed.
    #[error("cloud print API error: {0}")]
    Api(#[source] ApiError),
}

/// Result alias for gateway operations.
pub type Result<T> = std::result::Result<T, Error>;
