/// Failure of a durable-store operation.
///
/// None of these are fatal: the in-memory playlist stays authoritative and
/// the failure is reported only as `persisted: false`.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// Transport-level failure talking to the backend.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("Backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Could not obtain an access token.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The credentials file is missing or unreadable.
    #[error("Credentials error: {0}")]
    Credentials(String),

    /// The backend returned data we could not interpret.
    #[error("Malformed response: {0}")]
    Malformed(String),

    /// The call did not complete within the configured bound.
    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The adapter (or the queue in front of it) is not running.
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
