//! Error types for OAuth credential operations

/// Errors from OAuth credential operations.
///
/// Token endpoint helpers and stores return the low-level variants.
/// [`crate::OAuthCredentialManager`] folds them into `InvalidInput` (the
/// caller supplied something unusable) or `WebService` (the provider or the
/// store failed).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("web service error: {0}")]
    WebService(String),
}

impl Error {
    /// Fold a low-level failure into `WebService`, keeping caller-facing
    /// variants as they are.
    pub(crate) fn into_web_service(self) -> Self {
        match self {
            Error::InvalidInput(_) | Error::WebService(_) => self,
            other => Error::WebService(other.to_string()),
        }
    }
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_level_errors_fold_into_web_service() {
        let err = Error::Io("disk full".into()).into_web_service();
        assert!(matches!(err, Error::WebService(ref msg) if msg == "I/O error: disk full"));
    }

    #[test]
    fn caller_facing_errors_pass_through() {
        let err = Error::InvalidInput("no code".into()).into_web_service();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
