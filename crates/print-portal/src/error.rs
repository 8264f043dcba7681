//! Error types for print portal operations

/// Errors from the print accounting portal.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Connection, timeout or protocol failure before a response arrived.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// A response arrived but did not have the expected shape.
    #[error("scraping error: {0}")]
    Scraping(String),

    /// The portal rejected the identity/password pair.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Result alias for portal operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_failure_class() {
        assert_eq!(
            Error::Scraping("page has no title".into()).to_string(),
            "scraping error: page has no title"
        );
        assert_eq!(
            Error::InvalidCredentials("user name must not be blank".into()).to_string(),
            "invalid credentials: user name must not be blank"
        );
    }
}
