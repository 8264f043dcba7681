//! Service-level error types

use thiserror::Error;

/// Errors from [`crate::PrintService`] operations.
///
/// Component failures pass through unchanged. `status_code()` gives the
/// HTTP status a web host answers with for each of them.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] common::Error),

    #[error(transparent)]
    Portal(#[from] print_portal::Error),

    #[error(transparent)]
    Auth(#[from] cloud_auth::Error),

    #[error(transparent)]
    CloudPrint(#[from] cloud_print::Error),

    /// The caller's request cannot be served as given.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No cloud print grant is stored for the user.
    #[error("Cloud print is not authorized for {0}")]
    NotAuthorized(String),
}

impl Error {
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Config(_) => 500,
            Error::Portal(print_portal::Error::InvalidCredentials(_)) => 401,
            Error::Portal(print_portal::Error::Network(_)) => 504,
            Error::Portal(print_portal::Error::Scraping(_)) => 502,
            Error::Auth(cloud_auth::Error::InvalidInput(_)) => 400,
            Error::Auth(_) => 504,
            Error::CloudPrint(_) => 502,
            Error::InvalidRequest(_) => 400,
            Error::NotAuthorized(_) => 409,
        }
    }
}

/// Result alias using service Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_errors_keep_their_message() {
        let err: Error = print_portal::Error::Scraping("budget element missing".into()).into();
        assert_eq!(err.to_string(), "scraping error: budget element missing");
    }

    #[test]
    fn status_codes_follow_failure_kind() {
        let cases = [
            (Error::from(print_portal::Error::InvalidCredentials("x".into())), 401),
            (Error::from(print_portal::Error::Scraping("x".into())), 502),
            (Error::from(cloud_auth::Error::InvalidInput("x".into())), 400),
            (Error::from(cloud_auth::Error::WebService("x".into())), 504),
            (
                Error::from(cloud_print::Error::JobSubmission(
                    cloud_print::ApiError::JobFailed("x".into()),
                )),
                502,
            ),
            (Error::NotAuthorized("student@calvin.edu".into()), 409),
            (Error::InvalidRequest("copies".into()), 400),
            (Error::from(common::Error::Config("x".into())), 500),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code(), status, "{err:?}");
        }
    }
}
