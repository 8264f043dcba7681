//! Google OAuth endpoints for Cloud Print
//!
//! Defaults only. Every endpoint can be overridden through `OAuthSettings`.

/// Authorization endpoint the user is sent to.
pub const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Token endpoint for code exchange and refresh.
pub const TOKEN_URI: &str = "https://accounts.google.com/o/oauth2/token";

/// Revocation endpoint. The token travels as a query parameter.
pub const REVOKE_URI: &str = "https://accounts.google.com/o/oauth2/revoke";

/// Scope granting access to the user's cloud printers.
pub const CLOUDPRINT_SCOPE: &str = "https://www.googleapis.com/auth/cloudprint";

/// Callback the provider redirects to after consent.
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:5001/oauthredirect";

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
