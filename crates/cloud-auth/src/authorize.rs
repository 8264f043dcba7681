//! Authorization URL construction and redirect parsing

use url::Url;

use crate::error::{Error, Result};

/// Base used to resolve redirect URLs given without scheme or host.
const RELATIVE_BASE: &str = "http://localhost/";

/// Parameters of the consent page URL.
#[derive(Debug, Clone, Copy)]
pub struct AuthorizationRequest<'a> {
    pub auth_uri: &'a str,
    pub client_id: &'a str,
    pub redirect_uri: &'a str,
    pub scope: &'a str,
    pub login_hint: &'a str,
}

/// Build the consent page URL for offline access.
///
/// `approval_prompt=force` makes the provider hand out a refresh token
/// even when the user granted access before.
pub fn authorization_url(request: AuthorizationRequest<'_>) -> Result<String> {
    let mut url = Url::parse(request.auth_uri)
        .map_err(|e| Error::InvalidInput(format!("invalid authorization endpoint: {e}")))?;
    url.query_pairs_mut()
        .append_pair("client_id", request.client_id)
        .append_pair("redirect_uri", request.redirect_uri)
        .append_pair("scope", request.scope)
        .append_pair("access_type", "offline")
        .append_pair("response_type", "code")
        .append_pair("login_hint", request.login_hint)
        .append_pair("approval_prompt", "force");
    Ok(url.into())
}

/// Authorization code carried by the provider's redirect.
///
/// Accepts absolute URLs and bare query strings such as `?code=abc`.
/// Parameters with empty values are ignored.
pub fn code_from_url(url: Option<&str>) -> Result<String> {
    let raw = url.ok_or_else(|| Error::InvalidInput("url must be a string".into()))?;
    let base = Url::parse(RELATIVE_BASE).map_err(|e| Error::InvalidInput(e.to_string()))?;
    let parsed = Url::options()
        .base_url(Some(&base))
        .parse(raw)
        .map_err(|e| Error::InvalidInput(format!("unparsable redirect url: {e}")))?;

    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(key, value)| key == name && !value.is_empty())
            .map(|(_, value)| value.into_owned())
    };

    if let Some(error) = param("error") {
        return Err(Error::InvalidInput(error));
    }
    param("code").ok_or_else(|| Error::InvalidInput("no code found".into()))
}
