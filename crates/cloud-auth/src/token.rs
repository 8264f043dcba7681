//! Token endpoint calls: code exchange, refresh and revocation
//!
//! Exchange and refresh POST form bodies to the token endpoint with
//! different grant types. Revocation POSTs the token as a query parameter.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Token endpoint response for both exchange and refresh.
///
/// `expires_in` is a delta in seconds. Refresh responses usually omit
/// `refresh_token`, in which case the stored one stays valid.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Absolute expiry in unix milliseconds, relative to `now_ms`.
    pub fn expiry_at(&self, now_ms: u64) -> Option<u64> {
        self.expires_in
            .map(|secs| now_ms.saturating_add(secs.saturating_mul(1000)))
    }
}

/// OAuth client registration used on token endpoint calls.
#[derive(Debug, Clone, Copy)]
pub struct ClientAuth<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
}

/// Exchange an authorization code for tokens.
///
/// 400/401 mean the code is invalid, expired or already used and come back
/// as `InvalidCredentials`.
pub async fn exchange_code(
    http: &reqwest::Client,
    token_uri: &str,
    client: ClientAuth<'_>,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenResponse> {
    let response = http
        .post(token_uri)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", client.client_id),
            ("client_secret", client.client_secret),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if matches!(status.as_u16(), 400 | 401) {
            return Err(Error::InvalidCredentials(format!(
                "authorization code rejected ({status}): {body}"
            )));
        }
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))
}

/// Mint a new access token from a refresh token.
///
/// 400/401/403 mean the grant is revoked or invalid and come back as
/// `InvalidCredentials`.
pub async fn refresh_token(
    http: &reqwest::Client,
    token_uri: &str,
    client: ClientAuth<'_>,
    refresh: &str,
) -> Result<TokenResponse> {
    let response = http
        .post(token_uri)
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh),
            ("client_id", client.client_id),
            ("client_secret", client.client_secret),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));

        if matches!(status.as_u16(), 400 | 401 | 403) {
            return Err(Error::InvalidCredentials(format!(
                "refresh token rejected ({status}): {body}"
            )));
        }
        return Err(Error::TokenExchange(format!(
            "token refresh returned {status}: {body}"
        )));
    }

    response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::TokenExchange(format!("invalid refresh response: {e}")))
}

/// Revoke a token. Anything but 200 is an error.
pub async fn revoke_token(http: &reqwest::Client, revoke_uri: &str, token: &str) -> Result<()> {
    let response = http
        .post(revoke_uri)
        .query(&[("token", token)])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token revocation request failed: {e}")))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        return Err(Error::TokenExchange(format!(
            "revocation endpoint returned {status}"
        )));
    }
    debug!("Revoked OAuth token");
    Ok(())
}

#[cfg(test)]
pub(crate) mod mock {
    //! In-process token endpoint used by the token and manager tests.

    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::extract::{Form, Query, State};
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use axum::routing::post;
    use axum::{Json, Router};
    use tokio::net::TcpListener;

    pub const GOOD_CODE: &str = "4/good-code";
    pub const GOOD_REFRESH: &str = "rt_good";

    #[derive(Default)]
    pub struct TokenServer {
        pub exchanges: AtomicUsize,
        pub refreshes: AtomicUsize,
        pub revoked: Mutex<Vec<String>>,
        /// Status returned for every grant when set.
        pub fail_with: Mutex<Option<StatusCode>>,
        pub revoke_status: Mutex<Option<StatusCode>>,
    }

    pub struct Endpoints {
        pub token_uri: String,
        pub revoke_uri: String,
        pub server: Arc<TokenServer>,
    }

    async fn token(
        State(server): State<Arc<TokenServer>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Response {
        if let Some(status) = *server.fail_with.lock().unwrap() {
            return (status, r#"{"error":"server_error"}"#).into_response();
        }
        let grant = form.get("grant_type").map(String::as_str);
        match grant {
            Some("authorization_code") => {
                server.exchanges.fetch_add(1, Ordering::SeqCst);
                if form.get("code").map(String::as_str) != Some(GOOD_CODE) {
                    return (StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#)
                        .into_response();
                }
                Json(serde_json::json!({
                    "access_token": "at_exchanged",
                    "refresh_token": GOOD_REFRESH,
                    "expires_in": 3600,
                    "token_type": "Bearer"
                }))
                .into_response()
            }
            Some("refresh_token") => {
                server.refreshes.fetch_add(1, Ordering::SeqCst);
                if form.get("refresh_token").map(String::as_str) != Some(GOOD_REFRESH) {
                    return (StatusCode::BAD_REQUEST, r#"{"error":"invalid_grant"}"#)
                        .into_response();
                }
                Json(serde_json::json!({
                    "access_token": "at_refreshed",
                    "expires_in": 3600,
                    "token_type": "Bearer"
                }))
                .into_response()
            }
            _ => StatusCode::BAD_REQUEST.into_response(),
        }
    }

    async fn revoke(
        State(server): State<Arc<TokenServer>>,
        Query(query): Query<HashMap<String, String>>,
    ) -> StatusCode {
        if let Some(status) = *server.revoke_status.lock().unwrap() {
            return status;
        }
        if let Some(token) = query.get("token") {
            server.revoked.lock().unwrap().push(token.clone());
        }
        StatusCode::OK
    }

    pub async fn spawn() -> Endpoints {
        let server = Arc::new(TokenServer::default());
        let app = Router::new()
            .route("/token", post(token))
            .route("/revoke", post(revoke))
            .with_state(server.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Endpoints {
            token_uri: format!("http://{addr}/token"),
            revoke_uri: format!("http://{addr}/revoke"),
            server,
        }
    }
}
