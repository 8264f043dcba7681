//! OAuth credential lifecycle for cloud print users
//!
//! Credential flow:
//! 1. `get_authentication_prompt_url()` sends the user to the consent page
//! 2. The provider redirects back; `get_code_from_url()` pulls the code out
//! 3. `authorize_user_by_code()` exchanges it and stores the record
//! 4. `get_token()` returns the access token, refreshing it once expired
//! 5. `delete_credentials()` revokes (best effort) and forgets the record

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use tracing::{info, warn};

use crate::authorize::{self, AuthorizationRequest};
use crate::constants::{
    AUTH_URI, CLOUDPRINT_SCOPE, DEFAULT_REDIRECT_URI, DEFAULT_TIMEOUT_SECS, REVOKE_URI, TOKEN_URI,
};
use crate::credentials::{CredentialRecord, CredentialStore, now_millis};
use crate::error::{Error, Result};
use crate::token::{self, ClientAuth};

/// OAuth client registration and provider endpoints.
#[derive(Debug, Clone)]
pub struct OAuthSettings {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub redirect_uri: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub revoke_uri: String,
    pub scope: String,
    pub timeout: Duration,
}

impl OAuthSettings {
    /// Settings for the given client against Google's endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<Secret<String>>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_owned(),
            auth_uri: AUTH_URI.to_owned(),
            token_uri: TOKEN_URI.to_owned(),
            revoke_uri: REVOKE_URI.to_owned(),
            scope: CLOUDPRINT_SCOPE.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Acquires, refreshes, revokes and persists per-user OAuth credentials.
///
/// Every operation returns either `Error::InvalidInput` or
/// `Error::WebService`.
pub struct OAuthCredentialManager {
    settings: OAuthSettings,
    store: Arc<dyn CredentialStore>,
    http: reqwest::Client,
}

impl OAuthCredentialManager {
    pub fn new(settings: OAuthSettings, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| Error::WebService(format!("building HTTP client: {e}")))?;
        Ok(Self {
            settings,
            store,
            http,
        })
    }

    pub fn settings(&self) -> &OAuthSettings {
        &self.settings
    }

    /// Access token for `identity`, or `None` when the user has not
    /// authorized (or their grant was revoked).
    pub async fn get_token(&self, identity: &str) -> Result<Option<String>> {
        let Some(record) = self.find(identity).await? else {
            return Ok(None);
        };
        if !record.is_expired() {
            return Ok(Some(record.access_token));
        }

        info!(identity, "Access token expired, refreshing");
        match self.refresh(record).await {
            Ok(record) => {
                metrics::counter!("oauth_token_refresh_total", "outcome" => "success").increment(1);
                let access_token = record.access_token.clone();
                self.store
                    .upsert(record)
                    .await
                    .map_err(Error::into_web_service)?;
                Ok(Some(access_token))
            }
            Err(Error::InvalidCredentials(reason)) => {
                metrics::counter!("oauth_token_refresh_total", "outcome" => "rejected")
                    .increment(1);
                warn!(identity, %reason, "Refresh rejected, forgetting credentials");
                self.delete_credentials(identity, false).await?;
                Ok(None)
            }
            Err(err) => {
                metrics::counter!("oauth_token_refresh_total", "outcome" => "error").increment(1);
                Err(err.into_web_service())
            }
        }
    }

    async fn refresh(&self, record: CredentialRecord) -> Result<CredentialRecord> {
        let Some(refresh) = record.refresh_token.as_deref() else {
            return Err(Error::InvalidCredentials("record has no refresh token".into()));
        };
        let client = ClientAuth {
            client_id: &record.client_id,
            client_secret: &record.client_secret,
        };
        let response = token::refresh_token(&self.http, &record.token_uri, client, refresh).await?;

        let token_expiry = response.expiry_at(now_millis());
        Ok(CredentialRecord {
            access_token: response.access_token,
            refresh_token: response.refresh_token.or(record.refresh_token),
            token_expiry,
            ..record
        })
    }

    /// Consent page URL for `identity`. Makes no request.
    pub fn get_authentication_prompt_url(&self, identity: &str) -> Result<String> {
        authorize::authorization_url(AuthorizationRequest {
            auth_uri: &self.settings.auth_uri,
            client_id: &self.settings.client_id,
            redirect_uri: &self.settings.redirect_uri,
            scope: &self.settings.scope,
            login_hint: identity,
        })
    }

    /// Authorization code from the provider's redirect URL.
    pub fn get_code_from_url(url: Option<&str>) -> Result<String> {
        authorize::code_from_url(url)
    }

    /// Exchange an authorization code, store the credentials and return the
    /// access token.
    pub async fn authorize_user_by_code(&self, code: &str, identity: &str) -> Result<String> {
        let client = ClientAuth {
            client_id: &self.settings.client_id,
            client_secret: self.settings.client_secret.expose(),
        };
        let response = token::exchange_code(
            &self.http,
            &self.settings.token_uri,
            client,
            &self.settings.redirect_uri,
            code,
        )
        .await
        .map_err(|err| match err {
            Error::InvalidCredentials(reason) => {
                Error::InvalidInput(format!("invalid authorization code: {reason}"))
            }
            other => other.into_web_service(),
        })?;

        let record = CredentialRecord {
            identity: identity.to_owned(),
            token_expiry: response.expiry_at(now_millis()),
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            client_id: self.settings.client_id.clone(),
            client_secret: self.settings.client_secret.expose().clone(),
            token_uri: self.settings.token_uri.clone(),
            scope: self.settings.scope.clone(),
        };
        let access_token = record.access_token.clone();
        self.store
            .upsert(record)
            .await
            .map_err(Error::into_web_service)?;

        info!(identity, "Stored new OAuth credentials");
        Ok(access_token)
    }

    /// Forget the credentials for `identity`, revoking the access token
    /// first when `revoke` is set. Revocation failures are logged only.
    pub async fn delete_credentials(&self, identity: &str, revoke: bool) -> Result<()> {
        if revoke && let Err(err) = self.revoke(identity).await {
            warn!(identity, error = %err, "Token revocation failed, deleting anyway");
        }

        let removed = self
            .store
            .delete(identity)
            .await
            .map_err(Error::into_web_service)?;
        if removed {
            info!(identity, "Deleted OAuth credentials");
        }
        Ok(())
    }

    async fn revoke(&self, identity: &str) -> Result<()> {
        let Some(record) = self.store.find(identity).await? else {
            return Ok(());
        };
        token::revoke_token(&self.http, &self.settings.revoke_uri, &record.access_token).await
    }

    async fn find(&self, identity: &str) -> Result<Option<CredentialRecord>> {
        self.store
            .find(identity)
            .await
            .map_err(Error::into_web_service)
    }
}
