//! Configuration types and loading
//!
//! Config precedence: CLI args > env vars > config file > defaults.
//! The OAuth client secret is loaded from PRINT_OAUTH_CLIENT_SECRET or
//! client_secret_file, never stored in the TOML directly.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cloud_auth::OAuthSettings;
use cloud_print::{CloudPrintSettings, PollPolicy};
use common::Secret;
use print_portal::{PortalSettings, PrintPrice};
use serde::Deserialize;

/// Env var holding the OAuth client secret.
pub const CLIENT_SECRET_ENV: &str = "PRINT_OAUTH_CLIENT_SECRET";

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub portal: PortalConfig,
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub cloudprint: CloudPrintConfig,
    /// Price table used to tell colour jobs from black-and-white ones.
    #[serde(default = "print_portal::default_print_prices")]
    pub print_prices: Vec<PrintPrice>,
}

/// Print accounting portal connection
#[derive(Debug, Deserialize)]
pub struct PortalConfig {
    #[serde(default = "default_portal_url")]
    pub base_url: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// OAuth client registration and credential storage
#[derive(Debug, Deserialize)]
pub struct OAuthConfig {
    pub client_id: String,
    #[serde(skip)]
    pub client_secret: Option<Secret<String>>,
    /// Path to a file containing the client secret (alternative to the env var)
    #[serde(default)]
    pub client_secret_file: Option<PathBuf>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default = "default_revoke_uri")]
    pub revoke_uri: String,
    #[serde(default = "default_scope")]
    pub scope: String,
    /// JSON file the credential records are persisted to.
    #[serde(default = "default_credentials_path")]
    pub credentials_path: PathBuf,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Cloud print provider and completion polling
#[derive(Debug, Deserialize)]
pub struct CloudPrintConfig {
    #[serde(default = "default_cloudprint_url")]
    pub base_url: String,
    #[serde(default = "default_printer_id")]
    pub printer_id: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_initial_delay_ms")]
    pub poll_initial_delay_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Accept jobs locally instead of calling the provider.
    #[serde(default)]
    pub offline: bool,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            base_url: default_portal_url(),
            domain: String::new(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Default for CloudPrintConfig {
    fn default() -> Self {
        Self {
            base_url: default_cloudprint_url(),
            printer_id: default_printer_id(),
            timeout_secs: default_timeout(),
            poll_initial_delay_ms: default_poll_initial_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            poll_attempts: default_poll_attempts(),
            offline: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_portal_url() -> String {
    print_portal::constants::DEFAULT_BASE_URL.to_owned()
}

fn default_redirect_uri() -> String {
    cloud_auth::constants::DEFAULT_REDIRECT_URI.to_owned()
}

fn default_auth_uri() -> String {
    cloud_auth::constants::AUTH_URI.to_owned()
}

fn default_token_uri() -> String {
    cloud_auth::constants::TOKEN_URI.to_owned()
}

fn default_revoke_uri() -> String {
    cloud_auth::constants::REVOKE_URI.to_owned()
}

fn default_scope() -> String {
    cloud_auth::constants::CLOUDPRINT_SCOPE.to_owned()
}

fn default_credentials_path() -> PathBuf {
    PathBuf::from("oauth-credentials.json")
}

fn default_cloudprint_url() -> String {
    cloud_print::constants::DEFAULT_BASE_URL.to_owned()
}

fn default_printer_id() -> String {
    cloud_print::constants::DEFAULT_PRINTER_ID.to_owned()
}

fn default_poll_initial_delay_ms() -> u64 {
    cloud_print::constants::DEFAULT_POLL_INITIAL_DELAY_MS
}

fn default_poll_interval_ms() -> u64 {
    cloud_print::constants::DEFAULT_POLL_INTERVAL_MS
}

fn default_poll_attempts() -> u32 {
    cloud_print::constants::DEFAULT_POLL_ATTEMPTS
}

fn require_http(field: &str, url: &str) -> common::Result<()> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(common::Error::Config(format!(
            "{field} must start with http:// or https://, got: {url}"
        )));
    }
    Ok(())
}

fn require_nonzero(field: &str, value: u64) -> common::Result<()> {
    if value == 0 {
        return Err(common::Error::Config(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment variables.
    ///
    /// Client secret resolution order:
    /// 1. PRINT_OAUTH_CLIENT_SECRET env var
    /// 2. client_secret_file path from config
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;
        config.validate()?;

        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            config.oauth.client_secret = Some(Secret::new(secret));
        } else if let Some(ref secret_file) = config.oauth.client_secret_file {
            let secret = std::fs::read_to_string(secret_file).map_err(|e| {
                common::Error::Config(format!(
                    "failed to read client_secret_file {}: {e}",
                    secret_file.display()
                ))
            })?;
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.oauth.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(config)
    }

    fn validate(&self) -> common::Result<()> {
        require_http("portal.base_url", &self.portal.base_url)?;
        require_http("oauth.auth_uri", &self.oauth.auth_uri)?;
        require_http("oauth.token_uri", &self.oauth.token_uri)?;
        require_http("oauth.revoke_uri", &self.oauth.revoke_uri)?;
        require_http("cloudprint.base_url", &self.cloudprint.base_url)?;

        require_nonzero("portal.timeout_secs", self.portal.timeout_secs)?;
        require_nonzero("oauth.timeout_secs", self.oauth.timeout_secs)?;
        require_nonzero("cloudprint.timeout_secs", self.cloudprint.timeout_secs)?;
        require_nonzero(
            "cloudprint.poll_attempts",
            u64::from(self.cloudprint.poll_attempts),
        )?;

        if self.oauth.client_id.trim().is_empty() {
            return Err(common::Error::Config(
                "oauth.client_id must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolve config file path from CLI arg or CONFIG_PATH env var.
    pub fn resolve_path(cli_path: Option<&str>) -> PathBuf {
        if let Some(p) = cli_path {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("CONFIG_PATH") {
            return PathBuf::from(p);
        }
        PathBuf::from("print-service.toml")
    }
}

impl PortalConfig {
    pub fn settings(&self) -> PortalSettings {
        PortalSettings {
            base_url: self.base_url.clone(),
            domain: self.domain.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

impl OAuthConfig {
    /// Fails when no client secret was resolved at load time.
    pub fn settings(&self) -> common::Result<OAuthSettings> {
        let client_secret = self.client_secret.clone().ok_or_else(|| {
            common::Error::Config(format!(
                "OAuth client secret missing: set {CLIENT_SECRET_ENV} or oauth.client_secret_file"
            ))
        })?;
        Ok(OAuthSettings {
            client_id: self.client_id.clone(),
            client_secret,
            redirect_uri: self.redirect_uri.clone(),
            auth_uri: self.auth_uri.clone(),
            token_uri: self.token_uri.clone(),
            revoke_uri: self.revoke_uri.clone(),
            scope: self.scope.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }
}

impl CloudPrintConfig {
    pub fn settings(&self) -> CloudPrintSettings {
        CloudPrintSettings {
            base_url: self.base_url.clone(),
            printer_id: self.printer_id.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            poll: PollPolicy {
                initial_delay: Duration::from_millis(self.poll_initial_delay_ms),
                interval: Duration::from_millis(self.poll_interval_ms),
                attempts: self.poll_attempts,
            },
        }
    }
}
