//! Authenticated HTTP session against one portal sub-path
//!
//! Each sub-path is a separate portal application with its own cookies and
//! token, so the client keeps one [`ScrapingSession`] per path.

use std::fmt;
use std::time::Duration;

use common::Secret;
use reqwest::header::{AUTHORIZATION, WWW_AUTHENTICATE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tracing::{debug, info, warn};

use crate::constants::{AUTH_PAGE, CLIENT_PATH, DEFAULT_BASE_URL, DEFAULT_TIMEOUT_SECS, RQM_PATH};
use crate::error::{Error, Result};
use crate::ntlm::{self, Identity};
use crate::scrape;

/// Which portal application a session talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalPath {
    /// Client application (`pwclient/`), serves the budget page.
    Budget,
    /// Release queue manager (`pwrqm/`), serves and edits the queue.
    Queue,
}

impl PortalPath {
    pub fn sub_path(self) -> &'static str {
        match self {
            PortalPath::Budget => CLIENT_PATH,
            PortalPath::Queue => RQM_PATH,
        }
    }

    /// Short label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            PortalPath::Budget => "budget",
            PortalPath::Queue => "queue",
        }
    }
}

impl fmt::Display for PortalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Portal user name and password.
#[derive(Debug, Clone)]
pub struct Credentials {
    identity: String,
    password: Secret<String>,
}

impl Credentials {
    /// Rejects a blank identity, which would yield a malformed NTLM user.
    pub fn new(identity: impl Into<String>, password: impl Into<Secret<String>>) -> Result<Self> {
        let identity = identity.into();
        if identity.trim().is_empty() {
            return Err(Error::InvalidCredentials(
                "user name must not be blank".into(),
            ));
        }
        Ok(Self {
            identity,
            password: password.into(),
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Connection settings for the portal.
#[derive(Debug, Clone)]
pub struct PortalSettings {
    /// Portal root, e.g. `https://uniflow.calvin.edu/`.
    pub base_url: String,
    /// NTLM domain; empty sends the user as `\identity`.
    pub domain: String,
    pub timeout: Duration,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            domain: String::new(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Cookie-keeping, NTLM-authenticating session for one sub-path.
pub struct ScrapingSession {
    path: PortalPath,
    base_url: String,
    domain: String,
    credentials: Credentials,
    http: Client,
    token: Option<String>,
}

impl ScrapingSession {
    pub fn new(
        path: PortalPath,
        settings: &PortalSettings,
        credentials: Credentials,
    ) -> Result<Self> {
        // NTLM authenticates the connection, so the three handshake legs must
        // travel over one HTTP/1.1 socket. IIS refuses Windows auth over h2.
        let http = Client::builder()
            .cookie_store(true)
            .timeout(settings.timeout)
            .http1_only()
            .pool_max_idle_per_host(1)
            .build()?;

        let mut base_url = settings.base_url.clone();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            path,
            base_url,
            domain: settings.domain.clone(),
            credentials,
            http,
            token: None,
        })
    }

    pub fn path(&self) -> PortalPath {
        self.path
    }

    /// Absolute URL of a page under this session's sub-path.
    pub fn url(&self, page: &str) -> String {
        format!("{}{}{}", self.base_url, self.path.sub_path(), page)
    }

    /// Token from the most recent successful sign-in.
    pub fn token(&self) -> Result<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| Error::Scraping(format!("not signed in to {}", self.path)))
    }

    /// Sign in and refresh the session token.
    pub async fn sign_in(&mut self) -> Result<()> {
        let result = self.try_sign_in().await;
        let outcome = match &result {
            Ok(()) => "success",
            Err(Error::InvalidCredentials(_)) => "rejected",
            Err(_) => "error",
        };
        metrics::counter!(
            "portal_sign_in_total",
            "path" => self.path.label(),
            "outcome" => outcome
        )
        .increment(1);
        result
    }

    async fn try_sign_in(&mut self) -> Result<()> {
        // Landing page first so the portal can set its session cookie.
        let landing = self.http.get(self.url("")).send().await?;
        drain(landing).await;

        let auth_url = self.url(AUTH_PAGE);
        let response = self
            .send_authenticated(|http| http.post(&auth_url).form(&[("theAction", "ntlogin")]))
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                path = %self.path,
                identity = %self.credentials.identity,
                status = %status,
                "Portal rejected sign-in"
            );
            return Err(Error::InvalidCredentials(format!(
                "portal answered sign-in with {status}"
            )));
        }

        let body = response.text().await?;
        self.token = Some(scrape::extract_token(self.path, &body)?);
        info!(path = %self.path, identity = %self.credentials.identity, "Signed in to portal");
        Ok(())
    }

    /// GET a page under this sub-path. Non-success status is a scraping
    /// error; the body is returned as text.
    pub async fn get(&self, page: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = self.url(page);
        let response = self
            .send_authenticated(|http| http.get(&url).query(query))
            .await?;
        self.page_body(page, response).await
    }

    /// POST a form to a page under this sub-path.
    pub async fn post_form(&self, page: &str, form: &[(String, String)]) -> Result<String> {
        let url = self.url(page);
        let response = self
            .send_authenticated(|http| http.post(&url).form(form))
            .await?;
        self.page_body(page, response).await
    }

    async fn page_body(&self, page: &str, response: Response) -> Result<String> {
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Scraping(format!(
                "invalid HTTP status {status} from {}{page}",
                self.path.sub_path()
            )));
        }
        Ok(response.text().await?)
    }

    /// Send a request, answering an NTLM challenge if the portal issues one.
    ///
    /// `build` is called once per handshake leg since a request body cannot
    /// be replayed. The final response is returned whatever its status.
    async fn send_authenticated<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        let response = build(&self.http).send().await?;
        if response.status() != StatusCode::UNAUTHORIZED || !offers_ntlm(&response) {
            return Ok(response);
        }
        drain(response).await;

        debug!(path = %self.path, "Sending NTLM negotiate");
        let negotiate = ntlm::header_value(&ntlm::negotiate_message());
        let response = build(&self.http)
            .header(AUTHORIZATION, negotiate)
            .send()
            .await?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        let token = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(ntlm::challenge_token)
            .ok_or_else(|| Error::Scraping("portal sent no NTLM challenge".into()))?;
        drain(response).await;
        let challenge = ntlm::parse_challenge(&token)?;

        debug!(path = %self.path, "Answering NTLM challenge");
        let identity = Identity {
            domain: &self.domain,
            user: &self.credentials.identity,
            password: self.credentials.password.expose(),
        };
        let authenticate = ntlm::header_value(&ntlm::authenticate_message(&challenge, identity));
        Ok(build(&self.http)
            .header(AUTHORIZATION, authenticate)
            .send()
            .await?)
    }
}

fn offers_ntlm(response: &Response) -> bool {
    response
        .headers()
        .get_all(WWW_AUTHENTICATE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(ntlm::offers_ntlm)
}

/// Read a response to the end so its connection returns to the pool.
async fn drain(response: Response) {
    let _ = response.bytes().await;
}
