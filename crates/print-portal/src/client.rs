//! Budget, queue and deletion operations against the print portal

use common::Secret;
use tracing::{debug, info};

use crate::constants::{PRINT_BUDGET_PAGE, PRINT_QUEUE_PAGE};
use crate::error::Result;
use crate::job::PrintJob;
use crate::scrape;
use crate::session::{Credentials, PortalPath, PortalSettings, ScrapingSession};

/// Signed-in client for one portal user.
///
/// Tokens are never reused across operations: every operation signs in
/// again on its sub-path before touching the portal.
pub struct PrintPortalClient {
    identity: String,
    budget: ScrapingSession,
    queue: ScrapingSession,
}

impl PrintPortalClient {
    /// Verify the credentials by signing in on both sub-paths.
    ///
    /// A blank identity fails before any request is made.
    pub async fn connect(
        settings: &PortalSettings,
        identity: &str,
        password: impl Into<Secret<String>>,
    ) -> Result<Self> {
        let credentials = Credentials::new(identity, password)?;
        let mut budget = ScrapingSession::new(PortalPath::Budget, settings, credentials.clone())?;
        let mut queue = ScrapingSession::new(PortalPath::Queue, settings, credentials)?;

        budget.sign_in().await?;
        queue.sign_in().await?;

        info!(identity = %identity, "Portal credentials verified");
        Ok(Self {
            identity: identity.to_owned(),
            budget,
            queue,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Fresh sign-in before an operation so the token is always current.
    async fn ensure_authenticated(session: &mut ScrapingSession) -> Result<&ScrapingSession> {
        session.sign_in().await?;
        Ok(session)
    }

    /// Remaining print budget.
    pub async fn get_budget(&mut self) -> Result<f64> {
        let session = Self::ensure_authenticated(&mut self.budget).await?;
        let token = session.token()?;
        let body = session
            .get(
                PRINT_BUDGET_PAGE,
                &[("mmtype", "budget"), ("smtype", ""), ("token", token)],
            )
            .await?;
        let budget = scrape::parse_budget(&body)?;
        debug!(identity = %self.identity, budget, "Fetched budget");
        Ok(budget)
    }

    /// Jobs waiting in the release queue, in page order.
    pub async fn get_print_queue(&mut self) -> Result<Vec<PrintJob>> {
        let session = Self::ensure_authenticated(&mut self.queue).await?;
        let token = session.token()?;
        let body = session
            .get(
                PRINT_QUEUE_PAGE,
                &[("mmtype", "login"), ("smtype", ""), ("token", token)],
            )
            .await?;
        let jobs = scrape::parse_queue(&body)?;
        debug!(identity = %self.identity, jobs = jobs.len(), "Fetched print queue");
        Ok(jobs)
    }

    /// Remove jobs from the release queue.
    pub async fn delete_print_jobs<S: AsRef<str>>(&mut self, job_ids: &[S]) -> Result<()> {
        let session = Self::ensure_authenticated(&mut self.queue).await?;
        let form = deletion_form(session.token()?, job_ids);
        session.post_form(PRINT_QUEUE_PAGE, &form).await?;
        info!(identity = %self.identity, jobs = job_ids.len(), "Deleted print jobs");
        Ok(())
    }
}

fn deletion_form<S: AsRef<str>>(token: &str, job_ids: &[S]) -> Vec<(String, String)> {
    let mut form: Vec<(String, String)> = [
        ("theaction", "search"),
        ("mmtype", "login"),
        ("smtype", ""),
        ("theItems", "selected"),
        ("Action_IncReleaseQueue", "Delete"),
        ("token", token),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_owned(), value.to_owned()))
    .collect();
    form.extend(
        job_ids
            .iter()
            .map(|id| (id.as_ref().to_owned(), "yes".to_owned())),
    );
    form
}
