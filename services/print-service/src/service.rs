//! Print service composition
//!
//! Wires the portal client, the OAuth credential manager and the cloud print
//! gateway together behind the operations a web host exposes. Users are
//! identified by email; the portal only sees the part before the `@`.

use std::sync::Arc;

use cloud_auth::{FileCredentialStore, OAuthCredentialManager};
use cloud_print::{
    CloudPrintGateway, OfflineCloudPrint, PrintFile, PrintOptions, SubmissionOutcome,
};
use common::Secret;
use print_portal::{PortalSettings, PrintJob, PrintPortalClient, PrintPrice};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};

/// A queued job with its colour classification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueuedJob {
    #[serde(flatten)]
    pub job: PrintJob,
    pub color: bool,
}

/// Budget and release queue of one portal user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PortalStatus {
    pub queue: Vec<QueuedJob>,
    pub budget: f64,
}

/// Whether a user can print through the cloud provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudPrintStatus {
    pub have_cloud_print_permission: bool,
    /// `None` until the user has granted permission.
    pub is_printer_installed: Option<bool>,
    pub cloud_print_permission_url: String,
}

pub struct PrintService {
    portal: PortalSettings,
    prices: Vec<PrintPrice>,
    oauth: OAuthCredentialManager,
    gateway: CloudPrintGateway,
}

impl PrintService {
    pub fn new(
        portal: PortalSettings,
        prices: Vec<PrintPrice>,
        oauth: OAuthCredentialManager,
        gateway: CloudPrintGateway,
    ) -> Self {
        Self {
            portal,
            prices,
            oauth,
            gateway,
        }
    }

    /// Build every component from loaded configuration. Credentials are
    /// kept in the JSON file at `oauth.credentials_path`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let store = FileCredentialStore::load(config.oauth.credentials_path.clone()).await?;
        let oauth = OAuthCredentialManager::new(config.oauth.settings()?, Arc::new(store))?;

        let cloudprint = config.cloudprint.settings();
        let gateway = if config.cloudprint.offline {
            warn!(
                printer_id = %cloudprint.printer_id,
                "Cloud print offline: jobs are accepted locally and never printed"
            );
            let api = OfflineCloudPrint::with_printer(cloudprint.printer_id.clone());
            CloudPrintGateway::new(Arc::new(api), cloudprint.printer_id.clone(), cloudprint.poll)
        } else {
            CloudPrintGateway::http(&cloudprint)?
        };

        info!(
            portal = %config.portal.base_url,
            printer_id = %cloudprint.printer_id,
            "Print service ready"
        );
        Ok(Self::new(
            config.portal.settings(),
            config.print_prices.clone(),
            oauth,
            gateway,
        ))
    }

    /// Portal username for an email address: everything before the `@`.
    pub fn username(email: &str) -> &str {
        let email = email.trim();
        email.split_once('@').map_or(email, |(user, _)| user)
    }

    async fn portal_client(
        &self,
        email: &str,
        password: &Secret<String>,
    ) -> Result<PrintPortalClient> {
        Ok(PrintPortalClient::connect(&self.portal, Self::username(email), password.clone()).await?)
    }

    /// Check the user's portal credentials.
    pub async fn verify_login(&self, email: &str, password: &Secret<String>) -> Result<()> {
        self.portal_client(email, password).await?;
        Ok(())
    }

    /// Release queue, each job flagged as colour or not, plus the budget.
    pub async fn portal_status(
        &self,
        email: &str,
        password: &Secret<String>,
    ) -> Result<PortalStatus> {
        let mut client = self.portal_client(email, password).await?;
        let jobs = client.get_print_queue().await?;
        let budget = client.get_budget().await?;

        let queue = jobs
            .into_iter()
            .map(|job| QueuedJob {
                color: job.is_color(&self.prices),
                job,
            })
            .collect();
        Ok(PortalStatus { queue, budget })
    }

    /// Remove one job from the user's release queue.
    pub async fn delete_job(
        &self,
        email: &str,
        password: &Secret<String>,
        job_id: &str,
    ) -> Result<()> {
        if job_id.trim().is_empty() {
            return Err(Error::InvalidRequest("missing print job id".into()));
        }
        let mut client = self.portal_client(email, password).await?;
        client.delete_print_jobs(&[job_id]).await?;
        Ok(())
    }

    /// Permission state and the consent URL. The printer lookup only runs
    /// once the user has a token.
    pub async fn cloud_print_status(&self, email: &str) -> Result<CloudPrintStatus> {
        let cloud_print_permission_url = self.oauth.get_authentication_prompt_url(email)?;
        let token = self.oauth.get_token(email).await?;

        let is_printer_installed = match token.as_deref() {
            Some(token) => Some(self.gateway.has_target_printer(token).await?),
            None => None,
        };
        Ok(CloudPrintStatus {
            have_cloud_print_permission: token.is_some(),
            is_printer_installed,
            cloud_print_permission_url,
        })
    }

    /// Finish the consent flow from the provider's redirect URL.
    pub async fn complete_authorization(
        &self,
        email: &str,
        redirect_url: Option<&str>,
    ) -> Result<()> {
        let code = OAuthCredentialManager::get_code_from_url(redirect_url)?;
        self.oauth.authorize_user_by_code(&code, email).await?;
        Ok(())
    }

    /// Revoke and forget the user's cloud print grant.
    pub async fn revoke_cloud_print(&self, email: &str) -> Result<()> {
        Ok(self.oauth.delete_credentials(email, true).await?)
    }

    /// Send `file` to the campus printer on the user's behalf.
    pub async fn print(
        &self,
        email: &str,
        file: &PrintFile,
        options: &PrintOptions,
    ) -> Result<SubmissionOutcome> {
        if !file.is_supported() {
            return Err(Error::InvalidRequest(format!(
                "unsupported file type: {}",
                file.file_name()
            )));
        }
        if options.copies < 1 {
            return Err(Error::InvalidRequest(
                "cannot print fewer than 1 copy".into(),
            ));
        }

        let token = self
            .oauth
            .get_token(email)
            .await?
            .ok_or_else(|| Error::NotAuthorized(email.to_owned()))?;
        Ok(self.gateway.submit(&token, file, options).await?)
    }
}
