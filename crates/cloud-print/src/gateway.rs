//! Job submission and printer discovery against the cloud print provider

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::api::{CloudPrintApi, HttpCloudPrintApi};
use crate::constants::{DEFAULT_BASE_URL, DEFAULT_PRINTER_ID, DEFAULT_TIMEOUT_SECS};
use crate::error::{ApiError, Error, Result};
use crate::file::PrintFile;
use crate::poll::{JobState, JobSubmissionAttempt, PollPolicy};
use crate::ticket::{PrintOptions, build_ticket};

/// Connection and polling settings for the provider.
#[derive(Debug, Clone)]
pub struct CloudPrintSettings {
    pub base_url: String,
    /// Printer every job is sent to.
    pub printer_id: String,
    pub timeout: Duration,
    pub poll: PollPolicy,
}

impl Default for CloudPrintSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            printer_id: DEFAULT_PRINTER_ID.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll: PollPolicy::default(),
        }
    }
}

/// Result of a submission that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub job_id: String,
    /// `Done`, or `Timeout` when the job never showed up as finished.
    pub state: JobState,
}

impl SubmissionOutcome {
    pub fn is_confirmed(&self) -> bool {
        self.state == JobState::Done
    }
}

/// Sends print jobs to the configured printer and confirms completion.
pub struct CloudPrintGateway {
    api: Arc<dyn CloudPrintApi>,
    printer_id: String,
    poll: PollPolicy,
}

impl CloudPrintGateway {
    pub fn new(
        api: Arc<dyn CloudPrintApi>,
        printer_id: impl Into<String>,
        poll: PollPolicy,
    ) -> Self {
        Self {
            api,
            printer_id: printer_id.into(),
            poll,
        }
    }

    /// Gateway talking to the provider over HTTPS.
    pub fn http(settings: &CloudPrintSettings) -> Result<Self> {
        let api = HttpCloudPrintApi::new(&settings.base_url, settings.timeout).map_err(Error::Api)?;
        Ok(Self::new(Arc::new(api), settings.printer_id.clone(), settings.poll))
    }

    pub fn printer_id(&self) -> &str {
        &self.printer_id
    }

    /// Submit `file` with `options` and wait for the provider to process it.
    ///
    /// A job that is still unconfirmed after the last poll is returned with
    /// `JobState::Timeout` rather than as an error.
    pub async fn submit(
        &self,
        token: &str,
        file: &PrintFile,
        options: &PrintOptions,
    ) -> Result<SubmissionOutcome> {
        let ticket = build_ticket(options);
        let job_id = self
            .api
            .submit(token, &self.printer_id, file, &ticket)
            .await
            .map_err(|err| {
                record_job("rejected");
                warn!(file = file.file_name(), error = %err, "Print job submission failed");
                Error::JobSubmission(err)
            })?;
        info!(job_id = %job_id, file = file.file_name(), "Submitted print job");

        let state = self.await_completion(token, &job_id).await.inspect_err(|err| {
            record_job("error");
            warn!(job_id = %job_id, error = %err, "Print job failed");
        })?;

        match state {
            JobState::Done => {
                record_job("done");
                info!(job_id = %job_id, "Print job processed");
            }
            _ => {
                record_job("timeout");
                warn!(job_id = %job_id, "Print job not confirmed before polling gave up");
            }
        }
        Ok(SubmissionOutcome { job_id, state })
    }

    async fn await_completion(&self, token: &str, job_id: &str) -> Result<JobState> {
        tokio::time::sleep(self.poll.initial_delay).await;

        let mut attempt = JobSubmissionAttempt::new(job_id, self.poll.attempts);
        while attempt.state() == JobState::Pending {
            tokio::time::sleep(self.poll.interval).await;
            metrics::counter!("cloudprint_poll_attempts_total").increment(1);
            let history = self.api.jobs(token).await.map_err(Error::JobSubmission)?;
            let state = attempt.observe(&history);
            debug!(job_id, ?state, remaining = attempt.attempts_remaining(), "Polled job history");
        }

        match attempt.state() {
            JobState::Error => Err(Error::JobSubmission(ApiError::JobFailed(format!(
                "provider could not process job {job_id}"
            )))),
            state => Ok(state),
        }
    }

    /// Whether the configured printer is installed on the account.
    pub async fn has_target_printer(&self, token: &str) -> Result<bool> {
        let printers = self.api.search(token).await.map_err(Error::Api)?;
        Ok(printers.iter().any(|printer| printer.id == self.printer_id))
    }
}

fn record_job(outcome: &'static str) {
    metrics::counter!("cloudprint_jobs_total", "outcome" => outcome).increment(1);
}
