//! Provider stand-in for running without a cloud print account
//!
//! Accepts every submission and reports it `DONE` on the next history
//! listing, so a whole submit flow completes without network access.

use std::sync::Mutex;

use tracing::info;

use crate::api::{ApiFuture, CloudPrintApi, JobStatus, Printer};
use crate::error::ApiError;
use crate::file::PrintFile;
use crate::ticket::PrintTicket;

/// A job the offline provider accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OfflineJob {
    pub id: String,
    pub printer_id: String,
    pub file_name: String,
    pub ticket: String,
}

/// In-process `CloudPrintApi` with a configurable printer list.
pub struct OfflineCloudPrint {
    printers: Vec<String>,
    jobs: Mutex<Vec<OfflineJob>>,
}

impl OfflineCloudPrint {
    /// An account with `printer_id` installed.
    pub fn with_printer(printer_id: impl Into<String>) -> Self {
        Self {
            printers: vec![printer_id.into()],
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// An account with no printers installed.
    pub fn without_printer() -> Self {
        Self {
            printers: Vec::new(),
            jobs: Mutex::new(Vec::new()),
        }
    }

    /// Jobs accepted so far, oldest first.
    pub fn submitted(&self) -> Vec<OfflineJob> {
        self.lock_jobs().map(|jobs| jobs.clone()).unwrap_or_default()
    }

    fn lock_jobs(&self) -> Result<std::sync::MutexGuard<'_, Vec<OfflineJob>>, ApiError> {
        self.jobs
            .lock()
            .map_err(|_| ApiError::Transport("offline job list poisoned".into()))
    }
}

impl CloudPrintApi for OfflineCloudPrint {
    fn submit<'a>(
        &'a self,
        _token: &'a str,
        printer_id: &'a str,
        file: &'a PrintFile,
        ticket: &'a PrintTicket,
    ) -> ApiFuture<'a, String> {
        Box::pin(async move {
            let mut jobs = self.lock_jobs()?;
            let id = format!("offline-{}", jobs.len() + 1);
            jobs.push(OfflineJob {
                id: id.clone(),
                printer_id: printer_id.to_owned(),
                file_name: file.file_name().to_owned(),
                ticket: ticket.to_string(),
            });
            info!(job_id = %id, file = file.file_name(), "Accepted job offline");
            Ok(id)
        })
    }

    fn search<'a>(&'a self, _token: &'a str) -> ApiFuture<'a, Vec<Printer>> {
        Box::pin(async move {
            Ok(self
                .printers
                .iter()
                .map(|id| Printer {
                    id: id.clone(),
                    display_name: None,
                })
                .collect())
        })
    }

    fn jobs<'a>(&'a self, _token: &'a str) -> ApiFuture<'a, Vec<JobStatus>> {
        Box::pin(async move {
            let jobs = self.lock_jobs()?;
            Ok(jobs
                .iter()
                .map(|job| JobStatus {
                    id: job.id.clone(),
                    status: Some("DONE".into()),
                })
                .collect())
        })
    }
}
