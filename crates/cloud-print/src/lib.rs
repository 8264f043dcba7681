//! Cloud print job submission
//!
//! Builds Cloud Job Tickets from print options, submits documents to the
//! campus printer through a [`CloudPrintApi`] and polls the job history
//! until the provider reports the job processed.

pub mod api;
pub mod constants;
mod error;
mod file;
mod gateway;
mod offline;
pub mod poll;
pub mod ticket;

pub use api::{CloudPrintApi, HttpCloudPrintApi, JobStatus, Printer};
pub use error::{ApiError, Error, Result};
pub use file::{PrintFile, SUPPORTED_EXTENSIONS};
pub use gateway::{CloudPrintGateway, CloudPrintSettings, SubmissionOutcome};
pub use offline::{OfflineCloudPrint, OfflineJob};
pub use poll::{JobState, JobSubmissionAttempt, PollPolicy};
pub use ticket::{PrintOptions, PrintTicket, build_ticket};
