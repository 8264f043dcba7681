//! Campus web printing service
//!
//! Composes the print portal client, the cloud print credential manager and
//! the cloud print gateway into the operations a web front end calls:
//! portal status and job deletion, cloud print permission status and
//! consent, and document submission.

pub mod config;
mod error;
pub mod metrics;
mod service;

pub use config::Config;
pub use error::{Error, Result};
pub use service::{CloudPrintStatus, PortalStatus, PrintService, QueuedJob};
