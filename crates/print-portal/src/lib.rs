//! Client for the uniFLOW print accounting portal
//!
//! Signs in with NTLM and scrapes the portal's server-rendered pages for the
//! user's print budget and release queue.

mod client;
pub mod constants;
mod error;
mod job;
pub mod ntlm;
pub mod scrape;
mod session;

pub use client::PrintPortalClient;
pub use error::{Error, Result};
pub use job::{PrintJob, PrintPrice, default_print_prices};
pub use session::{Credentials, PortalPath, PortalSettings, ScrapingSession};
