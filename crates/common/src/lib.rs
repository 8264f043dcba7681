//! Shared building blocks for the print service crates

mod error;
pub mod logging;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
