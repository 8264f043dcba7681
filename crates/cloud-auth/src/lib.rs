//! OAuth2 credential management for the cloud print provider
//!
//! Builds the consent URL, exchanges authorization codes, refreshes expired
//! access tokens and revokes grants. Records live behind the
//! [`CredentialStore`] trait so the host decides where they are kept.

pub mod authorize;
pub mod constants;
pub mod credentials;
pub mod error;
mod manager;
pub mod token;

pub use credentials::{
    CredentialRecord, CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
pub use error::{Error, Result};
pub use manager::{OAuthCredentialManager, OAuthSettings};
pub use token::TokenResponse;
