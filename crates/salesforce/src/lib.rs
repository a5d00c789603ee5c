//! Salesforce REST transport for the sync engine.
//!
//! [`SalesforceClient`] implements [`sfsync_core::remote::SalesforceApiTrait`]
//! on top of `reqwest`, with OAuth refresh handled by [`TokenManager`] and
//! describe results cached per object.

pub mod auth;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;

pub use auth::{AuthState, TokenManager, TokenResponse};
pub use client::{RestResponse, SalesforceClient};
pub use config::SalesforceConfig;
pub use error::{Result, SalesforceError};
