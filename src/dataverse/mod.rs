//! Dataverse access layer.
//!
//! This module is split into submodules for separation of concerns:
//! - `token` - OAuth client-credentials cache
//! - `query` - OData query string construction
//! - `model` - equipment record types
//! - `client` - CRUD calls against the equipment table

pub mod client;
pub mod model;
pub mod query;
pub mod token;

pub use client::RecordClient;
pub use model::{EquipmentPatch, EquipmentRecord, NewEquipment};
pub use query::EquipmentFilters;
pub use token::{AccessToken, TokenCache};

use thiserror::Error;

/// Errors from the Dataverse access layer.
#[derive(Debug, Error)]
pub enum DataverseError {
    /// The identity provider rejected the client-credentials exchange.
    #[error("authentication with the identity provider failed: {message}")]
    AuthenticationFailed { message: String },
    /// Dataverse answered with a non-success status.
    #[error("Dataverse request failed with status {status}: {body}")]
    RequestFailed { status: u16, body: String },
    /// The upstream service could not be reached (network error or timeout).
    #[error("Dataverse unreachable: {0}")]
    Unavailable(#[source] reqwest::Error),
    /// A response body did not match the expected shape.
    #[error("unexpected Dataverse response: {0}")]
    BadResponse(String),
}
