//! Error types
//!
//! Every failure surfaced by the provider core maps to one [`ProviderError`]
//! variant. Configuration and validation errors are raised locally before any
//! network access; the remaining variants come from the wrapped services.

use std::time::Duration;
use thiserror::Error;

/// Message returned when a lookup matches nothing.
pub const NO_RESULTS_MESSAGE: &str =
    "your query returned no results. please change your search criteria and try again";

/// Message returned when a lookup matches more than one entity.
pub const MULTIPLE_RESULTS_MESSAGE: &str =
    "your query returned more than one result. please try a more specific search criteria";

/// Errors produced by the provider core.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Bad or incomplete provider configuration.
    #[error("{0}")]
    Config(String),

    /// The identity service rejected the credentials or the requested scope.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The service catalog has no entry for the requested service and region.
    #[error("endpoint for service '{service_type}' in region '{region}' not found in catalog")]
    EndpointNotFound {
        service_type: String,
        region: String,
    },

    /// A lookup matched no entity.
    #[error("{}", NO_RESULTS_MESSAGE)]
    NoResults,

    /// A lookup matched more than one entity.
    #[error("{}", MULTIPLE_RESULTS_MESSAGE)]
    MultipleResults,

    /// A declared structure failed local validation.
    #[error("{0}")]
    Validation(String),

    /// A service answered with a non-success status.
    #[error("API request failed: {status} - {message}")]
    Api { status: u16, message: String },

    /// The request could not be sent or its body could not be read.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A response was well-formed JSON but not the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The operation did not complete before its deadline.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
}

impl ProviderError {
    /// True for errors raised before any network call was attempted.
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Validation(_))
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Convenience alias used across the crate.
pub type Result<T, E = ProviderError> = std::result::Result<T, E>;
