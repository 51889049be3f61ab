//! Error type for identity platform calls.
//!
//! Every failure reported by the platform keeps its HTTP status so callers
//! can tell a missing resource (404) apart from any other failure.

use thiserror::Error;

/// Platform error code for a resource that does not exist.
pub const NOT_FOUND_CODE: &str = "E0000007";
/// Platform error code for a rejected request body or state.
pub const VALIDATION_CODE: &str = "E0000001";
/// Platform error code for an internal server failure.
pub const INTERNAL_CODE: &str = "E0000009";

/// Errors returned by a [`GroupRuleClient`](super::GroupRuleClient).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("API error {status} ({code}): {summary}")]
    Api {
        /// HTTP status of the response
        status: u16,
        /// Platform error code
        code: String,
        /// Human readable error summary
        summary: String,
    },

    #[error("Transport error: {message}")]
    Transport {
        /// Description of the connection failure
        message: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ClientError {
    /// A 404 for the given kind of resource.
    pub fn not_found(resource_type: &str, id: &str) -> Self {
        ClientError::Api {
            status: 404,
            code: NOT_FOUND_CODE.to_string(),
            summary: format!("Not found: Resource not found: {} ({})", id, resource_type),
        }
    }

    /// A 400 rejecting the request.
    pub fn bad_request(summary: impl Into<String>) -> Self {
        ClientError::Api {
            status: 400,
            code: VALIDATION_CODE.to_string(),
            summary: summary.into(),
        }
    }

    /// A 500 from the platform.
    pub fn internal(summary: impl Into<String>) -> Self {
        ClientError::Api {
            status: 500,
            code: INTERNAL_CODE.to_string(),
            summary: summary.into(),
        }
    }

    /// HTTP status, if the platform answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
