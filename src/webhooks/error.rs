//! Error types for admission handling and the webhook server.

use thiserror::Error;

use super::field::{FieldError, format_errors};

/// Rejection of an admission request, aggregating every field violation.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("{kind}.{group} \"{name}\" is invalid: {}", format_errors(.errors))]
    Invalid {
        kind: &'static str,
        group: &'static str,
        name: String,
        errors: Vec<FieldError>,
    },
}

impl AdmissionError {
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            AdmissionError::Invalid { errors, .. } => errors,
        }
    }
}

/// Errors that can occur when running the webhook server
#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    #[error("Webhook server error: {0}")]
    Server(String),
}
