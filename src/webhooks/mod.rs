//! Webhook module for defaulting and validating admission requests.
//!
//! This module provides the mutating and validating webhooks for
//! VerticaAutoscaler, with tiered validation policies:
//! - Tier 1 (Critical): Always enforced (structure and cross-field rules)
//! - Tier 2 (Update): Only on UPDATE operations (immutability)

mod admission;
pub mod defaulting;
mod error;
pub mod field;
pub mod policies;
mod server;

pub use admission::AdmissionHooks;
pub use defaulting::apply_defaults;
pub use error::{AdmissionError, WebhookError};
pub use field::{ErrorKind, FieldError, FieldPath};
pub use policies::{ValidationContext, ValidationResult, Warnings, validate_all};
pub use server::{
    MUTATE_PATH, VALIDATE_PATH, WebhookState, create_webhook_router, defaulting_patch,
    run_webhook_server,
};

// Re-export kube-rs admission types for contract testing
pub use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
