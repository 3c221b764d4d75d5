//! Validation policies for VerticaAutoscaler admission webhooks.
//!
//! Policies are organized into tiers:
//! - Tier 1 (Critical): Always enforced (granularity, custom autoscaler,
//!   triggers, HPA metrics, pause annotations)
//! - Tier 2 (Update): Only enforced on UPDATE operations (immutability and
//!   the version upgrade path)
//!
//! Every policy runs; violations are aggregated so a single rejection lists
//! everything wrong with the object.

pub mod annotations;
pub mod custom_autoscaler;
pub mod granularity;
pub mod hpa_metrics;
pub mod immutability;
pub mod triggers;
pub mod versions;

use kube::Resource;

use crate::crd::VerticaAutoscaler;
use crate::webhooks::error::AdmissionError;
use crate::webhooks::field::FieldError;

/// Non-fatal messages returned to the client alongside an admission decision.
pub type Warnings = Vec<String>;

/// Result of a validation check
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub warnings: Warnings,
    pub errors: Vec<FieldError>,
}

impl ValidationResult {
    /// Create an allowed result
    pub fn allowed() -> Self {
        Self::default()
    }

    pub fn is_allowed(&self) -> bool {
        self.errors.is_empty()
    }

    /// Turn the result into an admission decision for the named object.
    pub fn into_result(self, name: &str) -> Result<Warnings, AdmissionError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        Err(AdmissionError::Invalid {
            kind: "VerticaAutoscaler",
            group: "vertica.com",
            name: name.to_string(),
            errors: self.errors,
        })
    }
}

/// Context for validation
pub struct ValidationContext<'a> {
    /// The resource being validated
    pub resource: &'a VerticaAutoscaler,
    /// The old resource (for UPDATE operations)
    pub old_resource: Option<&'a VerticaAutoscaler>,
}

impl<'a> ValidationContext<'a> {
    pub fn create(resource: &'a VerticaAutoscaler) -> Self {
        Self {
            resource,
            old_resource: None,
        }
    }

    pub fn update(resource: &'a VerticaAutoscaler, old: &'a VerticaAutoscaler) -> Self {
        Self {
            resource,
            old_resource: Some(old),
        }
    }

    /// Check if this is an UPDATE operation
    pub fn is_update(&self) -> bool {
        self.old_resource.is_some()
    }

    pub fn annotation(&self, key: &str) -> Option<&'a str> {
        self.resource
            .meta()
            .annotations
            .as_ref()?
            .get(key)
            .map(String::as_str)
    }
}

/// Run all validation policies
pub fn validate_all(ctx: &ValidationContext<'_>) -> ValidationResult {
    let mut errors = Vec::new();

    // Tier 1: Critical validations (always enforced)
    errors.extend(granularity::validate(ctx));
    errors.extend(custom_autoscaler::validate(ctx));
    errors.extend(triggers::validate(ctx));
    errors.extend(hpa_metrics::validate(ctx));
    errors.extend(annotations::validate(ctx));

    // Tier 2: Update validations (only for UPDATE operations)
    if ctx.is_update() {
        errors.extend(immutability::validate(ctx));
    }

    ValidationResult {
        warnings: versions::warnings(ctx),
        errors,
    }
}
