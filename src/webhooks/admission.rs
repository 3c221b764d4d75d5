//! Admission entry points for VerticaAutoscaler.
//!
//! Create and update default the incoming object in place, then run the
//! validation policies. Delete is always allowed.

use kube::ResourceExt;
use tracing::debug;

use crate::crd::VerticaAutoscaler;
use crate::webhooks::defaulting::apply_defaults;
use crate::webhooks::policies::{ValidationContext, ValidationResult, validate_all};

/// Hooks invoked by the API server for each admission operation.
pub trait AdmissionHooks {
    fn on_create(&mut self) -> ValidationResult;
    fn on_update(&mut self, old: &Self) -> ValidationResult;
    fn on_delete(&self) -> ValidationResult;
}

impl AdmissionHooks for VerticaAutoscaler {
    fn on_create(&mut self) -> ValidationResult {
        debug!(name = %self.name_any(), "validate create");
        apply_defaults(self);
        validate_all(&ValidationContext::create(self))
    }

    fn on_update(&mut self, old: &Self) -> ValidationResult {
        debug!(name = %self.name_any(), "validate update");
        apply_defaults(self);
        validate_all(&ValidationContext::update(self, old))
    }

    fn on_delete(&self) -> ValidationResult {
        debug!(name = %self.name_any(), "validate delete");
        ValidationResult::allowed()
    }
}
