//! KEDA pause annotation policy.
//!
//! Tier 1 (Critical): Always enforced
//!
//! Validates:
//! - `autoscaling.keda.sh/paused` is a boolean literal
//! - `autoscaling.keda.sh/paused-replicas` is a non-negative integer
//! - The two annotations are not set together

use super::ValidationContext;
use crate::webhooks::field::{FieldError, FieldPath};

/// Pauses autoscaling at the current replica count.
pub const PAUSED_ANNOTATION: &str = "autoscaling.keda.sh/paused";
/// Pauses autoscaling after scaling to the given replica count.
pub const PAUSED_REPLICAS_ANNOTATION: &str = "autoscaling.keda.sh/paused-replicas";

pub fn validate(ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let path = FieldPath::new("metadata").child("annotations");
    let paused = ctx.annotation(PAUSED_ANNOTATION);
    let paused_replicas = ctx.annotation(PAUSED_REPLICAS_ANNOTATION);
    let mut errors = Vec::new();

    if let Some(value) = paused
        && !matches!(value, "true" | "false")
    {
        errors.push(FieldError::invalid(
            path.key(PAUSED_ANNOTATION),
            value,
            "must be 'true' or 'false'",
        ));
    }

    if let Some(value) = paused_replicas
        && !value.parse::<i32>().is_ok_and(|replicas| replicas >= 0)
    {
        errors.push(FieldError::invalid(
            path.key(PAUSED_REPLICAS_ANNOTATION),
            value,
            "must be a non-negative integer",
        ));
    }

    if paused.is_some() && paused_replicas.is_some() {
        errors.push(FieldError::forbidden(
            path.key(PAUSED_REPLICAS_ANNOTATION),
            format!(
                "{PAUSED_ANNOTATION} and {PAUSED_REPLICAS_ANNOTATION} are mutually exclusive; set only one of them"
            ),
        ));
    }

    errors
}
