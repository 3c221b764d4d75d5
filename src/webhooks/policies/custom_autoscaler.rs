//! Custom autoscaler selection and replica bounds policy.
//!
//! Tier 1 (Critical): Always enforced
//!
//! Validates:
//! - customAutoscaler.type is HPA, ScaledObject or empty
//! - The payload named by the type is present
//! - maxReplicas is set and not below minReplicas

use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscalerBehavior;

use super::ValidationContext;
use crate::crd::{CustomAutoscaler, CustomAutoscalerError};
use crate::webhooks::field::{FieldError, FieldPath};

pub fn validate(ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let Some(custom) = ctx.resource.spec.custom_autoscaler.as_ref() else {
        return Vec::new();
    };
    let path = FieldPath::new("spec").child("customAutoscaler");

    match custom.resolve() {
        Ok(CustomAutoscaler::Disabled) => Vec::new(),
        Ok(CustomAutoscaler::Hpa(hpa)) => {
            validate_replica_bounds(&path.child("hpa"), hpa.min_replicas, Some(hpa.max_replicas))
        }
        Ok(CustomAutoscaler::ScaledObject(scaled_object)) => validate_replica_bounds(
            &path.child("scaledObject"),
            scaled_object.min_replicas,
            scaled_object.max_replicas,
        ),
        Err(err @ CustomAutoscalerError::UnknownType(_)) => vec![FieldError::invalid(
            path.child("type"),
            &custom.r#type,
            err.to_string(),
        )],
        Err(err @ CustomAutoscalerError::MissingHpa) => {
            vec![FieldError::required(path.child("hpa"), err.to_string())]
        }
        Err(err @ CustomAutoscalerError::MissingScaledObject) => {
            vec![FieldError::required(path.child("scaledObject"), err.to_string())]
        }
    }
}

/// A zero maxReplicas is how an omitted value arrives, so it reads as unset.
fn validate_replica_bounds(
    path: &FieldPath,
    min_replicas: Option<i32>,
    max_replicas: Option<i32>,
) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if let Some(min) = min_replicas
        && min < 0
    {
        errors.push(FieldError::invalid(
            path.child("minReplicas"),
            min,
            "minReplicas cannot be negative",
        ));
    }

    match max_replicas {
        None | Some(0) => errors.push(FieldError::required(
            path.child("maxReplicas"),
            "maxReplicas must be set",
        )),
        Some(max) if max < 0 => errors.push(FieldError::invalid(
            path.child("maxReplicas"),
            max,
            "maxReplicas must be at least 1",
        )),
        Some(max) => {
            if let Some(min) = min_replicas
                && max < min
            {
                errors.push(FieldError::invalid(
                    path.child("maxReplicas"),
                    max,
                    format!("{max} cannot be less than minReplicas {min}"),
                ));
            }
        }
    }

    errors
}

/// With a scale-in threshold the autoscaler decides when to shrink, so the
/// scale-down stabilization window must stay at 0.
pub(super) fn validate_scale_down_window(
    path: &FieldPath,
    behavior: Option<&HorizontalPodAutoscalerBehavior>,
) -> Option<FieldError> {
    let window = behavior?.scale_down.as_ref()?.stabilization_window_seconds?;
    (window != 0).then(|| {
        FieldError::invalid(
            path.child("behavior")
                .child("scaleDown")
                .child("stabilizationWindowSeconds"),
            window,
            "When scaleInThreshold is set, the scale-down stabilization window must be 0",
        )
    })
}
