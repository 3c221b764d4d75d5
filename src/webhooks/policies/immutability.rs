//! Immutability validation policy.
//!
//! Tier 2 (Update): Only enforced on UPDATE operations
//!
//! Validates:
//! - verticaDBName and scalingGranularity cannot be changed after creation
//! - serviceName only changes together with the template's service name
//! - A custom autoscaler cannot be enabled or switched after creation
//! - Version changes follow the supported upgrade path

use super::{ValidationContext, versions};
use crate::webhooks::field::{FieldError, FieldPath};

/// Validate immutability constraints on UPDATE operations
pub fn validate(ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let Some(old) = ctx.old_resource else {
        return Vec::new(); // Not an UPDATE
    };
    let new = ctx.resource;
    let path = FieldPath::new("spec");
    let mut errors = Vec::new();

    if old.spec.vertica_db_name != new.spec.vertica_db_name {
        errors.push(FieldError::forbidden(
            path.child("verticaDBName"),
            "verticaDBName cannot change after creation",
        ));
    }

    if old.spec.scaling_granularity != new.spec.scaling_granularity {
        errors.push(FieldError::forbidden(
            path.child("scalingGranularity"),
            "scalingGranularity cannot change after creation",
        ));
    }

    if old.spec.service_name != new.spec.service_name
        && new.spec.template.service_name != new.spec.service_name
    {
        errors.push(FieldError::forbidden(
            path.child("serviceName"),
            "serviceName can only change when template.serviceName is changed to the same value",
        ));
    }

    let custom_path = path.child("customAutoscaler");
    match (old.is_custom_autoscaler_set(), new.is_custom_autoscaler_set()) {
        (false, true) => errors.push(FieldError::forbidden(
            custom_path,
            "customAutoscaler cannot be enabled after creation; recreate the VerticaAutoscaler to use a custom autoscaler",
        )),
        (true, true) => {
            let old_type = old.spec.custom_autoscaler.as_ref().map(|c| c.r#type.as_str());
            let new_type = new.spec.custom_autoscaler.as_ref().map(|c| c.r#type.as_str());
            if old_type != new_type {
                errors.push(FieldError::forbidden(
                    custom_path.child("type"),
                    "customAutoscaler.type cannot change after creation",
                ));
            }
        }
        // Disabling, or staying disabled, is always allowed
        _ => {}
    }

    errors.extend(versions::validate_upgrade_path(ctx));

    errors
}
