//! Scaling granularity and subcluster template policy.
//!
//! Tier 1 (Critical): Always enforced
//!
//! Validates:
//! - scalingGranularity is Pod or Subcluster, and Pod names a service
//! - The template is not used with Pod granularity
//! - Template and parent service names agree
//! - Service and subcluster names are valid DNS labels

use std::sync::LazyLock;

use regex::Regex;

use super::ValidationContext;
use crate::crd::ScalingGranularity;
use crate::webhooks::field::{FieldError, FieldPath};

/// DNS-1123 label: service and subcluster names end up in object names.
static OBJECT_NAME_REGEX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?$").ok());

const OBJECT_NAME_MESSAGE: &str = "must consist of lower case alphanumeric characters or '-', \
     start and end with an alphanumeric character, and be at most 63 characters";

pub fn is_valid_object_name(name: &str) -> bool {
    OBJECT_NAME_REGEX
        .as_ref()
        .is_some_and(|regex| regex.is_match(name))
}

/// Subcluster names may use `_`; objects derived from them use `-` instead.
pub fn subcluster_object_name(name: &str) -> String {
    name.replace('_', "-")
}

/// Validate granularity and template constraints
pub fn validate(ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let vas = ctx.resource;
    let spec = &vas.spec;
    let path = FieldPath::new("spec");
    let template_path = path.child("template");
    let mut errors = Vec::new();

    let granularity = spec.scaling_granularity.parse::<ScalingGranularity>().ok();
    match granularity {
        Some(ScalingGranularity::Pod) if spec.service_name.is_empty() => {
            errors.push(FieldError::invalid(
                path.child("scalingGranularity"),
                &spec.scaling_granularity,
                "scalingGranularity must be Subcluster when serviceName is empty",
            ));
        }
        Some(_) => {}
        None => errors.push(FieldError::invalid(
            path.child("scalingGranularity"),
            &spec.scaling_granularity,
            "scalingGranularity must be set to either Subcluster or Pod",
        )),
    }

    if vas.can_use_template() {
        if granularity == Some(ScalingGranularity::Pod) {
            errors.push(FieldError::invalid(
                template_path.child("size"),
                spec.template.size,
                "You cannot use the template if scalingGranularity is Pod. \
                 Set the template size to 0 to disable the template",
            ));
        }

        let template_service = &spec.template.service_name;
        if !spec.service_name.is_empty()
            && !template_service.is_empty()
            && *template_service != spec.service_name
        {
            errors.push(FieldError::invalid(
                template_path.child("serviceName"),
                template_service,
                "The serviceName in the subcluster template must match spec.serviceName",
            ));
        }
    }

    for (field_path, name) in [
        (path.child("serviceName"), &spec.service_name),
        (template_path.child("serviceName"), &spec.template.service_name),
    ] {
        if !name.is_empty() && !is_valid_object_name(name) {
            errors.push(FieldError::invalid(field_path, name, OBJECT_NAME_MESSAGE));
        }
    }

    let template_name = &spec.template.name;
    if !template_name.is_empty() && !is_valid_object_name(&subcluster_object_name(template_name)) {
        errors.push(FieldError::invalid(
            template_path.child("name"),
            template_name,
            OBJECT_NAME_MESSAGE,
        ));
    }

    errors
}
