//! HorizontalPodAutoscaler metric policy.
//!
//! Tier 1 (Critical): Always enforced
//!
//! Validates:
//! - Each metric's source block matches its type and names a metric
//! - A scale-in threshold has the same target type as its metric
//! - The scale-down window is 0 when a scale-in threshold is set

use k8s_openapi::api::autoscaling::v2::{MetricSpec, MetricTarget};

use super::ValidationContext;
use super::custom_autoscaler::validate_scale_down_window;
use crate::crd::CustomAutoscaler;
use crate::webhooks::field::{FieldError, FieldPath};

const METRIC_SOURCE_TYPES: [&str; 5] = ["ContainerResource", "External", "Object", "Pods", "Resource"];

const METRIC_NAME: &[&str] = &["metric", "name"];
const SOURCE_NAME: &[&str] = &["name"];

pub fn validate(ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let Ok(CustomAutoscaler::Hpa(hpa)) = ctx.resource.custom_autoscaler() else {
        return Vec::new();
    };
    let path = FieldPath::new("spec").child("customAutoscaler").child("hpa");
    let mut errors = Vec::new();

    for (i, definition) in hpa.metrics.iter().enumerate() {
        let metric_path = path.child("metrics").index(i);
        let target = match metric_target(&metric_path.child("metric"), &definition.metric) {
            Ok(target) => Some(target),
            Err(err) => {
                errors.push(err);
                None
            }
        };

        if let (Some(threshold), Some(target)) = (&definition.scale_in_threshold, target)
            && threshold.type_ != target.type_
        {
            errors.push(FieldError::invalid(
                metric_path.child("scaleInThreshold").child("type"),
                &threshold.type_,
                format!(
                    "scaleInThreshold type must match the metric target type '{}'",
                    target.type_
                ),
            ));
        }
    }

    if hpa.has_scale_in_threshold()
        && let Some(err) = validate_scale_down_window(&path, hpa.behavior.as_ref())
    {
        errors.push(err);
    }

    errors
}

/// Find the target of a metric through the source block its type selects.
fn metric_target<'a>(path: &FieldPath, metric: &'a MetricSpec) -> Result<&'a MetricTarget, FieldError> {
    // (source field, path of the metric name under it, (name, target))
    let (field, name_path, source) = match metric.type_.as_str() {
        "Pods" => (
            "pods",
            METRIC_NAME,
            metric.pods.as_ref().map(|s| (&s.metric.name, &s.target)),
        ),
        "Object" => (
            "object",
            METRIC_NAME,
            metric.object.as_ref().map(|s| (&s.metric.name, &s.target)),
        ),
        "External" => (
            "external",
            METRIC_NAME,
            metric.external.as_ref().map(|s| (&s.metric.name, &s.target)),
        ),
        "ContainerResource" => (
            "containerResource",
            SOURCE_NAME,
            metric
                .container_resource
                .as_ref()
                .map(|s| (&s.name, &s.target)),
        ),
        "Resource" => (
            "resource",
            SOURCE_NAME,
            metric.resource.as_ref().map(|s| (&s.name, &s.target)),
        ),
        other => {
            return Err(FieldError::not_supported(
                path.child("type"),
                other,
                &METRIC_SOURCE_TYPES,
            ));
        }
    };

    let source_path = path.child(field);
    let Some((name, target)) = source else {
        return Err(FieldError::required(
            source_path,
            format!("{field} must be set when type is {}", metric.type_),
        ));
    };

    if name.is_empty() {
        let name_path = name_path
            .iter()
            .fold(source_path, |path, segment| path.child(segment));
        return Err(FieldError::required(
            name_path,
            format!("metric name must be set for {} metrics", metric.type_),
        ));
    }

    Ok(target)
}
