//! ScaledObject trigger policy.
//!
//! Tier 1 (Critical): Always enforced
//!
//! Validates:
//! - Trigger types and the metric types each one accepts
//! - Prometheus and cpu/memory triggers carry their settings block
//! - Prometheus authentication modes
//! - Trigger names are unique
//! - The scale-down window is 0 when a scale-in threshold is set

use std::collections::HashSet;

use super::ValidationContext;
use super::custom_autoscaler::validate_scale_down_window;
use crate::crd::{
    CustomAutoscaler, MetricTargetType, PrometheusAuthMode, ScaleTrigger, TriggerType,
};
use crate::webhooks::field::{FieldError, FieldPath};

pub fn validate(ctx: &ValidationContext<'_>) -> Vec<FieldError> {
    let Ok(CustomAutoscaler::ScaledObject(scaled_object)) = ctx.resource.custom_autoscaler() else {
        return Vec::new();
    };
    let path = FieldPath::new("spec")
        .child("customAutoscaler")
        .child("scaledObject");
    let metrics_path = path.child("metrics");
    let mut errors = Vec::new();

    for (i, trigger) in scaled_object.metrics.iter().enumerate() {
        errors.extend(validate_trigger(&metrics_path.index(i), trigger));
    }

    if let Some(err) = find_duplicate_name(&metrics_path, &scaled_object.metrics) {
        errors.push(err);
    }

    if scaled_object.has_scale_in_threshold()
        && let Some(err) = validate_scale_down_window(&path, scaled_object.behavior.as_ref())
    {
        errors.push(err);
    }

    errors
}

fn validate_trigger(path: &FieldPath, trigger: &ScaleTrigger) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let trigger_type = match trigger.trigger_type() {
        Ok(trigger_type) => trigger_type,
        Err(_) => {
            errors.push(FieldError::invalid(
                path.child("type"),
                &trigger.r#type,
                "Type must be one of 'cpu', 'memory', 'prometheus' or empty.",
            ));
            return errors;
        }
    };

    let allowed = trigger_type.allowed_metric_types();
    let metric_type_ok = trigger
        .metric_type
        .parse::<MetricTargetType>()
        .is_ok_and(|metric_type| allowed.contains(&metric_type));
    if !metric_type_ok {
        errors.push(FieldError::invalid(
            path.child("metricType"),
            &trigger.metric_type,
            format!(
                "When type is set to {trigger_type}, metricType must be one of {}.",
                quote_all(allowed)
            ),
        ));
    }

    match trigger_type {
        TriggerType::Prometheus => match &trigger.prometheus {
            None => errors.push(FieldError::required(
                path.child("prometheus"),
                "prometheus must be set when type is prometheus",
            )),
            Some(prometheus) => {
                let prometheus_path = path.child("prometheus");
                let auth_path = prometheus_path.child("authModes");
                if prometheus.auth_modes.is_empty() {
                    if !trigger.auth_secret.is_empty() {
                        errors.push(FieldError::required(
                            auth_path,
                            "authModes must be set when authSecret is set",
                        ));
                    }
                } else if prometheus.auth_modes.parse::<PrometheusAuthMode>().is_err() {
                    errors.push(FieldError::not_supported(
                        auth_path,
                        &prometheus.auth_modes,
                        &PrometheusAuthMode::ALL,
                    ));
                }

                if prometheus.scale_in_threshold > prometheus.threshold {
                    errors.push(FieldError::invalid(
                        prometheus_path.child("scaleInThreshold"),
                        prometheus.scale_in_threshold,
                        format!(
                            "scaleInThreshold cannot be greater than threshold {}",
                            prometheus.threshold
                        ),
                    ));
                }
            }
        },
        TriggerType::Cpu | TriggerType::Memory => {
            if trigger.resource.is_none() {
                errors.push(FieldError::required(
                    path.child("resource"),
                    format!("resource must be set when type is {trigger_type}"),
                ));
            }
        }
    }

    errors
}

/// Report the first trigger whose non-empty name was already used.
fn find_duplicate_name(path: &FieldPath, triggers: &[ScaleTrigger]) -> Option<FieldError> {
    let mut seen = HashSet::new();
    triggers
        .iter()
        .enumerate()
        .filter(|(_, trigger)| !trigger.name.is_empty())
        .find(|(_, trigger)| !seen.insert(trigger.name.as_str()))
        .map(|(i, trigger)| {
            FieldError::duplicate(
                path.index(i).child("name"),
                &trigger.name,
                "trigger names must be unique",
            )
        })
}

fn quote_all(values: &[MetricTargetType]) -> String {
    values
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(", ")
}
