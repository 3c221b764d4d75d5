//! Defaults applied to a VerticaAutoscaler before it is validated.
//!
//! Defaulting only fills in values that are missing; anything set explicitly
//! is left alone, so running it again is a no-op.

use k8s_openapi::api::autoscaling::v2::HorizontalPodAutoscalerBehavior;

use crate::crd::{
    HPA_AUTOSCALER_TYPE, SCALED_OBJECT_AUTOSCALER_TYPE, SECONDARY_SUBCLUSTER_TYPE,
    TRANSIENT_SUBCLUSTER_TYPE, ScaleTrigger, TriggerType, VerticaAutoscaler,
};

/// Apply defaults in place. Returns true if anything changed.
pub fn apply_defaults(vas: &mut VerticaAutoscaler) -> bool {
    let mut changed = default_template(vas);

    let Some(custom) = vas.spec.custom_autoscaler.as_mut() else {
        return changed;
    };

    match custom.r#type.as_str() {
        HPA_AUTOSCALER_TYPE => {
            if let Some(hpa) = custom.hpa.as_mut()
                && hpa.has_scale_in_threshold()
            {
                changed |= default_scale_down_window(&mut hpa.behavior);
            }
        }
        SCALED_OBJECT_AUTOSCALER_TYPE => {
            if let Some(scaled_object) = custom.scaled_object.as_mut() {
                for trigger in &mut scaled_object.metrics {
                    changed |= default_metric_type(trigger);
                }
                if scaled_object.has_scale_in_threshold() {
                    changed |= default_scale_down_window(&mut scaled_object.behavior);
                }
            }
        }
        _ => {}
    }

    changed
}

fn default_template(vas: &mut VerticaAutoscaler) -> bool {
    let mut changed = false;
    let template = &mut vas.spec.template;

    if template.size > 0 && template.service_name.is_empty() && !vas.spec.service_name.is_empty() {
        template.service_name = vas.spec.service_name.clone();
        changed = true;
    }

    // Transient subclusters only exist during upgrades; a template creates
    // long-lived ones.
    if template.r#type == TRANSIENT_SUBCLUSTER_TYPE {
        template.r#type = SECONDARY_SUBCLUSTER_TYPE.to_string();
        changed = true;
    }

    changed
}

/// Unknown trigger types are left for the validator to report.
fn default_metric_type(trigger: &mut ScaleTrigger) -> bool {
    if !trigger.metric_type.is_empty() {
        return false;
    }
    let Ok(trigger_type) = trigger.r#type.parse::<TriggerType>() else {
        return false;
    };
    trigger.metric_type = trigger_type.default_metric_type().to_string();
    true
}

/// Ensure `behavior.scaleDown.stabilizationWindowSeconds` is set, using 0
/// when absent.
fn default_scale_down_window(behavior: &mut Option<HorizontalPodAutoscalerBehavior>) -> bool {
    let scale_down = behavior
        .get_or_insert_with(Default::default)
        .scale_down
        .get_or_insert_with(Default::default);

    if scale_down.stabilization_window_seconds.is_some() {
        return false;
    }
    scale_down.stabilization_window_seconds = Some(0);
    true
}
