// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for vertica-autoscaler-webhook.
//!
//! These tests run without a Kubernetes cluster and exercise the public
//! admission API: defaulting, validation, version gating and patches.

#[path = "../common/mod.rs"]
mod common;

mod crd_tests {
    use kube::CustomResourceExt;
    use serde_json::json;
    use vertica_autoscaler_webhook::crd::{
        CustomAutoscaler, MetricTargetType, PrometheusAuthMode, ScalingGranularity, TriggerType,
        VerticaAutoscaler,
    };

    use crate::common::fixtures::VerticaAutoscalerBuilder;

    #[test]
    fn test_deserialize_applies_serde_defaults() {
        let vas: VerticaAutoscaler = serde_json::from_value(json!({
            "apiVersion": "vertica.com/v1",
            "kind": "VerticaAutoscaler",
            "metadata": {"name": "vas", "namespace": "default"},
            "spec": {"verticaDBName": "vertica-sample"}
        }))
        .unwrap();

        assert_eq!(vas.spec.vertica_db_name, "vertica-sample");
        assert_eq!(vas.spec.scaling_granularity, "Subcluster");
        assert!(vas.spec.service_name.is_empty());
        assert_eq!(vas.spec.template.size, 0);
        assert!(!vas.is_custom_autoscaler_set());
        assert_eq!(vas.custom_autoscaler(), Ok(CustomAutoscaler::Disabled));
    }

    #[test]
    fn test_deserialize_scaled_object() {
        let vas: VerticaAutoscaler = serde_json::from_value(json!({
            "apiVersion": "vertica.com/v1",
            "kind": "VerticaAutoscaler",
            "metadata": {"name": "vas"},
            "spec": {
                "verticaDBName": "vertica-sample",
                "scalingGranularity": "Pod",
                "serviceName": "sc1",
                "customAutoscaler": {
                    "type": "ScaledObject",
                    "scaledObject": {
                        "minReplicas": 3,
                        "maxReplicas": 6,
                        "metrics": [{
                            "name": "sessions",
                            "type": "prometheus",
                            "prometheus": {
                                "serverAddress": "http://prometheus:9090",
                                "query": "sum(vertica_sessions_running_counter)",
                                "threshold": 50
                            }
                        }]
                    }
                }
            }
        }))
        .unwrap();

        let Ok(CustomAutoscaler::ScaledObject(scaled_object)) = vas.custom_autoscaler() else {
            panic!("expected a ScaledObject autoscaler");
        };
        assert_eq!(scaled_object.max_replicas, Some(6));
        assert_eq!(scaled_object.metrics[0].trigger_type(), Ok(TriggerType::Prometheus));
        assert!(!scaled_object.has_scale_in_threshold());
    }

    #[test]
    fn test_empty_service_name_is_not_serialized() {
        let vas = VerticaAutoscalerBuilder::default()
            .granularity(ScalingGranularity::Subcluster)
            .service_name("")
            .build();
        let value = serde_json::to_value(&vas).unwrap();
        assert!(value["spec"].get("serviceName").is_none());
        assert_eq!(value["spec"]["verticaDBName"], "vertica-sample");
    }

    #[test]
    fn test_crd_metadata() {
        let crd = VerticaAutoscaler::crd();
        assert_eq!(crd.spec.group, "vertica.com");
        assert_eq!(crd.spec.names.kind, "VerticaAutoscaler");
        assert_eq!(crd.spec.names.plural, "verticaautoscalers");
        assert_eq!(crd.spec.names.short_names, Some(vec!["vas".to_string()]));
        assert_eq!(crd.spec.versions[0].name, "v1");
    }

    #[test]
    fn test_trigger_type_parsing() {
        assert_eq!("".parse::<TriggerType>(), Ok(TriggerType::Prometheus));
        assert_eq!("cpu".parse::<TriggerType>(), Ok(TriggerType::Cpu));
        assert!("CPU".parse::<TriggerType>().is_err());
        assert_eq!(
            TriggerType::Memory.default_metric_type(),
            MetricTargetType::Utilization
        );
        assert!(
            !TriggerType::Prometheus
                .allowed_metric_types()
                .contains(&MetricTargetType::Utilization)
        );
    }

    #[test]
    fn test_auth_modes() {
        assert_eq!(
            "tls,basic".parse::<PrometheusAuthMode>(),
            Ok(PrometheusAuthMode::TlsAndBasic)
        );
        assert!("basic,tls".parse::<PrometheusAuthMode>().is_err());
        assert_eq!(PrometheusAuthMode::Bearer.to_string(), "bearer");
    }
}

mod version_tests {
    use vertica_autoscaler_webhook::VersionInfo;
    use vertica_autoscaler_webhook::version::{ONLINE_UPGRADE_VERSION, is_equal_or_newer_with_hotfix};

    fn v(raw: &str) -> VersionInfo {
        raw.parse().unwrap()
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for raw in ["24.3.0", "v24.3", "latest", "", "v24.3.0-"] {
            assert!(VersionInfo::parse(raw).is_none(), "{raw} should not parse");
        }
    }

    #[test]
    fn test_hotfix_ordering() {
        assert!(v("v24.3.0-2") > v("v24.3.0-1"));
        assert!(v("v24.3.0-2").supports_online_upgrade());
        assert!(!v("v24.3.0-1").is_equal_or_newer_with_hotfix(ONLINE_UPGRADE_VERSION));
        assert!(!is_equal_or_newer_with_hotfix("not-a-version", "v11.0.0"));
    }

    #[test]
    fn test_upgrade_paths() {
        assert!(v("v11.1.1").is_valid_upgrade_path("v12.0.3").is_ok());
        assert!(v("v12.0.4").is_valid_upgrade_path("v23.3.0").is_ok());
        assert_eq!(
            v("v11.0.2")
                .is_valid_upgrade_path("v12.0.0")
                .unwrap_err()
                .to_string(),
            "Version 'v11.0.2' to 'v12.0.0' is invalid because it skips 'v11.1.x'"
        );
        assert_eq!(
            v("v24.1.0")
                .is_valid_upgrade_path("v23.4.0")
                .unwrap_err()
                .to_string(),
            "Version 'v24.1.0' to 'v23.4.0' is a downgrade and is not supported"
        );
    }

    #[test]
    fn test_unparseable_target_fails_open() {
        assert!(v("v24.1.0").is_valid_upgrade_path("nightly").is_ok());
    }
}

mod admission_tests {
    use vertica_autoscaler_webhook::crd::{
        MetricTargetType, SECONDARY_SUBCLUSTER_TYPE, ScalingGranularity,
    };
    use vertica_autoscaler_webhook::webhooks::policies::annotations::{
        PAUSED_ANNOTATION, PAUSED_REPLICAS_ANNOTATION,
    };
    use vertica_autoscaler_webhook::webhooks::{AdmissionHooks, ErrorKind};

    use crate::common::fixtures::{
        VerticaAutoscalerBuilder, minimal_autoscaler, prometheus_trigger, resource_trigger,
        subcluster_autoscaler,
    };

    #[test]
    fn test_minimal_autoscaler_is_allowed() {
        let mut vas = minimal_autoscaler("vas");
        let result = vas.on_create();
        assert!(result.is_allowed(), "{:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_template_service_name_is_defaulted() {
        let mut vas = subcluster_autoscaler("vas");
        let result = vas.on_create();
        assert!(result.is_allowed(), "{:?}", result.errors);
        assert_eq!(vas.spec.template.service_name, "as-svc");
    }

    #[test]
    fn test_transient_template_becomes_secondary() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .granularity(ScalingGranularity::Subcluster)
            .template("as", 3)
            .template_type("transient")
            .build();
        assert!(vas.on_create().is_allowed());
        assert_eq!(vas.spec.template.r#type, SECONDARY_SUBCLUSTER_TYPE);
    }

    #[test]
    fn test_template_rejected_for_pod_granularity() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .granularity(ScalingGranularity::Pod)
            .template("as", 3)
            .build();
        let result = vas.on_create();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path.as_str(), "spec.template.size");
    }

    #[test]
    fn test_mismatched_template_service_name() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .granularity(ScalingGranularity::Subcluster)
            .service_name("sc_svc")
            .template("as", 3)
            .template_service_name("sc-svc")
            .build();
        let paths: Vec<String> = vas
            .on_create()
            .errors
            .iter()
            .map(|e| e.path.to_string())
            .collect();
        assert_eq!(paths, vec!["spec.template.serviceName", "spec.serviceName"]);
    }

    #[test]
    fn test_trigger_metric_types_are_defaulted() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .scaled_object(Some(1), Some(4))
            .trigger(resource_trigger("cpu", "cpu", 70))
            .trigger(prometheus_trigger("sessions", 50))
            .build();
        let result = vas.on_create();
        assert!(result.is_allowed(), "{:?}", result.errors);

        let custom = vas.spec.custom_autoscaler.as_ref().unwrap();
        let triggers = &custom.scaled_object.as_ref().unwrap().metrics;
        assert_eq!(triggers[0].metric_type, MetricTargetType::Utilization.to_string());
        assert_eq!(triggers[1].metric_type, MetricTargetType::Value.to_string());
    }

    #[test]
    fn test_duplicate_trigger_names() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .scaled_object(None, Some(4))
            .trigger(prometheus_trigger("load", 50))
            .trigger(resource_trigger("load", "memory", 70))
            .build();
        let result = vas.on_create();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].path.as_str(),
            "spec.customAutoscaler.scaledObject.metrics[1].name"
        );
        assert_eq!(
            result.errors[0].kind,
            ErrorKind::Duplicate {
                value: "load".to_string()
            }
        );
    }

    #[test]
    fn test_hpa_replica_bounds() {
        let mut vas = VerticaAutoscalerBuilder::default().hpa(Some(5), 3).build();
        let result = vas.on_create();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].detail, "3 cannot be less than minReplicas 5");

        let mut vas = VerticaAutoscalerBuilder::default().hpa(None, 0).build();
        let result = vas.on_create();
        assert_eq!(result.errors[0].kind, ErrorKind::Required);
        assert_eq!(
            result.errors[0].path.as_str(),
            "spec.customAutoscaler.hpa.maxReplicas"
        );
    }

    #[test]
    fn test_missing_hpa_payload() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .custom_autoscaler_type("HPA")
            .build();
        let result = vas.on_create();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path.as_str(), "spec.customAutoscaler.hpa");
        assert_eq!(result.errors[0].detail, "Hpa must be non-nil when type is 'HPA'.");
    }

    #[test]
    fn test_pause_annotations_are_exclusive() {
        let mut vas = VerticaAutoscalerBuilder::default()
            .annotation(PAUSED_ANNOTATION, "true")
            .annotation(PAUSED_REPLICAS_ANNOTATION, "2")
            .build();
        let result = vas.on_create();
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, ErrorKind::Forbidden);
    }

    #[test]
    fn test_old_version_only_warns() {
        let mut vas = VerticaAutoscalerBuilder::default().version("v10.1.1").build();
        let result = vas.on_create();
        assert!(result.is_allowed());
        assert_eq!(result.warnings.len(), 1);
        assert!(result.warnings[0].contains("older than the minimum supported version v11.0.1"));
    }

    #[test]
    fn test_delete_is_always_allowed() {
        let vas = VerticaAutoscalerBuilder::default()
            .raw_granularity("Node")
            .build();
        assert!(vas.on_delete().is_allowed());
    }

    #[test]
    fn test_rejection_message() {
        let mut vas = VerticaAutoscalerBuilder::new("vas-bad")
            .raw_granularity("Node")
            .build();
        let err = vas.on_create().into_result("vas-bad").unwrap_err();
        assert_eq!(
            err.to_string(),
            "VerticaAutoscaler.vertica.com \"vas-bad\" is invalid: spec.scalingGranularity: \
             Invalid value: \"Node\": scalingGranularity must be set to either Subcluster or Pod"
        );
    }
}

mod update_tests {
    use vertica_autoscaler_webhook::crd::VerticaAutoscaler;
    use vertica_autoscaler_webhook::webhooks::{AdmissionHooks, ErrorKind};

    use crate::common::fixtures::VerticaAutoscalerBuilder;

    fn update(old: &VerticaAutoscaler, mut new: VerticaAutoscaler) -> Vec<String> {
        new.on_update(old)
            .errors
            .iter()
            .map(|e| e.path.to_string())
            .collect()
    }

    #[test]
    fn test_unchanged_update_is_allowed() {
        let old = VerticaAutoscalerBuilder::default().hpa(Some(3), 6).build();
        assert!(update(&old, old.clone()).is_empty());
    }

    #[test]
    fn test_database_and_granularity_are_immutable() {
        let old = VerticaAutoscalerBuilder::default().build();
        let new = VerticaAutoscalerBuilder::default()
            .vertica_db_name("other-db")
            .raw_granularity("Subcluster")
            .build();
        assert_eq!(
            update(&old, new),
            vec!["spec.verticaDBName", "spec.scalingGranularity"]
        );
    }

    #[test]
    fn test_service_name_moves_with_template() {
        let old = VerticaAutoscalerBuilder::default().build();

        let renamed = VerticaAutoscalerBuilder::default().service_name("sc2").build();
        assert_eq!(update(&old, renamed), vec!["spec.serviceName"]);

        let moved = VerticaAutoscalerBuilder::default()
            .service_name("sc2")
            .template_service_name("sc2")
            .build();
        assert!(update(&old, moved).is_empty());
    }

    #[test]
    fn test_custom_autoscaler_cannot_be_enabled() {
        let old = VerticaAutoscalerBuilder::default().build();
        let mut new = VerticaAutoscalerBuilder::default().hpa(Some(3), 6).build();
        let result = new.on_update(&old);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path.as_str(), "spec.customAutoscaler");
        assert_eq!(result.errors[0].kind, ErrorKind::Forbidden);
    }

    #[test]
    fn test_custom_autoscaler_can_be_disabled() {
        let old = VerticaAutoscalerBuilder::default().hpa(Some(3), 6).build();
        let new = VerticaAutoscalerBuilder::default().build();
        assert!(update(&old, new).is_empty());
    }

    #[test]
    fn test_custom_autoscaler_type_is_immutable() {
        let old = VerticaAutoscalerBuilder::default().hpa(Some(3), 6).build();
        let new = VerticaAutoscalerBuilder::default()
            .scaled_object(Some(3), Some(6))
            .build();
        assert_eq!(update(&old, new), vec!["spec.customAutoscaler.type"]);
    }

    #[test]
    fn test_version_upgrade_path() {
        let old = VerticaAutoscalerBuilder::default().version("v11.1.1").build();

        let next = VerticaAutoscalerBuilder::default().version("v12.0.3").build();
        assert!(update(&old, next).is_empty());

        let old = VerticaAutoscalerBuilder::default().version("v11.0.2").build();
        let mut skip = VerticaAutoscalerBuilder::default().version("v12.0.0").build();
        let result = skip.on_update(&old);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(
            result.errors[0].path.as_str(),
            "metadata.annotations[vertica.com/version]"
        );
        assert_eq!(
            result.errors[0].detail,
            "Version 'v11.0.2' to 'v12.0.0' is invalid because it skips 'v11.1.x'"
        );
    }

    #[test]
    fn test_version_downgrade() {
        let old = VerticaAutoscalerBuilder::default().version("v24.3.0-2").build();
        let new = VerticaAutoscalerBuilder::default().version("v24.3.0-1").build();
        assert_eq!(
            update(&old, new),
            vec!["metadata.annotations[vertica.com/version]"]
        );
    }
}

mod patch_tests {
    use serde_json::Value;
    use vertica_autoscaler_webhook::webhooks::{apply_defaults, defaulting_patch};

    use crate::common::fixtures::{minimal_autoscaler, subcluster_autoscaler};

    #[test]
    fn test_patch_sets_template_service_name() {
        let original = subcluster_autoscaler("vas");
        let mut defaulted = original.clone();
        assert!(apply_defaults(&mut defaulted));

        let patch = defaulting_patch(&original, &defaulted).unwrap();
        let ops = serde_json::to_value(&patch).unwrap();
        let op = ops
            .as_array()
            .unwrap()
            .iter()
            .find(|op| op["path"] == "/spec/template/serviceName")
            .expect("patch should set the template service name");
        assert_eq!(op["value"], Value::from("as-svc"));
    }

    #[test]
    fn test_no_patch_when_nothing_defaulted() {
        let original = minimal_autoscaler("vas");
        let mut defaulted = original.clone();
        assert!(!apply_defaults(&mut defaulted));

        let patch = defaulting_patch(&original, &defaulted).unwrap();
        assert!(patch.0.is_empty());
    }
}
