//! VerticaAutoscaler Custom Resource Definition.
//!
//! A VerticaAutoscaler scales the subclusters of a VerticaDB, either by
//! resizing an existing subcluster (`Pod` granularity) or by adding and
//! removing whole subclusters built from a template (`Subcluster`
//! granularity). Scaling decisions can be delegated to a HorizontalPodAutoscaler
//! or a KEDA ScaledObject through `customAutoscaler`.
//!
//! Enumerated fields stay strings on the wire so that a bad value reaches the
//! admission webhook instead of failing deserialization; the typed views in
//! this module are what the policies work with.

use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::autoscaling::v2::{HorizontalPodAutoscalerBehavior, MetricSpec, MetricTarget};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// VerticaAutoscaler lets you autoscale one or more subclusters in a VerticaDB.
///
/// Example:
/// ```yaml
/// apiVersion: vertica.com/v1
/// kind: VerticaAutoscaler
/// metadata:
///   name: vas-sample
/// spec:
///   verticaDBName: vertica-sample
///   scalingGranularity: Pod
///   serviceName: sc1
///   customAutoscaler:
///     type: HPA
///     hpa:
///       minReplicas: 3
///       maxReplicas: 6
///       metrics:
///         - metric:
///             type: Resource
///             resource:
///               name: cpu
///               target:
///                 type: Utilization
///                 averageUtilization: 80
/// ```
#[derive(CustomResource, Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "vertica.com",
    version = "v1",
    kind = "VerticaAutoscaler",
    plural = "verticaautoscalers",
    shortname = "vas",
    category = "all",
    category = "vertica",
    status = "VerticaAutoscalerStatus",
    derive = "PartialEq",
    namespaced,
    printcolumn = r#"{"name":"Granularity", "type":"string", "jsonPath":".spec.scalingGranularity"}"#,
    printcolumn = r#"{"name":"Current Size", "type":"integer", "jsonPath":".status.currentSize"}"#,
    printcolumn = r#"{"name":"Target Size", "type":"integer", "jsonPath":".spec.targetSize"}"#,
    printcolumn = r#"{"name":"Scaling Count", "type":"integer", "jsonPath":".status.scalingCount"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct VerticaAutoscalerSpec {
    /// Name of the VerticaDB in the same namespace that this autoscaler scales.
    #[serde(rename = "verticaDBName")]
    pub vertica_db_name: String,

    /// How scaling happens: `Subcluster` adds or removes whole subclusters,
    /// `Pod` resizes the last subcluster selected by `serviceName`.
    #[serde(default = "default_scaling_granularity")]
    pub scaling_granularity: String,

    /// Selects the subclusters scaled together. Empty selects every subcluster.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,

    /// Template for new subclusters under `Subcluster` granularity. A size of
    /// 0 disables it, and an existing subcluster is used as the template.
    #[serde(default)]
    pub template: Subcluster,

    /// Desired number of pods across the selected subclusters.
    #[serde(default)]
    pub target_size: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_autoscaler: Option<CustomAutoscalerSpec>,
}

impl Default for VerticaAutoscalerSpec {
    fn default() -> Self {
        Self {
            vertica_db_name: String::new(),
            scaling_granularity: default_scaling_granularity(),
            service_name: String::new(),
            template: Subcluster::default(),
            target_size: 0,
            custom_autoscaler: None,
        }
    }
}

fn default_scaling_granularity() -> String {
    ScalingGranularity::Subcluster.to_string()
}

/// Subcluster template used when scaling by whole subclusters.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Subcluster {
    /// Prefix for generated subcluster names.
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub size: i32,

    /// `primary`, `secondary` or `transient`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_name: String,
}

/// Subcluster types a template may carry.
pub const PRIMARY_SUBCLUSTER_TYPE: &str = "primary";
pub const SECONDARY_SUBCLUSTER_TYPE: &str = "secondary";
pub const TRANSIENT_SUBCLUSTER_TYPE: &str = "transient";

/// Wire shape of the custom autoscaler block.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CustomAutoscalerSpec {
    /// `HPA`, `ScaledObject`, or empty to disable custom autoscaling.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hpa: Option<HpaSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaled_object: Option<ScaledObjectSpec>,
}

pub const HPA_AUTOSCALER_TYPE: &str = "HPA";
pub const SCALED_OBJECT_AUTOSCALER_TYPE: &str = "ScaledObject";

/// The custom autoscaler after its type tag has been checked against the
/// payload it selects.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CustomAutoscaler<'a> {
    Disabled,
    Hpa(&'a HpaSpec),
    ScaledObject(&'a ScaledObjectSpec),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CustomAutoscalerError {
    #[error("Type must be one of 'HPA', 'ScaledObject' or empty.")]
    UnknownType(String),

    #[error("Hpa must be non-nil when type is 'HPA'.")]
    MissingHpa,

    #[error("ScaledObject must be non-nil when type is 'ScaledObject'.")]
    MissingScaledObject,
}

impl CustomAutoscalerSpec {
    /// Resolve the type tag into the payload it names. The payload that the
    /// tag does not name is ignored.
    pub fn resolve(&self) -> Result<CustomAutoscaler<'_>, CustomAutoscalerError> {
        match self.r#type.as_str() {
            "" => Ok(CustomAutoscaler::Disabled),
            HPA_AUTOSCALER_TYPE => self
                .hpa
                .as_ref()
                .map(CustomAutoscaler::Hpa)
                .ok_or(CustomAutoscalerError::MissingHpa),
            SCALED_OBJECT_AUTOSCALER_TYPE => self
                .scaled_object
                .as_ref()
                .map(CustomAutoscaler::ScaledObject)
                .ok_or(CustomAutoscalerError::MissingScaledObject),
            other => Err(CustomAutoscalerError::UnknownType(other.to_string())),
        }
    }
}

/// HorizontalPodAutoscaler settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HpaSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(default)]
    pub max_replicas: i32,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<MetricDefinition>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,
}

impl HpaSpec {
    pub fn has_scale_in_threshold(&self) -> bool {
        self.metrics
            .iter()
            .any(|metric| metric.scale_in_threshold.is_some())
    }
}

/// A native HPA metric with an optional threshold for scaling in.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    /// Target below which the autoscaler scales in. Its type must match the
    /// metric's target type.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_in_threshold: Option<MetricTarget>,

    #[serde(default)]
    pub metric: MetricSpec,
}

/// KEDA ScaledObject settings.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaledObjectSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_replicas: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_replicas: Option<i32>,

    /// Seconds between trigger checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling_interval: Option<i32>,

    /// Seconds to wait after the last active trigger before scaling to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown_period: Option<i32>,

    #[serde(default)]
    pub metrics: Vec<ScaleTrigger>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavior: Option<HorizontalPodAutoscalerBehavior>,
}

impl ScaledObjectSpec {
    pub fn has_scale_in_threshold(&self) -> bool {
        self.metrics.iter().any(|trigger| {
            trigger
                .prometheus
                .as_ref()
                .is_some_and(|prometheus| prometheus.scale_in_threshold != 0)
        })
    }
}

/// A KEDA trigger.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScaleTrigger {
    /// `cpu`, `memory` or `prometheus`. Empty behaves as `prometheus`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub r#type: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// Secret with the credentials used by `prometheus.authModes`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_secret: String,

    /// `Utilization`, `Value` or `AverageValue`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub metric_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prometheus: Option<PrometheusSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<CpuMemorySpec>,
}

impl ScaleTrigger {
    pub fn trigger_type(&self) -> Result<TriggerType, UnknownVariant> {
        self.r#type.parse()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrometheusSpec {
    pub server_address: String,

    pub query: String,

    pub threshold: i32,

    /// Value below which the trigger scales in. 0 leaves it unset.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub scale_in_threshold: i32,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub auth_modes: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unsafe_ssl: bool,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub use_cached_metrics: bool,
}

fn is_zero(value: &i32) -> bool {
    *value == 0
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CpuMemorySpec {
    pub threshold: i32,
}

/// Status of a VerticaAutoscaler. Maintained by the operator.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerticaAutoscalerStatus {
    #[serde(default)]
    pub scaling_count: i32,

    #[serde(default)]
    pub current_size: i32,

    /// Label selector of the pods being scaled.
    #[serde(default)]
    pub selector: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<VerticaAutoscalerCondition>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VerticaAutoscalerCondition {
    /// `TargetSizeInitialized` or `ScalingActive`.
    pub r#type: String,
    /// "True", "False" or "Unknown".
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
}

impl VerticaAutoscaler {
    /// True when new subclusters are created from `spec.template`.
    pub fn can_use_template(&self) -> bool {
        self.spec.template.size > 0
    }

    /// True when a custom autoscaler type is selected, valid or not.
    pub fn is_custom_autoscaler_set(&self) -> bool {
        self.spec
            .custom_autoscaler
            .as_ref()
            .is_some_and(|custom| !custom.r#type.is_empty())
    }

    /// The resolved custom autoscaler. An absent block is `Disabled`.
    pub fn custom_autoscaler(&self) -> Result<CustomAutoscaler<'_>, CustomAutoscalerError> {
        match &self.spec.custom_autoscaler {
            Some(custom) => custom.resolve(),
            None => Ok(CustomAutoscaler::Disabled),
        }
    }
}

/// Returned when a string field holds a value outside its enumeration.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("unsupported {field} '{value}'")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

/// Scaling granularity of a VerticaAutoscaler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScalingGranularity {
    Pod,
    Subcluster,
}

impl FromStr for ScalingGranularity {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pod" => Ok(ScalingGranularity::Pod),
            "Subcluster" => Ok(ScalingGranularity::Subcluster),
            other => Err(UnknownVariant {
                field: "scalingGranularity",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ScalingGranularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalingGranularity::Pod => write!(f, "Pod"),
            ScalingGranularity::Subcluster => write!(f, "Subcluster"),
        }
    }
}

/// Type of a ScaledObject trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerType {
    Cpu,
    Memory,
    Prometheus,
}

impl TriggerType {
    /// Metric target types a trigger of this type accepts.
    pub fn allowed_metric_types(self) -> &'static [MetricTargetType] {
        match self {
            TriggerType::Prometheus => &[MetricTargetType::Value, MetricTargetType::AverageValue],
            TriggerType::Cpu | TriggerType::Memory => &[
                MetricTargetType::Utilization,
                MetricTargetType::AverageValue,
            ],
        }
    }

    /// Metric target type filled in when none is given.
    pub fn default_metric_type(self) -> MetricTargetType {
        match self {
            TriggerType::Prometheus => MetricTargetType::Value,
            TriggerType::Cpu | TriggerType::Memory => MetricTargetType::Utilization,
        }
    }
}

impl FromStr for TriggerType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cpu" => Ok(TriggerType::Cpu),
            "memory" => Ok(TriggerType::Memory),
            "prometheus" | "" => Ok(TriggerType::Prometheus),
            other => Err(UnknownVariant {
                field: "trigger type",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for TriggerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerType::Cpu => write!(f, "cpu"),
            TriggerType::Memory => write!(f, "memory"),
            TriggerType::Prometheus => write!(f, "prometheus"),
        }
    }
}

/// Metric target type, shared by triggers and HPA metric targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MetricTargetType {
    Utilization,
    Value,
    AverageValue,
}

impl FromStr for MetricTargetType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Utilization" => Ok(MetricTargetType::Utilization),
            "Value" => Ok(MetricTargetType::Value),
            "AverageValue" => Ok(MetricTargetType::AverageValue),
            other => Err(UnknownVariant {
                field: "metricType",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for MetricTargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricTargetType::Utilization => write!(f, "Utilization"),
            MetricTargetType::Value => write!(f, "Value"),
            MetricTargetType::AverageValue => write!(f, "AverageValue"),
        }
    }
}

/// Authentication mode of a prometheus trigger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrometheusAuthMode {
    Basic,
    Bearer,
    Tls,
    Custom,
    TlsAndBasic,
}

impl PrometheusAuthMode {
    pub const ALL: [PrometheusAuthMode; 5] = [
        PrometheusAuthMode::Basic,
        PrometheusAuthMode::Bearer,
        PrometheusAuthMode::Tls,
        PrometheusAuthMode::Custom,
        PrometheusAuthMode::TlsAndBasic,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            PrometheusAuthMode::Basic => "basic",
            PrometheusAuthMode::Bearer => "bearer",
            PrometheusAuthMode::Tls => "tls",
            PrometheusAuthMode::Custom => "custom",
            PrometheusAuthMode::TlsAndBasic => "tls,basic",
        }
    }
}

impl FromStr for PrometheusAuthMode {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                field: "authModes",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for PrometheusAuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
