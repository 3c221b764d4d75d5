//! Custom Resource Definitions (CRDs) for the autoscaler webhook.
//!
//! - `VerticaAutoscaler`: Scale the subclusters of a VerticaDB, optionally
//!   through an HPA or a KEDA ScaledObject

mod vertica_autoscaler;

pub use vertica_autoscaler::*;
