//! vertica-autoscaler-webhook library crate
//!
//! Admission defaulting and validation for the VerticaAutoscaler custom
//! resource, plus the version parsing used to gate upgrades.

pub mod config;
pub mod crd;
pub mod health;
pub mod version;
pub mod webhooks;

pub use config::{Config, ConfigError};
pub use health::HealthState;
pub use version::VersionInfo;
pub use webhooks::{AdmissionHooks, WebhookError, apply_defaults, run_webhook_server};
