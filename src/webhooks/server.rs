//! Admission webhook server.
//!
//! Provides the mutating and validating endpoints for VerticaAutoscaler.
//!
//! To enable webhooks:
//! 1. Deploy cert-manager for TLS certificates
//! 2. Create a MutatingWebhookConfiguration and a ValidatingWebhookConfiguration
//!    pointing at the two paths below
//! 3. Mount the TLS certificate secret to the webhook pod at /etc/webhook/certs/
//!
//! The webhook server starts automatically when certificates are present.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use kube::ResourceExt;
use kube::core::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview, Operation};
use tracing::{debug, error, info, warn};

use crate::crd::VerticaAutoscaler;
use crate::health::HealthState;
use crate::webhooks::admission::AdmissionHooks;
use crate::webhooks::defaulting::apply_defaults;
use crate::webhooks::error::WebhookError;
use crate::webhooks::policies::ValidationResult;

/// Path of the defaulting endpoint
pub const MUTATE_PATH: &str = "/mutate-vertica-com-v1-verticaautoscaler";
/// Path of the validation endpoint
pub const VALIDATE_PATH: &str = "/validate-vertica-com-v1-verticaautoscaler";

type ReviewResponse = (StatusCode, Json<AdmissionReview<DynamicObject>>);

/// Shared state for webhook handlers
pub struct WebhookState {
    pub health: Arc<HealthState>,
}

impl WebhookState {
    pub fn new(health: Arc<HealthState>) -> Self {
        Self { health }
    }
}

/// Create a denial response with reason embedded in message.
/// kube-rs deny() only sets status.message, so we format as "[reason] message"
fn deny_with_reason(
    request: &AdmissionRequest<VerticaAutoscaler>,
    message: &str,
    reason: &str,
) -> AdmissionResponse {
    AdmissionResponse::from(request).deny(format!("[{}] {}", reason, message))
}

fn operation_label(operation: &Operation) -> &'static str {
    match operation {
        Operation::Create => "CREATE",
        Operation::Update => "UPDATE",
        Operation::Delete => "DELETE",
        Operation::Connect => "CONNECT",
    }
}

fn object_name(request: &AdmissionRequest<VerticaAutoscaler>) -> String {
    request
        .object
        .as_ref()
        .or(request.old_object.as_ref())
        .map(|object| object.name_any())
        .unwrap_or_else(|| request.name.clone())
}

/// Unwrap the request from a review, or build the 400 response for it.
fn extract_request(
    review: AdmissionReview<VerticaAutoscaler>,
) -> Result<AdmissionRequest<VerticaAutoscaler>, ReviewResponse> {
    review.try_into().map_err(|e| {
        error!(error = %e, "Failed to extract admission request");
        (
            StatusCode::BAD_REQUEST,
            Json(AdmissionResponse::invalid(format!("Invalid AdmissionReview: {}", e)).into_review()),
        )
    })
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route(MUTATE_PATH, post(mutate_verticaautoscaler))
        .route(VALIDATE_PATH, post(validate_verticaautoscaler))
        .with_state(state)
}

/// Defaulting admission webhook handler
async fn mutate_verticaautoscaler(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<VerticaAutoscaler>>,
) -> ReviewResponse {
    let started = Instant::now();
    let request = match extract_request(review) {
        Ok(request) => request,
        Err(response) => return response,
    };

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing defaulting request"
    );

    let (response, patched) = mutate_request(&request);
    let metrics = &state.health.metrics;
    if patched {
        metrics.record_patch();
    }
    metrics.record_admission(
        "mutate",
        operation_label(&request.operation),
        response.allowed,
        started.elapsed().as_secs_f64(),
    );

    (StatusCode::OK, Json(response.into_review()))
}

/// Default the object and answer with a JSON patch. The flag is true when
/// a patch was attached.
fn mutate_request(request: &AdmissionRequest<VerticaAutoscaler>) -> (AdmissionResponse, bool) {
    let uid = &request.uid;
    let object = match (&request.operation, &request.object) {
        (Operation::Create | Operation::Update, Some(object)) => object,
        _ => return (AdmissionResponse::from(request), false),
    };

    let mut defaulted = object.clone();
    if !apply_defaults(&mut defaulted) {
        debug!(uid = %uid, "No defaults to apply");
        return (AdmissionResponse::from(request), false);
    }

    let patch = match defaulting_patch(object, &defaulted) {
        Ok(patch) => patch,
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to compute defaulting patch");
            return (
                deny_with_reason(request, &e.to_string(), "PatchFailed"),
                false,
            );
        }
    };

    info!(uid = %uid, patch_ops = patch.0.len(), "Applying defaults");

    match AdmissionResponse::from(request).with_patch(patch) {
        Ok(response) => (response, true),
        Err(e) => {
            error!(uid = %uid, error = %e, "Failed to serialize patch");
            (
                deny_with_reason(request, &format!("patch serialization error: {e}"), "PatchFailed"),
                false,
            )
        }
    }
}

/// JSON patch turning `original` into `defaulted`.
pub fn defaulting_patch(
    original: &VerticaAutoscaler,
    defaulted: &VerticaAutoscaler,
) -> Result<json_patch::Patch, serde_json::Error> {
    let before = serde_json::to_value(original)?;
    let after = serde_json::to_value(defaulted)?;
    Ok(json_patch::diff(&before, &after))
}

/// Validation admission webhook handler
async fn validate_verticaautoscaler(
    State(state): State<Arc<WebhookState>>,
    Json(review): Json<AdmissionReview<VerticaAutoscaler>>,
) -> ReviewResponse {
    let started = Instant::now();
    let request = match extract_request(review) {
        Ok(request) => request,
        Err(response) => return response,
    };

    debug!(
        uid = %request.uid,
        operation = ?request.operation,
        namespace = ?request.namespace,
        name = ?request.name,
        "Processing admission request"
    );

    let response = validate_request(&request);
    state.health.metrics.record_admission(
        "validate",
        operation_label(&request.operation),
        response.allowed,
        started.elapsed().as_secs_f64(),
    );

    (StatusCode::OK, Json(response.into_review()))
}

fn validate_request(request: &AdmissionRequest<VerticaAutoscaler>) -> AdmissionResponse {
    let uid = &request.uid;

    let result = match (&request.operation, &request.object, &request.old_object) {
        (Operation::Delete, _, Some(old)) => old.on_delete(),
        (Operation::Delete, _, None) | (Operation::Connect, _, _) => ValidationResult::allowed(),
        (Operation::Create, Some(object), _) => object.clone().on_create(),
        (Operation::Update, Some(object), Some(old)) => object.clone().on_update(old),
        (Operation::Update, Some(_), None) => {
            error!(uid = %uid, "Missing oldObject in UPDATE request");
            return deny_with_reason(request, "Missing oldObject in UPDATE request", "InvalidRequest");
        }
        (_, None, _) => {
            error!(uid = %uid, "Missing object in request");
            return deny_with_reason(request, "Missing object in request", "InvalidRequest");
        }
    };

    match result.into_result(&object_name(request)) {
        Ok(warnings) => {
            info!(uid = %uid, warnings = warnings.len(), "Admission request allowed");
            let mut response = AdmissionResponse::from(request);
            if !warnings.is_empty() {
                response.warnings = Some(warnings);
            }
            response
        }
        Err(e) => {
            warn!(
                uid = %uid,
                violations = e.field_errors().len(),
                message = %e,
                "Admission request denied"
            );
            AdmissionResponse::from(request).deny(e.to_string())
        }
    }
}

/// Run the webhook server with TLS
///
/// Binds to 0.0.0.0 on the given port and serves both admission endpoints.
///
/// # Arguments
/// * `health` - Shared health state, used for metrics
/// * `port` - Port to listen on
/// * `cert_path` - Path to TLS certificate file (PEM format)
/// * `key_path` - Path to TLS private key file (PEM format)
pub async fn run_webhook_server(
    health: Arc<HealthState>,
    port: u16,
    cert_path: &Path,
    key_path: &Path,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;

    let state = Arc::new(WebhookState::new(health));
    let app = create_webhook_router(state);

    let config = RustlsConfig::from_pem_file(cert_path, key_path)
        .await
        .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Webhook server listening with TLS");

    axum_server::bind_rustls(addr, config)
        .serve(app.into_make_service())
        .await
        .map_err(|e| WebhookError::Server(e.to_string()))?;

    Ok(())
}
