//! Server version policy.
//!
//! Warnings on every CREATE and UPDATE:
//! - The version annotation cannot be parsed
//! - The version is older than the oldest supported release
//!
//! Tier 2 (Update), called from the immutability policy:
//! - Moving between versions follows the supported upgrade path

use super::ValidationContext;
use crate::version::{
    MINIMUM_VERSION, PREVIOUS_VERSION_ANNOTATION, VERSION_ANNOTATION, VersionInfo,
};
use crate::webhooks::field::{FieldError, FieldPath};

pub fn warnings(ctx: &ValidationContext<'_>) -> Vec<String> {
    let Some(raw) = ctx.annotation(VERSION_ANNOTATION) else {
        return Vec::new();
    };

    match raw.parse::<VersionInfo>() {
        Err(err) => vec![format!(
            "annotation {VERSION_ANNOTATION}: {err}; version checks are skipped"
        )],
        Ok(version) if !version.is_supported() => vec![format!(
            "version {version} is older than the minimum supported version {MINIMUM_VERSION}"
        )],
        Ok(_) => Vec::new(),
    }
}

/// The starting point is the old object's version, or the previous version
/// recorded on the new object when the old one carried none. Unknown
/// versions do not constrain the update.
pub fn validate_upgrade_path(ctx: &ValidationContext<'_>) -> Option<FieldError> {
    let old = ctx.old_resource?;
    let target = ctx.annotation(VERSION_ANNOTATION)?;

    let old_version = old
        .metadata
        .annotations
        .as_ref()
        .and_then(VersionInfo::from_annotations)
        .or_else(|| {
            ctx.annotation(PREVIOUS_VERSION_ANNOTATION)
                .and_then(VersionInfo::parse)
        })?;

    old_version.is_valid_upgrade_path(target).err().map(|err| {
        FieldError::invalid(
            FieldPath::new("metadata")
                .child("annotations")
                .key(VERSION_ANNOTATION),
            target,
            err.to_string(),
        )
    })
}
