//! Vertica server version parsing and release gating.
//!
//! Versions are stamped on resources through the `vertica.com/version`
//! annotation in the form `vMAJOR.MINOR.PATCH[-HOTFIX]`, for example
//! `v24.3.0-2`. A stamp that cannot be parsed is treated as "version
//! unknown" by every caller: feature gates stay closed and the upgrade-path
//! check does not constrain the update.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Annotation holding the server version currently deployed.
pub const VERSION_ANNOTATION: &str = "vertica.com/version";
/// Annotation holding the server version in place before an in-flight upgrade.
pub const PREVIOUS_VERSION_ANNOTATION: &str = "vertica.com/previous-version";

/// Oldest server release the autoscaler supports.
pub const MINIMUM_VERSION: &str = "v11.0.1";
/// First release that can be upgraded while the database stays read-only.
pub const READ_ONLY_ONLINE_UPGRADE_VERSION: &str = "v11.1.0";
/// First release with a fully online upgrade.
pub const ONLINE_UPGRADE_VERSION: &str = "v24.3.0-2";
/// First release that supports sandboxed subclusters.
pub const SANDBOX_SUPPORTED_MIN_VERSION: &str = "v24.3.0";

/// One hop of the supported upgrade graph. The starting release is an exact
/// (major, minor, patch); the next release matches on (major, minor) only.
struct UpgradeStep {
    from: (u32, u32, u32),
    next: (u32, u32),
    next_label: &'static str,
}

const fn step(from: (u32, u32, u32), next: (u32, u32), next_label: &'static str) -> UpgradeStep {
    UpgradeStep {
        from,
        next,
        next_label,
    }
}

/// Releases that must be upgraded to their successor before moving further.
/// Releases that are not listed here are not constrained, including patch
/// releases that shipped after the table was written.
const UPGRADE_PATHS: &[UpgradeStep] = &[
    step((11, 0, 0), (11, 1), "v11.1.x"),
    step((11, 0, 1), (11, 1), "v11.1.x"),
    step((11, 0, 2), (11, 1), "v11.1.x"),
    step((11, 1, 0), (12, 0), "v12.0.x"),
    step((11, 1, 1), (12, 0), "v12.0.x"),
];

/// Error returned when a version stamp does not follow the release grammar.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ParseVersionError {
    #[error("version '{0}' must start with 'v'")]
    MissingPrefix(String),

    #[error("version '{0}' must have the form vMAJOR.MINOR.PATCH[-HOTFIX]")]
    Malformed(String),
}

/// Reason an update between two versions is rejected.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum UpgradePathViolation {
    #[error("Version '{from}' to '{to}' is a downgrade and is not supported")]
    Downgrade { from: String, to: String },

    #[error("Version '{from}' to '{to}' is invalid because it skips '{skipped}'")]
    SkipsRelease {
        from: String,
        to: String,
        skipped: &'static str,
    },
}

/// A parsed server version.
///
/// Ordering and equality only look at the numeric components; the raw stamp
/// is kept for messages.
#[derive(Clone, Debug)]
pub struct VersionInfo {
    raw: String,
    major: u32,
    minor: u32,
    patch: u32,
    hotfix: u32,
}

impl VersionInfo {
    /// Parse a version stamp, returning `None` if it is not recognised.
    pub fn parse(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }

    /// Read the current version from a resource's annotations.
    pub fn from_annotations(annotations: &BTreeMap<String, String>) -> Option<Self> {
        annotations
            .get(VERSION_ANNOTATION)
            .and_then(|raw| Self::parse(raw))
    }

    /// Read the pre-upgrade version from a resource's annotations.
    pub fn previous_from_annotations(annotations: &BTreeMap<String, String>) -> Option<Self> {
        annotations
            .get(PREVIOUS_VERSION_ANNOTATION)
            .and_then(|raw| Self::parse(raw))
    }

    /// The stamp this version was parsed from.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> (u32, u32, u32, u32) {
        (self.major, self.minor, self.patch, self.hotfix)
    }

    fn release(&self) -> (u32, u32, u32) {
        (self.major, self.minor, self.patch)
    }

    /// True if this version is at or past `threshold`, hotfix included.
    /// An unparseable threshold is never satisfied.
    pub fn is_equal_or_newer_with_hotfix(&self, threshold: &str) -> bool {
        Self::parse(threshold).is_some_and(|threshold| *self >= threshold)
    }

    /// True if this version is at or past `threshold`, ignoring hotfixes.
    pub fn is_equal_or_newer(&self, threshold: &str) -> bool {
        Self::parse(threshold).is_some_and(|threshold| self.release() >= threshold.release())
    }

    /// True if this version is strictly before `threshold`, ignoring hotfixes.
    pub fn is_older(&self, threshold: &str) -> bool {
        Self::parse(threshold).is_some_and(|threshold| self.release() < threshold.release())
    }

    pub fn is_supported(&self) -> bool {
        self.is_equal_or_newer(MINIMUM_VERSION)
    }

    pub fn supports_online_upgrade(&self) -> bool {
        self.is_equal_or_newer_with_hotfix(ONLINE_UPGRADE_VERSION)
    }

    pub fn supports_read_only_online_upgrade(&self) -> bool {
        self.is_equal_or_newer(READ_ONLY_ONLINE_UPGRADE_VERSION)
    }

    pub fn supports_sandboxes(&self) -> bool {
        self.is_equal_or_newer(SANDBOX_SUPPORTED_MIN_VERSION)
    }

    /// True if both versions share major and minor, so only the patch or
    /// hotfix differs.
    pub fn is_equal_except_patch(&self, other: &VersionInfo) -> bool {
        self.major == other.major && self.minor == other.minor
    }

    /// Check that moving from this version to `target` is a supported upgrade.
    ///
    /// A target that does not parse is accepted: the gate fails open when
    /// the version is unknown.
    pub fn is_valid_upgrade_path(&self, target: &str) -> Result<(), UpgradePathViolation> {
        let Some(target) = Self::parse(target) else {
            return Ok(());
        };

        if target < *self {
            return Err(UpgradePathViolation::Downgrade {
                from: self.raw.clone(),
                to: target.raw,
            });
        }

        if self.is_equal_except_patch(&target) {
            return Ok(());
        }

        let Some(step) = UPGRADE_PATHS
            .iter()
            .find(|step| step.from == (self.major, self.minor, self.patch))
        else {
            return Ok(());
        };

        if (target.major, target.minor) == step.next {
            Ok(())
        } else {
            Err(UpgradePathViolation::SkipsRelease {
                from: self.raw.clone(),
                to: target.raw,
                skipped: step.next_label,
            })
        }
    }
}

/// Compare a raw stamp against a threshold. Unparseable stamps are never
/// equal to or newer than anything.
pub fn is_equal_or_newer_with_hotfix(raw: &str, threshold: &str) -> bool {
    VersionInfo::parse(raw).is_some_and(|version| version.is_equal_or_newer_with_hotfix(threshold))
}

fn parse_component(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl FromStr for VersionInfo {
    type Err = ParseVersionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseVersionError::Malformed(raw.to_string());

        let body = raw
            .strip_prefix('v')
            .ok_or_else(|| ParseVersionError::MissingPrefix(raw.to_string()))?;

        let (release, hotfix) = match body.split_once('-') {
            Some((release, hotfix)) => (release, Some(hotfix)),
            None => (body, None),
        };

        let mut parts = release.split('.');
        let (Some(major), Some(minor), Some(patch), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };

        let hotfix = match hotfix {
            Some(hotfix) => parse_component(hotfix).ok_or_else(malformed)?,
            None => 0,
        };

        Ok(Self {
            raw: raw.to_string(),
            major: parse_component(major).ok_or_else(malformed)?,
            minor: parse_component(minor).ok_or_else(malformed)?,
            patch: parse_component(patch).ok_or_else(malformed)?,
            hotfix,
        })
    }
}

impl fmt::Display for VersionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl PartialEq for VersionInfo {
    fn eq(&self, other: &Self) -> bool {
        self.components() == other.components()
    }
}

impl Eq for VersionInfo {}

impl PartialOrd for VersionInfo {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionInfo {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components().cmp(&other.components())
    }
}
