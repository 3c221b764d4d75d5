//! Field-scoped admission errors.
//!
//! Errors carry the JSON path of the offending field and render the way the
//! API server renders its own validation errors, e.g.
//! `spec.customAutoscaler.hpa.maxReplicas: Required value: maxReplicas must be set`.

use std::fmt;

/// Path to a field inside the resource, e.g. `spec.template.serviceName`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldPath(String);

impl FieldPath {
    pub fn new(root: &str) -> Self {
        Self(root.to_string())
    }

    pub fn child(&self, name: &str) -> Self {
        Self(format!("{}.{}", self.0, name))
    }

    /// Element of a list.
    pub fn index(&self, index: usize) -> Self {
        Self(format!("{}[{}]", self.0, index))
    }

    /// Entry of a map, such as an annotation.
    pub fn key(&self, key: &str) -> Self {
        Self(format!("{}[{}]", self.0, key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Invalid { value: String },
    Required,
    Duplicate { value: String },
    Forbidden,
    NotSupported { value: String, allowed: Vec<String> },
}

/// A single violation attached to a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldError {
    pub path: FieldPath,
    pub kind: ErrorKind,
    pub detail: String,
}

impl FieldError {
    pub fn invalid(path: FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: ErrorKind::Invalid {
                value: value.to_string(),
            },
            detail: detail.into(),
        }
    }

    pub fn required(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: ErrorKind::Required,
            detail: detail.into(),
        }
    }

    pub fn duplicate(path: FieldPath, value: impl fmt::Display, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: ErrorKind::Duplicate {
                value: value.to_string(),
            },
            detail: detail.into(),
        }
    }

    pub fn forbidden(path: FieldPath, detail: impl Into<String>) -> Self {
        Self {
            path,
            kind: ErrorKind::Forbidden,
            detail: detail.into(),
        }
    }

    pub fn not_supported<T: fmt::Display>(
        path: FieldPath,
        value: impl fmt::Display,
        allowed: &[T],
    ) -> Self {
        Self {
            path,
            kind: ErrorKind::NotSupported {
                value: value.to_string(),
                allowed: allowed.iter().map(ToString::to_string).collect(),
            },
            detail: String::new(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.path)?;
        match &self.kind {
            ErrorKind::Invalid { value } => write!(f, "Invalid value: \"{value}\"")?,
            ErrorKind::Required => write!(f, "Required value")?,
            ErrorKind::Duplicate { value } => write!(f, "Duplicate value: \"{value}\"")?,
            ErrorKind::Forbidden => write!(f, "Forbidden")?,
            ErrorKind::NotSupported { value, allowed } => {
                write!(f, "Unsupported value: \"{value}\": supported values: ")?;
                let quoted: Vec<String> = allowed.iter().map(|v| format!("\"{v}\"")).collect();
                write!(f, "{}", quoted.join(", "))?;
            }
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Render a list of errors as a single message. More than one error is
/// bracketed, matching the API server.
pub fn format_errors(errors: &[FieldError]) -> String {
    match errors {
        [single] => single.to_string(),
        _ => {
            let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
            format!("[{}]", rendered.join(", "))
        }
    }
}
