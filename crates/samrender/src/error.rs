//! evaluation errors
//!
//! Every error raised while resolving a node carries the [Path] of that node. Errors are never
//! swallowed: the first one aborts the render.
use crate::path::Path;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
#[error("{path}: {kind}")]
pub struct Error {
    pub path: Path,
    pub kind: ErrorKind,
}

impl Error {
    pub fn new(path: &Path, kind: ErrorKind) -> Self {
        Self {
            path: path.clone(),
            kind,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ErrorKind {
    #[error("unknown function `{0}`")]
    UnknownFunction(String),
    #[error("parameter `{0}` is not defined or has no value")]
    UndefinedParameter(String),
    #[error("value `{value}` of parameter `{name}` is not one of its allowed values")]
    DisallowedParameterValue { name: String, value: String },
    #[error("condition `{0}` is not defined")]
    UndefinedCondition(String),
    #[error("mapping lookup {map}.{top_key}.{second_key} failed: `{missing}` not found")]
    MissingMappingKey {
        map: String,
        top_key: String,
        second_key: String,
        missing: String,
    },
    #[error("circular dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),
    #[error("unresolved placeholder `${{{0}}}`")]
    SubstitutionPlaceholder(String),
    #[error("index {index} is out of range for a list of {len} elements")]
    SelectIndexOutOfRange { index: i64, len: usize },
    #[error("invalid arguments for `{function}`: {message}")]
    InvalidArguments { function: String, message: String },
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error(transparent)]
    ExternalResolution(#[from] ExternalError),
}

/// Failures of the external-resolution capability
///
/// `reference` is the import name or dynamic reference as written in the document.
#[derive(thiserror::Error, Debug)]
pub enum ExternalError {
    #[error("no backend configured to resolve `{reference}`")]
    NotConfigured { reference: String },
    #[error("backend call for `{reference}` failed")]
    Failed {
        reference: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    #[error("`{reference}` not found at backend")]
    NotFound { reference: String },
    #[error("key `{key}` not found in secret `{reference}`")]
    KeyNotFound { reference: String, key: String },
    #[error("secret `{reference}` is not a JSON object")]
    InvalidSecretJson {
        reference: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("backend call for `{reference}` timed out after {seconds}s")]
    Timeout { reference: String, seconds: u64 },
}

impl ExternalError {
    /// The reference (import name or secret reference) this error is about
    pub fn reference(&self) -> &str {
        match self {
            ExternalError::NotConfigured { reference }
            | ExternalError::Failed { reference, .. }
            | ExternalError::NotFound { reference }
            | ExternalError::KeyNotFound { reference, .. }
            | ExternalError::InvalidSecretJson { reference, .. }
            | ExternalError::Timeout { reference, .. } => reference,
        }
    }

    /// Replace the reference with the one written in the document, e.g. the full
    /// `{{resolve:...}}` text instead of the bare secret id
    pub fn in_reference(mut self, written: &str) -> Self {
        match &mut self {
            ExternalError::NotConfigured { reference }
            | ExternalError::Failed { reference, .. }
            | ExternalError::NotFound { reference }
            | ExternalError::KeyNotFound { reference, .. }
            | ExternalError::InvalidSecretJson { reference, .. }
            | ExternalError::Timeout { reference, .. } => *reference = written.into(),
        }
        self
    }
}
