use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomError {
    #[error("Missing required property \"{property}\" on node {node_type}")]
    MissingRequiredProperty { property: String, node_type: String },
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("Unknown {kind} literal: \"{value}\"")]
    UnknownEnumLiteral { kind: &'static str, value: String },
    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),
    #[error("Cannot add {child} node as a child of {parent}")]
    StructuralConstraintViolation { parent: String, child: String },
    #[error("Invalid value for \"{property}\": {reason}")]
    InvalidValue { property: String, reason: String },
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),
    #[error("Failed to create surface")]
    SurfaceFailure,
    #[error("Failed to encode image")]
    EncodeFailure,
    #[error("Recursion depth limit exceeded")]
    RecursionLimit,
    #[error("Script error: {0}")]
    Script(String),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DomError {
    pub(crate) fn invalid(property: &str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            property: property.to_string(),
            reason: reason.into(),
        }
    }
}
