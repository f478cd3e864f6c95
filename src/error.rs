//! Error types for SCIM filter and PATCH processing.
//!
//! Every failure raised by the parser, the strict filter compiler and the
//! patch engine is a [`ScimError`]. The variants line up with the `scimType`
//! keywords of RFC 7644 §3.12 so an HTTP layer can map them directly.

use crate::schema::Mutability;

/// Main error type for filter and PATCH operations.
#[derive(Debug, thiserror::Error)]
pub enum ScimError {
    /// Filter or path text could not be reduced by the grammar
    #[error("Invalid filter '{filter}' at token '{token}': {message}")]
    FilterParse {
        message: String,
        token: String,
        filter: String,
    },

    /// Filter is well formed but not allowed for the attributes it touches
    #[error("Unsupported filter: {message}")]
    UnsupportedFilter { message: String },

    /// PATCH path does not name an attribute of the resource schema
    #[error("Invalid path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    /// PATCH operation has nothing to act on
    #[error("No target for path '{path}'")]
    NoTarget { path: String },

    /// Mutation of a readOnly or already-set immutable attribute
    #[error("Attribute '{attribute}' is {mutability} and cannot be modified")]
    Mutability {
        attribute: String,
        mutability: Mutability,
    },

    /// PATCH value has the wrong shape for the target attribute
    #[error("Invalid value for attribute '{attribute}': {message}")]
    InvalidValue { attribute: String, message: String },

    /// Malformed PATCH request body
    #[error("Invalid syntax: {message}")]
    InvalidSyntax { message: String },

    /// Schema not found in the registry
    #[error("Schema not found: {schema_id}")]
    SchemaNotFound { schema_id: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScimError {
    /// Create a filter parse error for the given offending token.
    pub fn filter_parse(
        message: impl Into<String>,
        token: impl Into<String>,
        filter: impl Into<String>,
    ) -> Self {
        Self::FilterParse {
            message: message.into(),
            token: token.into(),
            filter: filter.into(),
        }
    }

    pub fn unsupported_filter(message: impl Into<String>) -> Self {
        Self::UnsupportedFilter {
            message: message.into(),
        }
    }

    pub fn invalid_path(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn no_target(path: impl Into<String>) -> Self {
        Self::NoTarget { path: path.into() }
    }

    pub fn mutability(attribute: impl Into<String>, mutability: Mutability) -> Self {
        Self::Mutability {
            attribute: attribute.into(),
            mutability,
        }
    }

    pub fn invalid_value(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            attribute: attribute.into(),
            message: message.into(),
        }
    }

    pub fn invalid_syntax(message: impl Into<String>) -> Self {
        Self::InvalidSyntax {
            message: message.into(),
        }
    }

    pub fn schema_not_found(schema_id: impl Into<String>) -> Self {
        Self::SchemaNotFound {
            schema_id: schema_id.into(),
        }
    }

    /// The RFC 7644 `scimType` keyword for this error, if it has one.
    pub fn scim_type(&self) -> Option<&'static str> {
        match self {
            Self::FilterParse { .. } | Self::UnsupportedFilter { .. } => Some("invalidFilter"),
            Self::InvalidPath { .. } => Some("invalidPath"),
            Self::NoTarget { .. } => Some("noTarget"),
            Self::Mutability { .. } => Some("mutability"),
            Self::InvalidValue { .. } => Some("invalidValue"),
            Self::InvalidSyntax { .. } => Some("invalidSyntax"),
            Self::SchemaNotFound { .. } | Self::Json(_) => None,
        }
    }

    /// HTTP status an outer REST layer should answer with.
    pub fn status(&self) -> u16 {
        match self {
            Self::SchemaNotFound { .. } => 404,
            Self::Json(_) => 500,
            _ => 400,
        }
    }
}

// Result type alias for convenience
pub type ScimResult<T> = Result<T, ScimError>;
