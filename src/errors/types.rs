//! # Error Types
//!
//! Crate-wide error type for the annotation service using `thiserror`.

use crate::domain::AnnotationId;

/// Custom result type for service operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the annotation service
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A user with the requested username already exists
    #[error("Username already registered")]
    DuplicateUsername,

    /// Login rejected; never says whether the user or the password was wrong
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Any failure to resolve a bearer token into a known user
    #[error("Could not validate credentials")]
    Unauthenticated,

    /// Text submitted for annotation or storage was empty
    #[error("Text cannot be empty")]
    EmptyText,

    /// A stored annotation payload could not be decoded
    #[error("Corrupt annotation data for record '{id}'")]
    CorruptAnnotationData {
        id: AnnotationId,
        #[source]
        source: serde_json::Error,
    },

    /// Storage or prediction collaborator did not respond correctly
    #[error("Service unavailable: {context}")]
    Unavailable {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Requested record does not exist
    #[error("{resource} '{id}' not found")]
    NotFound { resource: String, id: String },

    /// Request validation errors
    #[error("Validation error: {message}")]
    Validation { message: String, field: Option<String> },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into(), field: None }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation { message: message.into(), field: Some(field.into()) }
    }

    /// Create a not-found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound { resource: resource.into(), id: id.into() }
    }

    /// Create an unavailability error without an underlying source
    pub fn unavailable<S: Into<String>>(context: S) -> Self {
        Self::Unavailable { context: context.into(), source: None }
    }

    /// Wrap a storage failure with context
    pub fn database<S: Into<String>>(source: sqlx::Error, context: S) -> Self {
        Self::Unavailable { context: context.into(), source: Some(Box::new(source)) }
    }

    /// Get the HTTP status code that should be returned for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::DuplicateUsername => 400,
            Error::InvalidCredentials => 401,
            Error::Unauthenticated => 401,
            Error::EmptyText => 400,
            Error::CorruptAnnotationData { .. } => 500,
            Error::Unavailable { .. } => 503,
            Error::NotFound { .. } => 404,
            Error::Validation { .. } => 400,
            Error::Config(_) => 500,
            Error::Internal(_) => 500,
        }
    }
}

impl From<sqlx::Error> for Error {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error, "Database operation failed")
    }
}

impl From<config::ConfigError> for Error {
    fn from(error: config::ConfigError) -> Self {
        Self::Config(format!("Configuration loading failed: {}", error))
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let message = field_errors
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| {
                        e.message.as_ref().map_or("Invalid value".to_string(), |m| m.to_string())
                    })
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        let field = if field_errors.len() == 1 {
            field_errors.keys().next().map(|f| f.to_string())
        } else {
            None
        };

        // Nested structs report through `errors()`, not `field_errors()`.
        let message = if message.is_empty() { errors.to_string() } else { message };

        Self::Validation { message: format!("Validation failed: {}", message), field }
    }
}
