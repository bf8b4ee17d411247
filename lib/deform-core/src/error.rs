//! Error types for deform.
//!
//! Local validation failures ([`Error::MissingParameter`],
//! [`Error::UnknownParameter`]) never reach the wire. Everything the service
//! or the transport reports is funneled through the classifier and surfaces
//! as [`Error::Api`] carrying an [`ApiError`].

use std::fmt;

use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};

// ============================================================================
// Classified wire errors
// ============================================================================

/// The class of a failed call, as determined by the error classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum ErrorKind {
    /// Invalid authentication credentials (401).
    #[display("auth error")]
    Auth,
    /// Authenticated but not allowed (403).
    #[display("forbidden error")]
    Forbidden,
    /// Resource does not exist (404).
    #[display("not found error")]
    NotFound,
    /// Payload rejected by the service (422).
    #[display("validation error")]
    Validation,
    /// Resource already exists (409).
    #[display("conflict error")]
    Conflict,
    /// The connection could not be established.
    #[display("connection error")]
    Connection,
    /// Timed out while connecting.
    ///
    /// This is both a connection error and a timeout.
    #[display("connect timeout")]
    ConnectTimeout,
    /// The server did not send any data in the allotted amount of time.
    #[display("read timeout")]
    ReadTimeout,
    /// Any other HTTP-layer failure.
    #[display("HTTP error")]
    Http,
}

impl ErrorKind {
    /// Message used when the response body carries none.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Auth => "Auth error",
            Self::Forbidden => "Forbidden error",
            Self::NotFound => "Not found error",
            Self::Validation => "Validation error",
            Self::Conflict => "Conflict error",
            Self::Connection => "Connection error",
            Self::ConnectTimeout => "Connect timeout",
            Self::ReadTimeout => "Read timeout",
            Self::Http => "HTTP error",
        }
    }

    /// Returns `true` for [`Self::Connection`] and [`Self::ConnectTimeout`].
    #[must_use]
    pub const fn is_connection(self) -> bool {
        matches!(self, Self::Connection | Self::ConnectTimeout)
    }

    /// Returns `true` for [`Self::ConnectTimeout`] and [`Self::ReadTimeout`].
    #[must_use]
    pub const fn is_timeout(self) -> bool {
        matches!(self, Self::ConnectTimeout | Self::ReadTimeout)
    }
}

/// A per-property validation failure reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The offending property path.
    pub property: String,
    /// What is wrong with it.
    pub message: String,
}

/// A classified failure of a wire call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ErrorKind,
    status: Option<u16>,
    message: String,
    errors: Vec<FieldError>,
}

impl ApiError {
    /// Create a classified error.
    #[must_use]
    pub fn new(
        kind: ErrorKind,
        status: Option<u16>,
        message: impl Into<String>,
        errors: Vec<FieldError>,
    ) -> Self {
        Self {
            kind,
            status,
            message: message.into(),
            errors,
        }
    }

    /// Create an error of the given kind with its default message.
    #[must_use]
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, None, kind.default_message(), Vec::new())
    }

    /// The error class.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status code, when the failure came with a response.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        self.status
    }

    /// Human readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured per-property errors.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for error in &self.errors {
            write!(f, "\n* \"{}\" - {}", error.property, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

// ============================================================================
// Error Type
// ============================================================================

/// Main error type for deform operations.
#[derive(Debug, Display, Error, From)]
pub enum Error {
    /// A required parameter was not supplied.
    #[display("{_0} is required parameter")]
    #[from(skip)]
    MissingParameter(#[error(not(source))] String),

    /// An argument has no parameter definition.
    #[display("unknown parameter: {_0}")]
    #[from(skip)]
    UnknownParameter(#[error(not(source))] String),

    /// A method descriptor is inconsistent.
    #[display("invalid descriptor: {_0}")]
    #[from(skip)]
    InvalidDescriptor(#[error(not(source))] String),

    /// Arguments cannot be turned into a request.
    #[display("invalid request: {_0}")]
    #[from(skip)]
    InvalidRequest(#[error(not(source))] String),

    /// Classified wire failure.
    #[display("{_0}")]
    #[from]
    Api(ApiError),

    /// An outcome was consumed as the wrong shape.
    #[display("unexpected outcome: expected {expected}, got {actual}")]
    #[from(skip)]
    UnexpectedOutcome {
        /// Shape the caller asked for.
        expected: &'static str,
        /// Shape the call produced.
        actual: &'static str,
    },

    /// JSON serialization error.
    #[display("JSON serialization error: {_0}")]
    #[from]
    JsonSerialization(serde_json::Error),

    /// JSON deserialization error with path context.
    #[display("JSON deserialization error at '{path}': {message}")]
    #[from(skip)]
    JsonDeserialization {
        /// JSON path to the error (e.g., "result.sessionId").
        path: String,
        /// Error message.
        message: String,
    },

    /// URL parsing error.
    #[display("invalid URL: {_0}")]
    #[from]
    InvalidUrl(url::ParseError),
}

/// Result type alias using [`crate::Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a missing parameter error.
    #[must_use]
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    /// Create an unknown parameter error.
    #[must_use]
    pub fn unknown_parameter(name: impl Into<String>) -> Self {
        Self::UnknownParameter(name.into())
    }

    /// Create an invalid descriptor error.
    #[must_use]
    pub fn invalid_descriptor(message: impl Into<String>) -> Self {
        Self::InvalidDescriptor(message.into())
    }

    /// Create an invalid request error.
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create a JSON deserialization error with path context.
    #[must_use]
    pub fn json_deserialization(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JsonDeserialization {
            path: path.into(),
            message: message.into(),
        }
    }

    /// The classified wire error, if this is one.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(api) => Some(api),
            _ => None,
        }
    }

    /// The error class, if this is a wire error.
    #[must_use]
    pub fn kind(&self) -> Option<ErrorKind> {
        self.api().map(ApiError::kind)
    }

    /// Returns the HTTP status code if the failure came with a response.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        self.api().and_then(ApiError::status)
    }

    /// Returns `true` if this is a 404 Not Found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == Some(ErrorKind::NotFound)
    }

    /// Returns `true` for connect and read timeouts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_timeout)
    }

    /// Returns `true` for connection errors, including connect timeouts.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::missing_parameter("identity");
        assert_eq!(err.to_string(), "identity is required parameter");

        let err = Error::unknown_parameter("colour");
        assert_eq!(err.to_string(), "unknown parameter: colour");

        let err = Error::json_deserialization("result.sessionId", "missing field");
        assert_eq!(
            err.to_string(),
            "JSON deserialization error at 'result.sessionId': missing field"
        );
    }

    #[test]
    fn api_error_renders_message_only() {
        let err = ApiError::new(ErrorKind::NotFound, Some(404), "Document not found.", vec![]);
        assert_eq!(err.to_string(), "Document not found.");
        assert_eq!(Error::from(err).to_string(), "Document not found.");
    }

    #[test]
    fn api_error_renders_field_errors() {
        let err = ApiError::new(
            ErrorKind::Validation,
            Some(422),
            "Validation error",
            vec![
                FieldError {
                    property: "name".to_string(),
                    message: "Required.".to_string(),
                },
                FieldError {
                    property: "age".to_string(),
                    message: "Must be a number.".to_string(),
                },
            ],
        );
        assert_eq!(
            err.to_string(),
            "Validation error\n* \"name\" - Required.\n* \"age\" - Must be a number."
        );
    }

    #[test]
    fn kind_relations() {
        assert!(ErrorKind::ConnectTimeout.is_connection());
        assert!(ErrorKind::ConnectTimeout.is_timeout());
        assert!(ErrorKind::ReadTimeout.is_timeout());
        assert!(!ErrorKind::ReadTimeout.is_connection());
        assert!(ErrorKind::Connection.is_connection());
        assert!(!ErrorKind::Connection.is_timeout());
        assert!(!ErrorKind::Http.is_connection());
    }

    #[test]
    fn error_predicates() {
        let err = Error::from(ApiError::from_kind(ErrorKind::NotFound));
        assert!(err.is_not_found());
        assert!(!err.is_timeout());
        assert_eq!(err.status(), None);

        let err = Error::from(ApiError::from_kind(ErrorKind::ConnectTimeout));
        assert!(err.is_timeout());
        assert!(err.is_connection());
        assert_eq!(err.to_string(), "Connect timeout");

        assert!(!Error::missing_parameter("data").is_not_found());
        assert_eq!(Error::missing_parameter("data").kind(), None);
    }
}
