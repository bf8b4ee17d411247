//! Error classification.
//!
//! Every failed wire call goes through exactly one of [`classify_response`]
//! (the service answered with a non-2xx status) or [`classify_transport`]
//! (no usable response). Both are pure: classifying the same failure twice
//! yields equal [`ApiError`]s.

use derive_more::{Display, Error};
use serde::Deserialize;

use crate::error::{ApiError, ErrorKind, FieldError};

/// Failure reported by an [`HttpClient`](crate::HttpClient) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum TransportError {
    /// The connection was refused or dropped.
    #[display("connection error: {_0}")]
    Connect(#[error(not(source))] String),
    /// The connect phase timed out.
    #[display("connect timeout")]
    ConnectTimeout,
    /// The response did not arrive in time.
    #[display("read timeout")]
    ReadTimeout,
    /// TLS handshake or certificate failure.
    #[display("TLS error: {_0}")]
    Tls(#[error(not(source))] String),
    /// Anything else the transport could not do.
    #[display("transport error: {_0}")]
    Other(#[error(not(source))] String),
}

impl TransportError {
    /// Create a connection error.
    #[must_use]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect(message.into())
    }

    /// Create a TLS error.
    #[must_use]
    pub fn tls(message: impl Into<String>) -> Self {
        Self::Tls(message.into())
    }

    /// Create an unclassified transport error.
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Map an HTTP status to an error class.
///
/// Returns `None` for statuses without a dedicated class.
#[must_use]
pub const fn classify_status(status: u16) -> Option<ErrorKind> {
    match status {
        401 => Some(ErrorKind::Auth),
        403 => Some(ErrorKind::Forbidden),
        404 => Some(ErrorKind::NotFound),
        409 => Some(ErrorKind::Conflict),
        422 => Some(ErrorKind::Validation),
        _ => None,
    }
}

/// Map a transport failure to an error class.
#[must_use]
pub const fn classify_transport_kind(error: &TransportError) -> ErrorKind {
    match error {
        TransportError::Connect(_) => ErrorKind::Connection,
        TransportError::ConnectTimeout => ErrorKind::ConnectTimeout,
        TransportError::ReadTimeout => ErrorKind::ReadTimeout,
        TransportError::Tls(_) | TransportError::Other(_) => ErrorKind::Http,
    }
}

/// Classify a non-2xx response.
///
/// The message and field errors come from the `{"result": {"message", "errors"}}`
/// envelope when the body carries one.
#[must_use]
pub fn classify_response(status: u16, body: &[u8]) -> ApiError {
    let kind = classify_status(status).unwrap_or(ErrorKind::Http);
    let details = ErrorDetails::parse(body);
    let message = details
        .message
        .unwrap_or_else(|| kind.default_message().to_string());
    ApiError::new(kind, Some(status), message, details.errors)
}

/// Classify a failure that produced no response.
#[must_use]
pub fn classify_transport(error: &TransportError) -> ApiError {
    ApiError::from_kind(classify_transport_kind(error))
}

/// The parts of a `{"result": {"message", "errors"}}` envelope that parse.
#[derive(Debug, Default)]
struct ErrorDetails {
    message: Option<String>,
    errors: Vec<FieldError>,
}

impl ErrorDetails {
    fn parse(body: &[u8]) -> Self {
        let Ok(envelope) = serde_json::from_slice::<serde_json::Value>(body) else {
            return Self::default();
        };
        let Some(result) = envelope.get("result") else {
            return Self::default();
        };

        let message = result
            .get("message")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        // A malformed entry is dropped on its own.
        let errors = result
            .get("errors")
            .and_then(serde_json::Value::as_array)
            .into_iter()
            .flatten()
            .filter_map(|entry| FieldError::deserialize(entry).ok())
            .collect();

        Self { message, errors }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_table() {
        assert_eq!(classify_status(401), Some(ErrorKind::Auth));
        assert_eq!(classify_status(403), Some(ErrorKind::Forbidden));
        assert_eq!(classify_status(404), Some(ErrorKind::NotFound));
        assert_eq!(classify_status(409), Some(ErrorKind::Conflict));
        assert_eq!(classify_status(422), Some(ErrorKind::Validation));
        assert_eq!(classify_status(500), None);
        assert_eq!(classify_status(400), None);
    }

    #[test]
    fn not_found_uses_body_message() {
        let err = classify_response(404, br#"{"result":{"message":"Document not found."}}"#);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Document not found.");
    }

    #[test]
    fn validation_collects_field_errors() {
        let body = br#"{"result":{"message":"Validation error","errors":[{"property":"name","message":"Required."}]}}"#;
        let err = classify_response(422, body);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(
            err.errors(),
            &[FieldError {
                property: "name".to_string(),
                message: "Required.".to_string(),
            }]
        );
        assert_eq!(err.to_string(), "Validation error\n* \"name\" - Required.");
    }

    #[test]
    fn unmapped_status_falls_back_to_http() {
        let err = classify_response(500, b"<html>oops</html>");
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.message(), "HTTP error");
        assert!(err.errors().is_empty());
    }

    #[test]
    fn missing_message_uses_class_default() {
        let err = classify_response(401, br#"{"result":{}}"#);
        assert_eq!(err.message(), "Auth error");

        let err = classify_response(409, b"");
        assert_eq!(err.message(), "Conflict error");
    }

    #[test]
    fn malformed_field_error_keeps_message() {
        let body = br#"{"result":{"message":"Invalid data","errors":[{"property":"name"},{"property":"age","message":"Too low."}]}}"#;
        let err = classify_response(422, body);
        assert_eq!(err.message(), "Invalid data");
        assert_eq!(
            err.errors(),
            &[FieldError {
                property: "age".to_string(),
                message: "Too low.".to_string(),
            }]
        );

        let err = classify_response(403, br#"{"result":{"message":"Nope","errors":"oops"}}"#);
        assert_eq!(err.message(), "Nope");
        assert!(err.errors().is_empty());
    }

    #[test]
    fn transport_table() {
        assert_eq!(
            classify_transport(&TransportError::connect("refused")).kind(),
            ErrorKind::Connection
        );
        assert_eq!(
            classify_transport(&TransportError::ConnectTimeout).kind(),
            ErrorKind::ConnectTimeout
        );
        assert_eq!(
            classify_transport(&TransportError::ReadTimeout).to_string(),
            "Read timeout"
        );
        assert_eq!(
            classify_transport(&TransportError::tls("bad certificate")).kind(),
            ErrorKind::Http
        );
    }

    #[test]
    fn classification_is_idempotent() {
        let body = br#"{"result":{"message":"Nope","errors":[{"property":"a","message":"b"}]}}"#;
        assert_eq!(classify_response(403, body), classify_response(403, body));

        let err = TransportError::connect("refused");
        assert_eq!(classify_transport(&err), classify_transport(&err));
    }
}
