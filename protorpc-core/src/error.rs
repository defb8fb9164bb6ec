use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::call::CallState;

/// Application-level failure codes carried in the reply envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    BadRequest,
    NotFound,
    PermissionDenied,
    Unauthenticated,
    FailedPrecondition,
    Unavailable,
    Internal,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::BadRequest => "bad_request",
            ErrorCode::NotFound => "not_found",
            ErrorCode::PermissionDenied => "permission_denied",
            ErrorCode::Unauthenticated => "unauthenticated",
            ErrorCode::FailedPrecondition => "failed_precondition",
            ErrorCode::Unavailable => "unavailable",
            ErrorCode::Internal => "internal",
            ErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Business-logic failure signaled by the server inside a well-formed reply.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct ApplicationError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApplicationError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApplicationError {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: Value) -> Self {
        ApplicationError {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PermissionDenied, message)
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthenticated, message)
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FailedPrecondition, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unavailable, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

/// Which terminal error state a call ended in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request was invalid before anything was sent.
    Request,
    /// The server replied with something that could not be decoded.
    Server,
    /// The exchange failed at the connection level.
    Network,
    /// The server reported a business-logic failure.
    Application,
    /// The caller cancelled the call while it was running.
    Cancelled,
}

impl ErrorKind {
    /// The terminal call state this kind resolves to.
    pub fn state(self) -> CallState {
        match self {
            ErrorKind::Request => CallState::RequestError,
            ErrorKind::Server => CallState::ServerError,
            ErrorKind::Network => CallState::NetworkError,
            ErrorKind::Application => CallState::ApplicationError,
            ErrorKind::Cancelled => CallState::Cancelled,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Request => "request",
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
            ErrorKind::Application => "application",
            ErrorKind::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Terminal error recorded on a call.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind} error: {detail}")]
pub struct CallError {
    pub kind: ErrorKind,
    pub detail: String,
    /// Present only for [`ErrorKind::Application`].
    pub application: Option<ApplicationError>,
}

impl CallError {
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        CallError {
            kind,
            detail: detail.into(),
            application: None,
        }
    }

    pub fn request(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Request, detail)
    }

    pub fn server(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Server, detail)
    }

    pub fn network(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, detail)
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "call cancelled by caller")
    }

    pub fn application(error: ApplicationError) -> Self {
        CallError {
            kind: ErrorKind::Application,
            detail: error.to_string(),
            application: Some(error),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        self.application.as_ref().map(|e| e.code)
    }
}

/// Descriptor registry failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown method '{method}' on service '{service}'")]
    UnknownMethod { service: String, method: String },
    #[error("method '{method}' registered twice on service '{service}'")]
    DuplicateMethod { service: String, method: String },
    #[error("invalid method schema: {0}")]
    InvalidSchema(String),
}

impl From<CodecError> for RegistryError {
    fn from(err: CodecError) -> Self {
        RegistryError::InvalidSchema(err.to_string())
    }
}

/// Failures while turning messages into bytes or back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message does not match schema '{schema}': {reason}")]
    Schema { schema: String, reason: String },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("message too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

/// A transition was attempted on a call that already reached a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("call already in terminal state {0}")]
    AlreadyTerminal(CallState),
}

/// Error returned by the awaitable service façade.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Call(#[from] CallError),
}

impl ServiceError {
    /// The call error kind, if the call was dispatched at all.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            ServiceError::Registry(_) => None,
            ServiceError::Call(e) => Some(e.kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = ApplicationError::new(ErrorCode::BadRequest, "Invalid input");
        assert_eq!(err.code, ErrorCode::BadRequest);
        assert_eq!(err.message, "Invalid input");
        assert_eq!(err.data, None);
    }

    #[test]
    fn test_error_with_data() {
        let data = serde_json::json!({"field": "value"});
        let err = ApplicationError::with_data(ErrorCode::Internal, "Server error", data.clone());
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.data, Some(data));
    }

    #[test]
    fn test_convenience_constructors() {
        assert_eq!(ApplicationError::bad_request("x").code, ErrorCode::BadRequest);
        assert_eq!(ApplicationError::not_found("x").code, ErrorCode::NotFound);
        assert_eq!(
            ApplicationError::permission_denied("x").code,
            ErrorCode::PermissionDenied
        );
        assert_eq!(
            ApplicationError::unauthenticated("x").code,
            ErrorCode::Unauthenticated
        );
        assert_eq!(
            ApplicationError::failed_precondition("x").code,
            ErrorCode::FailedPrecondition
        );
        assert_eq!(ApplicationError::unavailable("x").code, ErrorCode::Unavailable);
        assert_eq!(ApplicationError::internal("x").code, ErrorCode::Internal);
    }

    #[test]
    fn test_error_code_wire_names() {
        let json = serde_json::to_string(&ErrorCode::FailedPrecondition).unwrap();
        assert_eq!(json, "\"failed_precondition\"");
        assert_eq!(ErrorCode::FailedPrecondition.to_string(), "failed_precondition");
    }

    #[test]
    fn test_unknown_error_code_decodes() {
        let code: ErrorCode = serde_json::from_str("\"quota_exceeded\"").unwrap();
        assert_eq!(code, ErrorCode::Unknown);
    }

    #[test]
    fn test_application_error_serialization() {
        let err = ApplicationError::with_data(ErrorCode::NotFound, "no such user", serde_json::json!({"id": 7}));
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"data\""));
        let back: ApplicationError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, back);

        let bare = serde_json::to_string(&ApplicationError::internal("boom")).unwrap();
        assert!(!bare.contains("data"));
    }

    #[test]
    fn test_call_error_kinds_map_to_states() {
        assert_eq!(CallError::request("x").kind.state(), CallState::RequestError);
        assert_eq!(CallError::server("x").kind.state(), CallState::ServerError);
        assert_eq!(CallError::network("x").kind.state(), CallState::NetworkError);
        assert_eq!(CallError::cancelled().kind.state(), CallState::Cancelled);

        let app = CallError::application(ApplicationError::permission_denied("nope"));
        assert_eq!(app.kind.state(), CallState::ApplicationError);
        assert_eq!(app.code(), Some(ErrorCode::PermissionDenied));
        assert_eq!(app.detail, "permission_denied: nope");
    }

    #[test]
    fn test_error_display() {
        let err = CallError::network("connection refused");
        assert_eq!(err.to_string(), "network error: connection refused");

        let err = RegistryError::UnknownMethod {
            service: "Echo".into(),
            method: "ping".into(),
        };
        assert_eq!(err.to_string(), "unknown method 'ping' on service 'Echo'");

        let err: ServiceError = err.into();
        assert_eq!(err.kind(), None);
    }
}
