//! Typed errors and their wire names.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Every failure a Model or Service can report. The payload is the human text;
/// the wire name comes from [`ErrorKind::name`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("{0}")]
    ParameterType(String),
    #[error("{0}")]
    RecordType(String),
    #[error("{0}")]
    SchemaValidation(String),
    #[error("{0}")]
    BadParameter(String),
    #[error("{0}")]
    InsecureOperation(String),
    #[error("{0}")]
    ConfirmAuthorization(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    AuthenticationFailed(String),
    #[error("{0}")]
    ReauthenticationRequired(String),
    #[error("{0}")]
    RecordExists(String),
    #[error("{0}")]
    RecordDeleted(String),
    #[error("{0}")]
    NoRecordsFound(String),
    #[error("{0}")]
    BadRange(String),
    #[error("{0}")]
    NoRouteFound(String),
    #[error("{0}")]
    NoSuchMethod(String),
    #[error("{0}")]
    Cryptography(String),
    #[error("{0}")]
    Internal(String),
    /// A panic caught at the controller boundary.
    #[error("{0}")]
    Unexpected(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParameterType,
    RecordType,
    SchemaValidation,
    BadParameter,
    InsecureOperation,
    ConfirmAuthorization,
    Unauthorized,
    AuthenticationFailed,
    ReauthenticationRequired,
    RecordExists,
    RecordDeleted,
    NoRecordsFound,
    BadRange,
    NoRouteFound,
    NoSuchMethod,
    Cryptography,
    Internal,
    Unexpected,
}

impl ErrorKind {
    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::ParameterType => "ParameterTypeError",
            ErrorKind::RecordType => "RecordTypeError",
            ErrorKind::SchemaValidation => "SchemaValidationTypeError",
            ErrorKind::BadParameter => "BadParameterError",
            ErrorKind::InsecureOperation => "InsecureOperationError",
            ErrorKind::ConfirmAuthorization => "ConfirmAuthorizationError",
            ErrorKind::Unauthorized => "UnauthorizedError",
            ErrorKind::AuthenticationFailed => "AuthenticationFailedError",
            ErrorKind::ReauthenticationRequired => "ReauthenticationRequiredError",
            ErrorKind::RecordExists => "RecordExistsError",
            ErrorKind::RecordDeleted => "RecordDeletedError",
            ErrorKind::NoRecordsFound => "NoRecordsFoundError",
            ErrorKind::BadRange => "BadRangeError",
            ErrorKind::NoRouteFound => "NoRouteFoundError",
            ErrorKind::NoSuchMethod => "NoSuchMethodTypeError",
            ErrorKind::Cryptography => "CryptographyError",
            ErrorKind::Internal => "Error",
            ErrorKind::Unexpected => "<no error name>",
        }
    }

    /// Kinds answered with 401 and accepted by the auth check as a denial reason.
    pub fn is_unauthorized_family(self) -> bool {
        matches!(
            self,
            ErrorKind::Unauthorized | ErrorKind::AuthenticationFailed | ErrorKind::ReauthenticationRequired
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::ParameterType(_) => ErrorKind::ParameterType,
            AppError::RecordType(_) => ErrorKind::RecordType,
            AppError::SchemaValidation(_) => ErrorKind::SchemaValidation,
            AppError::BadParameter(_) => ErrorKind::BadParameter,
            AppError::InsecureOperation(_) => ErrorKind::InsecureOperation,
            AppError::ConfirmAuthorization(_) => ErrorKind::ConfirmAuthorization,
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            AppError::ReauthenticationRequired(_) => ErrorKind::ReauthenticationRequired,
            AppError::RecordExists(_) => ErrorKind::RecordExists,
            AppError::RecordDeleted(_) => ErrorKind::RecordDeleted,
            AppError::NoRecordsFound(_) => ErrorKind::NoRecordsFound,
            AppError::BadRange(_) => ErrorKind::BadRange,
            AppError::NoRouteFound(_) => ErrorKind::NoRouteFound,
            AppError::NoSuchMethod(_) => ErrorKind::NoSuchMethod,
            AppError::Cryptography(_) => ErrorKind::Cryptography,
            AppError::Internal(_) => ErrorKind::Internal,
            AppError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }

    /// `<ErrorKindName>: <text>`, the form every error body carries.
    pub fn message(&self) -> String {
        format!("{}: {}", self.kind().name(), self)
    }
}

/// A response-registry lookup that found no entry; a configuration bug.
#[derive(Error, Debug)]
#[error("response registry is missing key: {0}")]
pub struct RegistryError(pub String);

#[derive(Serialize)]
pub struct BareErrorBody {
    pub code: u16,
    pub status: &'static str,
    pub message: String,
}

impl IntoResponse for RegistryError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = BareErrorBody {
            code: status.as_u16(),
            status: "Internal Server Error",
            message: format!("Error: {}", self),
        };
        (status, Json(body)).into_response()
    }
}
