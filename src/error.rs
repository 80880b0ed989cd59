//! Error taxonomy and reporter.
//!
//! # Responsibilities
//! - Define the closed set of internal error codes
//! - Map every code to exactly one HTTP status and one stable message
//! - Log and serialize failures as `{"errcode": <int>, "msg": <string>}`
//!
//! # Design Decisions
//! - The wrapped cause is logged, never serialized
//! - Every handler returns either a success value or an `ErrorEnvelope`

use std::fmt;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

type Cause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Internal error codes, grouped by concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Data store
    NoDatabase,
    DbDelete,
    DbSave,
    IdNotFound,
    NameNotFound,
    FileNotFound,

    // Serialization
    MarshalJson,
    UnmarshalJson,
    MarshalProto,

    // Request
    IdNotInRequest,
    IdWrongFormat,
    NameWrongFormat,
    PayloadEmpty,
    Form,
    UnexpectedId,
    UnknownSuffix,
    UserNotInRequest,
    UserUnknown,
    MissingField,
    OwnerNotInRequest,
    ModelNotInRequest,
    InvalidPaginationRequest,
    MethodNotAllowed,

    // Authentication / authorization
    AuthNoUser,
    AuthJwtInvalid,
    Unauthorized,
    CsrfInvalid,

    // Resource lifecycle
    ZipNotAvailable,
    ResourceExists,
    CreatingDir,
    CreatingRepo,
    CreatingFile,
    Unzipping,
    NonExistentResource,
    Repo,
    RemovingDir,
    FileTree,
    UnexpectedFailure,
}

impl ErrorCode {
    /// Numeric code sent to clients as `errcode`.
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::NoDatabase => 1000,
            ErrorCode::DbDelete => 1001,
            ErrorCode::DbSave => 1002,
            ErrorCode::IdNotFound => 1003,
            ErrorCode::NameNotFound => 1004,
            ErrorCode::FileNotFound => 1005,
            ErrorCode::MarshalJson => 2000,
            ErrorCode::UnmarshalJson => 2001,
            ErrorCode::MarshalProto => 2500,
            ErrorCode::IdNotInRequest => 3000,
            ErrorCode::IdWrongFormat => 3001,
            ErrorCode::NameWrongFormat => 3002,
            ErrorCode::PayloadEmpty => 3003,
            ErrorCode::Form => 3004,
            ErrorCode::UnexpectedId => 3005,
            ErrorCode::UnknownSuffix => 3006,
            ErrorCode::UserNotInRequest => 3007,
            ErrorCode::UserUnknown => 3008,
            ErrorCode::MissingField => 3009,
            ErrorCode::OwnerNotInRequest => 3010,
            ErrorCode::ModelNotInRequest => 3011,
            ErrorCode::InvalidPaginationRequest => 3012,
            ErrorCode::MethodNotAllowed => 3013,
            ErrorCode::AuthNoUser => 4000,
            ErrorCode::AuthJwtInvalid => 4001,
            ErrorCode::Unauthorized => 4002,
            ErrorCode::CsrfInvalid => 4003,
            ErrorCode::ZipNotAvailable => 100000,
            ErrorCode::ResourceExists => 100001,
            ErrorCode::CreatingDir => 100002,
            ErrorCode::CreatingRepo => 100003,
            ErrorCode::CreatingFile => 100004,
            ErrorCode::Unzipping => 100005,
            ErrorCode::NonExistentResource => 100006,
            ErrorCode::Repo => 100007,
            ErrorCode::RemovingDir => 100008,
            ErrorCode::FileTree => 100009,
            ErrorCode::UnexpectedFailure => 100010,
        }
    }

    /// HTTP status the code maps to.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorCode::NoDatabase => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::DbDelete | ErrorCode::DbSave => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::IdNotFound | ErrorCode::NameNotFound | ErrorCode::FileNotFound => {
                StatusCode::NOT_FOUND
            }
            ErrorCode::MarshalJson | ErrorCode::MarshalProto => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::UnmarshalJson => StatusCode::BAD_REQUEST,
            ErrorCode::IdNotInRequest
            | ErrorCode::IdWrongFormat
            | ErrorCode::NameWrongFormat
            | ErrorCode::PayloadEmpty
            | ErrorCode::Form
            | ErrorCode::UnexpectedId
            | ErrorCode::UnknownSuffix
            | ErrorCode::UserNotInRequest
            | ErrorCode::UserUnknown
            | ErrorCode::MissingField
            | ErrorCode::OwnerNotInRequest
            | ErrorCode::ModelNotInRequest
            | ErrorCode::InvalidPaginationRequest => StatusCode::BAD_REQUEST,
            ErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ErrorCode::AuthNoUser | ErrorCode::AuthJwtInvalid | ErrorCode::CsrfInvalid => {
                StatusCode::FORBIDDEN
            }
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::ZipNotAvailable
            | ErrorCode::NonExistentResource
            | ErrorCode::Repo => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::ResourceExists => StatusCode::CONFLICT,
            ErrorCode::CreatingDir
            | ErrorCode::CreatingRepo
            | ErrorCode::CreatingFile
            | ErrorCode::RemovingDir
            | ErrorCode::FileTree
            | ErrorCode::UnexpectedFailure => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Unzipping => StatusCode::BAD_REQUEST,
        }
    }

    /// Stable human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::NoDatabase => "Unable to connect to the database",
            ErrorCode::DbDelete => "Unable to remove resource from the database",
            ErrorCode::DbSave => "Unable to save resource into the database",
            ErrorCode::IdNotFound => "Requested id not found on server",
            ErrorCode::NameNotFound => "Requested name not found on server",
            ErrorCode::FileNotFound => "Requested file not found on server",
            ErrorCode::MarshalJson => "Unable to marshal the response into a JSON",
            ErrorCode::UnmarshalJson => "Unable to decode JSON payload included in the request",
            ErrorCode::MarshalProto => "Unable to marshal the response into a protobuf",
            ErrorCode::IdNotInRequest => "ID not present in request",
            ErrorCode::IdWrongFormat => "ID in request is in an invalid format",
            ErrorCode::NameWrongFormat => "Name in request is in an invalid format",
            ErrorCode::PayloadEmpty => "Payload empty in the request",
            ErrorCode::Form => "Missing field in the multipart form",
            ErrorCode::UnexpectedId => "Unexpected id included in your request",
            ErrorCode::UnknownSuffix => "Unknown suffix requested",
            ErrorCode::UserNotInRequest => "User or team not present in the request",
            ErrorCode::UserUnknown => "Provided user or team does not exist on the server",
            ErrorCode::MissingField => "One or more required fields are missing",
            ErrorCode::OwnerNotInRequest => "Owner name not present in request",
            ErrorCode::ModelNotInRequest => "Model name not present in request",
            ErrorCode::InvalidPaginationRequest => "Invalid pagination request",
            ErrorCode::MethodNotAllowed => "Method not allowed on this route",
            ErrorCode::AuthNoUser => "No user in server with the claimed identity",
            ErrorCode::AuthJwtInvalid => {
                "Unable to process user ID from the JWT included in request"
            }
            ErrorCode::Unauthorized => "Unauthorized request",
            ErrorCode::CsrfInvalid => "CSRF token missing or invalid",
            ErrorCode::ZipNotAvailable => "Zip file not available for this resource",
            ErrorCode::ResourceExists => "A resource with the same id already exists",
            ErrorCode::CreatingDir => "Unable to create a new directory for the resource",
            ErrorCode::CreatingRepo => "Unable to create a new repository for the resource",
            ErrorCode::CreatingFile => "Unable to create a new file for the resource",
            ErrorCode::Unzipping => "Unable to unzip a file",
            ErrorCode::NonExistentResource => "Unable to find the requested resource",
            ErrorCode::Repo => "Unable to process repository command",
            ErrorCode::RemovingDir => "Unable to remove a resource directory",
            ErrorCode::FileTree => "Unable to get files from model",
            ErrorCode::UnexpectedFailure => "Unexpected internal failure",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A failure on its way to the client.
#[derive(Debug, thiserror::Error)]
#[error("[{code}] {msg}")]
pub struct ErrorEnvelope {
    code: ErrorCode,
    msg: String,
    #[source]
    cause: Option<Cause>,
}

impl ErrorEnvelope {
    pub fn new(code: ErrorCode) -> Self {
        Self {
            code,
            msg: code.message().to_string(),
            cause: None,
        }
    }

    /// Attach the underlying failure. It is logged, not sent.
    pub fn with_cause(code: ErrorCode, cause: impl Into<Cause>) -> Self {
        Self {
            cause: Some(cause.into()),
            ..Self::new(code)
        }
    }

    /// Append the offending argument names to the message.
    pub fn with_args(mut self, args: &[&str]) -> Self {
        if !args.is_empty() {
            self.msg = format!("{}: {}", self.msg, args.join(", "));
        }
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    pub fn message(&self) -> &str {
        &self.msg
    }

    pub fn cause(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        self.cause.as_deref()
    }

    /// The JSON body sent to clients.
    pub fn body(&self) -> ErrorBody<'_> {
        ErrorBody {
            errcode: self.code.code(),
            msg: &self.msg,
        }
    }
}

impl From<ErrorCode> for ErrorEnvelope {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

/// Wire shape of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub errcode: i64,
    pub msg: &'a str,
}

impl IntoResponse for ErrorEnvelope {
    fn into_response(self) -> Response {
        match &self.cause {
            Some(cause) => tracing::error!(
                errcode = self.code.code(),
                status = self.status().as_u16(),
                msg = %self.msg,
                cause = %cause,
                "Request failed"
            ),
            None => tracing::error!(
                errcode = self.code.code(),
                status = self.status().as_u16(),
                msg = %self.msg,
                "Request failed"
            ),
        }

        (self.status(), Json(self.body())).into_response()
    }
}
