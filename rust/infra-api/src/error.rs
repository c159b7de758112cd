//! Error taxonomy for the inventory API.
//!
//! Every failure surfaced to a caller is a single [`ApiError`] carrying one
//! gRPC status code and a human-readable message. Collaborator failures are
//! wrapped once with the name of the operation that observed them and keep
//! the code of the underlying error.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tonic::Code;

/// Core error type for inventory API operations.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed input: bad target cardinality, bad time window, bad pagination.
    #[error("{0}")]
    InvalidArgument(String),

    /// The request carried no tenant.
    #[error("{0}")]
    Unauthenticated(String),

    /// The referenced resource does not exist for the tenant.
    #[error("{0}")]
    NotFound(String),

    /// The resource is in a state that forbids the operation, such as a
    /// host still targeted by a schedule.
    #[error("{0}")]
    FailedPrecondition(String),

    /// The caller cancelled the request.
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline elapsed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// A backing service (cache, store) could not be reached.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// An error annotated with the operation that observed it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<ApiError>,
    },
}

/// Result type alias for inventory API operations.
pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn failed_precondition(message: impl Into<String>) -> Self {
        Self::FailedPrecondition(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Annotate the error with the operation that observed it.
    #[must_use]
    pub fn wrap(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The gRPC status code of this error. Wrapping never changes the code.
    pub fn code(&self) -> Code {
        match self {
            Self::InvalidArgument(_) => Code::InvalidArgument,
            Self::Unauthenticated(_) => Code::Unauthenticated,
            Self::NotFound(_) => Code::NotFound,
            Self::FailedPrecondition(_) => Code::FailedPrecondition,
            Self::Cancelled => Code::Cancelled,
            Self::DeadlineExceeded => Code::DeadlineExceeded,
            Self::Unavailable(_) => Code::Unavailable,
            Self::Internal(_) => Code::Internal,
            Self::Context { source, .. } => source.code(),
        }
    }

    /// HTTP status used by the REST surface, following the grpc-gateway table.
    pub fn http_status(&self) -> StatusCode {
        match self.code() {
            Code::InvalidArgument | Code::FailedPrecondition => StatusCode::BAD_REQUEST,
            Code::Unauthenticated => StatusCode::UNAUTHORIZED,
            Code::NotFound => StatusCode::NOT_FOUND,
            Code::Cancelled => {
                StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ApiError> for tonic::Status {
    fn from(err: ApiError) -> Self {
        tonic::Status::new(err.code(), err.to_string())
    }
}

impl From<redis::RedisError> for ApiError {
    fn from(err: redis::RedisError) -> Self {
        ApiError::Unavailable(format!("cache backend: {err}"))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("serialization failed: {err}"))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidArgument(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::InvalidArgument(format!("invalid query parameters: {}", rejection.body_text()))
    }
}

/// Error body returned by the REST surface.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// gRPC code name, e.g. `InvalidArgument`.
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.http_status();
        let body = ErrorBody {
            code: format!("{:?}", self.code()),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
