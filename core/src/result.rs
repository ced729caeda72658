//! Normalization of transport outcomes, HTTP statuses and validation into
//! one discriminated [`ApiResult`].
//!
//! # Design
//! A 2xx response whose body fails validation is a *failure* carrying the
//! real HTTP status: the network succeeded but the data is unusable. A
//! response that never arrived has no status at all (`None`).

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::http::HttpRequest;
use crate::messages;
use crate::transport::Transport;
use crate::validate::ValidationFallback;

/// Where in the pipeline a failure originated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No HTTP response was received.
    Transport,
    /// The server answered with a non-2xx status.
    Http,
    /// The response arrived but its body failed validation.
    Validation,
    /// The request could not be built.
    Request,
}

/// The failure side of an [`ApiResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub kind: FailureKind,
    /// `None` only when no response was received.
    pub status_code: Option<u16>,
    /// User-facing text derived from the status.
    pub error_message: String,
    /// Technical text for logs; never shown to end users.
    pub raw_error_message: String,
}

impl ApiFailure {
    /// Failure derived from an [`ApiError`], using the status table for the
    /// user-facing message.
    pub fn from_error(error: &ApiError) -> Self {
        let (kind, status_code) = match error {
            ApiError::Status { status, .. } => (FailureKind::Http, Some(*status)),
            ApiError::Transport(_) => (FailureKind::Transport, None),
            ApiError::Serialization(_) => (FailureKind::Request, None),
            ApiError::Deserialization(_) => (FailureKind::Validation, None),
        };
        Self {
            kind,
            status_code,
            error_message: messages::status_message(status_code).to_string(),
            raw_error_message: error.to_string(),
        }
    }

    fn validation(status: u16, fallback: ValidationFallback) -> Self {
        Self {
            kind: FailureKind::Validation,
            status_code: Some(status),
            error_message: fallback.error_message,
            raw_error_message: fallback.raw_error_message,
        }
    }
}

/// Either validated data with its HTTP status, or a normalized failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiResult<T> {
    Success { status_code: u16, data: T },
    Failure(ApiFailure),
}

impl<T> ApiResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ApiResult::Success { .. })
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiResult::Success { status_code, .. } => Some(*status_code),
            ApiResult::Failure(failure) => failure.status_code,
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            ApiResult::Success { data, .. } => Some(data),
            ApiResult::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ApiFailure> {
        match self {
            ApiResult::Success { .. } => None,
            ApiResult::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self {
            ApiResult::Success { data, .. } => Ok(data),
            ApiResult::Failure(failure) => Err(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResult<U> {
        match self {
            ApiResult::Success { status_code, data } => ApiResult::Success {
                status_code,
                data: f(data),
            },
            ApiResult::Failure(failure) => ApiResult::Failure(failure),
        }
    }
}

impl<T> From<ApiError> for ApiResult<T> {
    fn from(error: ApiError) -> Self {
        ApiResult::Failure(ApiFailure::from_error(&error))
    }
}

/// Perform `request` and run the body through `validator`.
///
/// An empty body is presented to the validator as `null`; a body that is not
/// JSON is a validation failure.
pub async fn execute<T, V>(transport: &dyn Transport, request: HttpRequest, validator: V) -> ApiResult<T>
where
    V: FnOnce(&Value) -> Result<T, ValidationFallback>,
{
    let method = request.method;
    let url = request.url.clone();

    let response = match transport.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            let error = ApiError::from(e);
            warn!(%method, %url, error = %error, "request failed without a response");
            return error.into();
        }
    };

    if !response.is_success() {
        let status = response.status;
        debug!(%url, status, body = %response.body, "error response body");
        let error = ApiError::Status {
            status,
            body: response.body,
        };
        warn!(%method, %url, status, error = %error, "request failed");
        return error.into();
    }

    let body = if response.body.trim().is_empty() {
        Value::Null
    } else {
        match serde_json::from_str::<Value>(&response.body) {
            Ok(value) => value,
            Err(e) => {
                let error = ApiError::Deserialization(e.to_string());
                warn!(%method, %url, status = response.status, error = %error, "response body is not JSON");
                return ApiResult::Failure(ApiFailure::validation(
                    response.status,
                    ValidationFallback::default(),
                ));
            }
        }
    };

    match validator(&body) {
        Ok(data) => ApiResult::Success {
            status_code: response.status,
            data,
        },
        Err(fallback) => {
            warn!(%method, %url, status = response.status, "response failed validation");
            ApiResult::Failure(ApiFailure::validation(response.status, fallback))
        }
    }
}
