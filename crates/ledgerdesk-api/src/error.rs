//! Error types for ledgerdesk-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use ledgerdesk_core::error::{ErrorCategory, ErrorCode};
use ledgerdesk_core::{CoreError, CoreResult, DefaultErrorLogger, ErrorContext, ErrorLogger, RequestContext};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("{source}")]
    Core {
        source: CoreError,
        /// Caller and operation the failure is logged under
        context: ErrorContext,
    },
}

impl From<CoreError> for ApiError {
    fn from(source: CoreError) -> Self {
        ApiError::Core {
            source,
            context: ErrorContext::new("api"),
        }
    }
}

/// Tag a core failure with the caller that triggered it
pub trait ForCaller<T> {
    fn for_caller(self, ctx: &RequestContext, operation: &str) -> ApiResult<T>;
}

impl<T> ForCaller<T> for CoreResult<T> {
    fn for_caller(self, ctx: &RequestContext, operation: &str) -> ApiResult<T> {
        self.map_err(|source| ApiError::Core {
            source,
            context: ErrorContext::for_request(operation, ctx),
        })
    }
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Core { source: error, .. } => match (error.category(), error.code()) {
                (_, ErrorCode::AccountNotFound | ErrorCode::EntryNotFound) => StatusCode::NOT_FOUND,
                (ErrorCategory::Validation, _) => StatusCode::UNPROCESSABLE_ENTITY,
                (ErrorCategory::Integrity, _) => StatusCode::CONFLICT,
                (ErrorCategory::Transient, _) => StatusCode::SERVICE_UNAVAILABLE,
                (ErrorCategory::Internal, _) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest { .. } => ErrorBody {
                code: "BAD_REQUEST".to_string(),
                category: None,
                message: self.to_string(),
                errors: vec![],
                suggestions: vec![],
            },
            ApiError::Core { source: error, .. } => {
                let details = error.to_details();
                ErrorBody {
                    code: details.code.to_string(),
                    category: Some(details.category),
                    message: details.message,
                    errors: details.errors,
                    suggestions: details.suggestions,
                }
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Core { source, context } => DefaultErrorLogger.log_error(source, context),
            ApiError::BadRequest { .. } => log::debug!(target: "ledgerdesk::api", "{}", self),
        }
        (self.status(), Json(self.body())).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
