use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use error_common::codes;
use logger_redacted::redact;
use plugins_registry_api::RegistryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Message returned for every infrastructure fault
const GENERIC_FAILURE: &str = "Internal server error";

/// Error body; shares `code` and `message` with the success envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// HTTP status, repeated in the body
    pub code: u16,
    /// Human-readable error message
    pub message: String,
    /// Unique error ID for tracking
    pub error_id: String,
    /// Error kind, e.g. `duplicate_version`
    pub error_type: String,
    /// Stable machine-readable code
    pub error_code: String,
    /// Field-specific validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field_errors: Option<HashMap<String, Vec<String>>>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Success envelope: `{code, message, data}`
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

/// Successful response carrying `data`
pub fn api_success<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        code: StatusCode::OK.as_u16(),
        message: "Success".to_string(),
        data: Some(data),
    }
}

/// Successful response with only a message
pub fn api_message(message: impl Into<String>) -> ApiResponse<()> {
    ApiResponse {
        code: StatusCode::OK.as_u16(),
        message: message.into(),
        data: None,
    }
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("{message}")]
    BadRequest { message: String },

    #[error("Payload too large: {message}")]
    PayloadTooLarge { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Registry(err) => match err {
                RegistryError::DuplicateVersion { .. } => StatusCode::CONFLICT,
                RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
                RegistryError::Storage(_) | RegistryError::Persistence(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    /// Get the error type string
    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Registry(err) => match err {
                RegistryError::Parse(_) => "parse_error",
                RegistryError::InvalidVersion { .. } => "invalid_version",
                RegistryError::DuplicateVersion { .. } => "duplicate_version",
                RegistryError::Storage(_) => "storage_error",
                RegistryError::Persistence(_) => "persistence_error",
                RegistryError::Schema(_) => "schema_error",
                RegistryError::SchemaMissing => "schema_missing",
                RegistryError::Validation { .. } => "validation_error",
                RegistryError::NotFound(_) => "not_found",
                RegistryError::InvalidRequest(_) => "bad_request",
            },
            ApiError::BadRequest { .. } => "bad_request",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Registry(err) => err.code(),
            ApiError::BadRequest { .. } => codes::validation::INVALID_FORMAT,
            ApiError::PayloadTooLarge { .. } => codes::validation::INVALID_INPUT,
        }
    }

    /// Text shown to the client; infrastructure details stay in the logs
    pub fn public_message(&self) -> String {
        if self.status_code().is_server_error() {
            GENERIC_FAILURE.to_string()
        } else {
            self.to_string()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let error_id = Uuid::new_v4().to_string();
        let status_code = self.status_code();
        let detail = redact(&self.to_string());

        // Log the error with correlation ID
        if status_code.is_server_error() {
            error!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %detail,
                "API error occurred"
            );
        } else {
            warn!(
                error_id = %error_id,
                error_type = %self.error_type(),
                status_code = %status_code.as_u16(),
                error = %detail,
                "Request rejected"
            );
        }

        let field_errors = match &self {
            ApiError::Registry(RegistryError::Validation { field, message }) => {
                Some(HashMap::from([(field.clone(), vec![message.clone()])]))
            }
            _ => None,
        };

        let body = ApiErrorResponse {
            code: status_code.as_u16(),
            message: self.public_message(),
            error_id,
            error_type: self.error_type().to_string(),
            error_code: self.error_code().to_string(),
            field_errors,
            timestamp: chrono::Utc::now(),
        };

        (status_code, Json(body)).into_response()
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::bad_request(format!("Invalid query parameters: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::bad_request(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid request body: {}", rejection.body_text()))
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return ApiError::PayloadTooLarge {
                message: error.body_text(),
            };
        }
        ApiError::bad_request(format!("Invalid multipart body: {}", error.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::bad_request(format!("Expected a multipart upload: {}", rejection.body_text()))
    }
}

/// Type alias for API results
pub type ApiResult<T> = Result<T, ApiError>;
