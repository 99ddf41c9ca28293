use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use super::dates::DateError;
use crate::catalogue::{ObserverError, RegistryError};

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or missing request parameters
    Input(String),
    /// No catalogue could serve the request
    Unavailable(String),
}

impl From<DateError> for ApiError {
    fn from(e: DateError) -> Self {
        ApiError::Input(e.to_string())
    }
}

impl From<ObserverError> for ApiError {
    fn from(e: ObserverError) -> Self {
        ApiError::Input(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Input(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        ApiError::Input(e.body_text())
    }
}

impl From<RegistryError> for ApiError {
    fn from(e: RegistryError) -> Self {
        log::error!("Catalogue request failed: {}", e);
        ApiError::Unavailable(e.to_string())
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Input(_) => StatusCode::BAD_REQUEST,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Input(_) => "invalid_request",
            ApiError::Unavailable(_) => "catalogue_unavailable",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.code().to_string();
        let message = match self {
            ApiError::Input(msg) | ApiError::Unavailable(msg) => msg,
        };
        let body = ErrorBody {
            error,
            message: Some(message),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// JSON body of every non-2xx response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Machine-readable error code
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
