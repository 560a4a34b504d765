//! Single formatting layer for every error response: `{"error": "<message>"}`.

use application::ApplicationError;
use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Application(#[from] ApplicationError),
    /// Malformed body or query string.
    #[error("{0}")]
    BadRequest(String),
    #[error("Not Found")]
    RouteNotFound,
    #[error("Method Not Allowed")]
    MethodNotAllowed,
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self::Application(ApplicationError::DomainError(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Application(err) => map_application_error(err),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::RouteNotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            ApiError::MethodNotAllowed => (
                StatusCode::METHOD_NOT_ALLOWED,
                "Method Not Allowed".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// Maps ApplicationError to an HTTP status code and client-facing message.
fn map_application_error(err: ApplicationError) -> (StatusCode, String) {
    match err {
        ApplicationError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        ApplicationError::DomainError(domain_err) => {
            warn!("Domain validation failed: {}", domain_err);
            let msg = match domain_err {
                DomainError::MissingField(_) => "Invalid book data",
                DomainError::InvalidSortField(_) => "Invalid sort field",
                DomainError::InvalidSortDirection(_) => "Invalid sort direction",
            };
            (StatusCode::BAD_REQUEST, msg.to_string())
        }
        ApplicationError::InfrastructureError(msg) => {
            error!("Underlying infrastructure error: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal server error occurred".to_string(),
            )
        }
    }
}

/// Gives the router's bare 405 responses the JSON error body, keeping `Allow`.
pub async fn json_method_not_allowed(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }
    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json_response = ApiError::MethodNotAllowed.into_response();
    if let Some(allow) = allow {
        json_response.headers_mut().insert(header::ALLOW, allow);
    }
    json_response
}

/// Router fallback for unmatched paths.
pub async fn route_not_found() -> ApiError {
    ApiError::RouteNotFound
}
