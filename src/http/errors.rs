//! HTTP error handling and conversion
//!
//! Client-facing messages are short and generic. The internal cause travels
//! with the response as an [`ErrorDetail`] extension, where the error-logging
//! middleware picks it up; it never reaches the response body.

use crate::core::service::ServiceError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Internal description of a failed request, attached to error responses
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

/// HTTP error types
#[derive(Debug, Clone)]
pub enum HttpError {
    /// Malformed request; the message is shown to the client as is
    BadRequest(String),

    /// Request refused by policy
    Forbidden(String),

    /// Unknown spec or static file
    NotFound { message: String, detail: String },

    /// The spec source or proxy target failed
    BadGateway { message: String, detail: String },

    /// Server errors
    InternalServerError { message: String, detail: String },
}

impl HttpError {
    pub fn not_found(message: &str, detail: impl Into<String>) -> Self {
        HttpError::NotFound {
            message: message.to_string(),
            detail: detail.into(),
        }
    }

    pub fn bad_gateway(message: &str, detail: impl Into<String>) -> Self {
        HttpError::BadGateway {
            message: message.to_string(),
            detail: detail.into(),
        }
    }

    pub fn internal(message: &str, detail: impl Into<String>) -> Self {
        HttpError::InternalServerError {
            message: message.to_string(),
            detail: detail.into(),
        }
    }

    /// Convert to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            HttpError::BadRequest(_) => StatusCode::BAD_REQUEST,
            HttpError::Forbidden(_) => StatusCode::FORBIDDEN,
            HttpError::NotFound { .. } => StatusCode::NOT_FOUND,
            HttpError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            HttpError::InternalServerError { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            HttpError::BadRequest(_) => "BAD_REQUEST",
            HttpError::Forbidden(_) => "FORBIDDEN",
            HttpError::NotFound { .. } => "NOT_FOUND",
            HttpError::BadGateway { .. } => "BAD_GATEWAY",
            HttpError::InternalServerError { .. } => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Message safe to send to the client
    pub fn message(&self) -> &str {
        match self {
            HttpError::BadRequest(msg) | HttpError::Forbidden(msg) => msg,
            HttpError::NotFound { message, .. }
            | HttpError::BadGateway { message, .. }
            | HttpError::InternalServerError { message, .. } => message,
        }
    }

    /// Full internal description for logs
    pub fn detail(&self) -> &str {
        match self {
            HttpError::BadRequest(msg) | HttpError::Forbidden(msg) => msg,
            HttpError::NotFound { detail, .. }
            | HttpError::BadGateway { detail, .. }
            | HttpError::InternalServerError { detail, .. } => detail,
        }
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} - {}", self.status_code().as_u16(), self.detail())
    }
}

impl std::error::Error for HttpError {}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = Json(json!({
            "success": false,
            "error": {
                "code": self.error_code(),
                "message": self.message(),
            }
        }));

        let mut response = (status, body).into_response();
        response
            .extensions_mut()
            .insert(ErrorDetail(self.detail().to_string()));
        response
    }
}

/// Convert service errors to HTTP errors
impl From<ServiceError> for HttpError {
    fn from(err: ServiceError) -> Self {
        let detail = err.to_string();
        match err {
            ServiceError::SpecNotFound(_) => HttpError::not_found("API not found", detail),
            ServiceError::Fetch { .. } | ServiceError::UpstreamStatus { .. } => {
                HttpError::bad_gateway("Failed to fetch spec", detail)
            }
            ServiceError::Decode(_) => HttpError::internal("Failed to decode spec", detail),
            ServiceError::InvalidUrl { .. } => {
                HttpError::internal("Failed to parse spec URL", detail)
            }
            ServiceError::Source(_) | ServiceError::Config(_) | ServiceError::Io(_) => {
                HttpError::internal("Internal server error", detail)
            }
        }
    }
}

/// Result type alias for HTTP operations
pub type HttpResult<T> = Result<T, HttpError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn test_response_hides_internal_detail() {
        let err = HttpError::from(ServiceError::Fetch {
            url: "http://orders.shop.svc.cluster.local/openapi.json".to_string(),
            reason: "connection refused".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);

        let response = err.into_response();
        let detail = response.extensions().get::<ErrorDetail>().cloned().unwrap();
        assert!(detail.0.contains("connection refused"));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "BAD_GATEWAY");
        assert_eq!(body["error"]["message"], "Failed to fetch spec");
        assert!(!body.to_string().contains("cluster.local"));
    }

    #[test]
    fn test_service_error_status_mapping() {
        let cases = vec![
            (
                ServiceError::SpecNotFound("x".to_string()),
                StatusCode::NOT_FOUND,
            ),
            (
                ServiceError::UpstreamStatus {
                    url: "http://x".to_string(),
                    status: 404,
                },
                StatusCode::BAD_GATEWAY,
            ),
            (
                ServiceError::Decode("eof".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                ServiceError::InvalidUrl {
                    url: "::".to_string(),
                    reason: "relative URL without a base".to_string(),
                },
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(HttpError::from(err).status_code(), status);
        }
    }
}
