use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

use crate::punch::validator::PunchRejection;

/// Errors returned by handlers. Every variant renders as `{"message": ...}`.
#[derive(Debug, Display)]
pub enum ApiError {
    #[display(fmt = "{}", _0)]
    BadRequest(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(&'static str),

    #[display(fmt = "{}", _0)]
    Forbidden(&'static str),

    #[display(fmt = "{}", _0)]
    NotFound(&'static str),

    #[display(fmt = "{}", _0)]
    Conflict(&'static str),

    #[display(fmt = "{}", _0)]
    Rejected(PunchRejection),

    #[display(fmt = "{}", _0)]
    Unavailable(&'static str),

    #[display(fmt = "Internal Server Error")]
    Internal,
}

impl ApiError {
    /// Logs the underlying failure and hides it from the caller.
    pub fn internal<E: std::fmt::Display>(error: E, context: &str) -> Self {
        tracing::error!(error = %error, "{}", context);
        ApiError::Internal
    }
}

impl From<PunchRejection> for ApiError {
    fn from(rejection: PunchRejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Rejected(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "message": self.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;

    #[actix_web::test]
    async fn test_rejection_renders_reason_as_bad_request() {
        let err = ApiError::from(PunchRejection::CooldownActive);
        let resp = err.error_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "must wait between punches");
    }

    #[test]
    fn test_internal_hides_details() {
        let err = ApiError::internal("connection reset", "Failed to load punches");
        assert_eq!(err.to_string(), "Internal Server Error");
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
