use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use codegrade_common::error::GraderError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Internal,
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Conflict(message.into())
    }
}

impl From<GraderError> for ApiError {
    fn from(err: GraderError) -> Self {
        match err {
            GraderError::Validation(message) => ApiError::BadRequest(message),
            GraderError::Conflict(message) => ApiError::Conflict(message),
            e @ GraderError::NotFound(_) => ApiError::NotFound(e.to_string()),
            // Judge and storage details stay in the logs
            e => {
                error!(error = %e, "Internal failure while handling request");
                ApiError::Internal
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            ApiError::Conflict(message) => (StatusCode::CONFLICT, message),
            ApiError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal error, please retry".to_string(),
            ),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (GraderError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (GraderError::NotFound("question x".into()), StatusCode::NOT_FOUND),
            (GraderError::Conflict("done".into()), StatusCode::CONFLICT),
            (
                GraderError::ExternalService("judge 503 at 10.0.0.4".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_error_hides_details() {
        let api = ApiError::from(GraderError::ExternalService("judge 503 at 10.0.0.4".into()));
        assert!(matches!(api, ApiError::Internal));
    }
}
