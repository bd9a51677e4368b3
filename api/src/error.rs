use axum::http::StatusCode;
use axum::response::IntoResponse;
use std::borrow::Cow;

#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request
    BadRequest(Cow<'static, str>),
    /// 404 Not Found
    NotFound,
}

impl ApiError {
    pub fn bad_request<Msg: Into<Cow<'static, str>>>(msg: Msg) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::BadRequest(cow) => (StatusCode::BAD_REQUEST, cow).into_response(),
            ApiError::NotFound => StatusCode::NOT_FOUND.into_response(),
        }
    }
}

/// Fallback handler for unmatched paths.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
