//! HTTP 错误响应
//!
//! 所有批处理级别的错误都返回 500，响应体为 `{"error": "..."}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::error::{AppError, UploadError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `AppError` 的 HTTP 包装
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        ApiError(err)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        ApiError(AppError::Upload(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("请求处理失败: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}
