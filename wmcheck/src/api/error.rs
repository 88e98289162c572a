//! APIエラーレスポンス型
//!
//! axum用の共通エラーハンドリング

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// APIハンドラーのエラー
#[derive(Debug, Error)]
pub enum ApiError {
    /// 指定されたチェックの結果が存在しない
    #[error("Check not found: {0}")]
    CheckNotFound(String),

    /// 内部エラー
    #[error("Internal server error")]
    Internal,
}

/// Axum用のエラーレスポンス型
#[derive(Debug)]
pub struct AppError(pub ApiError);

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self.0 {
            ApiError::CheckNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let payload = json!({
            "error": self.0.to_string()
        });

        (status, Json(payload)).into_response()
    }
}
