//! チェック結果API

use super::error::{ApiError, AppError};
use crate::AppState;
use axum::{
    extract::{Path, State},
    Json,
};
use wmcheck_common::types::CheckResult;

/// GET /result
///
/// 全チェックの最新結果を名前順で返す。
pub async fn list_results(State(state): State<AppState>) -> Json<Vec<CheckResult>> {
    Json(state.results.snapshot().await)
}

/// GET /result/:name
pub async fn get_result(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<CheckResult>, AppError> {
    state
        .results
        .get(&name)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::CheckNotFound(name).into())
}

/// GET /hello
pub async fn hello() -> &'static str {
    "hello"
}
