//! REST APIハンドラー
//!
//! チェック結果の参照API、疎通確認、静的ファイル配信

pub mod error;
pub mod results;

use crate::AppState;
use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use error::{ApiError, AppError};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, services::ServeDir, trace::TraceLayer};
use tracing::{error, Instrument};
use uuid::Uuid;

/// リクエストIDヘッダー名
pub const REQUEST_ID_HEADER: &str = "x-tid";

/// APIルーターを作成
pub fn create_app(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    let router = Router::new()
        .route("/result", get(results::list_results))
        .route("/result/:name", get(results::get_result))
        .route("/hello", get(results::hello))
        .fallback_service(static_files)
        .with_state(state);

    with_middleware(router)
}

/// 共通ミドルウェアを適用
///
/// 外側から順に: リクエストID → リクエストトレース → パニック回復
fn with_middleware(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(request_id))
}

/// `X-tid` を引き継ぐ（未指定なら生成する）ミドルウェア
async fn request_id(request: Request, next: Next) -> Response {
    let tid = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!("request", tid = %tid);
    let mut response = next.run(request).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(&tid) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// ハンドラーのパニックを500レスポンスに変換
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = err.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = err.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Request handler panicked: {}", detail);

    AppError(ApiError::Internal).into_response()
}
