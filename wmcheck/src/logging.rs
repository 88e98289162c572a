//! ロギング初期化ユーティリティ
//!
//! ログレベルは `WMCHECK_LOG_LEVEL`（旧: `RUST_LOG`）から取得し、未設定なら `info`。
//! `WMCHECK_LOG_DIR` が設定されている場合は日次ローテーションのファイルにも出力する。

use crate::config::get_env_with_fallback;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// ログファイル名のプレフィックス
const LOG_FILE_PREFIX: &str = "wmcheck.log";

/// デフォルトのログレベル
const DEFAULT_LOG_LEVEL: &str = "info";

/// ログ出力の初期化エラー
pub type LoggingError = Box<dyn std::error::Error + Send + Sync>;

/// ログフィルタを構築する
fn build_filter() -> EnvFilter {
    let level = get_env_with_fallback("WMCHECK_LOG_LEVEL", "RUST_LOG")
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());
    EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// ログファイルの出力先ディレクトリ
fn log_dir() -> Option<PathBuf> {
    std::env::var("WMCHECK_LOG_DIR")
        .ok()
        .filter(|dir| !dir.trim().is_empty())
        .map(PathBuf::from)
}

/// グローバルなtracing subscriberを初期化する
///
/// ファイル出力が有効な場合は `WorkerGuard` を返す。プロセス終了まで保持すること。
pub fn init() -> Result<Option<WorkerGuard>, LoggingError> {
    let stdout_layer = fmt::layer().with_target(false);

    match log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_ansi(false).with_writer(writer);

            tracing_subscriber::registry()
                .with(build_filter())
                .with(stdout_layer)
                .with(file_layer)
                .try_init()?;

            tracing::info!(dir = %dir.display(), "File logging enabled");
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(build_filter())
                .with(stdout_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
