//! serve サブコマンド
//!
//! チェック定義を読み込み、監視エンジンとHTTPサーバーを起動します。

use crate::config::{
    get_checks_path, get_env_with_fallback_or, get_env_with_fallback_parse, get_static_dir,
    MonitorConfig, SlackConfig,
};
use crate::monitor::{Monitor, MonitorError};
use crate::notify::{self, NotifyError};
use crate::shutdown::ShutdownController;
use crate::{server, AppState};
use clap::Args;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;
use wmcheck_common::config::ChecksConfig;
use wmcheck_common::error::CommonError;

/// デフォルトの待受ポート
pub const DEFAULT_PORT: u16 = 8000;

/// デフォルトのbindアドレス
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// serve サブコマンドの引数
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServeArgs {
    /// Path to the checks file (default: ./checks.json)
    #[arg(short, long, env = "WMCHECK_CONFIG_PATH")]
    pub config: Option<PathBuf>,

    /// Listen port (default: 8000)
    #[arg(short, long, env = "WMCHECK_PORT")]
    pub port: Option<u16>,

    /// Bind address (default: 0.0.0.0)
    #[arg(short = 'H', long, env = "WMCHECK_HOST")]
    pub host: Option<String>,
}

/// 引数と環境変数を解決した起動設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeOptions {
    /// チェック定義ファイル
    pub config_path: PathBuf,
    /// bindアドレス
    pub host: String,
    /// 待受ポート
    pub port: u16,
}

impl ServeOptions {
    /// `host:port` 形式のアドレス
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl ServeArgs {
    /// 未指定の値を環境変数（旧名を含む）とデフォルト値で補完する
    pub fn resolve(self) -> ServeOptions {
        ServeOptions {
            config_path: self
                .config
                .unwrap_or_else(|| PathBuf::from(get_checks_path())),
            host: self.host.unwrap_or_else(|| {
                get_env_with_fallback_or("WMCHECK_HOST", "WMCHECK_HOST", DEFAULT_HOST)
            }),
            port: self.port.unwrap_or_else(|| {
                get_env_with_fallback_parse("WMCHECK_PORT", "PORT", DEFAULT_PORT)
            }),
        }
    }
}

/// serve の実行エラー
#[derive(Debug, Error)]
pub enum ServeError {
    /// チェック定義の読み込みに失敗
    #[error(transparent)]
    Config(#[from] CommonError),

    /// 監視エンジンの初期化に失敗
    #[error(transparent)]
    Monitor(#[from] MonitorError),

    /// 通知先の初期化に失敗
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// サーバーの起動・実行に失敗
    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),
}

/// serve サブコマンドを実行
///
/// サーバー停止後は監視エンジンにもシャットダウンを伝え、全タスクの終了を待つ。
pub async fn execute(args: ServeArgs) -> Result<(), ServeError> {
    let options = args.resolve();

    let checks = ChecksConfig::load(&options.config_path)?;
    let monitor = Monitor::new(checks.checks, MonitorConfig::from_env())?;
    info!(
        path = %options.config_path.display(),
        checks = monitor.check_count(),
        "Loaded check definitions"
    );
    let notifier = notify::from_config(SlackConfig::from_env())?;

    let shutdown = ShutdownController::default();
    let handle = monitor.start(notifier, shutdown.clone());

    let state = AppState {
        results: handle.results(),
        static_dir: get_static_dir(),
        shutdown: shutdown.clone(),
    };

    let served = server::run(state, &options.bind_addr()).await;

    shutdown.request_shutdown();
    handle.join().await;
    info!("Monitor stopped");

    served.map_err(ServeError::from)
}
