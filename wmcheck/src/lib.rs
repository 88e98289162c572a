//! wmcheck: Webサイト監視サービス
//!
//! 設定ファイルに定義されたHTTPチェックを定期実行し、レスポンスボディを検証して
//! 最新結果をHTTP APIで公開する。状態がOK/FAILの間で変化した場合は通知する。

#![warn(missing_docs)]

/// REST APIハンドラー
pub mod api;

/// CLIインターフェース
pub mod cli;

/// 環境変数からの設定読み込み
pub mod config;

/// ロギング初期化
pub mod logging;

/// チェック実行・結果集約エンジン
pub mod monitor;

/// 状態遷移の通知
pub mod notify;

/// HTTPサーバー起動・シャットダウン
pub mod server;

/// 協調シャットダウン
pub mod shutdown;

/// アプリケーション状態
#[derive(Clone)]
pub struct AppState {
    /// 最新結果の読み取りハンドル
    pub results: monitor::ResultsView,
    /// 静的ファイルの配信ディレクトリ
    pub static_dir: String,
    /// Cooperative shutdown controller
    pub shutdown: shutdown::ShutdownController,
}
