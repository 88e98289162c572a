//! Configuration management via environment variables
//!
//! Provides helper functions for reading environment variables with fallback
//! to deprecated variable names with warning logs, and the runtime settings
//! built from them.

use crate::monitor::TransitionPolicy;
use std::time::Duration;

/// デフォルトのチェック間隔（秒）
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 30;

/// デフォルトのリクエストタイムアウト（秒）
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

/// デフォルトのResult Bus容量
pub const DEFAULT_RESULT_BUS_CAPACITY: usize = 1;

/// Get an environment variable with fallback to a deprecated name
///
/// If the new variable name is set, returns its value.
/// If only the old (deprecated) variable name is set, returns its value
/// and logs a deprecation warning.
///
/// # Example
/// ```
/// use wmcheck::config::get_env_with_fallback;
///
/// let port = get_env_with_fallback("WMCHECK_PORT", "PORT");
/// ```
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        if new_name != old_name {
            tracing::warn!(
                "Environment variable '{}' is deprecated, use '{}' instead",
                old_name,
                new_name
            );
        }
        return Some(val);
    }
    None
}

/// Get an environment variable with fallback and default value
pub fn get_env_with_fallback_or(new_name: &str, old_name: &str, default: &str) -> String {
    get_env_with_fallback(new_name, old_name).unwrap_or_else(|| default.to_string())
}

/// Get an environment variable with fallback, parsing to a specific type
///
/// Falls back to `default` if neither variable is set. A value that fails to
/// parse is logged as a warning and also falls back to `default`.
pub fn get_env_with_fallback_parse<T>(new_name: &str, old_name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = get_env_with_fallback(new_name, old_name) else {
        return default;
    };
    match value.trim().parse() {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(
                "Invalid value {:?} for '{}' ({}), using the default",
                value,
                new_name,
                e
            );
            default
        }
    }
}

/// 真偽値の環境変数を取得（`true/1/yes/on` で有効）
pub fn get_env_flag(new_name: &str, old_name: &str, default: bool) -> bool {
    get_env_with_fallback(new_name, old_name)
        .map(|value| {
            matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(default)
}

/// チェック定義ファイルのパスを取得
///
/// `WMCHECK_CONFIG_PATH`（旧: `CONFIG_PATH`）、未設定なら `./checks.json`。
pub fn get_checks_path() -> String {
    get_env_with_fallback_or(
        "WMCHECK_CONFIG_PATH",
        "CONFIG_PATH",
        wmcheck_common::config::DEFAULT_CHECKS_PATH,
    )
}

/// 監視エンジンの設定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// チェック間隔
    pub interval: Duration,
    /// 1リクエストあたりのタイムアウト
    pub request_timeout: Duration,
    /// TLS証明書検証を無効化するか
    pub accept_invalid_certs: bool,
    /// Result Busのチャネル容量（最小1）
    pub bus_capacity: usize,
    /// 状態遷移の判定方法
    pub transition_policy: TransitionPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            accept_invalid_certs: true,
            bus_capacity: DEFAULT_RESULT_BUS_CAPACITY,
            transition_policy: TransitionPolicy::default(),
        }
    }
}

impl MonitorConfig {
    /// Load monitor configuration from environment variables.
    pub fn from_env() -> Self {
        let interval_secs = get_env_with_fallback_parse(
            "WMCHECK_CHECK_INTERVAL_SECS",
            "CHECK_INTERVAL_SECS",
            DEFAULT_CHECK_INTERVAL_SECS,
        );
        let timeout_secs = get_env_with_fallback_parse(
            "WMCHECK_REQUEST_TIMEOUT_SECS",
            "REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        );
        let bus_capacity = get_env_with_fallback_parse(
            "WMCHECK_RESULT_BUS_CAPACITY",
            "RESULT_BUS_CAPACITY",
            DEFAULT_RESULT_BUS_CAPACITY,
        );
        let transition_policy = get_env_with_fallback_parse(
            "WMCHECK_TRANSITION_POLICY",
            "TRANSITION_POLICY",
            TransitionPolicy::default(),
        );

        Self {
            interval: Duration::from_secs(interval_secs.max(1)),
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            accept_invalid_certs: get_env_flag("WMCHECK_INSECURE_TLS", "INSECURE_TLS", true),
            bus_capacity: bus_capacity.max(1),
            transition_policy,
        }
    }
}

/// Slack通知の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlackConfig {
    /// Bot token
    pub token: String,
    /// 投稿先チャンネル
    pub channel: String,
}

impl SlackConfig {
    /// 環境変数から読み込む（token・channelの両方が揃っている場合のみ Some）
    pub fn from_env() -> Option<Self> {
        let token = get_env_with_fallback("WMCHECK_SLACK_TOKEN", "SLACK_TOKEN")?;
        let channel = get_env_with_fallback("WMCHECK_SLACK_CHANNEL", "SLACK_CHANNEL")?;
        if token.trim().is_empty() || channel.trim().is_empty() {
            return None;
        }
        Some(Self { token, channel })
    }
}

/// 静的ファイルの配信ディレクトリを取得
pub fn get_static_dir() -> String {
    get_env_with_fallback_or("WMCHECK_STATIC_DIR", "STATIC_DIR", ".")
}
