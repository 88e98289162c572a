//! 状態遷移の通知
//!
//! コンシューマはチェックの状態が変化したときのみ `Notifier` を呼び出す。

pub mod slack;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use slack::SlackNotifier;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::SlackConfig;
use crate::monitor::Transition;

/// 通知エラー
#[derive(Debug, Error)]
pub enum NotifyError {
    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// The notification service rejected the message
    #[error("Notification rejected: {0}")]
    Rejected(String),
}

/// 状態遷移の通知先
#[async_trait]
pub trait Notifier: Send + Sync {
    /// チェック名と遷移前後の状態を通知する
    async fn notify(&self, transition: &Transition) -> Result<(), NotifyError>;
}

/// 通知文を生成
///
/// 状態が変わらない遷移（失敗件数・失敗ルールの変化）は件数を併記する。
pub fn format_message(transition: &Transition) -> String {
    let mut message = format!(
        "[wmcheck] {}: {} -> {}",
        transition.name, transition.old, transition.new
    );
    if transition.old == transition.new {
        message.push_str(&format!(
            " (failed validations: {} -> {})",
            transition.old_failures, transition.new_failures
        ));
    }
    message
}

/// ログ出力のみ行う通知先（Slack未設定時）
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, transition: &Transition) -> Result<(), NotifyError> {
        info!(
            check = %transition.name,
            old_status = %transition.old,
            new_status = %transition.new,
            "{}",
            format_message(transition)
        );
        Ok(())
    }
}

/// 設定に応じた通知先を作成
pub fn from_config(slack: Option<SlackConfig>) -> Result<Arc<dyn Notifier>, NotifyError> {
    match slack {
        Some(config) => {
            info!(channel = %config.channel, "Slack notifications enabled");
            Ok(Arc::new(SlackNotifier::new(config)?))
        }
        None => {
            info!("Slack is not configured; transitions are only logged");
            Ok(Arc::new(LogNotifier))
        }
    }
}
