//! テスト用の通知先
//!
//! 結合テストからは `test-support` フィーチャー経由で利用する。

use super::{Notifier, NotifyError};
use crate::monitor::Transition;
use async_trait::async_trait;
use std::sync::Mutex;
use wmcheck_common::types::CheckStatus;

/// 呼び出しを記録する通知先
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    transitions: Mutex<Vec<Transition>>,
    fail: bool,
}

impl RecordingNotifier {
    /// 記録した上で常にエラーを返す通知先
    pub fn failing() -> Self {
        Self {
            transitions: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// 記録した (チェック名, 旧状態, 新状態)
    pub fn calls(&self) -> Vec<(String, CheckStatus, CheckStatus)> {
        self.transitions()
            .into_iter()
            .map(|t| (t.name, t.old, t.new))
            .collect()
    }

    /// 記録した遷移（失敗件数を含む）
    pub fn transitions(&self) -> Vec<Transition> {
        self.transitions
            .lock()
            .map(|transitions| transitions.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, transition: &Transition) -> Result<(), NotifyError> {
        if let Ok(mut transitions) = self.transitions.lock() {
            transitions.push(transition.clone());
        }
        if self.fail {
            return Err(NotifyError::Rejected(
                "recording notifier set to fail".into(),
            ));
        }
        Ok(())
    }
}
