//! Result Store
//!
//! チェック名 → 最新結果 のマップを保持する。書き込みはコンシューマタスクのみが
//! `ResultStore` を通じて行い、その他は `ResultsView` のスナップショットを読む。

use super::bus::ResultReceiver;
use crate::notify::Notifier;
use crate::shutdown::ShutdownController;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use wmcheck_common::types::{CheckResult, CheckStatus, Failure, Validation};

/// 状態遷移の判定方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// 失敗件数が変化したら遷移とみなす
    #[default]
    FailureCount,
    /// 失敗したルールの集合が変化したら遷移とみなす
    FailureSet,
}

impl TransitionPolicy {
    /// TransitionPolicyを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FailureCount => "count",
            Self::FailureSet => "set",
        }
    }
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" | "failure_count" => Ok(Self::FailureCount),
            "set" | "failure_set" => Ok(Self::FailureSet),
            other => Err(format!("unknown transition policy: {}", other)),
        }
    }
}

/// 検出された状態遷移
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// チェック名
    pub name: String,
    /// 直前の状態
    pub old: CheckStatus,
    /// 新しい状態
    pub new: CheckStatus,
    /// 直前の失敗件数
    pub old_failures: usize,
    /// 新しい失敗件数
    pub new_failures: usize,
}

/// 遷移判定で比較するキー（リクエストエラーはメッセージを無視する）
fn failure_keys(failures: &[Failure]) -> Vec<Option<&Validation>> {
    failures
        .iter()
        .map(|failure| match failure {
            Failure::Rule(validation) => Some(validation),
            Failure::RequestError { .. } => None,
        })
        .collect()
}

/// 直前の結果と新しい結果から遷移を判定する
///
/// 直前の結果が無い場合は失敗0件（OK）として扱う。
pub fn detect_transition(
    policy: TransitionPolicy,
    previous: Option<&CheckResult>,
    next: &CheckResult,
) -> Option<Transition> {
    let previous_failures = previous
        .map(|p| p.failed_validations.as_slice())
        .unwrap_or(&[]);

    let changed = match policy {
        TransitionPolicy::FailureCount => previous_failures.len() != next.failed_validations.len(),
        TransitionPolicy::FailureSet => {
            failure_keys(previous_failures) != failure_keys(&next.failed_validations)
        }
    };

    changed.then(|| Transition {
        name: next.name.clone(),
        old: CheckStatus::from_failure_count(previous_failures.len()),
        new: next.status(),
        old_failures: previous_failures.len(),
        new_failures: next.failed_validations.len(),
    })
}

/// 結果マップの書き込みハンドル
///
/// `Clone` を実装しないため、書き込み手は常に1つに限られる。
#[derive(Debug)]
pub struct ResultStore {
    results: Arc<RwLock<HashMap<String, CheckResult>>>,
    policy: TransitionPolicy,
}

impl ResultStore {
    /// 空のストアを作成
    pub fn new(policy: TransitionPolicy) -> Self {
        Self {
            results: Arc::new(RwLock::new(HashMap::new())),
            policy,
        }
    }

    /// 読み取り用ハンドルを取得
    pub fn view(&self) -> ResultsView {
        ResultsView {
            results: self.results.clone(),
        }
    }

    /// 結果を反映し、遷移があれば返す（常に上書き）
    pub async fn apply(&mut self, result: CheckResult) -> Option<Transition> {
        let mut results = self.results.write().await;
        let transition = detect_transition(self.policy, results.get(&result.name), &result);
        results.insert(result.name.clone(), result);
        transition
    }

    /// コンシューマループ
    ///
    /// Result Busを排出し続け、遷移時に通知する。シャットダウン要求後は
    /// キュー済みの結果を反映してから終了する。
    pub async fn run(
        mut self,
        mut receiver: ResultReceiver,
        notifier: Arc<dyn Notifier>,
        shutdown: ShutdownController,
    ) {
        info!(policy = self.policy.as_str(), "Result consumer started");

        loop {
            tokio::select! {
                biased;
                received = receiver.recv() => match received {
                    Some(result) => self.handle(result, notifier.as_ref()).await,
                    None => {
                        debug!("All result senders dropped");
                        break;
                    }
                },
                _ = shutdown.wait() => {
                    receiver.close();
                    while let Some(result) = receiver.recv().await {
                        self.handle(result, notifier.as_ref()).await;
                    }
                    break;
                }
            }
        }

        info!("Result consumer stopped");
    }

    async fn handle(&mut self, result: CheckResult, notifier: &dyn Notifier) {
        let name = result.name.clone();
        let failures = result.failed_validations.len();

        if failures > 0 {
            let summary = result
                .failed_validations
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            warn!(check = %name, failures, failed = %summary, "Validation failed");
            debug!(check = %name, body = %result.body, "Failed response body");
        }

        let transition = self.apply(result).await;
        debug!(check = %name, failures, "Result updated");

        if let Some(transition) = transition {
            info!(
                check = %transition.name,
                old_status = %transition.old,
                new_status = %transition.new,
                old_failures = transition.old_failures,
                new_failures = transition.new_failures,
                "Check status changed"
            );
            if let Err(e) = notifier.notify(&transition).await {
                warn!(check = %transition.name, error = %e, "Failed to send notification");
            }
        }
    }
}

/// 結果マップの読み取りハンドル（Query Surface）
#[derive(Clone, Debug)]
pub struct ResultsView {
    results: Arc<RwLock<HashMap<String, CheckResult>>>,
}

impl ResultsView {
    /// 全結果をチェック名の昇順で取得（時点コピー）
    pub async fn snapshot(&self) -> Vec<CheckResult> {
        let mut results: Vec<CheckResult> = self.results.read().await.values().cloned().collect();
        results.sort_by(|a, b| a.name.cmp(&b.name));
        results
    }

    /// 指定チェックの最新結果を取得
    pub async fn get(&self, name: &str) -> Option<CheckResult> {
        self.results.read().await.get(name).cloned()
    }

    /// 結果を保持しているチェック数
    pub async fn len(&self) -> usize {
        self.results.read().await.len()
    }

    /// 結果が1件も無いか
    pub async fn is_empty(&self) -> bool {
        self.results.read().await.is_empty()
    }
}
