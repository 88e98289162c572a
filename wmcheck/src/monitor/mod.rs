//! チェック実行・結果集約エンジン
//!
//! チェックごとに1つのランナータスクを起動し、全ランナーの結果を単一の
//! Result Bus経由で1つのコンシューマタスクに集約する。
//!
//! ```text
//! CheckRunner ─┐
//! CheckRunner ─┼─> ResultBus ─> ResultStore (consumer) ─> Notifier
//! CheckRunner ─┘                     │
//!                                    └─> ResultsView (snapshot)
//! ```

pub mod bus;
pub mod runner;
pub mod store;
pub mod validator;

pub use bus::{result_bus, ResultReceiver, ResultSender};
pub use runner::CheckRunner;
pub use store::{ResultStore, ResultsView, Transition, TransitionPolicy};

use crate::config::MonitorConfig;
use crate::notify::Notifier;
use crate::shutdown::ShutdownController;
use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{error, info};
use wmcheck_common::config::validate_checks;
use wmcheck_common::error::CommonError;
use wmcheck_common::types::Check;

/// 監視エンジンのエラー
#[derive(Debug, Error)]
pub enum MonitorError {
    /// チェック定義が不正（名前の重複など）
    #[error(transparent)]
    InvalidChecks(#[from] CommonError),

    /// HTTPクライアントの作成に失敗
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// 監視エンジン
///
/// チェック定義を検証済みの状態で保持し、`start` で全タスクを起動する。
pub struct Monitor {
    checks: Vec<Arc<Check>>,
    config: MonitorConfig,
    client: Client,
}

impl Monitor {
    /// チェック一覧を検証して監視エンジンを作成
    pub fn new(checks: Vec<Check>, config: MonitorConfig) -> Result<Self, MonitorError> {
        validate_checks(&checks)?;
        let client = runner::build_client(&config)?;

        Ok(Self {
            checks: checks.into_iter().map(Arc::new).collect(),
            config,
            client,
        })
    }

    /// チェック数
    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// ランナーとコンシューマを起動する
    pub fn start(self, notifier: Arc<dyn Notifier>, shutdown: ShutdownController) -> MonitorHandle {
        let (sender, receiver) = result_bus(self.config.bus_capacity);
        let store = ResultStore::new(self.config.transition_policy);
        let view = store.view();

        info!(
            checks = self.checks.len(),
            interval_secs = self.config.interval.as_secs(),
            timeout_secs = self.config.request_timeout.as_secs(),
            "Starting monitor"
        );

        let runners = self
            .checks
            .into_iter()
            .map(|check| {
                let runner = CheckRunner::new(
                    check,
                    self.client.clone(),
                    self.config.interval,
                    sender.clone(),
                );
                let name = runner.name().to_string();
                (name, tokio::spawn(runner.run(shutdown.clone())))
            })
            .collect();

        // ランナーが全て終了したらコンシューマも終了できるよう、元の送信側は手放す
        drop(sender);

        let consumer = tokio::spawn(store.run(receiver, notifier, shutdown));

        MonitorHandle {
            view,
            runners,
            consumer,
        }
    }
}

/// 起動済み監視エンジンのハンドル
pub struct MonitorHandle {
    view: ResultsView,
    runners: Vec<(String, JoinHandle<()>)>,
    consumer: JoinHandle<()>,
}

impl MonitorHandle {
    /// 結果の読み取りハンドル
    pub fn results(&self) -> ResultsView {
        self.view.clone()
    }

    /// 全タスクの終了を待つ
    ///
    /// ランナーのパニックは他のタスクに影響せず、ここでログに記録される。
    pub async fn join(self) {
        for (name, handle) in self.runners {
            if let Err(e) = handle.await {
                error!(check = %name, "Check runner task failed: {}", e);
            }
        }
        if let Err(e) = self.consumer.await {
            error!("Result consumer task failed: {}", e);
        }
    }
}
