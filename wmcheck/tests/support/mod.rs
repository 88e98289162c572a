//! 統合テスト共通ユーティリティ

#![allow(dead_code)]

use std::future::Future;
use std::time::Duration;
use wmcheck::config::MonitorConfig;
use wmcheck_common::types::{Check, CheckRequest, Validation};

pub use wmcheck::notify::testing::RecordingNotifier;

/// GETチェックを作成
pub fn check(name: &str, url: String, validations: Vec<Validation>) -> Check {
    Check {
        name: name.to_string(),
        request: CheckRequest {
            method: "GET".to_string(),
            url,
            body: String::new(),
            headers: vec![],
        },
        validations,
    }
}

/// 短い間隔で回す監視設定
pub fn fast_config() -> MonitorConfig {
    MonitorConfig {
        interval: Duration::from_millis(50),
        request_timeout: Duration::from_millis(500),
        ..MonitorConfig::default()
    }
}

/// 条件が満たされるまでポーリングする（満たされなければパニック）
pub async fn wait_until<F, Fut>(what: &str, mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while !condition().await {
        if tokio::time::Instant::now() >= deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
