//! Check Runner
//!
//! チェック1件ごとに1タスク。リクエスト発行 → 検証 → Result Busへ送信 → 待機 を
//! シャットダウンまで繰り返す。

use super::bus::ResultSender;
use super::validator;
use super::MonitorError;
use crate::config::MonitorConfig;
use crate::shutdown::ShutdownController;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};
use wmcheck_common::types::{Check, CheckResult, Failure};

/// リクエスト発行時のエラー
#[derive(Debug, Error)]
pub enum RequestError {
    /// HTTPメソッドが不正
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// ヘッダーが不正
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    /// 送受信エラー（接続失敗・タイムアウト等）
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// チェック用HTTPクライアントを作成
///
/// タイムアウトは全リクエスト共通。証明書検証の無効化は設定に従う。
pub fn build_client(config: &MonitorConfig) -> Result<Client, MonitorError> {
    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled for checks");
    }
    Client::builder()
        .timeout(config.request_timeout)
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()
        .map_err(MonitorError::HttpClient)
}

/// チェック1件分の実行単位
#[derive(Debug, Clone)]
pub struct CheckRunner {
    check: Arc<Check>,
    client: Client,
    interval: Duration,
    sink: ResultSender,
}

impl CheckRunner {
    /// 新しいランナーを作成
    pub fn new(check: Arc<Check>, client: Client, interval: Duration, sink: ResultSender) -> Self {
        Self {
            check,
            client,
            interval,
            sink,
        }
    }

    /// 担当するチェック名
    pub fn name(&self) -> &str {
        &self.check.name
    }

    /// 実行ループ
    ///
    /// シャットダウン要求か、Result Busの受信側終了で抜ける。
    pub async fn run(self, shutdown: ShutdownController) {
        info!(
            check = %self.check.name,
            interval_secs = self.interval.as_secs_f64(),
            "Check runner started"
        );

        loop {
            let result = tokio::select! {
                result = self.execute() => result,
                _ = shutdown.wait() => break,
            };

            tokio::select! {
                sent = self.sink.send(result) => {
                    if let Err(e) = sent {
                        debug!(check = %self.check.name, error = %e, "Result bus closed");
                        break;
                    }
                }
                _ = shutdown.wait() => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                _ = shutdown.wait() => break,
            }
        }

        info!(check = %self.check.name, "Check runner stopped");
    }

    /// 1回分のチェックを実行して結果を生成する
    ///
    /// リクエストが失敗した場合も結果を返す（ボディは空、`RequestError` の失敗を1件含む）。
    pub async fn execute(&self) -> CheckResult {
        match self.fetch().await {
            Ok(body) => {
                let failed = validator::evaluate(&body, &self.check.validations);
                debug!(
                    check = %self.check.name,
                    failures = failed.len(),
                    "Check executed"
                );
                CheckResult {
                    name: self.check.name.clone(),
                    failed_validations: failed.into_iter().map(Failure::Rule).collect(),
                    last_update: Utc::now(),
                    body,
                }
            }
            Err(e) => {
                warn!(
                    check = %self.check.name,
                    url = %self.check.request.url,
                    error = %e,
                    "Check request failed"
                );
                CheckResult {
                    name: self.check.name.clone(),
                    failed_validations: vec![Failure::request_error(e.to_string())],
                    last_update: Utc::now(),
                    body: String::new(),
                }
            }
        }
    }

    /// リクエストを発行し、レスポンスボディを返す
    ///
    /// ステータスコードは問わない（2xx以外のボディも検証対象）。
    async fn fetch(&self) -> Result<String, RequestError> {
        let request = &self.check.request;

        let method_name = request.method.trim().to_ascii_uppercase();
        let method = Method::from_bytes(method_name.as_bytes())
            .map_err(|_| RequestError::InvalidMethod(request.method.clone()))?;

        let mut headers = HeaderMap::new();
        for header in &request.headers {
            let name = HeaderName::from_bytes(header.key.as_bytes())
                .map_err(|_| RequestError::InvalidHeader(header.key.clone()))?;
            let value = HeaderValue::from_str(&header.value)
                .map_err(|_| RequestError::InvalidHeader(header.key.clone()))?;
            headers.insert(name, value);
        }

        let mut builder = self.client.request(method, &request.url).headers(headers);
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let response = builder.send().await?;
        debug!(
            check = %self.check.name,
            status = %response.status(),
            "Check response received"
        );
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::bus::result_bus;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};
    use wmcheck_common::types::{CheckRequest, Header, Validation};

    fn check(name: &str, url: String, validations: Vec<Validation>) -> Check {
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

    fn client(timeout: Duration) -> Client {
        build_client(&MonitorConfig {
            request_timeout: timeout,
            ..MonitorConfig::default()
        })
        .unwrap()
    }

    fn runner(check: Check, timeout: Duration) -> (CheckRunner, crate::monitor::bus::ResultReceiver) {
        let (tx, rx) = result_bus(1);
        (
            CheckRunner::new(Arc::new(check), client(timeout), Duration::from_millis(20), tx),
            rx,
        )
    }

    async fn unused_url() -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{}/health", addr)
    }

    #[tokio::test]
    async fn test_execute_passing_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("system ok"))
            .mount(&server)
            .await;

        let (runner, _rx) = runner(
            check(
                "api",
                format!("{}/health", server.uri()),
                vec![Validation::RequireContains("ok".to_string())],
            ),
            Duration::from_secs(5),
        );

        let result = runner.execute().await;
        assert_eq!(result.name, "api");
        assert!(result.failed_validations.is_empty());
        assert_eq!(result.body, "system ok");
    }

    #[tokio::test]
    async fn test_execute_failing_check() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("error: disk full"))
            .mount(&server)
            .await;

        let (runner, _rx) = runner(
            check(
                "api",
                server.uri(),
                vec![
                    Validation::RequireContains("ok".to_string()),
                    Validation::ForbidContains("error".to_string()),
                ],
            ),
            Duration::from_secs(5),
        );

        let result = runner.execute().await;
        assert_eq!(
            result.failed_validations,
            vec![
                Failure::Rule(Validation::RequireContains("ok".to_string())),
                Failure::Rule(Validation::ForbidContains("error".to_string())),
            ]
        );
    }

    #[tokio::test]
    async fn test_request_uses_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api"))
            .and(header("x-token", "second"))
            .and(header("content-type", "application/json"))
            .and(body_string("{\"ping\":true}"))
            .respond_with(ResponseTemplate::new(200).set_body_string("pong"))
            .expect(1)
            .mount(&server)
            .await;

        let mut c = check(
            "post",
            format!("{}/api", server.uri()),
            vec![Validation::RequireContains("pong".to_string())],
        );
        c.request.method = "post".to_string();
        c.request.body = "{\"ping\":true}".to_string();
        c.request.headers = vec![
            Header {
                key: "Content-Type".to_string(),
                value: "application/json".to_string(),
            },
            Header {
                key: "X-Token".to_string(),
                value: "first".to_string(),
            },
            Header {
                key: "X-Token".to_string(),
                value: "second".to_string(),
            },
        ];

        let (runner, _rx) = runner(c, Duration::from_secs(5));
        let result = runner.execute().await;
        assert!(result.failed_validations.is_empty(), "{:?}", result);
    }

    #[tokio::test]
    async fn test_non_success_status_body_is_validated() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let (runner, _rx) = runner(
            check(
                "api",
                server.uri(),
                vec![Validation::ForbidContains("maintenance".to_string())],
            ),
            Duration::from_secs(5),
        );

        let result = runner.execute().await;
        assert_eq!(result.body, "maintenance");
        assert_eq!(result.failed_validations.len(), 1);
    }

    #[tokio::test]
    async fn test_connection_error_produces_request_error_result() {
        let (runner, _rx) = runner(
            check(
                "down",
                unused_url().await,
                vec![Validation::RequireContains("ok".to_string())],
            ),
            Duration::from_secs(5),
        );

        let result = runner.execute().await;
        assert!(result.body.is_empty());
        assert_eq!(result.failed_validations.len(), 1);
        assert!(matches!(
            result.failed_validations[0],
            Failure::RequestError { .. }
        ));
    }

    #[tokio::test]
    async fn test_timeout_produces_request_error_result() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("ok")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let (runner, _rx) = runner(
            check("slow", server.uri(), vec![]),
            Duration::from_millis(200),
        );

        let result = runner.execute().await;
        assert!(result.body.is_empty());
        assert!(matches!(
            result.failed_validations.as_slice(),
            [Failure::RequestError { .. }]
        ));
    }

    #[tokio::test]
    async fn test_run_emits_results_until_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let (runner, mut rx) = runner(
            check(
                "loop",
                server.uri(),
                vec![Validation::RequireContains("ok".to_string())],
            ),
            Duration::from_secs(5),
        );
        let shutdown = ShutdownController::default();
        let task = tokio::spawn(runner.run(shutdown.clone()));

        for _ in 0..3 {
            let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .expect("runner did not emit a result")
                .expect("bus closed");
            assert_eq!(result.name, "loop");
            assert!(result.failed_validations.is_empty());
        }

        shutdown.request_shutdown();
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("runner did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_keeps_polling_after_transport_error() {
        let (runner, mut rx) = runner(
            check("down", unused_url().await, vec![]),
            Duration::from_secs(1),
        );
        let shutdown = ShutdownController::default();
        let task = tokio::spawn(runner.run(shutdown.clone()));

        for _ in 0..2 {
            let result = tokio::time::timeout(Duration::from_secs(5), rx.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(matches!(
                result.failed_validations.as_slice(),
                [Failure::RequestError { .. }]
            ));
        }

        shutdown.request_shutdown();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_waits_interval_between_cycles() {
        // 読み込み時の検証を経ないランナーに不正メソッドを渡し、通信せずに失敗させる
        let mut c = check("cadence", "http://127.0.0.1:9/".to_string(), vec![]);
        c.request.method = "G(ET".to_string();
        let (tx, mut rx) = result_bus(1);
        let runner = CheckRunner::new(
            Arc::new(c),
            client(Duration::from_secs(1)),
            Duration::from_secs(30),
            tx,
        );
        let shutdown = ShutdownController::default();
        let task = tokio::spawn(runner.run(shutdown.clone()));

        rx.recv().await.unwrap();
        let first = tokio::time::Instant::now();
        rx.recv().await.unwrap();
        assert!(first.elapsed() >= Duration::from_secs(30));

        shutdown.request_shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_run_stops_when_bus_closed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let (runner, rx) = runner(check("orphan", server.uri(), vec![]), Duration::from_secs(5));
        drop(rx);

        tokio::time::timeout(
            Duration::from_secs(5),
            runner.run(ShutdownController::default()),
        )
        .await
        .expect("runner did not stop after the bus closed");
    }
}
