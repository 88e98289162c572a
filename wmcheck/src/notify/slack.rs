//! Slack通知
//!
//! `chat.postMessage` に状態遷移を投稿する。

use super::{format_message, Notifier, NotifyError};
use crate::config::SlackConfig;
use crate::monitor::Transition;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Slack Web APIのベースURL
pub const SLACK_API_BASE: &str = "https://slack.com/api";

/// Slack APIのタイムアウト（秒）
const SLACK_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Slackへ通知する `Notifier`
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    config: SlackConfig,
    api_base: String,
}

impl SlackNotifier {
    /// 新しいSlack通知先を作成
    pub fn new(config: SlackConfig) -> Result<Self, NotifyError> {
        Self::with_api_base(config, SLACK_API_BASE)
    }

    /// APIのベースURLを指定して作成
    pub fn with_api_base(
        config: SlackConfig,
        api_base: impl Into<String>,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(SLACK_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            config,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, transition: &Transition) -> Result<(), NotifyError> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let payload = json!({
            "channel": self.config.channel,
            "text": format_message(transition),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifyError::Rejected(format!("HTTP {}", response.status())));
        }

        let body: SlackResponse = response.json().await?;
        if !body.ok {
            return Err(NotifyError::Rejected(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        debug!(check = %transition.name, channel = %self.config.channel, "Slack notification sent");
        Ok(())
    }
}
