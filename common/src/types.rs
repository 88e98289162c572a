//! 共通型定義
//!
//! Check, Validation, CheckResult等のコアデータ型

use crate::error::CommonError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTPヘッダー（設定ファイル上の並び順を保持する）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Header {
    /// ヘッダー名
    pub key: String,
    /// ヘッダー値
    #[serde(alias = "Value")]
    pub value: String,
}

/// チェック時に発行するHTTPリクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRequest {
    /// HTTPメソッド (デフォルト: "GET")
    #[serde(default = "default_method")]
    pub method: String,
    /// リクエスト先URL
    pub url: String,
    /// リクエストボディ
    #[serde(default)]
    pub body: String,
    /// ヘッダー（同一キーは後勝ち）
    #[serde(default)]
    pub headers: Vec<Header>,
}

fn default_method() -> String {
    "GET".to_string()
}

/// 監視対象のチェック定義
///
/// 起動時に一度だけ読み込まれ、以後変更されない。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Check {
    /// チェック名（一意キー）
    pub name: String,
    /// 発行するリクエスト
    pub request: CheckRequest,
    /// レスポンスボディに対する検証ルール（順序を保持）
    #[serde(default)]
    pub validations: Vec<Validation>,
}

/// レスポンスボディに対する検証ルール
///
/// 設定ファイル上は `{contain, notContain}` で表現され、
/// どちらか一方のみが指定される。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawValidation", into = "RawValidation")]
pub enum Validation {
    /// ボディに部分文字列を含むこと
    RequireContains(String),
    /// ボディに部分文字列を含まないこと
    ForbidContains(String),
    /// 両方とも未指定のルール（常に成功）
    Noop,
}

impl Validation {
    /// ボディがこのルールに違反しているか判定
    pub fn is_violated_by(&self, body: &str) -> bool {
        match self {
            Self::RequireContains(needle) => !body.contains(needle.as_str()),
            Self::ForbidContains(needle) => body.contains(needle.as_str()),
            Self::Noop => false,
        }
    }
}

impl fmt::Display for Validation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequireContains(needle) => write!(f, "should contain {}", needle),
            Self::ForbidContains(needle) => write!(f, "should not contain {}", needle),
            Self::Noop => f.write_str("no-op"),
        }
    }
}

/// 設定ファイル・APIレスポンス上のValidation表現
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RawValidation {
    /// 含むべき部分文字列（空文字は未指定）
    #[serde(default)]
    pub contain: String,
    /// 含むべきでない部分文字列（空文字は未指定）
    #[serde(default)]
    pub not_contain: String,
}

impl TryFrom<RawValidation> for Validation {
    type Error = CommonError;

    fn try_from(raw: RawValidation) -> Result<Self, Self::Error> {
        match (raw.contain.is_empty(), raw.not_contain.is_empty()) {
            (false, false) => Err(CommonError::Validation(format!(
                "rule sets both contain ({:?}) and notContain ({:?})",
                raw.contain, raw.not_contain
            ))),
            (false, true) => Ok(Self::RequireContains(raw.contain)),
            (true, false) => Ok(Self::ForbidContains(raw.not_contain)),
            (true, true) => Ok(Self::Noop),
        }
    }
}

impl From<Validation> for RawValidation {
    fn from(validation: Validation) -> Self {
        match validation {
            Validation::RequireContains(contain) => Self {
                contain,
                not_contain: String::new(),
            },
            Validation::ForbidContains(not_contain) => Self {
                contain: String::new(),
                not_contain,
            },
            Validation::Noop => Self::default(),
        }
    }
}

/// 1回のチェック実行で検出された失敗
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Failure {
    /// リクエスト自体が失敗した（接続エラー・タイムアウト等）
    RequestError {
        /// エラー内容
        #[serde(rename = "requestError")]
        request_error: String,
    },
    /// 検証ルール違反
    Rule(Validation),
}

impl Failure {
    /// リクエストエラーの失敗エントリを作成
    pub fn request_error(message: impl Into<String>) -> Self {
        Self::RequestError {
            request_error: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RequestError { request_error } => write!(f, "request-error: {}", request_error),
            Self::Rule(validation) => validation.fmt(f),
        }
    }
}

/// チェックの状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum CheckStatus {
    /// 失敗なし
    #[default]
    #[serde(rename = "OK")]
    Ok,
    /// 1件以上の失敗あり
    #[serde(rename = "FAIL")]
    Fail,
}

impl CheckStatus {
    /// 失敗件数から状態を決定
    pub fn from_failure_count(count: usize) -> Self {
        if count == 0 {
            Self::Ok
        } else {
            Self::Fail
        }
    }

    /// CheckStatusを文字列に変換
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Fail => "FAIL",
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1回のチェック実行結果
///
/// 生成後は変更されず、Result Bus経由でストアに所有権が移る。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// チェック名
    pub name: String,
    /// 失敗一覧（空なら成功）
    pub failed_validations: Vec<Failure>,
    /// 実行時刻
    pub last_update: DateTime<Utc>,
    /// レスポンスボディ（リクエスト失敗時は空）
    pub body: String,
}

impl CheckResult {
    /// 現在の状態
    pub fn status(&self) -> CheckStatus {
        CheckStatus::from_failure_count(self.failed_validations.len())
    }
}
