//! 設定管理
//!
//! チェック定義ファイル（JSON）の読み込みと検証

use crate::error::{CommonError, CommonResult};
use crate::types::Check;
use http::header::{HeaderName, HeaderValue};
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use url::Url;

/// チェック定義ファイルのデフォルトパス
pub const DEFAULT_CHECKS_PATH: &str = "./checks.json";

/// チェック定義ファイル
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChecksConfig {
    /// チェック一覧
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl ChecksConfig {
    /// JSON文字列から読み込み、検証する
    pub fn from_json_str(json: &str) -> CommonResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// ファイルから読み込み、検証する
    pub fn load(path: impl AsRef<Path>) -> CommonResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| CommonError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }

    /// チェック定義の不変条件を検証
    pub fn validate(&self) -> CommonResult<()> {
        validate_checks(&self.checks)
    }
}

/// チェック一覧を検証する
///
/// - 名前が空でないこと
/// - 名前が一意であること
/// - URLが絶対URLとして解釈できること
/// - メソッドがHTTPメソッドのトークンとして有効であること
/// - ヘッダー名・値がHTTPヘッダーとして有効であること
pub fn validate_checks(checks: &[Check]) -> CommonResult<()> {
    let mut seen = HashSet::with_capacity(checks.len());

    for check in checks {
        if check.name.trim().is_empty() {
            return Err(CommonError::Validation(
                "check name must not be empty".to_string(),
            ));
        }
        if !seen.insert(check.name.as_str()) {
            return Err(CommonError::DuplicateCheck(check.name.clone()));
        }
        validate_request(check)?;
    }

    Ok(())
}

fn validate_request(check: &Check) -> CommonResult<()> {
    let request = &check.request;

    if request.url.trim().is_empty() {
        return Err(CommonError::Validation(format!(
            "check '{}' has an empty url",
            check.name
        )));
    }
    if let Err(e) = Url::parse(&request.url) {
        return Err(CommonError::Validation(format!(
            "check '{}' has an invalid url {:?}: {}",
            check.name, request.url, e
        )));
    }

    // 実行時と同じく前後の空白を除き大文字化してから判定する
    let method = request.method.trim().to_ascii_uppercase();
    if method.is_empty() || Method::from_bytes(method.as_bytes()).is_err() {
        return Err(CommonError::Validation(format!(
            "check '{}' has an invalid method {:?}",
            check.name, request.method
        )));
    }

    for header in &request.headers {
        if HeaderName::from_bytes(header.key.as_bytes()).is_err() {
            return Err(CommonError::Validation(format!(
                "check '{}' has an invalid header name {:?}",
                check.name, header.key
            )));
        }
        if HeaderValue::from_str(&header.value).is_err() {
            return Err(CommonError::Validation(format!(
                "check '{}' has an invalid value for header {:?}",
                check.name, header.key
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Validation;
    use std::io::Write;

    const SAMPLE: &str = r#"{
        "checks": [
            {
                "name": "api",
                "request": {
                    "method": "POST",
                    "url": "https://example.internal/health",
                    "body": "{\"ping\":true}",
                    "headers": [
                        {"key": "Content-Type", "Value": "application/json"},
                        {"key": "X-Token", "value": "secret"}
                    ]
                },
                "validations": [
                    {"contain": "ok"},
                    {"notContain": "error"},
                    {"contain": "", "notContain": ""}
                ]
            },
            {
                "name": "web",
                "request": {"method": "GET", "url": "https://example.internal/"}
            }
        ]
    }"#;

    #[test]
    fn test_parse_sample_config() {
        let config = ChecksConfig::from_json_str(SAMPLE).unwrap();
        assert_eq!(config.checks.len(), 2);

        let api = &config.checks[0];
        assert_eq!(api.request.method, "POST");
        assert_eq!(api.request.headers.len(), 2);
        assert_eq!(api.request.headers[0].value, "application/json");
        assert_eq!(
            api.validations,
            vec![
                Validation::RequireContains("ok".to_string()),
                Validation::ForbidContains("error".to_string()),
                Validation::Noop,
            ]
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let json = r#"{"checks": [
            {"name": "a", "request": {"url": "http://a"}},
            {"name": "a", "request": {"url": "http://b"}}
        ]}"#;
        let err = ChecksConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, CommonError::DuplicateCheck(name) if name == "a"));
    }

    #[test]
    fn test_empty_name_rejected() {
        let json = r#"{"checks": [{"name": " ", "request": {"url": "http://a"}}]}"#;
        assert!(matches!(
            ChecksConfig::from_json_str(json),
            Err(CommonError::Validation(_))
        ));
    }

    #[test]
    fn test_empty_url_rejected() {
        let json = r#"{"checks": [{"name": "a", "request": {"url": ""}}]}"#;
        assert!(matches!(
            ChecksConfig::from_json_str(json),
            Err(CommonError::Validation(_))
        ));
    }

    #[test]
    fn test_relative_url_rejected() {
        let json = r#"{"checks": [{"name": "a", "request": {"url": "not a url"}}]}"#;
        let err = ChecksConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, CommonError::Validation(msg) if msg.contains("invalid url")));
    }

    #[test]
    fn test_invalid_method_rejected() {
        for method in ["G(ET", "GE T", "   "] {
            let json = format!(
                r#"{{"checks": [{{"name": "a", "request": {{"method": "{}", "url": "http://a"}}}}]}}"#,
                method
            );
            let err = ChecksConfig::from_json_str(&json).unwrap_err();
            assert!(
                matches!(&err, CommonError::Validation(msg) if msg.contains("invalid method")),
                "method {:?} should be rejected, got {}",
                method,
                err
            );
        }
    }

    #[test]
    fn test_method_is_normalized_before_validation() {
        let json = r#"{"checks": [
            {"name": "a", "request": {"method": " post ", "url": "http://a"}},
            {"name": "b", "request": {"method": "PURGE", "url": "http://a"}}
        ]}"#;
        assert!(ChecksConfig::from_json_str(json).is_ok());
    }

    #[test]
    fn test_invalid_header_name_rejected() {
        let json = r#"{"checks": [{"name": "a", "request": {
            "url": "http://a",
            "headers": [{"key": "Bad Header", "value": "x"}]
        }}]}"#;
        let err = ChecksConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, CommonError::Validation(msg) if msg.contains("invalid header name")));
    }

    #[test]
    fn test_invalid_header_value_rejected() {
        let json = r#"{"checks": [{"name": "a", "request": {
            "url": "http://a",
            "headers": [{"key": "X-Token", "value": "line\nbreak"}]
        }}]}"#;
        let err = ChecksConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, CommonError::Validation(msg) if msg.contains("invalid value")));
    }

    #[test]
    fn test_missing_request_is_serialization_error() {
        let json = r#"{"checks": [{"name": "a"}]}"#;
        assert!(matches!(
            ChecksConfig::from_json_str(json),
            Err(CommonError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ChecksConfig::load(file.path()).unwrap();
        assert_eq!(config.checks[1].name, "web");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ChecksConfig::load("/nonexistent/wmcheck/checks.json").unwrap_err();
        assert!(matches!(err, CommonError::Io { .. }));
    }

    #[test]
    fn test_empty_config_is_valid() {
        let config = ChecksConfig::from_json_str("{}").unwrap();
        assert!(config.checks.is_empty());
    }

    #[test]
    fn test_bundled_example_is_valid() {
        let config =
            ChecksConfig::from_json_str(include_str!("../../checks.example.json")).unwrap();
        assert_eq!(config.checks.len(), 2);
        assert_eq!(config.checks[1].request.headers[1].key, "X-Api-Key");
    }
}
