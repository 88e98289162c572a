//! エラー型定義
//!
//! 統一エラー型（thiserror使用）

use std::path::PathBuf;
use thiserror::Error;

/// Common layer error type
#[derive(Debug, Error)]
pub enum CommonError {
    /// Failed to read the checks file
    #[error("Failed to read {path}: {source}")]
    Io {
        /// Path that was being read
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two checks share the same name
    #[error("Duplicate check name: {0}")]
    DuplicateCheck(String),
}

/// Result type alias (Common)
pub type CommonResult<T> = Result<T, CommonError>;
