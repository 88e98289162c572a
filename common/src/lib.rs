//! wmcheck 共通ライブラリ
//!
//! サーバーとテストで共有する型定義・設定読み込み・エラー型

#![warn(missing_docs)]

/// 設定管理（チェック定義ファイル）
pub mod config;

/// エラー型定義
pub mod error;

/// 共通型定義
pub mod types;
