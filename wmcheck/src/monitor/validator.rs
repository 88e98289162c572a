//! レスポンスボディの検証
//!
//! 純粋関数のみ。複数のランナーから同期なしで呼び出される。

use wmcheck_common::types::Validation;

/// ボディをルール一覧で評価し、違反したルールを返す
///
/// 入力順を保持し、最初の違反で打ち切らずに全ルールを評価する。
pub fn evaluate(body: &str, rules: &[Validation]) -> Vec<Validation> {
    rules
        .iter()
        .filter(|rule| rule.is_violated_by(body))
        .cloned()
        .collect()
}
