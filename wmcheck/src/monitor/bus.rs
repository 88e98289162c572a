//! Result Bus
//!
//! 全ランナーから単一のコンシューマへ結果を運ぶ有界チャネル。
//! 容量を小さく保つことで、コンシューマが遅い場合はランナー側の送信が待たされる。

use thiserror::Error;
use tokio::sync::mpsc;
use wmcheck_common::types::CheckResult;

/// 受信側が既に終了しているため送信できなかった
#[derive(Debug, Error)]
#[error("result bus closed; dropped result for '{}'", .0.name)]
pub struct BusClosed(pub CheckResult);

/// Result Busを作成する（容量は最小1）
pub fn result_bus(capacity: usize) -> (ResultSender, ResultReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ResultSender { tx }, ResultReceiver { rx })
}

/// 送信側（ランナーごとに複製される）
#[derive(Clone, Debug)]
pub struct ResultSender {
    tx: mpsc::Sender<CheckResult>,
}

impl ResultSender {
    /// 結果を送信する。コンシューマが受け取れるまで待機する。
    pub async fn send(&self, result: CheckResult) -> Result<(), BusClosed> {
        self.tx.send(result).await.map_err(|e| BusClosed(e.0))
    }

    /// 受信側が閉じているか
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 受信側（コンシューマが唯一の所有者）
#[derive(Debug)]
pub struct ResultReceiver {
    rx: mpsc::Receiver<CheckResult>,
}

impl ResultReceiver {
    /// 次の結果を受信する。全送信側が破棄されると `None`。
    pub async fn recv(&mut self) -> Option<CheckResult> {
        self.rx.recv().await
    }

    /// 新規送信を拒否する（キュー済みの結果は引き続き受信できる）
    pub fn close(&mut self) {
        self.rx.close();
    }
}
