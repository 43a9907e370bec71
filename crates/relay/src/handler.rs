//! # Lambda呼び出しハンドラ
//!
//! ランタイムから受け取ったイベントをファンアウト配信へ渡す。

use std::sync::Arc;

use lambda_runtime::LambdaEvent;
use tracing::Instrument;
use upnotify_types::EnvelopeBatch;

use crate::config::RelayState;
use crate::dispatcher::{handle_batch, BatchReport};

/// 1回の呼び出しを処理する。エンベロープ単位のエラーは内部で処理済みのため常に成功を返す。
pub async fn handle_invocation(
    state: Arc<RelayState>,
    event: LambdaEvent<EnvelopeBatch>,
) -> Result<BatchReport, lambda_runtime::Error> {
    let (batch, context) = event.into_parts();
    let span = tracing::info_span!("invocation", request_id = %context.request_id);

    let report = async {
        let report = handle_batch(&state, &batch).await;
        tracing::info!(
            envelopes = report.envelopes,
            processed = report.processed,
            skipped = report.skipped,
            files = report.files,
            delivered = report.delivered,
            gone = report.gone,
            failed = report.failed,
            "バッチを処理しました"
        );
        report
    }
    .instrument(span)
    .await;

    Ok(report)
}
