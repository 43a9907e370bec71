//! # ファンアウト配信
//!
//! 1回の呼び出しで受け取ったエンベロープのバッチを処理する。
//!
//! ## 処理の流れ（エンベロープごと）
//! 1. 本文をデコードしてアップロードレコードを取り出す
//! 2. レコードごとに署名付きURLを生成し、サイズと組にして集める
//! 3. 接続ディレクトリから現在の接続IDを全件取得する
//! 4. 集めたリストを1度だけシリアライズし、全接続へ同じメッセージを送る
//!
//! ## エラーの扱い
//! - URL生成の失敗: そのレコードの`fileUrl`を`null`にして続行
//! - 送信の失敗: その接続だけをスキップして次の接続へ
//! - 不正なレコード: そのレコードだけを除外して続行
//! - デコード・ディレクトリ読み取りの失敗: そのエンベロープを破棄して次のエンベロープへ

use futures::stream::{self, StreamExt};
use serde::Serialize;
use upnotify_types::{Envelope, EnvelopeBatch, FileInfo};

use crate::config::RelayState;
use crate::decoder::{decode_envelope, object_ref, ObjectRef};
use crate::error::RelayError;
use crate::storage::generate_file_url;

/// エンベロープ1件分の処理結果。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EnvelopeReport {
    /// 生成したファイル情報の件数
    pub files: usize,
    /// 取得した接続IDの件数
    pub connections: usize,
    /// 送信に成功した件数
    pub delivered: usize,
    /// 切断済みだった接続の件数
    pub gone: usize,
    /// 送信に失敗した件数
    pub failed: usize,
}

/// バッチ全体の処理結果。ログと呼び出し元への応答にのみ使う。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub envelopes: usize,
    /// 最後まで処理できたエンベロープ数
    pub processed: usize,
    /// エラーで破棄したエンベロープ数
    pub skipped: usize,
    pub files: usize,
    pub delivered: usize,
    pub gone: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, envelope: &EnvelopeReport) {
        self.processed += 1;
        self.files += envelope.files;
        self.delivered += envelope.delivered;
        self.gone += envelope.gone;
        self.failed += envelope.failed;
    }
}

/// バッチ内の全エンベロープを順に処理する。
///
/// エンベロープ単位のエラーはログに残して次へ進むため、この関数自体は失敗しない。
pub async fn handle_batch(state: &RelayState, batch: &EnvelopeBatch) -> BatchReport {
    let mut report = BatchReport {
        envelopes: batch.records.len(),
        ..Default::default()
    };

    for (index, envelope) in batch.records.iter().enumerate() {
        let message_id = envelope.message_id.as_deref().unwrap_or("-");
        match process_envelope(state, envelope).await {
            Ok(envelope_report) => {
                tracing::info!(
                    index,
                    message_id,
                    files = envelope_report.files,
                    connections = envelope_report.connections,
                    delivered = envelope_report.delivered,
                    gone = envelope_report.gone,
                    failed = envelope_report.failed,
                    "エンベロープを処理"
                );
                report.record(&envelope_report);
            }
            Err(e) => {
                tracing::error!(index, message_id, error = %e, "エンベロープの処理に失敗。次のエンベロープに進みます");
                report.skipped += 1;
            }
        }
    }

    report
}

/// エンベロープ1件をデコードし、生成したリンクを全接続へ配信する。
///
/// レコードが無い（`Records`欠落・空配列）場合は配信しない。
/// `Records`が存在しても空配列、または全レコードが不正で除外された場合は、
/// 空リスト`[]`を送らずにディレクトリも読まない。
pub async fn process_envelope(
    state: &RelayState,
    envelope: &Envelope,
) -> Result<EnvelopeReport, RelayError> {
    let Some(records) = decode_envelope(envelope)? else {
        tracing::debug!("Recordsが無いため配信をスキップ");
        return Ok(EnvelopeReport::default());
    };
    if records.is_empty() {
        tracing::debug!("Recordsが空のため配信をスキップ");
        return Ok(EnvelopeReport::default());
    }

    let objects: Vec<ObjectRef> = records.iter().map(object_ref).collect();
    let file_infos = collect_file_infos(state, &objects).await;

    let connection_ids = state.directory.connection_ids().await?;

    let payload = serde_json::to_string(&file_infos)
        .map_err(|e| RelayError::Serialization(format!("配信メッセージのシリアライズに失敗: {e}")))?;

    let mut report = EnvelopeReport {
        files: file_infos.len(),
        connections: connection_ids.len(),
        ..Default::default()
    };

    for (connection_id, result) in deliver(state, &connection_ids, &payload).await {
        match result {
            Ok(()) => report.delivered += 1,
            Err(RelayError::ConnectionGone(_)) => {
                tracing::warn!(connection_id, "切断済みの接続のため送信をスキップ");
                report.gone += 1;
            }
            Err(e) => {
                tracing::error!(connection_id, error = %e, "接続への送信に失敗");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// オブジェクトごとに署名付きURLを生成し、デコード順にファイル情報を返す。
///
/// URL生成に失敗したオブジェクトも`fileUrl: null`として件数に含める。
pub async fn collect_file_infos(state: &RelayState, objects: &[ObjectRef]) -> Vec<FileInfo> {
    let mut file_infos = Vec::with_capacity(objects.len());
    for object in objects {
        let file_url = generate_file_url(
            state.link_signer.as_ref(),
            state.default_bucket.as_deref(),
            object,
        )
        .await;
        file_infos.push(FileInfo {
            file_url,
            size: object.size,
        });
    }
    file_infos
}

/// 同じメッセージを全接続へ送る。接続ごとの結果を返し、1件の失敗で残りを止めない。
///
/// 同時送信数は`delivery_concurrency`まで。完了順は保証しない。
async fn deliver<'a>(
    state: &RelayState,
    connection_ids: &'a [String],
    payload: &str,
) -> Vec<(&'a str, Result<(), RelayError>)> {
    stream::iter(connection_ids)
        .map(move |connection_id| async move {
            let result = state
                .gateway
                .post_to_connection(connection_id, payload)
                .await;
            (connection_id.as_str(), result)
        })
        .buffer_unordered(state.delivery_concurrency.max(1))
        .collect()
        .await
}
