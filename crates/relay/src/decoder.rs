//! # エンベロープデコーダ
//!
//! エンベロープ本文をパースし、アップロードレコードを取り出す。

use serde_json::Value;
use upnotify_types::{Envelope, UploadNotification, UploadRecord};

use crate::error::RelayError;

/// 署名対象のオブジェクト参照。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// レコードに含まれていたバケット名
    pub bucket: Option<String>,
    /// デコード済みのオブジェクトキー
    pub key: String,
    /// レコードに含まれていたサイズ（バイト）
    pub size: u64,
}

/// エンベロープからアップロードレコードを取り出す。
///
/// 本文が無い場合は`{}`として扱い、`Records`が無ければ`Ok(None)`を返す。
/// 本文自体が不正な場合はエラーとし、呼び出し側でそのエンベロープのみを破棄する。
/// 必須フィールドを欠くレコードはそのレコードだけを読み飛ばす（[`decode_records`]）。
pub fn decode_envelope(envelope: &Envelope) -> Result<Option<Vec<UploadRecord>>, RelayError> {
    let notification: UploadNotification = match &envelope.body {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(raw)) if raw.trim().is_empty() => return Ok(None),
        Some(Value::String(raw)) => serde_json::from_str(raw)
            .map_err(|e| RelayError::Decode(format!("本文のJSONパースに失敗: {e}")))?,
        Some(body @ Value::Object(_)) => serde_json::from_value(body.clone())
            .map_err(|e| RelayError::Decode(format!("本文の構造が不正: {e}")))?,
        Some(other) => {
            return Err(RelayError::Decode(format!(
                "本文がJSONオブジェクトではありません: {other}"
            )))
        }
    };

    Ok(notification.records.map(|entries| decode_records(&entries)))
}

/// `Records`の各要素をアップロードレコードに変換する。
///
/// `s3.object.key`/`s3.object.size`を欠く要素（削除イベント等）は警告を出して除外し、
/// 残りのレコードは元の順序のまま返す。
pub fn decode_records(entries: &[Value]) -> Vec<UploadRecord> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            match serde_json::from_value::<UploadRecord>(entry.clone()) {
                Ok(record) => Some(record),
                Err(e) => {
                    let event_name = entry
                        .get("eventName")
                        .and_then(Value::as_str)
                        .unwrap_or("-");
                    tracing::warn!(index, event_name, error = %e, "不正なレコードを読み飛ばします");
                    None
                }
            }
        })
        .collect()
}

/// レコードから署名対象のオブジェクト参照を作る。
pub fn object_ref(record: &UploadRecord) -> ObjectRef {
    let bucket = record
        .s3
        .bucket
        .as_ref()
        .and_then(|b| b.name.clone())
        .filter(|name| !name.is_empty());

    ObjectRef {
        bucket,
        key: decode_object_key(&record.s3.object.key),
        size: record.s3.object.size,
    }
}

/// S3イベント通知のオブジェクトキーをデコードする。
///
/// 通知ではキーがフォームエンコードされている（空白は`+`）。
/// デコードできない場合は元の文字列をそのまま使う。
pub fn decode_object_key(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(key) => key.into_owned(),
        Err(e) => {
            tracing::warn!(key = raw, error = %e, "オブジェクトキーのデコードに失敗。元のキーを使用します");
            raw.to_string()
        }
    }
}
