//! # Upnotify 共有型定義
//!
//! アップロード通知（入力）とクライアントへ配信するファイル情報（出力）の
//! データ構造をRust構造体として提供する。
//!
//! ## エンコーディング規則
//! - 入力: SQSイベント形式。各エンベロープの`body`にS3イベント通知のJSONが入る
//! - 出力: `{"fileUrl": string|null, "size": integer}` の配列

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 入力エンベロープ
// ---------------------------------------------------------------------------

/// 1回の呼び出しで受け取るエンベロープのバッチ。
///
/// `Records`が存在しない場合は空バッチとして扱う。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvelopeBatch {
    /// エンベロープの一覧（受信順）
    #[serde(rename = "Records", default)]
    pub records: Vec<Envelope>,
}

/// アップロード通知のエンベロープ（キューメッセージ1件分）。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Envelope {
    /// キューが払い出したメッセージID。ログの突き合わせにのみ使う。
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// 通知本文。JSON文字列、またはパース済みのJSONオブジェクト。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// S3イベント通知
// ---------------------------------------------------------------------------

/// エンベロープ本文をパースした結果。
///
/// レコードは未検証のJSONのまま保持する。削除イベントのように`size`を持たない
/// レコードが混在しても、他のレコードはデコードできるようにするため。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadNotification {
    /// アップロードレコード。テストイベント等では存在しない。
    #[serde(rename = "Records", default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<serde_json::Value>>,
}

/// アップロードされたオブジェクト1件分のレコード。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadRecord {
    pub s3: S3Entity,
}

/// レコード内の`s3`要素。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    /// バケット情報（省略時はデフォルトバケットを使う）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<S3Bucket>,
    /// オブジェクト情報
    pub object: S3Object,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct S3Bucket {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// アップロードされたオブジェクト。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Object {
    /// オブジェクトキー（S3イベント通知ではURLエンコードされている）
    pub key: String,
    /// オブジェクトサイズ（バイト）
    pub size: u64,
}

// ---------------------------------------------------------------------------
// 配信メッセージ
// ---------------------------------------------------------------------------

/// 接続中のクライアントへ配信するファイル情報。
///
/// 署名付きURLの生成に失敗した場合、`file_url`は`None`（JSONでは`null`）となる。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// 署名付きダウンロードURL
    #[serde(rename = "fileUrl")]
    pub file_url: Option<String>,
    /// オブジェクトサイズ（バイト）。レコードの値をそのまま使う。
    pub size: u64,
}
