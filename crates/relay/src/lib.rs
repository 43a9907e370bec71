//! # Upnotify Relay
//!
//! ファイルアップロード通知を受け取り、アップロードされたファイルの署名付きURLを生成して
//! 接続中の全リアルタイムクライアントへ配信する。
//!
//! ## 構成
//! - `decoder` — エンベロープ本文からアップロードレコードを取り出す
//! - `storage` — 署名付きURL生成（S3互換）
//! - `directory` — 接続IDの読み取り（DynamoDB）
//! - `gateway` — 接続への送信（API Gateway WebSocket）
//! - `dispatcher` — 上記をまとめたファンアウト配信
//! - `handler` — Lambda呼び出しの受け口

pub mod config;
pub mod decoder;
pub mod directory;
pub mod dispatcher;
pub mod error;
pub mod gateway;
#[cfg(feature = "vendor-aws")]
pub mod handler;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::{RelayConfig, RelayState};
pub use dispatcher::{handle_batch, BatchReport, EnvelopeReport};
pub use error::RelayError;
