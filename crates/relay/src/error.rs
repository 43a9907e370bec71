//! # Relay エラー型
//!
//! 配信パイプライン全体で共通のエラー型。
//! どの単位で握りつぶすか（レコード・接続・エンベロープ）は呼び出し側が決める。

/// Relayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// エンベロープ本文のデコードに失敗（不正なJSON、必須フィールド欠落）
    #[error("エンベロープのデコードに失敗: {0}")]
    Decode(String),
    /// 署名付きURLの生成に失敗
    #[error("署名付きURL生成に失敗: {0}")]
    Storage(String),
    /// 接続ディレクトリの読み取りに失敗
    #[error("接続ディレクトリの読み取りに失敗: {0}")]
    Directory(String),
    /// 接続へのメッセージ送信に失敗
    #[error("接続への送信に失敗: {0}")]
    Delivery(String),
    /// 送信先の接続が既に切断されている
    #[error("接続は既に切断されています: {0}")]
    ConnectionGone(String),
    /// 配信メッセージのシリアライズに失敗
    #[error("シリアライズに失敗: {0}")]
    Serialization(String),
    /// 設定値が不正
    #[error("設定が不正です: {0}")]
    Config(String),
}
