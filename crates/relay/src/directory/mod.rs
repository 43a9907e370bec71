//! # 接続ディレクトリ
//!
//! 現在接続中のリアルタイムクライアントの接続IDを読み取る。
//! ディレクトリのエントリは参照のみで、作成・削除・更新はしない。
//! DynamoDB実装は `dynamodb` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod dynamodb;

#[cfg(feature = "vendor-aws")]
pub use self::dynamodb::DynamoConnectionDirectory;

use crate::error::RelayError;

/// 接続ディレクトリの抽象インターフェース。
#[async_trait::async_trait]
pub trait ConnectionDirectory: Send + Sync {
    /// 登録されている全接続IDを返す。空のディレクトリでは空のVecを返す。
    async fn connection_ids(&self) -> Result<Vec<String>, RelayError>;
}
