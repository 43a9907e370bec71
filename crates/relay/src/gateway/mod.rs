//! # 接続への送信
//!
//! 接続IDを指定してリアルタイムクライアントへメッセージを送る。
//! API Gateway WebSocket実装は `apigw` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod apigw;

#[cfg(feature = "vendor-aws")]
pub use self::apigw::ApiGatewayConnectionGateway;

use crate::error::RelayError;

/// 接続単位の送信口の抽象インターフェース。
#[async_trait::async_trait]
pub trait ConnectionGateway: Send + Sync {
    /// `connection_id`の接続へ`payload`を1件送信する。
    ///
    /// 接続が既に切断されている場合は`RelayError::ConnectionGone`を返す。
    async fn post_to_connection(&self, connection_id: &str, payload: &str)
        -> Result<(), RelayError>;
}
