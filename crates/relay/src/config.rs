//! # Relay設定・共有状態
//!
//! 環境変数からの設定読み込みとRelayの共有状態の定義。

use crate::directory::ConnectionDirectory;
use crate::error::RelayError;
use crate::gateway::ConnectionGateway;
use crate::storage::LinkSigner;

/// 接続IDを保持する属性名のデフォルト値。
pub const DEFAULT_CONNECTION_ID_ATTRIBUTE: &str = "connectionId";

/// `S3_REGION`も`AWS_REGION`も未設定の場合に使うリージョン。
pub const DEFAULT_REGION: &str = "us-east-1";

/// 環境変数から読み込むRelay設定。
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// WebSocket APIの接続管理エンドポイント（WEBSOCKET_API_ENDPOINT）
    pub websocket_api_endpoint: String,
    /// 接続IDを保持するテーブル名（TABLE_NAME）
    pub table_name: String,
    /// レコードにバケット名が無い場合のデフォルトバケット（BUCKET_NAME）
    pub default_bucket: Option<String>,
    /// ストレージのリージョン（S3_REGION）
    pub s3_region: String,
    /// S3互換ストレージのエンドポイント（S3_ENDPOINT）。
    /// 設定時はパススタイルでアクセスする。
    pub s3_endpoint: Option<String>,
    /// 明示的なストレージ認証情報（S3_ACCESS_KEY / S3_SECRET_KEY）。
    /// Noneの場合は標準のAWS環境変数を使う。
    pub s3_access_key: Option<String>,
    pub s3_secret_key: Option<String>,
    /// スキャン時に射影する接続ID属性名（CONNECTION_ID_ATTRIBUTE）
    pub connection_id_attribute: String,
    /// 1エンベロープあたりの同時送信数（DELIVERY_CONCURRENCY）
    pub delivery_concurrency: usize,
}

impl RelayConfig {
    /// プロセスの環境変数から構築する。
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する。空文字列は未設定として扱う。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &str| {
            get(name).ok_or_else(|| RelayError::Config(format!("{name}が設定されていません")))
        };

        let delivery_concurrency = match get("DELIVERY_CONCURRENCY") {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(RelayError::Config(format!(
                        "DELIVERY_CONCURRENCYは1以上の整数である必要があります: {raw}"
                    )))
                }
            },
            None => 1,
        };

        let s3_access_key = get("S3_ACCESS_KEY");
        let s3_secret_key = get("S3_SECRET_KEY");
        if s3_access_key.is_some() != s3_secret_key.is_some() {
            return Err(RelayError::Config(
                "S3_ACCESS_KEYとS3_SECRET_KEYは両方設定する必要があります".to_string(),
            ));
        }

        Ok(Self {
            websocket_api_endpoint: require("WEBSOCKET_API_ENDPOINT")?,
            table_name: require("TABLE_NAME")?,
            default_bucket: get("BUCKET_NAME"),
            s3_region: get("S3_REGION")
                .or_else(|| get("AWS_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            s3_endpoint: get("S3_ENDPOINT"),
            s3_access_key,
            s3_secret_key,
            connection_id_attribute: get("CONNECTION_ID_ATTRIBUTE")
                .unwrap_or_else(|| DEFAULT_CONNECTION_ID_ATTRIBUTE.to_string()),
            delivery_concurrency,
        })
    }
}

/// Relayの共有状態。
///
/// コールドスタート時に一度だけ構築し、以降の呼び出しで読み取り専用に再利用する。
pub struct RelayState {
    /// 署名付きURL生成（S3互換等、トレイトで抽象化）
    pub link_signer: Box<dyn LinkSigner>,
    /// 接続ディレクトリ
    pub directory: Box<dyn ConnectionDirectory>,
    /// 接続への送信口
    pub gateway: Box<dyn ConnectionGateway>,
    /// レコードにバケット名が無い場合のデフォルトバケット
    pub default_bucket: Option<String>,
    /// 1エンベロープあたりの同時送信数
    pub delivery_concurrency: usize,
}
