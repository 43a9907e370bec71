//! # S3互換 署名付きURL生成
//!
//! AWS S3, MinIO, Cloudflare R2 等のS3互換APIを使用する`LinkSigner`実装。
//! 署名はローカルで計算するため、オブジェクトの存在確認は行わない。

use super::LinkSigner;
use crate::config::RelayConfig;
use crate::error::RelayError;

/// S3互換ストレージによる署名付きURL生成。
///
/// レコードごとにバケット名が異なるため、リージョンと認証情報だけを保持し、
/// 署名のたびにバケットハンドルを作る。
pub struct S3LinkSigner {
    region: s3::Region,
    credentials: s3::creds::Credentials,
    /// S3互換エンドポイント（MinIO等）ではパススタイルを使う
    path_style: bool,
}

impl S3LinkSigner {
    pub fn new(region: s3::Region, credentials: s3::creds::Credentials, path_style: bool) -> Self {
        Self {
            region,
            credentials,
            path_style,
        }
    }

    /// Relay設定から構築する。
    ///
    /// `S3_ENDPOINT`が設定されていればカスタムリージョン + パススタイル、
    /// 無ければ`S3_REGION`のAWSリージョンを使う。
    /// 認証情報は`S3_ACCESS_KEY`/`S3_SECRET_KEY`、無ければ標準のAWS環境変数から読む。
    pub fn from_config(config: &RelayConfig) -> anyhow::Result<Self> {
        let region = match &config.s3_endpoint {
            Some(endpoint) => {
                tracing::info!(s3_endpoint = %endpoint, "S3互換エンドポイントを設定");
                s3::Region::Custom {
                    region: config.s3_region.clone(),
                    endpoint: endpoint.clone(),
                }
            }
            None => config.s3_region.parse::<s3::Region>()?,
        };

        let credentials = match (&config.s3_access_key, &config.s3_secret_key) {
            (Some(access_key), Some(secret_key)) => s3::creds::Credentials::new(
                Some(access_key),
                Some(secret_key),
                None,
                None,
                None,
            )?,
            _ => s3::creds::Credentials::from_env()?,
        };

        Ok(Self::new(region, credentials, config.s3_endpoint.is_some()))
    }

    fn bucket(&self, bucket_name: &str) -> Result<Box<s3::Bucket>, RelayError> {
        let bucket = s3::Bucket::new(bucket_name, self.region.clone(), self.credentials.clone())
            .map_err(|e| RelayError::Storage(format!("バケットの初期化に失敗 ({bucket_name}): {e}")))?;

        Ok(if self.path_style {
            bucket.with_path_style()
        } else {
            bucket
        })
    }
}

#[async_trait::async_trait]
impl LinkSigner for S3LinkSigner {
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, RelayError> {
        self.bucket(bucket)?
            .presign_get(key, expiry_secs, None)
            .await
            .map_err(|e| {
                RelayError::Storage(format!("署名付きダウンロードURL生成失敗 ({bucket}/{key}): {e}"))
            })
    }
}
