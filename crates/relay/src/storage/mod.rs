//! # 署名付きURL生成
//!
//! オブジェクト参照から期限付きのダウンロードURLを生成する。
//! S3互換ストレージ実装は `s3` サブモジュールを参照。

#[cfg(feature = "vendor-aws")]
pub mod s3;

#[cfg(feature = "vendor-aws")]
pub use self::s3::S3LinkSigner;

use crate::decoder::ObjectRef;
use crate::error::RelayError;

/// 署名付きURLの有効期限（秒）。2日間。
pub const SIGNED_URL_EXPIRY_SECS: u32 = 172_800;

/// 署名付きGET URLを発行するストレージの抽象インターフェース。
///
/// AWS S3, MinIO, Cloudflare R2 等のS3互換ストレージを実装として選択できる。
#[async_trait::async_trait]
pub trait LinkSigner: Send + Sync {
    /// `bucket`内の`key`を読み取るための署名付きURLを生成する。
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, RelayError>;
}

/// レコードのバケット名、無ければデフォルトバケットを返す。
pub fn resolve_bucket<'a>(
    object: &'a ObjectRef,
    default_bucket: Option<&'a str>,
) -> Option<&'a str> {
    object
        .bucket
        .as_deref()
        .filter(|name| !name.is_empty())
        .or(default_bucket.filter(|name| !name.is_empty()))
}

/// オブジェクト1件分の署名付きURLを生成する。
///
/// 失敗してもエラーにはせず`None`を返す。1件の失敗で同じバッチの他のリンク配信を止めない。
pub async fn generate_file_url(
    signer: &dyn LinkSigner,
    default_bucket: Option<&str>,
    object: &ObjectRef,
) -> Option<String> {
    let Some(bucket) = resolve_bucket(object, default_bucket) else {
        tracing::error!(
            key = %object.key,
            "バケット名を解決できません（レコードにもBUCKET_NAMEにも無し）"
        );
        return None;
    };

    match signer
        .presign_get(bucket, &object.key, SIGNED_URL_EXPIRY_SECS)
        .await
    {
        Ok(url) => {
            tracing::debug!(bucket, key = %object.key, "署名付きURLを生成");
            Some(url)
        }
        Err(e) => {
            tracing::error!(bucket, key = %object.key, error = %e, "署名付きURL生成に失敗");
            None
        }
    }
}
