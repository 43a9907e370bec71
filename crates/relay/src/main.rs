//! # Upnotify Relay エントリポイント
//!
//! Lambdaランタイム上で動作する。コールドスタート時にストレージ・ディレクトリ・送信口の
//! クライアントを一度だけ構築し、以降の呼び出しで再利用する。

use std::sync::Arc;

use aws_config::BehaviorVersion;
use lambda_runtime::{service_fn, LambdaEvent};
use upnotify_relay::config::{RelayConfig, RelayState};
use upnotify_relay::directory::DynamoConnectionDirectory;
use upnotify_relay::gateway::apigw::normalize_endpoint;
use upnotify_relay::gateway::ApiGatewayConnectionGateway;
use upnotify_relay::handler::handle_invocation;
use upnotify_relay::storage::S3LinkSigner;
use upnotify_relay::telemetry;
use upnotify_types::EnvelopeBatch;

/// 設定からRelayの共有状態を構築する。
async fn build_state(config: &RelayConfig) -> anyhow::Result<RelayState> {
    let link_signer = S3LinkSigner::from_config(config)?;

    let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;

    let dynamodb = aws_sdk_dynamodb::Client::new(&sdk_config);
    let directory = DynamoConnectionDirectory::new(
        dynamodb,
        config.table_name.clone(),
        config.connection_id_attribute.clone(),
    );

    let endpoint = normalize_endpoint(&config.websocket_api_endpoint);
    let gateway_config = aws_sdk_apigatewaymanagement::config::Builder::from(&sdk_config)
        .endpoint_url(endpoint.clone())
        .build();
    let gateway = ApiGatewayConnectionGateway::new(
        aws_sdk_apigatewaymanagement::Client::from_conf(gateway_config),
    );

    tracing::info!(
        websocket_api_endpoint = %endpoint,
        table = %config.table_name,
        default_bucket = config.default_bucket.as_deref().unwrap_or("-"),
        s3_region = %config.s3_region,
        delivery_concurrency = config.delivery_concurrency,
        "Relayを初期化しました"
    );

    Ok(RelayState {
        link_signer: Box::new(link_signer),
        directory: Box::new(directory),
        gateway: Box::new(gateway),
        default_bucket: config.default_bucket.clone(),
        delivery_concurrency: config.delivery_concurrency,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_tracing();

    let config = RelayConfig::from_env()?;
    let state = Arc::new(build_state(&config).await?);

    lambda_runtime::run(service_fn(move |event: LambdaEvent<EnvelopeBatch>| {
        let state = Arc::clone(&state);
        async move { handle_invocation(state, event).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}
