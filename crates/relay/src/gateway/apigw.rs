//! # API Gateway WebSocket 送信
//!
//! API Gateway Management APIの`PostToConnection`で接続へメッセージを送る。

use aws_sdk_apigatewaymanagement::error::DisplayErrorContext;
use aws_sdk_apigatewaymanagement::operation::post_to_connection::PostToConnectionError;
use aws_sdk_apigatewaymanagement::primitives::Blob;

use super::ConnectionGateway;
use crate::error::RelayError;

/// API Gateway WebSocket APIによる送信口。
pub struct ApiGatewayConnectionGateway {
    client: aws_sdk_apigatewaymanagement::Client,
}

impl ApiGatewayConnectionGateway {
    pub fn new(client: aws_sdk_apigatewaymanagement::Client) -> Self {
        Self { client }
    }
}

/// 接続管理エンドポイントをHTTPSに正規化する。
///
/// WebSocket APIのURL（`wss://`）がそのまま設定されていても管理APIを呼べるようにする。
/// 末尾の`/`は取り除く。
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if let Some(rest) = endpoint.strip_prefix("wss://") {
        format!("https://{rest}")
    } else if let Some(rest) = endpoint.strip_prefix("ws://") {
        format!("http://{rest}")
    } else if endpoint.starts_with("https://") || endpoint.starts_with("http://") {
        endpoint.to_string()
    } else {
        format!("https://{endpoint}")
    }
}

#[async_trait::async_trait]
impl ConnectionGateway for ApiGatewayConnectionGateway {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &str,
    ) -> Result<(), RelayError> {
        self.client
            .post_to_connection()
            .connection_id(connection_id)
            .data(Blob::new(payload.as_bytes()))
            .send()
            .await
            .map_err(|e| match e.into_service_error() {
                PostToConnectionError::GoneException(_) => {
                    RelayError::ConnectionGone(connection_id.to_string())
                }
                other => RelayError::Delivery(format!(
                    "{connection_id}: {}",
                    DisplayErrorContext(&other)
                )),
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use aws_sdk_apigatewaymanagement::config::{BehaviorVersion, Credentials, Region};
    use axum::body::Bytes;
    use axum::extract::Path;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;

    use super::*;

    type Received = Arc<Mutex<Vec<(String, String)>>>;

    /// モックWebSocket管理APIを起動する。
    /// `gone`に含まれる接続IDには410 GoneExceptionを返す。
    async fn start_mock_gateway(gone: &[&str]) -> (u16, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let gone: Arc<Vec<String>> = Arc::new(gone.iter().map(|s| s.to_string()).collect());

        let recorded = received.clone();
        let app = axum::Router::new().route(
            "/prod/@connections/{id}",
            axum::routing::post(move |Path(id): Path<String>, body: Bytes| {
                let recorded = recorded.clone();
                let gone = gone.clone();
                async move {
                    if gone.contains(&id) {
                        return (
                            StatusCode::GONE,
                            [("x-amzn-errortype", "GoneException")],
                            r#"{"message":"Gone"}"#,
                        )
                            .into_response();
                    }
                    recorded
                        .lock()
                        .unwrap()
                        .push((id, String::from_utf8(body.to_vec()).unwrap()));
                    StatusCode::OK.into_response()
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        (port, received)
    }

    fn test_gateway(port: u16) -> ApiGatewayConnectionGateway {
        let config = aws_sdk_apigatewaymanagement::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .endpoint_url(normalize_endpoint(&format!("ws://127.0.0.1:{port}/prod/")))
            .build();
        ApiGatewayConnectionGateway::new(aws_sdk_apigatewaymanagement::Client::from_conf(config))
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(
            normalize_endpoint("wss://abc.execute-api.ap-northeast-1.amazonaws.com/prod"),
            "https://abc.execute-api.ap-northeast-1.amazonaws.com/prod"
        );
        assert_eq!(
            normalize_endpoint("https://abc.execute-api.ap-northeast-1.amazonaws.com/prod/"),
            "https://abc.execute-api.ap-northeast-1.amazonaws.com/prod"
        );
        assert_eq!(normalize_endpoint("ws://localhost:3001"), "http://localhost:3001");
        assert_eq!(normalize_endpoint("example.com/dev"), "https://example.com/dev");
    }

    #[tokio::test]
    async fn test_post_to_connection_sends_payload() {
        let (port, received) = start_mock_gateway(&[]).await;
        let gateway = test_gateway(port);

        let payload = r#"[{"fileUrl":"http://mock/b1/k1","size":1024}]"#;
        gateway.post_to_connection("conn-A", payload).await.unwrap();

        let received = received.lock().unwrap();
        assert_eq!(received.as_slice(), &[("conn-A".to_string(), payload.to_string())]);
    }

    /// 410はConnectionGoneとして区別されることを確認
    #[tokio::test]
    async fn test_post_to_gone_connection() {
        let (port, received) = start_mock_gateway(&["conn-B"]).await;
        let gateway = test_gateway(port);

        let result = gateway.post_to_connection("conn-B", "[]").await;
        assert!(
            matches!(result, Err(RelayError::ConnectionGone(ref id)) if id == "conn-B"),
            "unexpected result: {result:?}"
        );
        assert!(received.lock().unwrap().is_empty());
    }
}
