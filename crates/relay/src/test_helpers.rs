//! # テスト用共通ヘルパー
//!
//! dispatcher, handlerテストで共有するモック群。

use std::sync::{Arc, Mutex};

use serde_json::Value;
use upnotify_types::Envelope;

use crate::config::RelayState;
use crate::directory::ConnectionDirectory;
use crate::error::RelayError;
use crate::gateway::ConnectionGateway;
use crate::storage::LinkSigner;

/// テスト用のモックLinkSigner。
/// `fail_keys`に含まれるキーでは署名に失敗する。
struct MockLinkSigner {
    fail_keys: Vec<String>,
}

#[async_trait::async_trait]
impl LinkSigner for MockLinkSigner {
    async fn presign_get(
        &self,
        bucket: &str,
        key: &str,
        expiry_secs: u32,
    ) -> Result<String, RelayError> {
        if self.fail_keys.iter().any(|k| k == key) {
            return Err(RelayError::Storage(format!("AccessDenied: {bucket}/{key}")));
        }
        Ok(format!("http://mock-storage/{bucket}/{key}?expires={expiry_secs}"))
    }
}

/// テスト用の固定接続ディレクトリ。`ids`がNoneならエラーを返す。
struct MockDirectory {
    ids: Option<Vec<String>>,
    calls: Arc<Mutex<usize>>,
}

#[async_trait::async_trait]
impl ConnectionDirectory for MockDirectory {
    async fn connection_ids(&self) -> Result<Vec<String>, RelayError> {
        *self.calls.lock().unwrap() += 1;
        self.ids
            .clone()
            .ok_or_else(|| RelayError::Directory("ProvisionedThroughputExceeded".to_string()))
    }
}

pub(crate) type Sent = Arc<Mutex<Vec<(String, String)>>>;

/// 送信を記録するモック送信口。
struct RecordingGateway {
    gone: Vec<String>,
    failing: Vec<String>,
    sent: Sent,
    attempts: Arc<Mutex<Vec<String>>>,
}

#[async_trait::async_trait]
impl ConnectionGateway for RecordingGateway {
    async fn post_to_connection(
        &self,
        connection_id: &str,
        payload: &str,
    ) -> Result<(), RelayError> {
        self.attempts.lock().unwrap().push(connection_id.to_string());
        if self.gone.iter().any(|id| id == connection_id) {
            return Err(RelayError::ConnectionGone(connection_id.to_string()));
        }
        if self.failing.iter().any(|id| id == connection_id) {
            return Err(RelayError::Delivery(format!("{connection_id}: throttled")));
        }
        self.sent
            .lock()
            .unwrap()
            .push((connection_id.to_string(), payload.to_string()));
        Ok(())
    }
}

pub(crate) struct Fixture {
    pub(crate) fail_keys: Vec<&'static str>,
    pub(crate) connections: Option<Vec<&'static str>>,
    pub(crate) gone: Vec<&'static str>,
    pub(crate) failing: Vec<&'static str>,
    pub(crate) default_bucket: Option<&'static str>,
    pub(crate) concurrency: usize,
}

impl Default for Fixture {
    fn default() -> Self {
        Self {
            fail_keys: vec![],
            connections: Some(vec!["conn-A", "conn-B"]),
            gone: vec![],
            failing: vec![],
            default_bucket: None,
            concurrency: 1,
        }
    }
}

/// モックを組み込んだRelayStateと、その記録への参照。
pub(crate) struct TestRelay {
    pub(crate) state: RelayState,
    pub(crate) directory_calls: Arc<Mutex<usize>>,
    pub(crate) sent: Sent,
    pub(crate) attempts: Arc<Mutex<Vec<String>>>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// テスト用RelayStateを構築するヘルパー
pub(crate) fn build(fixture: Fixture) -> TestRelay {
    let directory_calls = Arc::new(Mutex::new(0));
    let sent: Sent = Arc::new(Mutex::new(Vec::new()));
    let attempts = Arc::new(Mutex::new(Vec::new()));

    let state = RelayState {
        link_signer: Box::new(MockLinkSigner {
            fail_keys: to_strings(&fixture.fail_keys),
        }),
        directory: Box::new(MockDirectory {
            ids: fixture.connections.map(|ids| to_strings(&ids)),
            calls: directory_calls.clone(),
        }),
        gateway: Box::new(RecordingGateway {
            gone: to_strings(&fixture.gone),
            failing: to_strings(&fixture.failing),
            sent: sent.clone(),
            attempts: attempts.clone(),
        }),
        default_bucket: fixture.default_bucket.map(str::to_string),
        delivery_concurrency: fixture.concurrency,
    };

    TestRelay {
        state,
        directory_calls,
        sent,
        attempts,
    }
}

/// 文字列本文のエンベロープを作る
pub(crate) fn envelope(body: &str) -> Envelope {
    Envelope {
        message_id: None,
        body: Some(Value::String(body.to_string())),
    }
}

pub(crate) fn records_body(records: &[(Option<&str>, &str, u64)]) -> String {
    let records: Vec<Value> = records
        .iter()
        .map(|(bucket, key, size)| {
            let mut s3 = serde_json::json!({"object": {"key": key, "size": size}});
            if let Some(bucket) = bucket {
                s3["bucket"] = serde_json::json!({"name": bucket});
            }
            serde_json::json!({"s3": s3})
        })
        .collect();
    serde_json::json!({ "Records": records }).to_string()
}
