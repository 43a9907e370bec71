//! # DynamoDB 接続ディレクトリ
//!
//! 接続IDテーブルを全件スキャンし、接続ID属性のみを射影して読み取る。
//! `LastEvaluatedKey`が返る限りページを辿る。

use std::collections::HashMap;

use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;

use super::ConnectionDirectory;
use crate::error::RelayError;

/// 射影式で使う属性名プレースホルダ
const ID_PLACEHOLDER: &str = "#cid";

/// DynamoDBテーブルによる接続ディレクトリ。
pub struct DynamoConnectionDirectory {
    client: aws_sdk_dynamodb::Client,
    table_name: String,
    id_attribute: String,
}

impl DynamoConnectionDirectory {
    pub fn new(
        client: aws_sdk_dynamodb::Client,
        table_name: impl Into<String>,
        id_attribute: impl Into<String>,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            id_attribute: id_attribute.into(),
        }
    }
}

#[async_trait::async_trait]
impl ConnectionDirectory for DynamoConnectionDirectory {
    async fn connection_ids(&self) -> Result<Vec<String>, RelayError> {
        let mut ids = Vec::new();
        let mut start_key: Option<HashMap<String, AttributeValue>> = None;
        let mut pages = 0usize;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .projection_expression(ID_PLACEHOLDER)
                .expression_attribute_names(ID_PLACEHOLDER, &self.id_attribute)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| {
                    RelayError::Directory(format!(
                        "Scan失敗 ({}): {}",
                        self.table_name,
                        DisplayErrorContext(&e)
                    ))
                })?;
            pages += 1;

            for item in output.items() {
                match item.get(&self.id_attribute).and_then(|v| v.as_s().ok()) {
                    Some(id) => ids.push(id.clone()),
                    None => tracing::warn!(
                        table = %self.table_name,
                        attribute = %self.id_attribute,
                        "接続ID属性が文字列でないエントリをスキップ"
                    ),
                }
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        tracing::debug!(
            table = %self.table_name,
            pages,
            connections = ids.len(),
            "接続IDを取得"
        );
        Ok(ids)
    }
}
