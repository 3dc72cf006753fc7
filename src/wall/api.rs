//! VK `execute` 接口客户端与响应解析。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

use super::models::ItemOutcome;

#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("status code: {0}")]
    Status(u16),
    #[error("invalid json: {0}")]
    Json(String),
}

/// 响应里没有 `response` 数组时的错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResponseShapeError {
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },
    #[error("unexpected response: {0}")]
    Unexpected(String),
}

#[async_trait]
pub trait ExecuteApi: Send + Sync {
    async fn execute(&self, code: &str) -> Result<Value, ExecuteError>;
}

#[derive(Debug, Clone)]
pub struct VkExecuteClient {
    client: Client,
    url: String,
    access_token: String,
    version: String,
}

impl VkExecuteClient {
    pub fn new(
        url: &str,
        access_token: &str,
        version: &str,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            url: url.trim().to_string(),
            access_token: access_token.to_string(),
            version: version.to_string(),
        })
    }
}

#[async_trait]
impl ExecuteApi for VkExecuteClient {
    async fn execute(&self, code: &str) -> Result<Value, ExecuteError> {
        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("access_token", self.access_token.as_str()),
                ("v", self.version.as_str()),
                ("code", code),
            ])
            .send()
            .await
            .map_err(|e| ExecuteError::Transport(e.without_url().to_string()))?;
        if resp.status() != StatusCode::OK {
            return Err(ExecuteError::Status(resp.status().as_u16()));
        }
        resp.json::<Value>()
            .await
            .map_err(|e| ExecuteError::Json(e.without_url().to_string()))
    }
}

/// 取出 `response` 数组并逐项转换。
pub fn parse_execute_response(value: &Value) -> Result<Vec<ItemOutcome>, ResponseShapeError> {
    if let Some(items) = value.get("response") {
        return match items.as_array() {
            Some(arr) => Ok(arr.iter().map(ItemOutcome::from_value).collect()),
            None => Err(ResponseShapeError::Unexpected(value.to_string())),
        };
    }
    if let Some(err) = value.get("error") {
        return Err(ResponseShapeError::Api {
            code: err.get("error_code").and_then(Value::as_i64).unwrap_or(0),
            message: err
                .get("error_msg")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        });
    }
    Err(ResponseShapeError::Unexpected(value.to_string()))
}
