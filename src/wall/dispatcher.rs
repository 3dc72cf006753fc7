//! 顺序限速派发。
//!
//! 同一时刻只有一个请求在途，每次请求返回后由 `Pacer` 决定空闲多久。
//! 测试中换成 `NoDelay` 即可去掉等待。

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::api::{ExecuteApi, ExecuteError};

#[async_trait]
pub trait Pacer: Send {
    /// 在下一次请求之前调用。
    async fn pause(&mut self);
}

/// 每次请求后固定等待。
#[derive(Debug, Clone, Copy)]
pub struct FixedDelayPacer {
    delay: Duration,
}

impl FixedDelayPacer {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Pacer for FixedDelayPacer {
    async fn pause(&mut self) {
        if !self.delay.is_zero() {
            debug!("等待 {:.2}s 后发送下一批", self.delay.as_secs_f64());
            tokio::time::sleep(self.delay).await;
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

#[async_trait]
impl Pacer for NoDelay {
    async fn pause(&mut self) {}
}

pub struct SequentialDispatcher<A, P> {
    api: A,
    pacer: P,
    /// 最后一批之后是否仍然等待。
    trailing_delay: bool,
    sent: usize,
}

impl<A: ExecuteApi, P: Pacer> SequentialDispatcher<A, P> {
    pub fn new(api: A, pacer: P, trailing_delay: bool) -> Self {
        Self {
            api,
            pacer,
            trailing_delay,
            sent: 0,
        }
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    #[cfg(test)]
    pub fn api(&self) -> &A {
        &self.api
    }

    /// 发送一段脚本；返回后按策略等待（`is_last` 且关闭了尾部等待时跳过）。
    pub async fn dispatch(&mut self, code: &str, is_last: bool) -> Result<Value, ExecuteError> {
        let result = self.api.execute(code).await;
        self.sent += 1;
        if !is_last || self.trailing_delay {
            self.pacer.pause().await;
        }
        result
    }
}
