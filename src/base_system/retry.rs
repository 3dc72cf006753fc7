//! 有上限的固定间隔重试策略。
//!
//! 只负责“试几次、每次之间等多久”，具体操作由调用方以闭包传入，
//! 因此可以用假的传输层单独测试。

use std::future::Future;
use std::time::Duration;

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// 最大尝试次数（含第一次）。为 0 时一次也不尝试。
    pub max_attempts: u32,
    /// 两次尝试之间的固定等待。
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
        }
    }
}

/// 重试用尽后的结果，保留最后一次错误。
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last_error: Option<E>,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// 第 `attempt` 次（1 起）失败后是否还能继续。
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// 执行 `op` 直到成功或次数用尽；成功时返回 (值, 实际尝试次数)。
    pub async fn run<T, E, F, Fut>(
        &self,
        label: &str,
        mut op: F,
    ) -> Result<(T, u32), RetryExhausted<E>>
    where
        E: std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut last_error = None;
        let mut attempt = 0u32;
        while attempt < self.max_attempts {
            attempt += 1;
            match op(attempt).await {
                Ok(v) => return Ok((v, attempt)),
                Err(e) => {
                    warn!("{} 第 {} 次尝试失败: {}", label, attempt, e);
                    last_error = Some(e);
                }
            }
            if self.should_retry(attempt) {
                warn!(
                    "{} 将在 {:.1}s 后重试 (第 {} 次尝试)",
                    label,
                    self.delay.as_secs_f64(),
                    attempt + 1
                );
                tokio::time::sleep(self.delay).await;
            }
        }
        Err(RetryExhausted {
            attempts: attempt,
            last_error,
        })
    }
}
