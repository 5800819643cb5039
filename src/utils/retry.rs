//! 重试机制
//!
//! 分片扫描期间段被后台合并替换时，重新获取搜索器并重跑该分片

use std::thread;
use std::time::Duration;

use crate::core::error::{DBError, DBResult};

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 总尝试次数（含第一次）
    pub max_attempts: u32,
    /// 两次尝试之间的等待
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            delay_ms: 0,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由“额外重试次数”构造
    pub fn from_retries(retries: u32) -> Self {
        Self::default().with_max_attempts(retries.saturating_add(1))
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// 仅对可重试错误进行重试，其他错误立即返回
///
/// `on_retry` 在每次重试前以 (已失败次数, 错误) 调用
pub fn retry_with_policy<F, T, R>(config: &RetryConfig, mut on_retry: R, mut operation: F) -> DBResult<T>
where
    F: FnMut() -> DBResult<T>,
    R: FnMut(u32, &DBError),
{
    let mut attempt = 0;

    loop {
        attempt += 1;
        match operation() {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() || attempt >= config.max_attempts {
                    return Err(e);
                }

                on_retry(attempt, &e);

                if config.delay_ms > 0 {
                    thread::sleep(Duration::from_millis(config.delay_ms));
                }
            }
        }
    }
}
