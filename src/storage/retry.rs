//! 后端操作重试模块
//!
//! Every backend call is bounded by a per-attempt timeout. Transient
//! failures (`BackendUnavailable`, including timeouts) are retried with
//! exponential backoff; every other error is returned immediately.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::errors::{Result, ShortstatError};

/// 重试配置
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
            timeout_ms: 10_000,
        }
    }
}

impl From<&StoreConfig> for RetryConfig {
    fn from(config: &StoreConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay_ms: config.retry_base_delay_ms,
            max_delay_ms: config.retry_max_delay_ms,
            timeout_ms: config.timeout_ms,
        }
    }
}

/// 带超时的指数退避重试执行器
pub async fn with_retry<T, F, Fut>(operation_name: &str, config: RetryConfig, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let timeout = Duration::from_millis(config.timeout_ms);
    let mut attempt = 0;
    loop {
        let outcome = match tokio::time::timeout(timeout, operation()).await {
            Ok(result) => result,
            Err(_elapsed) => Err(ShortstatError::backend_unavailable(format!(
                "operation '{}' timed out after {}ms",
                operation_name, config.timeout_ms
            ))),
        };

        match outcome {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        "Operation '{}' succeeded after {} retries",
                        operation_name, attempt
                    );
                }
                return Ok(value);
            }
            Err(e @ ShortstatError::BackendUnavailable(_)) if attempt < config.max_retries => {
                attempt += 1;
                let delay = calculate_backoff(attempt, config.base_delay_ms, config.max_delay_ms);
                warn!(
                    "Operation '{}' failed (attempt {}/{}): {}; retrying in {} ms",
                    operation_name,
                    attempt,
                    config.max_retries + 1,
                    e,
                    delay
                );
                sleep(Duration::from_millis(delay)).await;
            }
            Err(e) => {
                debug!("Operation '{}' failed: {}", operation_name, e);
                return Err(e);
            }
        }
    }
}

/// 计算指数退避延迟（带抖动）
fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    let exp_delay = base_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
    let capped = exp_delay.min(max_ms);
    // 添加 0-25% 的随机抖动，避免惊群效应
    let jitter = rand::random_range(0..=capped / 4);
    capped.saturating_add(jitter)
}
