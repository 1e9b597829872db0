//! 超时组合子
//!
//! 管线里各个外部调用（存储查询、合作方解析、落地/点击写入）
//! 都通过这里统一加超时，超时后返回 `RentrouteError::Timeout`。

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::{RentrouteError, Result};

/// 给返回 `Result` 的 future 加超时
pub async fn with_timeout<T, Fut>(operation_name: &str, duration: Duration, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_elapsed) => {
            warn!(
                "Operation '{}' timed out after {}ms",
                operation_name,
                duration.as_millis()
            );
            Err(RentrouteError::timeout(operation_name, duration))
        }
    }
}

pub async fn with_timeout_ms<T, Fut>(operation_name: &str, timeout_ms: u64, fut: Fut) -> Result<T>
where
    Fut: Future<Output = Result<T>>,
{
    with_timeout(operation_name, Duration::from_millis(timeout_ms), fut).await
}
