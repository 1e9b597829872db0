use std::time::Duration;
use tokio::signal;
use tokio::time::timeout;
use tracing::{error, info, warn};

use crate::reporting::ErrorReporter;

/// 关闭超时时间（秒）
const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// 单个任务超时时间（秒）
const TASK_TIMEOUT_SECS: u64 = 10;

pub async fn listen_for_shutdown(reporter: &ErrorReporter) {
    // 等待 Ctrl+C 信号
    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received, flushing error logs...");
        }
        Err(e) => {
            warn!(
                "Failed to listen for Ctrl+C: {}. Proceeding with shutdown anyway.",
                e
            );
        }
    }

    let shutdown_result = timeout(
        Duration::from_secs(SHUTDOWN_TIMEOUT_SECS),
        perform_shutdown_tasks(reporter),
    )
    .await;

    match shutdown_result {
        Ok(()) => info!("All shutdown tasks completed successfully"),
        Err(_) => error!(
            "Shutdown tasks timed out after {} seconds",
            SHUTDOWN_TIMEOUT_SECS
        ),
    }
}

/// 执行所有关闭任务（在超时内调用）
async fn perform_shutdown_tasks(reporter: &ErrorReporter) {
    let pending = reporter.pending();
    if pending == 0 {
        info!("No pending error logs, skipping flush");
        return;
    }

    match timeout(Duration::from_secs(TASK_TIMEOUT_SECS), reporter.flush()).await {
        Ok(()) => {
            let left = reporter.pending();
            if left > 0 {
                warn!("{} error log entries could not be written on shutdown", left);
            } else {
                info!("Flushed {} pending error logs", pending);
            }
        }
        Err(_) => error!(
            "Error log flush timed out after {} seconds",
            TASK_TIMEOUT_SECS
        ),
    }
}
