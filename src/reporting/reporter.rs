//! 错误上报
//!
//! 上报调用只入队并立即返回错误 ID：
//! - critical 条目触发一次后台刷盘
//! - 其余条目由定时任务批量写入
//! - 刷盘失败时整批放回队列，下次重试

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, trace, warn};

use super::types::{
    ErrorContext, ErrorLogEntry, ErrorMetadata, ErrorStats, ErrorType, Severity, UserContext,
    determine_severity,
};
use crate::config::ReportingConfig;
use crate::errors::Result;
use crate::models::VisitContext;
use crate::storage::TrackingStore;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

fn base36_suffix(len: usize) -> String {
    (0..len)
        .map(|_| BASE36[rand::random_range(0..BASE36.len())] as char)
        .collect()
}

/// `err_<毫秒时间戳>_<9 位 base36>`
pub fn generate_error_id() -> String {
    format!("err_{}_{}", Utc::now().timestamp_millis(), base36_suffix(9))
}

/// `sess_<毫秒时间戳>_<9 位 base36>`
pub fn generate_session_id() -> String {
    format!("sess_{}_{}", Utc::now().timestamp_millis(), base36_suffix(9))
}

struct ErrorQueue {
    entries: Mutex<Vec<ErrorLogEntry>>,
    /// 刷盘锁，防止并发刷盘
    flush_lock: tokio::sync::Mutex<()>,
    /// 是否已有立即刷盘任务
    flush_pending: AtomicBool,
    max_pending: usize,
}

impl ErrorQueue {
    fn new(max_pending: usize) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            flush_lock: tokio::sync::Mutex::new(()),
            flush_pending: AtomicBool::new(false),
            max_pending: max_pending.max(1),
        }
    }

    fn push(&self, entry: ErrorLogEntry) {
        let mut entries = self.entries.lock();
        entries.push(entry);
        self.trim(&mut entries);
    }

    /// 超出上限时丢弃最旧的条目
    fn trim(&self, entries: &mut Vec<ErrorLogEntry>) {
        if entries.len() > self.max_pending {
            let dropped = entries.len() - self.max_pending;
            entries.drain(..dropped);
            warn!(
                "Error queue over capacity ({}), dropped {} oldest entries",
                self.max_pending, dropped
            );
        }
    }

    fn drain(&self) -> Vec<ErrorLogEntry> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// 失败的批次放回队首，保持时间顺序
    fn restore(&self, mut batch: Vec<ErrorLogEntry>) {
        let mut entries = self.entries.lock();
        batch.append(&mut entries);
        *entries = batch;
        self.trim(&mut entries);
    }

    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[derive(Clone)]
pub struct ErrorReporter {
    queue: Arc<ErrorQueue>,
    store: Arc<dyn TrackingStore>,
    flush_interval: Duration,
    session_id: Arc<str>,
    metadata: ErrorMetadata,
}

impl ErrorReporter {
    pub fn new(store: Arc<dyn TrackingStore>, config: &ReportingConfig) -> Self {
        Self {
            queue: Arc::new(ErrorQueue::new(config.max_pending)),
            store,
            flush_interval: Duration::from_millis(config.flush_interval_ms),
            session_id: Arc::from(generate_session_id()),
            metadata: ErrorMetadata {
                version: config.version.clone(),
                environment: config.environment.clone(),
            },
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// 入队一条错误，返回错误 ID
    pub fn log_error(
        &self,
        visit: &VisitContext,
        error_type: ErrorType,
        title: &str,
        message: &str,
        context: ErrorContext,
        stack: Option<String>,
    ) -> String {
        let entry = ErrorLogEntry {
            error_id: generate_error_id(),
            timestamp: Utc::now(),
            error_type,
            title: title.to_string(),
            message: message.to_string(),
            stack,
            user_context: UserContext {
                user_agent: visit.user_agent.clone(),
                url: visit.page_url.clone(),
                referrer: visit.referrer.clone(),
                device_type: visit.device_type().to_string(),
                session_id: Some(self.session_id.to_string()),
            },
            error_context: context,
            severity: determine_severity(error_type, message),
            resolved: false,
            metadata: self.metadata.clone(),
        };
        let error_id = entry.error_id.clone();
        let severity = entry.severity;

        info!(
            "Error reported: {} [{}] {} ({})",
            error_id, error_type, title, severity
        );
        self.queue.push(entry);

        if severity == Severity::Critical {
            self.spawn_flush();
        }
        error_id
    }

    pub fn log_user_error(
        &self,
        visit: &VisitContext,
        title: &str,
        message: &str,
        context: ErrorContext,
    ) -> String {
        self.log_error(visit, ErrorType::UserError, title, message, context, None)
    }

    pub fn log_validation_error(
        &self,
        visit: &VisitContext,
        title: &str,
        message: &str,
        context: ErrorContext,
    ) -> String {
        self.log_error(visit, ErrorType::ValidationError, title, message, context, None)
    }

    pub fn log_network_error(
        &self,
        visit: &VisitContext,
        title: &str,
        message: &str,
        context: ErrorContext,
    ) -> String {
        self.log_error(visit, ErrorType::NetworkError, title, message, context, None)
    }

    pub fn log_partner_error(
        &self,
        visit: &VisitContext,
        title: &str,
        message: &str,
        partner: &str,
        context: ErrorContext,
    ) -> String {
        self.log_error(
            visit,
            ErrorType::PartnerError,
            title,
            message,
            context.with_partner(partner),
            None,
        )
    }

    pub fn log_system_error(
        &self,
        visit: &VisitContext,
        title: &str,
        message: &str,
        context: ErrorContext,
        stack: Option<String>,
    ) -> String {
        self.log_error(visit, ErrorType::SystemError, title, message, context, stack)
    }

    fn spawn_flush(&self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            trace!("ErrorReporter: no runtime, critical entry left for next flush");
            return;
        };
        if self
            .queue
            .flush_pending
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
            .is_err()
        {
            return;
        }

        let queue = Arc::clone(&self.queue);
        let store = Arc::clone(&self.store);
        handle.spawn(async move {
            if let Ok(_guard) = queue.flush_lock.try_lock() {
                Self::flush_queue(&queue, &store).await;
            } else {
                trace!("ErrorReporter: flush already in progress, skipping");
            }
            queue.flush_pending.store(false, Ordering::Release);
        });
    }

    /// 定时刷盘循环
    pub async fn start_background_task(&self) {
        loop {
            sleep(self.flush_interval).await;

            if let Ok(_guard) = self.queue.flush_lock.try_lock() {
                Self::flush_queue(&self.queue, &self.store).await;
            } else {
                trace!("ErrorReporter: flush already in progress, skipping scheduled flush");
            }
        }
    }

    /// 手动刷盘（等待进行中的刷盘完成）
    pub async fn flush(&self) {
        debug!("ErrorReporter: Manual flush triggered");
        let _guard = self.queue.flush_lock.lock().await;
        Self::flush_queue(&self.queue, &self.store).await;
    }

    async fn flush_queue(queue: &ErrorQueue, store: &Arc<dyn TrackingStore>) {
        let batch = queue.drain();
        if batch.is_empty() {
            return;
        }

        let count = batch.len();
        match store.insert_error_logs(&batch).await {
            Ok(()) => debug!("ErrorReporter: Flushed {} entries", count),
            Err(e) => {
                queue.restore(batch);
                warn!(
                    "ErrorReporter: insert_error_logs failed: {}, {} entries restored to queue",
                    e, count
                );
            }
        }
    }

    /// 队列中尚未写入的条目数
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// 最近 `days` 天的错误统计
    pub async fn error_stats(&self, days: i64) -> Result<ErrorStats> {
        let since = Utc::now() - chrono::Duration::days(days);
        let rows = self.store.recent_error_logs(since).await?;

        let mut stats = ErrorStats {
            total: rows.len(),
            ..Default::default()
        };
        for row in &rows {
            *stats.by_type.entry(row.error_type.to_string()).or_default() += 1;
            *stats
                .by_severity
                .entry(row.severity.to_string())
                .or_default() += 1;
            *stats
                .by_resolved
                .entry(row.resolved.to_string())
                .or_default() += 1;
        }
        stats.recent = rows.iter().rev().take(10).rev().cloned().collect();
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn reporter(store: Arc<MemoryStore>) -> ErrorReporter {
        let config = ReportingConfig {
            flush_interval_ms: 50,
            version: "test".to_string(),
            environment: "test".to_string(),
            max_pending: 1000,
        };
        ErrorReporter::new(store, &config)
    }

    #[test]
    fn test_id_formats() {
        let id = generate_error_id();
        let parts: Vec<&str> = id.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "err");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 9);
        assert!(parts[2].chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        assert!(generate_session_id().starts_with("sess_"));
    }

    #[tokio::test]
    async fn test_non_critical_entries_wait_for_flush() {
        let store = Arc::new(MemoryStore::new());
        let reporter = reporter(Arc::clone(&store));
        let visit = VisitContext::default();

        reporter.log_validation_error(
            &visit,
            "Location Needed",
            "User attempted search without selecting a pickup location",
            ErrorContext::new("SearchForm", "generate_and_open_deep_link"),
        );
        assert_eq!(reporter.pending(), 1);
        assert!(store.error_logs().is_empty());

        reporter.flush().await;
        let logs = store.error_logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].severity, Severity::Medium);
        assert_eq!(
            logs[0].user_context.session_id.as_deref(),
            Some(reporter.session_id())
        );
        assert_eq!(reporter.pending(), 0);
    }

    #[tokio::test]
    async fn test_critical_entry_flushes_in_background() {
        let store = Arc::new(MemoryStore::new());
        let reporter = reporter(Arc::clone(&store));

        reporter.log_system_error(
            &VisitContext::default(),
            "Search Unavailable - Deep Link Generation Failed",
            "boom",
            ErrorContext::default(),
            None,
        );

        for _ in 0..50 {
            if !store.error_logs().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(store.error_logs().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_flush_restores_entries() {
        let store = Arc::new(MemoryStore::new());
        store.fail_error_logs(true);
        let reporter = reporter(Arc::clone(&store));
        let visit = VisitContext::default();

        reporter.log_network_error(&visit, "first", "network down", ErrorContext::default());
        reporter.flush().await;
        assert_eq!(reporter.pending(), 1);

        reporter.log_network_error(&visit, "second", "network down", ErrorContext::default());
        store.fail_error_logs(false);
        reporter.flush().await;

        let titles: Vec<String> = store.error_logs().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_queue_drops_oldest_when_store_stays_down() {
        let store = Arc::new(MemoryStore::new());
        store.fail_error_logs(true);
        let config = ReportingConfig {
            flush_interval_ms: 50,
            version: "test".to_string(),
            environment: "test".to_string(),
            max_pending: 3,
        };
        let reporter = ErrorReporter::new(store.clone(), &config);
        let visit = VisitContext::default();

        for i in 0..5 {
            reporter.log_network_error(&visit, &format!("e{}", i), "down", ErrorContext::default());
            reporter.flush().await;
        }
        assert_eq!(reporter.pending(), 3);

        store.fail_error_logs(false);
        reporter.flush().await;
        let titles: Vec<String> = store.error_logs().into_iter().map(|e| e.title).collect();
        assert_eq!(titles, vec!["e2", "e3", "e4"]);
    }

    #[tokio::test]
    async fn test_error_stats_groups_rows() {
        let store = Arc::new(MemoryStore::new());
        let reporter = reporter(Arc::clone(&store));
        let visit = VisitContext::default();

        reporter.log_partner_error(&visit, "a", "x", "kayak", ErrorContext::default());
        reporter.log_partner_error(&visit, "b", "y", "skyscanner", ErrorContext::default());
        reporter.log_user_error(&visit, "c", "z", ErrorContext::default());
        reporter.flush().await;

        let stats = reporter.error_stats(7).await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_type.get("partner_error"), Some(&2));
        assert_eq!(stats.by_severity.get("high"), Some(&2));
        assert_eq!(stats.by_resolved.get("false"), Some(&3));
        assert_eq!(stats.recent.len(), 3);
        assert_eq!(
            stats.recent[0].error_context.partner_name.as_deref(),
            Some("kayak")
        );
    }
}
