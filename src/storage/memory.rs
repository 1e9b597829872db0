//! 进程内存储
//!
//! 用于 `--memory` 运行与测试。支持按操作注入失败和延迟。

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::time::sleep;

use crate::errors::{RentrouteError, Result};
use crate::models::{ClickTrackingData, LandingData};
use crate::partners::fallback_configs;
use crate::reporting::ErrorLogEntry;

use super::{PartnerConfigurationRecord, PartnerRecord, TrackingStore};

#[derive(Default)]
struct Faults {
    partner_queries: AtomicBool,
    clicks: AtomicBool,
    landings: AtomicBool,
    error_logs: AtomicBool,
}

#[derive(Default)]
pub struct MemoryStore {
    partners: Mutex<Vec<PartnerRecord>>,
    configurations: Mutex<Vec<PartnerConfigurationRecord>>,
    clicks: Mutex<Vec<ClickTrackingData>>,
    landings: Mutex<Vec<LandingData>>,
    error_logs: Mutex<Vec<ErrorLogEntry>>,
    faults: Faults,
    query_delay: Mutex<Option<Duration>>,
    write_delay: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置与数据库迁移相同的三家合作方
    pub fn with_default_partners() -> Self {
        let store = Self::new();
        for config in fallback_configs() {
            let id = config.name.clone();
            let pairs: Vec<(String, String)> = config.configurations.into_iter().collect();
            store.add_partner(
                PartnerRecord {
                    id: id.clone(),
                    name: config.name,
                    display_name: config.display_name,
                    is_active: true,
                },
                pairs
                    .iter()
                    .map(|(k, v)| PartnerConfigurationRecord::new(&id, k, v))
                    .collect(),
            );
        }
        store
    }

    pub fn add_partner(
        &self,
        partner: PartnerRecord,
        configurations: Vec<PartnerConfigurationRecord>,
    ) {
        self.partners.lock().push(partner);
        self.configurations.lock().extend(configurations);
    }

    // ==================== 故障注入 ====================

    pub fn fail_partner_queries(&self, fail: bool) {
        self.faults.partner_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_clicks(&self, fail: bool) {
        self.faults.clicks.store(fail, Ordering::SeqCst);
    }

    pub fn fail_landings(&self, fail: bool) {
        self.faults.landings.store(fail, Ordering::SeqCst);
    }

    pub fn fail_error_logs(&self, fail: bool) {
        self.faults.error_logs.store(fail, Ordering::SeqCst);
    }

    /// 读取合作方时的人为延迟
    pub fn set_query_delay(&self, delay: Option<Duration>) {
        *self.query_delay.lock() = delay;
    }

    /// 写入点击/落地时的人为延迟
    pub fn set_write_delay(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    // ==================== 读取已写入数据 ====================

    pub fn clicks(&self) -> Vec<ClickTrackingData> {
        self.clicks.lock().clone()
    }

    pub fn landings(&self) -> Vec<LandingData> {
        self.landings.lock().clone()
    }

    pub fn error_logs(&self) -> Vec<ErrorLogEntry> {
        self.error_logs.lock().clone()
    }

    async fn apply_delay(slot: &Mutex<Option<Duration>>) {
        let delay = *slot.lock();
        if let Some(delay) = delay {
            sleep(delay).await;
        }
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            Err(RentrouteError::database_operation(format!(
                "{} failed (injected)",
                operation
            )))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl TrackingStore for MemoryStore {
    async fn load_active_partners(&self) -> Result<Vec<PartnerRecord>> {
        Self::apply_delay(&self.query_delay).await;
        Self::check(&self.faults.partner_queries, "load_active_partners")?;
        let mut partners: Vec<PartnerRecord> = self
            .partners
            .lock()
            .iter()
            .filter(|p| p.is_active)
            .cloned()
            .collect();
        partners.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(partners)
    }

    async fn load_partner_configurations(&self) -> Result<Vec<PartnerConfigurationRecord>> {
        Self::apply_delay(&self.query_delay).await;
        Self::check(&self.faults.partner_queries, "load_partner_configurations")?;
        Ok(self.configurations.lock().clone())
    }

    async fn insert_click(&self, click: &ClickTrackingData) -> Result<()> {
        Self::apply_delay(&self.write_delay).await;
        Self::check(&self.faults.clicks, "insert_click")?;
        self.clicks.lock().push(click.clone());
        Ok(())
    }

    async fn insert_landing(&self, landing: &LandingData) -> Result<()> {
        Self::apply_delay(&self.write_delay).await;
        Self::check(&self.faults.landings, "insert_landing")?;
        self.landings.lock().push(landing.clone());
        Ok(())
    }

    async fn insert_error_logs(&self, entries: &[ErrorLogEntry]) -> Result<()> {
        Self::check(&self.faults.error_logs, "insert_error_logs")?;
        self.error_logs.lock().extend_from_slice(entries);
        Ok(())
    }

    async fn recent_error_logs(&self, since: DateTime<Utc>) -> Result<Vec<ErrorLogEntry>> {
        let mut entries: Vec<ErrorLogEntry> = self
            .error_logs
            .lock()
            .iter()
            .filter(|e| e.timestamp >= since)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.timestamp);
        Ok(entries)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
