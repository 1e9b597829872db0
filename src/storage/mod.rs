use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::models::{ClickTrackingData, LandingData};
use crate::reporting::ErrorLogEntry;

pub mod backend;
pub mod memory;
pub mod models;

pub use backend::SeaOrmStorage;
pub use memory::MemoryStore;
pub use models::{PartnerConfigurationRecord, PartnerRecord};

/// 追踪数据存储接口
///
/// 核心流程只依赖这些操作：读取合作方及其配置、写入点击/落地/错误日志。
#[async_trait]
pub trait TrackingStore: Send + Sync {
    /// 活跃合作方（按 name 排序）
    async fn load_active_partners(&self) -> Result<Vec<PartnerRecord>>;

    async fn load_partner_configurations(&self) -> Result<Vec<PartnerConfigurationRecord>>;

    async fn insert_click(&self, click: &ClickTrackingData) -> Result<()>;

    async fn insert_landing(&self, landing: &LandingData) -> Result<()>;

    async fn insert_error_logs(&self, entries: &[ErrorLogEntry]) -> Result<()>;

    /// timestamp >= since 的错误日志（按时间升序）
    async fn recent_error_logs(&self, since: DateTime<Utc>) -> Result<Vec<ErrorLogEntry>>;

    /// 健康检查
    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &str;
}

pub struct StorageFactory;

impl StorageFactory {
    /// 按全局配置创建数据库存储
    pub async fn create() -> Result<Arc<dyn TrackingStore>> {
        let config = crate::config::get_config();
        let database_url = &config.database.database_url;

        // 从 URL 自动推断数据库类型
        let backend_type = backend::infer_backend_from_url(database_url)?;

        let storage = backend::SeaOrmStorage::new(database_url, &backend_type).await?;
        Ok(Arc::new(storage))
    }

    /// 进程内存储（预置三家合作方），用于 `--memory` 运行
    pub fn memory() -> Arc<dyn TrackingStore> {
        Arc::new(MemoryStore::with_default_partners())
    }
}
