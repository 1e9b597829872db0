use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::services::AppServices;
use crate::storage::{StorageFactory, TrackingStore};

pub struct StartupContext {
    pub store: Arc<dyn TrackingStore>,
    pub services: AppServices,
}

/// 准备服务器启动的上下文
/// 包括存储、合作方注册表与各服务实例
pub async fn prepare_server_startup(use_memory: bool) -> Result<StartupContext> {
    let start_time = std::time::Instant::now();
    debug!("Starting pre-startup processing...");

    let config = crate::config::get_config();

    let store = if use_memory {
        warn!("Using in-memory storage, tracking data will not survive a restart");
        StorageFactory::memory()
    } else {
        StorageFactory::create()
            .await
            .context("Failed to create storage backend")?
    };
    info!("Using storage backend: {}", store.backend_name());

    let services = AppServices::build(store.clone(), &config);

    // 合作方加载失败时注册表自行回退到内置配置，这里不会失败
    services.registry.initialize().await;
    info!(
        "Partner registry ready: {:?} (new tab: {}, redirect: {})",
        services.registry.partner_names().await,
        services.registry.default_new_tab_partner_name(),
        services.registry.default_redirect_partner_name(),
    );

    info!(
        "Pre-startup processing completed in {} ms",
        start_time.elapsed().as_millis()
    );

    Ok(StartupContext { store, services })
}
