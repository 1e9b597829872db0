//! 合作方注册表
//!
//! 首次使用时从存储加载活跃合作方（并发调用方共享同一次加载）。
//! 加载失败或超时时使用内置的三家后备配置，注册表永远不会为空。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use super::locations::LocationSearch;
use crate::config::{GeoOverride, PartnersConfig, StaticConfig};
use crate::errors::{RentrouteError, Result};
use crate::models::{PartnerConfig, RentalLocation, SearchParams, VisitContext};
use crate::partners::{Partner, PartnerKind, TrackingContext, fallback_config, fallback_configs};
use crate::reporting::{ErrorContext, ErrorReporter};
use crate::storage::TrackingStore;
use crate::utils::with_timeout;

const STATIC_NEW_TAB_PARTNER: &str = "kayak";
const STATIC_REDIRECT_PARTNER: &str = "autorentals";
const LEGACY_DEFAULT_PARTNER: &str = "skyscanner";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    NewTab,
    Redirect,
}

#[derive(Debug, Clone)]
struct Roles {
    active: String,
    new_tab: String,
    redirect: String,
}

pub struct PartnerRegistry {
    store: Arc<dyn TrackingStore>,
    locations: Arc<dyn LocationSearch>,
    reporter: ErrorReporter,
    /// 按加载顺序保存
    partners: OnceCell<Vec<Partner>>,
    roles: RwLock<Roles>,
    geo_overrides: HashMap<String, GeoOverride>,
    query_timeout: Duration,
}

impl PartnerRegistry {
    pub fn new(
        store: Arc<dyn TrackingStore>,
        locations: Arc<dyn LocationSearch>,
        reporter: ErrorReporter,
        partners: &PartnersConfig,
        query_timeout: Duration,
    ) -> Self {
        Self {
            store,
            locations,
            reporter,
            partners: OnceCell::new(),
            roles: RwLock::new(Roles {
                active: partners.active_partner.clone(),
                new_tab: partners.default_new_tab.clone(),
                redirect: partners.default_redirect.clone(),
            }),
            geo_overrides: partners
                .geo_overrides
                .iter()
                .map(|(country, o)| (country.trim().to_uppercase(), o.clone()))
                .collect(),
            query_timeout,
        }
    }

    pub fn from_config(
        store: Arc<dyn TrackingStore>,
        locations: Arc<dyn LocationSearch>,
        reporter: ErrorReporter,
        config: &StaticConfig,
    ) -> Self {
        Self::new(
            store,
            locations,
            reporter,
            &config.partners,
            Duration::from_millis(config.pipeline.registry_query_timeout_ms),
        )
    }

    // ==================== 初始化 ====================

    /// 等待合作方加载完成（只会执行一次）
    pub async fn initialize(&self) {
        self.loaded().await;
    }

    pub fn is_initialized(&self) -> bool {
        self.partners.initialized()
    }

    async fn loaded(&self) -> &[Partner] {
        self.partners.get_or_init(|| self.load()).await
    }

    async fn load(&self) -> Vec<Partner> {
        info!("PartnerRegistry: Initializing partners...");
        match self.load_from_store().await {
            Ok(mut partners) => {
                ensure_fallback_partners(&mut partners);
                info!("PartnerRegistry: Initialized {} partners", partners.len());
                partners
            }
            Err(e) => {
                error!("PartnerRegistry: Initialization failed: {}", e);
                self.reporter.log_system_error(
                    &VisitContext::default(),
                    "Partner Service Initialization Failed",
                    e.message(),
                    ErrorContext::new("PartnerRegistry", "initialize")
                        .with_extra("error_type", e.error_type()),
                    None,
                );
                let partners: Vec<Partner> = fallback_configs()
                    .into_iter()
                    .filter_map(Partner::from_config)
                    .collect();
                warn!(
                    "PartnerRegistry: Using fallback partners only ({} partners)",
                    partners.len()
                );
                partners
            }
        }
    }

    async fn load_from_store(&self) -> Result<Vec<Partner>> {
        let (rows, configurations) = tokio::try_join!(
            with_timeout(
                "Partner query",
                self.query_timeout,
                self.store.load_active_partners()
            ),
            with_timeout(
                "Partner configuration query",
                self.query_timeout,
                self.store.load_partner_configurations()
            ),
        )?;

        let mut by_partner: HashMap<String, BTreeMap<String, String>> = HashMap::new();
        for row in configurations {
            by_partner
                .entry(row.partner_id)
                .or_default()
                .insert(row.config_key, row.config_value);
        }

        let mut partners: Vec<Partner> = Vec::with_capacity(rows.len());
        for row in rows {
            let config = PartnerConfig {
                configurations: by_partner.remove(&row.id).unwrap_or_default(),
                id: row.id,
                name: row.name,
                display_name: row.display_name,
                is_active: row.is_active,
            };
            let name = config.name.clone();
            match Partner::from_config(config) {
                Some(partner) => {
                    debug!("PartnerRegistry: Initialized {} partner", partner.display_name());
                    // 同名行以后加载的为准
                    partners.retain(|p| p.kind() != partner.kind());
                    partners.push(partner);
                }
                None => warn!("PartnerRegistry: Unknown partner type: {}", name),
            }
        }
        Ok(partners)
    }

    // ==================== 查询 ====================

    pub async fn get_partner(&self, name: &str) -> Option<Partner> {
        find(self.loaded().await, name).cloned()
    }

    pub async fn active_partners(&self) -> Vec<Partner> {
        self.loaded()
            .await
            .iter()
            .filter(|p| p.is_active())
            .cloned()
            .collect()
    }

    pub async fn partner_names(&self) -> Vec<String> {
        self.loaded()
            .await
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// 旧版单一默认合作方（active，其次 skyscanner）
    pub async fn default_partner(&self) -> Option<Partner> {
        let active = self.roles.read().active.clone();
        let partners = self.loaded().await;
        find(partners, &active)
            .or_else(|| find(partners, LEGACY_DEFAULT_PARTNER))
            .cloned()
    }

    pub async fn default_new_tab_partner(&self, user_country: Option<&str>) -> Option<Partner> {
        self.resolve_role(Role::NewTab, user_country).await
    }

    pub async fn default_redirect_partner(&self, user_country: Option<&str>) -> Option<Partner> {
        self.resolve_role(Role::Redirect, user_country).await
    }

    /// 国家覆盖 / 当前默认 → 当前默认 → 静态默认 → 任意已加载合作方
    pub async fn resolve_role(&self, role: Role, user_country: Option<&str>) -> Option<Partner> {
        let partners = self.loaded().await;
        let (target, current, fallback) = {
            let roles = self.roles.read();
            let current = match role {
                Role::NewTab => roles.new_tab.clone(),
                Role::Redirect => roles.redirect.clone(),
            };
            let fallback = match role {
                Role::NewTab => STATIC_NEW_TAB_PARTNER,
                Role::Redirect => STATIC_REDIRECT_PARTNER,
            };
            (self.override_for(role, user_country), current, fallback)
        };

        let resolved = target
            .as_deref()
            .and_then(|name| find(partners, name))
            .or_else(|| find(partners, &current))
            .or_else(|| find(partners, fallback));

        match resolved {
            Some(partner) => Some(partner.clone()),
            None => {
                let any = partners.first().cloned();
                if let Some(ref partner) = any {
                    warn!(
                        "PartnerRegistry: No default {:?} partner, using {}",
                        role,
                        partner.display_name()
                    );
                }
                any
            }
        }
    }

    fn override_for(&self, role: Role, user_country: Option<&str>) -> Option<String> {
        let country = user_country.map(|c| c.trim().to_uppercase())?;
        if country.is_empty() {
            return None;
        }
        let entry = self.geo_overrides.get(&country)?;
        match role {
            Role::NewTab => entry.new_tab.clone(),
            Role::Redirect => entry.redirect.clone(),
        }
    }

    // ==================== 默认值设置 ====================

    /// 切换旧版默认合作方，名称未加载时返回 false
    pub async fn set_active_partner(&self, name: &str) -> bool {
        self.set_role_name(name, |roles| &mut roles.active).await
    }

    pub fn active_partner_name(&self) -> String {
        self.roles.read().active.clone()
    }

    pub async fn set_default_new_tab_partner(&self, name: &str) -> bool {
        self.set_role_name(name, |roles| &mut roles.new_tab).await
    }

    pub async fn set_default_redirect_partner(&self, name: &str) -> bool {
        self.set_role_name(name, |roles| &mut roles.redirect).await
    }

    pub fn default_new_tab_partner_name(&self) -> String {
        self.roles.read().new_tab.clone()
    }

    pub fn default_redirect_partner_name(&self) -> String {
        self.roles.read().redirect.clone()
    }

    async fn set_role_name<F>(&self, name: &str, slot: F) -> bool
    where
        F: FnOnce(&mut Roles) -> &mut String,
    {
        let Some(partner) = find(self.loaded().await, name) else {
            warn!("PartnerRegistry: Partner {} not found", name);
            return false;
        };
        let mut roles = self.roles.write();
        *slot(&mut roles) = partner.name().to_string();
        info!("PartnerRegistry: Default partner set to {}", partner.name());
        true
    }

    // ==================== 分发 ====================

    async fn named_or_default(&self, partner: Option<&str>) -> Result<Partner> {
        match partner {
            Some(name) => self
                .get_partner(name)
                .await
                .ok_or_else(|| RentrouteError::partner_not_found(name)),
            None => self
                .default_partner()
                .await
                .ok_or_else(|| RentrouteError::partner_unavailable("No partner available")),
        }
    }

    /// 地点搜索，任何错误都降级为空结果
    pub async fn search_locations(&self, term: &str, partner: Option<&str>) -> Vec<RentalLocation> {
        let partner = match self.named_or_default(partner).await {
            Ok(p) => p,
            Err(e) => {
                warn!("PartnerRegistry: No partner available for search: {}", e);
                return Vec::new();
            }
        };

        match partner
            .search_locations(self.locations.as_ref(), term)
            .await
        {
            Ok(locations) => locations,
            Err(e) => {
                error!(
                    "PartnerRegistry: Error searching with {}: {}",
                    partner.display_name(),
                    e
                );
                Vec::new()
            }
        }
    }

    pub async fn generate_deep_link(
        &self,
        params: &SearchParams,
        location: &RentalLocation,
        partner: Option<&str>,
        click_id: Option<&str>,
    ) -> Result<String> {
        let partner = self.named_or_default(partner).await?;
        Ok(partner.generate_deep_link(params, location, click_id))
    }

    pub async fn track_click(
        &self,
        ctx: &TrackingContext<'_>,
        params: &SearchParams,
        location: &RentalLocation,
        partner: &str,
        click_id: Option<&str>,
        landing_id: Option<&str>,
    ) -> Result<String> {
        let partner = self
            .get_partner(partner)
            .await
            .ok_or_else(|| RentrouteError::partner_not_found(partner))?;
        partner
            .track_click(ctx, params, location, click_id, landing_id)
            .await
    }
}

/// 按合作方类型匹配，名称大小写与首尾空白不敏感
fn find<'a>(partners: &'a [Partner], name: &str) -> Option<&'a Partner> {
    let kind: PartnerKind = name.trim().parse().ok()?;
    partners.iter().find(|p| p.kind() == kind)
}

/// 存储里缺少的规范合作方用后备配置补齐
fn ensure_fallback_partners(partners: &mut Vec<Partner>) {
    for kind in [
        PartnerKind::AutoRentals,
        PartnerKind::Skyscanner,
        PartnerKind::Kayak,
    ] {
        if partners.iter().any(|p| p.kind() == kind) {
            continue;
        }
        info!("PartnerRegistry: Creating fallback {} partner", kind);
        if let Some(partner) = Partner::from_config(fallback_config(kind)) {
            partners.push(partner);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReportingConfig;
    use crate::storage::{MemoryStore, PartnerConfigurationRecord, PartnerRecord};
    use async_trait::async_trait;

    struct NoLocations;

    #[async_trait]
    impl LocationSearch for NoLocations {
        async fn search(&self, _term: &str) -> Result<Vec<RentalLocation>> {
            Err(RentrouteError::location_api("API returned 500: Internal Server Error"))
        }
    }

    fn registry(store: Arc<MemoryStore>, partners: PartnersConfig) -> PartnerRegistry {
        let reporter = ErrorReporter::new(store.clone(), &ReportingConfig::default());
        PartnerRegistry::new(
            store,
            Arc::new(NoLocations),
            reporter,
            &partners,
            Duration::from_millis(100),
        )
    }

    #[tokio::test]
    async fn test_loads_store_rows_with_configuration() {
        let store = Arc::new(MemoryStore::new());
        store.add_partner(
            PartnerRecord {
                id: "p-1".into(),
                name: "autorentals".into(),
                display_name: "AutoRentals Custom".into(),
                is_active: true,
            },
            vec![PartnerConfigurationRecord::new("p-1", "campaign_id", "777")],
        );
        let registry = registry(store, PartnersConfig::default());

        let partner = registry.get_partner("autorentals").await.unwrap();
        assert_eq!(partner.display_name(), "AutoRentals Custom");
        assert_eq!(partner.config().get("campaign_id"), Some("777"));
        // 缺少的两家由后备配置补齐
        assert_eq!(registry.partner_names().await.len(), 3);
        assert_eq!(
            registry.get_partner("kayak").await.unwrap().config().id,
            "kayak-fallback"
        );
    }

    #[tokio::test]
    async fn test_mixed_case_store_name_matches_kind() {
        let store = Arc::new(MemoryStore::new());
        store.add_partner(
            PartnerRecord {
                id: "p-9".into(),
                name: "Kayak".into(),
                display_name: "Kayak Partner".into(),
                is_active: true,
            },
            Vec::new(),
        );
        let registry = registry(store, PartnersConfig::default());

        let partner = registry.get_partner("kayak").await.unwrap();
        assert_eq!(partner.config().id, "p-9");
        assert_eq!(partner.name(), "kayak");
        assert_eq!(
            registry.get_partner(" KAYAK ").await.unwrap().config().id,
            "p-9"
        );
        // 不会再补一个 kayak 后备
        let names = registry.partner_names().await;
        assert_eq!(names.len(), 3);
        assert_eq!(names.iter().filter(|n| n.as_str() == "kayak").count(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_uses_fallbacks_and_reports() {
        let store = Arc::new(MemoryStore::with_default_partners());
        store.fail_partner_queries(true);
        let registry = registry(store.clone(), PartnersConfig::default());

        registry.initialize().await;
        let ids: Vec<String> = registry
            .active_partners()
            .await
            .iter()
            .map(|p| p.config().id.clone())
            .collect();
        assert_eq!(
            ids,
            vec!["autorentals-fallback", "skyscanner-fallback", "kayak-fallback"]
        );
        assert_eq!(registry.reporter.pending() + store.error_logs().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_query_timeout_uses_fallbacks() {
        let store = Arc::new(MemoryStore::with_default_partners());
        store.set_query_delay(Some(Duration::from_secs(60)));
        let registry = registry(store, PartnersConfig::default());

        let partner = registry.default_new_tab_partner(None).await.unwrap();
        assert_eq!(partner.config().id, "skyscanner-fallback");
    }

    #[tokio::test]
    async fn test_geo_override_and_defaults() {
        let mut config = PartnersConfig::default();
        config.geo_overrides.insert(
            "gb".to_string(),
            GeoOverride {
                new_tab: Some("kayak".to_string()),
                redirect: Some("hertz".to_string()),
            },
        );
        let registry = registry(Arc::new(MemoryStore::with_default_partners()), config);

        let new_tab = registry.default_new_tab_partner(Some(" gb ")).await.unwrap();
        assert_eq!(new_tab.name(), "kayak");
        // 覆盖指向未加载的合作方时回到当前默认
        let redirect = registry.default_redirect_partner(Some("GB")).await.unwrap();
        assert_eq!(redirect.name(), "autorentals");

        let new_tab = registry.default_new_tab_partner(Some("US")).await.unwrap();
        assert_eq!(new_tab.name(), "skyscanner");
    }

    #[tokio::test]
    async fn test_setters_accept_loaded_names_only() {
        let registry = registry(
            Arc::new(MemoryStore::with_default_partners()),
            PartnersConfig::default(),
        );
        assert!(!registry.set_default_new_tab_partner("hertz").await);
        assert_eq!(registry.default_new_tab_partner_name(), "skyscanner");

        assert!(registry.set_default_new_tab_partner("Kayak").await);
        assert_eq!(registry.default_new_tab_partner_name(), "kayak");
        assert_eq!(
            registry.default_new_tab_partner(None).await.unwrap().name(),
            "kayak"
        );

        assert!(registry.set_active_partner("autorentals").await);
        assert_eq!(registry.active_partner_name(), "autorentals");
        assert_eq!(
            registry.default_partner().await.unwrap().name(),
            "autorentals"
        );
    }

    #[tokio::test]
    async fn test_unknown_default_falls_back_to_static_then_any() {
        let config = PartnersConfig {
            default_new_tab: "hertz".to_string(),
            default_redirect: "hertz".to_string(),
            ..Default::default()
        };
        let registry = registry(Arc::new(MemoryStore::with_default_partners()), config);
        assert_eq!(
            registry.default_new_tab_partner(None).await.unwrap().name(),
            "kayak"
        );
        assert_eq!(
            registry.default_redirect_partner(None).await.unwrap().name(),
            "autorentals"
        );
    }

    #[tokio::test]
    async fn test_dispatch_errors() {
        let registry = registry(
            Arc::new(MemoryStore::with_default_partners()),
            PartnersConfig::default(),
        );
        assert!(registry.search_locations("lon", None).await.is_empty());
        assert!(registry.search_locations("lon", Some("hertz")).await.is_empty());

        let params = SearchParams::round_trip(
            "LHR",
            chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
            chrono::NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        );
        let location = RentalLocation::airport("LHR", "London Heathrow");
        let err = registry
            .generate_deep_link(&params, &location, Some("hertz"), None)
            .await
            .unwrap_err();
        assert_eq!(err.message(), "Partner hertz not found");

        let url = registry
            .generate_deep_link(&params, &location, Some("autorentals"), Some("CLICK12345"))
            .await
            .unwrap();
        assert!(url.contains("pd=20250601"));
    }
}
