//! Service layer
//!
//! 合作方注册表、落地追踪、深链编排与搜索透传。
//! HTTP 层与 CLI 共用同一组服务实例（见 [`AppServices`]）。

pub mod geoip;
pub mod landing;
pub mod locations;
pub mod orchestrator;
pub mod passthrough;
pub mod registry;
pub mod session;

use std::sync::Arc;
use std::time::Duration;

pub use geoip::{
    GeoLookup, IpInfoProvider, NoopGeoLookup, detect_location, geo_lookup_from_config,
    location_from_geo,
};
pub use landing::LandingTracker;
pub use locations::{HttpLocationSearch, LocationSearch};
pub use orchestrator::{
    DeepLinkOrchestrator, NavigationAction, Navigator, Notice, PipelineTimeouts,
    RecordingNavigator, SearchOutcome, SearchRequest, generate_fallback_url,
};
pub use passthrough::{
    PassthroughQuery, SearchPassthrough, looks_like_iata_code, parse_passthrough_query,
    resolve_pickup_location, trusted_landing_id,
};
pub use registry::{PartnerRegistry, Role};
pub use session::{Clock, CookieChange, LandingSession, SystemClock};

use crate::config::StaticConfig;
use crate::reporting::ErrorReporter;
use crate::storage::TrackingStore;

/// 一次启动内共享的服务实例
#[derive(Clone)]
pub struct AppServices {
    pub store: Arc<dyn TrackingStore>,
    pub registry: Arc<PartnerRegistry>,
    pub reporter: ErrorReporter,
    pub landing: LandingTracker,
    pub orchestrator: DeepLinkOrchestrator,
    pub passthrough: Arc<SearchPassthrough>,
    pub geo: Arc<dyn GeoLookup>,
    pub session_ttl: Duration,
    pub cookie_name: String,
}

impl AppServices {
    pub fn build(store: Arc<dyn TrackingStore>, config: &StaticConfig) -> Self {
        let locations: Arc<dyn LocationSearch> =
            Arc::new(HttpLocationSearch::new(&config.locations));
        let geo = geo_lookup_from_config(&config.landing);
        Self::with_providers(store, config, locations, geo)
    }

    /// 指定地点搜索与 GeoIP 实现（测试中替换外部接口）
    pub fn with_providers(
        store: Arc<dyn TrackingStore>,
        config: &StaticConfig,
        locations: Arc<dyn LocationSearch>,
        geo: Arc<dyn GeoLookup>,
    ) -> Self {
        let reporter = ErrorReporter::new(store.clone(), &config.reporting);
        let registry = Arc::new(PartnerRegistry::from_config(
            store.clone(),
            locations,
            reporter.clone(),
            config,
        ));
        let landing = LandingTracker::new(store.clone(), geo.clone());
        let orchestrator = DeepLinkOrchestrator::new(
            registry.clone(),
            landing.clone(),
            reporter.clone(),
            store.clone(),
            PipelineTimeouts::from(&config.pipeline),
        );
        let passthrough = Arc::new(SearchPassthrough::new(
            orchestrator.clone(),
            config.landing.trusted_referrers.clone(),
        ));

        Self {
            store,
            registry,
            reporter,
            landing,
            orchestrator,
            passthrough,
            geo,
            session_ttl: Duration::from_secs(config.landing.ttl_secs),
            cookie_name: config.landing.cookie_name.clone(),
        }
    }

    /// 按请求携带的 cookie 恢复落地会话
    pub fn session_from_cookie(&self, value: Option<&str>) -> LandingSession {
        LandingSession::from_cookie(value, self.session_ttl)
    }
}
