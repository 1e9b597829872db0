//! 落地追踪
//!
//! landing id 在会话内复用，让一次访问中的多次点击关联到同一条落地记录。
//! 新建 landing id 时会话与存储必须一致：写库成功后才写入会话，
//! 调用方超时丢弃 future 时会话保持不变。

use std::net::IpAddr;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::geoip::GeoLookup;
use super::session::LandingSession;
use crate::errors::Result;
use crate::models::{LandingData, LandingMetadata, PartnerVisit, VisitContext};
use crate::storage::TrackingStore;
use crate::utils::generate_landing_id;
use crate::utils::ip::is_private_or_local;

#[derive(Clone)]
pub struct LandingTracker {
    store: Arc<dyn TrackingStore>,
    geo: Arc<dyn GeoLookup>,
}

impl LandingTracker {
    pub fn new(store: Arc<dyn TrackingStore>, geo: Arc<dyn GeoLookup>) -> Self {
        Self { store, geo }
    }

    /// 读取会话中的 landing id，没有则新建并写入一条落地记录
    pub async fn get_or_create_landing_id(
        &self,
        session: &LandingSession,
        visit: &VisitContext,
    ) -> Result<String> {
        if let Some(id) = session.current() {
            debug!("Using existing landing id {}", id);
            return Ok(id);
        }

        let landing_id = generate_landing_id();

        if let Err(e) = self.log_landing(&landing_id, visit, None).await {
            warn!("Failed to save landing {}: {}", landing_id, e);
            return Err(e);
        }

        session.set(&landing_id);
        info!("New landing {}", landing_id);
        Ok(landing_id)
    }

    /// 采用上游站点带来的 landing id（不写库）
    pub fn set_existing_landing_id(&self, session: &LandingSession, landing_id: &str) {
        debug!("Adopting upstream landing id {}", landing_id);
        session.set(landing_id);
    }

    pub fn current_landing_id(&self, session: &LandingSession) -> Option<String> {
        session.current()
    }

    /// 写入一条落地记录；带合作方信息时附加 IP、地理位置与设备类型
    pub async fn log_landing(
        &self,
        landing_id: &str,
        visit: &VisitContext,
        partner: Option<&PartnerVisit>,
    ) -> Result<()> {
        let now = Utc::now();
        let mut metadata = LandingMetadata {
            user_agent: visit.user_agent.clone(),
            referrer: visit.referrer.clone(),
            timestamp: now,
            ip: None,
            location: None,
            device: None,
            partner: None,
            deeplink: None,
            parameters: None,
            method: None,
        };

        if let Some(partner) = partner {
            metadata.ip = visit.client_ip.clone();
            metadata.location = self.lookup_geo(visit.client_ip.as_deref()).await;
            metadata.device = Some(visit.device_type());
            metadata.partner = Some(partner.partner.clone());
            metadata.deeplink = Some(partner.deeplink.clone());
            metadata.parameters = Some(partner.parameters.clone());
            metadata.method = Some(partner.method);
        }

        let data = LandingData {
            landing_id: landing_id.to_string(),
            timestamp: now,
            url_params: visit.url_params(),
            metadata,
        };
        self.store.insert_landing(&data).await
    }

    /// 合作方落地：复用（或新建）会话 landing id 后记录一次，记录失败不影响返回
    pub async fn log_partner_landing(
        &self,
        session: &LandingSession,
        visit: &VisitContext,
        partner: &PartnerVisit,
    ) -> Result<String> {
        let landing_id = self.get_or_create_landing_id(session, visit).await?;

        if let Err(e) = self.log_landing(&landing_id, visit, Some(partner)).await {
            warn!(
                "Failed to log {} landing for {}: {}",
                partner.method, partner.partner, e
            );
        }
        Ok(landing_id)
    }

    async fn lookup_geo(&self, ip: Option<&str>) -> Option<crate::models::GeoPoint> {
        let ip = ip?;
        match ip.parse::<IpAddr>() {
            Ok(addr) if !is_private_or_local(&addr) => self.geo.lookup(ip).await,
            _ => None,
        }
    }
}
