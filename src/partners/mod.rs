//! 合作方适配器
//!
//! 支持的合作方是固定集合（Kayak / Skyscanner / AutoRentals），
//! 每个变体持有自己构造好的配置，对外只有三个操作：
//! - `search_locations`: 地点自动补全
//! - `generate_deep_link`: 纯函数，生成带追踪参数的深链
//! - `track_click`: 写入一条点击记录并返回点击 ID

mod autorentals;
mod fallback;
mod kayak;
pub mod places;
mod skyscanner;
mod tokens;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use tracing::{debug, error};

use crate::errors::Result;
use crate::models::{
    ClickTrackingData, PartnerConfig, Placement, RentalLocation, SearchParams, VisitContext,
};
use crate::services::locations::LocationSearch;
use crate::services::session::LandingSession;
use crate::storage::TrackingStore;
use crate::utils::generate_click_id;

pub use autorentals::AutoRentalsPartner;
pub use fallback::{fallback_config, fallback_configs};
pub use kayak::{KayakPartner, cars_path, format_date_hour};
pub use skyscanner::SkyscannerPartner;

/// 合作方种类（按规范名称解析，大小写不敏感）
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum PartnerKind {
    Kayak,
    Skyscanner,
    AutoRentals,
}

/// 点击写入时需要的外部依赖
pub struct TrackingContext<'a> {
    pub store: &'a dyn TrackingStore,
    pub session: &'a LandingSession,
    pub visit: &'a VisitContext,
}

#[derive(Debug, Clone)]
pub enum Partner {
    Kayak(KayakPartner),
    Skyscanner(SkyscannerPartner),
    AutoRentals(AutoRentalsPartner),
}

impl Partner {
    /// 根据配置构造适配器，未知名称返回 None；名称统一为小写规范名
    pub fn from_config(mut config: PartnerConfig) -> Option<Self> {
        let kind: PartnerKind = config.name.trim().parse().ok()?;
        config.name = kind.to_string();
        Some(match kind {
            PartnerKind::Kayak => Partner::Kayak(KayakPartner::new(config)),
            PartnerKind::Skyscanner => Partner::Skyscanner(SkyscannerPartner::new(config)),
            PartnerKind::AutoRentals => Partner::AutoRentals(AutoRentalsPartner::new(config)),
        })
    }

    pub fn kind(&self) -> PartnerKind {
        match self {
            Partner::Kayak(_) => PartnerKind::Kayak,
            Partner::Skyscanner(_) => PartnerKind::Skyscanner,
            Partner::AutoRentals(_) => PartnerKind::AutoRentals,
        }
    }

    pub fn config(&self) -> &PartnerConfig {
        match self {
            Partner::Kayak(p) => p.config(),
            Partner::Skyscanner(p) => p.config(),
            Partner::AutoRentals(p) => p.config(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config().name
    }

    pub fn display_name(&self) -> &str {
        &self.config().display_name
    }

    pub fn is_active(&self) -> bool {
        self.config().is_active
    }

    /// 地点自动补全（所有合作方共用同一个接口）
    pub async fn search_locations(
        &self,
        search: &dyn LocationSearch,
        term: &str,
    ) -> Result<Vec<RentalLocation>> {
        debug!("{}: searching locations for '{}'", self.display_name(), term);
        search.search(term).await
    }

    /// 生成深链（纯函数；只有 Kayak 在缺少点击 ID 时会随机生成一个）
    pub fn generate_deep_link(
        &self,
        params: &SearchParams,
        location: &RentalLocation,
        click_id: Option<&str>,
    ) -> String {
        match self {
            Partner::Kayak(p) => p.generate_deep_link(params, location, click_id),
            Partner::Skyscanner(p) => p.generate_deep_link(params, location, click_id),
            Partner::AutoRentals(p) => p.generate_deep_link(params, location, click_id),
        }
    }

    /// 写入一条点击记录，返回最终使用的点击 ID
    ///
    /// 写入失败直接向上返回，超时与降级由调用方处理。
    pub async fn track_click(
        &self,
        ctx: &TrackingContext<'_>,
        params: &SearchParams,
        location: &RentalLocation,
        click_id: Option<&str>,
        landing_id: Option<&str>,
    ) -> Result<String> {
        let click = self.build_click(ctx, params, location, click_id, landing_id);
        let click_id = click.click_id.clone();

        if let Err(e) = ctx.store.insert_click(&click).await {
            error!(
                "{}: failed to track click {}: {}",
                self.display_name(),
                click_id,
                e
            );
            return Err(e);
        }

        debug!(
            "{}: click tracked {} (landing {:?})",
            self.display_name(),
            click_id,
            click.landing_id
        );
        Ok(click_id)
    }

    fn build_click(
        &self,
        ctx: &TrackingContext<'_>,
        params: &SearchParams,
        location: &RentalLocation,
        click_id: Option<&str>,
        landing_id: Option<&str>,
    ) -> ClickTrackingData {
        let click_id = click_id
            .filter(|id| !id.is_empty())
            .map(String::from)
            .unwrap_or_else(generate_click_id);
        let landing_id = landing_id
            .filter(|id| !id.is_empty())
            .map(String::from)
            .or_else(|| ctx.session.current());
        let redirect_url = self.generate_deep_link(params, location, Some(&click_id));

        ClickTrackingData {
            click_id,
            landing_id,
            partner: self.name().to_string(),
            iata_code: location.code().map(String::from),
            location_id: location.id().map(String::from),
            pickup_date_new: params.pickup_date_str(),
            pickup_time_new: params.pickup_time_str(),
            dropoff_date_new: params.dropoff_date_str(),
            dropoff_time_new: params.dropoff_time_str(),
            timestamp: Utc::now(),
            // 现有分析数据依赖该值，重定向角色也记为 new_tab
            placement: Placement::NewTab,
            redirect_url,
            search_params: ctx.visit.query_params(),
            auto_params: false,
        }
    }
}

/// 与浏览器 URLSearchParams 相同的 application/x-www-form-urlencoded 编码
pub(crate) fn form_query(pairs: &[(&str, &str)]) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in pairs {
        serializer.append_pair(key, value);
    }
    serializer.finish()
}
