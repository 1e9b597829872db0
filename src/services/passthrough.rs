//! 搜索透传
//!
//! `/search?pickup=..&pickupDate=..` 落地页：解析 query 得到一次搜索，
//! 采用可信来源站点带来的 landing id，然后走 new-tab-only 流程。

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use super::orchestrator::{DeepLinkOrchestrator, Navigator, SearchOutcome, SearchRequest};
use super::registry::PartnerRegistry;
use super::session::LandingSession;
use crate::errors::{RentrouteError, Result};
use crate::models::{RentalLocation, SearchParams, VisitContext, hhmm};

/// 解析后的透传请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassthroughQuery {
    pub params: SearchParams,
    pub pickup_location: Option<RentalLocation>,
    /// query 中的 `landing_id`（是否采用取决于来源站点）
    pub landing_id: Option<String>,
}

/// 解析透传 query，缺少取车地点、日期或时间时返回校验错误
pub fn parse_passthrough_query(visit: &VisitContext) -> Result<PassthroughQuery> {
    let query = visit.query_params();
    let get = |key: &str| {
        query
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.is_empty())
    };

    let (Some(pickup), Some(pickup_date), Some(dropoff_date), Some(pickup_time), Some(dropoff_time)) = (
        get("pickup"),
        get("pickupDate"),
        get("dropoffDate"),
        get("pickupTime"),
        get("dropoffTime"),
    ) else {
        warn!("SearchPassthrough: missing required parameters in '{}'", visit.query_string);
        return Err(RentrouteError::validation("Missing required search parameters"));
    };

    let different_dropoff = get("differentDropoff") == Some("true");
    let dropoff = if different_dropoff {
        get("dropoff").unwrap_or_default()
    } else {
        pickup
    };

    let pickup_location = get("pickupLocation").and_then(|raw| parse_location("pickup", raw));
    let dropoff_location = if different_dropoff {
        get("dropoffLocation").and_then(|raw| parse_location("dropoff", raw))
    } else {
        None
    };

    let params = SearchParams {
        pickup: pickup.to_string(),
        dropoff: dropoff.to_string(),
        pickup_date: parse_date("pickupDate", pickup_date)?,
        dropoff_date: parse_date("dropoffDate", dropoff_date)?,
        pickup_time: parse_time("pickupTime", pickup_time)?,
        dropoff_time: parse_time("dropoffTime", dropoff_time)?,
        pickup_location: pickup_location.clone(),
        dropoff_location,
    };

    Ok(PassthroughQuery {
        params,
        pickup_location,
        landing_id: get("landing_id").map(String::from),
    })
}

fn parse_date(key: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| RentrouteError::validation(format!("Invalid {} '{}': {}", key, value, e)))
}

fn parse_time(key: &str, value: &str) -> Result<chrono::NaiveTime> {
    hhmm::parse(value)
        .ok_or_else(|| RentrouteError::validation(format!("Invalid {} '{}'", key, value)))
}

/// 地点 JSON 在 query 里被额外编码了一次
fn parse_location(which: &str, raw: &str) -> Option<RentalLocation> {
    let decoded = match urlencoding::decode(raw) {
        Ok(d) => d,
        Err(e) => {
            warn!("Failed to decode {} location data: {}", which, e);
            return None;
        }
    };
    match serde_json::from_str::<RentalLocation>(&decoded) {
        Ok(location) => Some(location),
        Err(e) => {
            warn!("Failed to parse {} location data: {}", which, e);
            None
        }
    }
}

/// 来源站点可信时才采用上游带来的 landing id
pub fn trusted_landing_id<'a>(
    query: &'a PassthroughQuery,
    referrer: &str,
    trusted_referrers: &[String],
) -> Option<&'a str> {
    let landing_id = query.landing_id.as_deref()?;
    if trusted_referrers.iter().any(|r| referrer.contains(r.as_str())) {
        Some(landing_id)
    } else {
        debug!(
            "SearchPassthrough: ignoring landing_id from untrusted referrer '{}'",
            referrer
        );
        None
    }
}

/// 取车 IATA 代码样式的输入（3-4 个字母）
pub fn looks_like_iata_code(text: &str) -> bool {
    let text = text.trim();
    (3..=4).contains(&text.len()) && text.chars().all(|c| c.is_ascii_alphabetic())
}

/// 搜索表单的取车地点解析
///
/// 优先级：访客选中的地点 → IATA 样式输入（交给合作方按文本处理）
/// → 自动补全首条结果（输入至少 2 个字符）→ 输入为空时用定位地点。
pub async fn resolve_pickup_location(
    registry: &PartnerRegistry,
    pickup_text: &str,
    selected: Option<RentalLocation>,
    detected: Option<&RentalLocation>,
) -> Option<RentalLocation> {
    if selected.is_some() {
        return selected;
    }

    let text = pickup_text.trim();
    if looks_like_iata_code(text) {
        debug!("Pickup text '{}' looks like an IATA code", text);
        return None;
    }
    if text.chars().count() >= 2 {
        return registry.search_locations(text, None).await.into_iter().next();
    }
    if text.is_empty() {
        return detected.cloned();
    }
    None
}

pub struct SearchPassthrough {
    orchestrator: DeepLinkOrchestrator,
    trusted_referrers: Vec<String>,
}

impl SearchPassthrough {
    pub fn new(orchestrator: DeepLinkOrchestrator, trusted_referrers: Vec<String>) -> Self {
        Self {
            orchestrator,
            trusted_referrers,
        }
    }

    /// 处理一次透传访问；query 不完整时返回校验错误，其余情况都由编排器兜底
    pub async fn handle(
        &self,
        visit: &VisitContext,
        session: &LandingSession,
        detected_location: Option<&RentalLocation>,
        nav: &dyn Navigator,
    ) -> Result<SearchOutcome> {
        let query = parse_passthrough_query(visit)?;

        if let Some(landing_id) =
            trusted_landing_id(&query, &visit.referrer, &self.trusted_referrers)
        {
            info!("SearchPassthrough: using upstream landing id {}", landing_id);
            self.orchestrator
                .landing()
                .set_existing_landing_id(session, landing_id);
        }

        let req = SearchRequest {
            params: &query.params,
            location: query.pickup_location.as_ref(),
            default_location: detected_location,
            visit,
            session,
        };
        Ok(self
            .orchestrator
            .generate_new_tab_only_deep_link(&req, nav)
            .await)
    }
}
