use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// 深链所扮演的角色
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Placement {
    NewTab,
    Redirect,
}

impl Placement {
    /// 落地日志里记录的深链标签
    pub fn deeplink_label(&self) -> &'static str {
        match self {
            Placement::NewTab => "new_tab_deeplink",
            Placement::Redirect => "redirect_deeplink",
        }
    }
}

/// 一次出站点击（写入 rental_clicks）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickTrackingData {
    pub click_id: String,
    pub landing_id: Option<String>,
    pub partner: String,
    pub iata_code: Option<String>,
    pub location_id: Option<String>,
    pub pickup_date_new: String,
    pub pickup_time_new: String,
    pub dropoff_date_new: String,
    pub dropoff_time_new: String,
    pub timestamp: DateTime<Utc>,
    pub placement: Placement,
    pub redirect_url: String,
    /// 访客当前页的 query 参数
    pub search_params: BTreeMap<String, String>,
    pub auto_params: bool,
}

/// 设备类型（按 UA 关键字粗分）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
}

impl DeviceType {
    pub fn from_user_agent(user_agent: &str) -> Self {
        let ua = user_agent.to_lowercase();
        if ["mobile", "android", "iphone", "ipad", "phone"]
            .iter()
            .any(|k| ua.contains(k))
        {
            DeviceType::Mobile
        } else if ua.contains("tablet") {
            DeviceType::Tablet
        } else {
            DeviceType::Desktop
        }
    }
}

/// IP 地理位置（字段与 ipinfo 风格接口一致）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct GeoPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<String>,
}

/// 合作方落地附加信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerVisit {
    pub partner: String,
    pub deeplink: String,
    pub parameters: serde_json::Value,
    pub method: Placement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingMetadata {
    pub user_agent: String,
    pub referrer: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deeplink: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<Placement>,
}

/// 一条落地记录（写入 landings）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandingData {
    pub landing_id: String,
    pub timestamp: DateTime<Utc>,
    /// 原始 query string（含前导 `?`，无参数时为空串）
    pub url_params: String,
    pub metadata: LandingMetadata,
}

/// 运行时已知的访客信息
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitContext {
    pub user_agent: String,
    pub referrer: String,
    pub client_ip: Option<String>,
    /// 不含 `?` 的 query string
    pub query_string: String,
    pub page_url: String,
}

impl VisitContext {
    pub fn with_query(query_string: impl Into<String>) -> Self {
        Self {
            query_string: query_string.into(),
            ..Default::default()
        }
    }

    /// 解析后的 query 参数（重复 key 保留最后一个）
    pub fn query_params(&self) -> BTreeMap<String, String> {
        url::form_urlencoded::parse(self.query_string.as_bytes())
            .into_owned()
            .collect()
    }

    pub fn query_param(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query_string.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// 与浏览器 `location.search` 相同的形式
    pub fn url_params(&self) -> String {
        if self.query_string.is_empty() {
            String::new()
        } else {
            format!("?{}", self.query_string)
        }
    }

    pub fn device_type(&self) -> DeviceType {
        DeviceType::from_user_agent(&self.user_agent)
    }
}
