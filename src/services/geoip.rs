//! 访客 IP 地理位置
//!
//! 只用于丰富合作方落地记录，查询失败一律返回 None。
//! 内置 moka 缓存，同一 IP 的并发查询只发一次 HTTP。

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, trace, warn};
use ureq::Agent;

use crate::config::LandingConfig;
use crate::models::{GeoPoint, LocationType, RentalLocation};
use crate::utils::ip::is_private_or_local;

const GEOIP_CACHE_TTL_SECS: u64 = 15 * 60;
const GEOIP_CACHE_MAX_CAPACITY: u64 = 10_000;
const HTTP_TIMEOUT_SECS: u64 = 2;

static HTTP_AGENT: OnceLock<Agent> = OnceLock::new();

fn get_agent() -> &'static Agent {
    HTTP_AGENT.get_or_init(|| {
        Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .build()
            .into()
    })
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Option<GeoPoint>;

    fn name(&self) -> &'static str;
}

/// 关闭地理位置查询
pub struct NoopGeoLookup;

#[async_trait]
impl GeoLookup for NoopGeoLookup {
    async fn lookup(&self, _ip: &str) -> Option<GeoPoint> {
        None
    }

    fn name(&self) -> &'static str {
        "Disabled"
    }
}

/// ipinfo 风格 API（`{ip}` 占位符）
pub struct IpInfoProvider {
    api_url_template: String,
    cache: Cache<String, Option<GeoPoint>>,
}

impl IpInfoProvider {
    pub fn new(api_url_template: &str) -> Self {
        Self {
            api_url_template: api_url_template.to_string(),
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(GEOIP_CACHE_TTL_SECS))
                .max_capacity(GEOIP_CACHE_MAX_CAPACITY)
                .build(),
        }
    }

    fn fetch_sync(url: String) -> Option<GeoPoint> {
        let resp = match get_agent().get(&url).call() {
            Ok(r) => r,
            Err(e) => {
                warn!("GeoIP API request to \"{}\" failed: {}", url, e);
                return None;
            }
        };

        let json: serde_json::Value = match resp.into_body().read_json() {
            Ok(j) => j,
            Err(e) => {
                warn!("GeoIP API response from \"{}\" parse failed: {}", url, e);
                return None;
            }
        };

        parse_ipinfo(&json)
    }

    async fn fetch(&self, ip: &str) -> Option<GeoPoint> {
        let url = self.api_url_template.replace("{ip}", ip);
        tokio::task::spawn_blocking(move || Self::fetch_sync(url))
            .await
            .unwrap_or_else(|e| {
                warn!("GeoIP spawn_blocking failed: {}", e);
                None
            })
    }
}

#[async_trait]
impl GeoLookup for IpInfoProvider {
    async fn lookup(&self, ip: &str) -> Option<GeoPoint> {
        self.cache
            .get_with(ip.to_string(), async {
                trace!("GeoIP cache miss for {}", ip);
                self.fetch(ip).await
            })
            .await
    }

    fn name(&self) -> &'static str {
        "IpInfo"
    }
}

/// 解析 `{"city","region","country","loc":"lat,lng"}`
pub fn parse_ipinfo(json: &serde_json::Value) -> Option<GeoPoint> {
    if json.get("error").is_some() || json["bogon"].as_bool() == Some(true) {
        return None;
    }

    let text = |key: &str| json[key].as_str().map(String::from);
    let (lat, lng) = match json["loc"].as_str().and_then(|loc| loc.split_once(',')) {
        Some((lat, lng)) => (Some(lat.trim().to_string()), Some(lng.trim().to_string())),
        None => (None, None),
    };

    Some(GeoPoint {
        city: text("city"),
        region: text("region"),
        country: text("country"),
        lat,
        lng,
    })
}

/// 把 IP 定位结果转换为默认地点（没有国家时无法使用）
pub fn location_from_geo(point: &GeoPoint) -> Option<RentalLocation> {
    let country = point.country.clone().filter(|c| !c.is_empty())?;
    let city = point.city.clone().unwrap_or_default();
    let display_name = if city.is_empty() {
        country.clone()
    } else {
        format!("{}, {}", city, country)
    };
    Some(RentalLocation {
        id: city.to_lowercase().replace(' ', "-"),
        name: city.clone(),
        display_name,
        city,
        country,
        location_type: LocationType::City,
        ..Default::default()
    })
}

/// 访客默认地点，内网地址不查询
pub async fn detect_location(geo: &dyn GeoLookup, ip: Option<&str>) -> Option<RentalLocation> {
    let ip = ip?;
    let addr: std::net::IpAddr = ip.parse().ok()?;
    if is_private_or_local(&addr) {
        return None;
    }
    geo.lookup(ip).await.as_ref().and_then(location_from_geo)
}

pub fn geo_lookup_from_config(config: &LandingConfig) -> Arc<dyn GeoLookup> {
    if config.enable_geo_lookup && !config.geoip_api_url.is_empty() {
        debug!("GeoIP: using {}", config.geoip_api_url);
        Arc::new(IpInfoProvider::new(&config.geoip_api_url))
    } else {
        debug!("GeoIP: disabled");
        Arc::new(NoopGeoLookup)
    }
}
