//! 地点自动补全客户端
//!
//! 所有合作方共用同一个 `GET <api_url>?q=<term>` 接口，返回原始地点数组。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use tracing::{debug, trace, warn};
use ureq::Agent;

use crate::config::LocationsConfig;
use crate::errors::{RentrouteError, Result};
use crate::models::RentalLocation;

#[async_trait]
pub trait LocationSearch: Send + Sync {
    async fn search(&self, term: &str) -> Result<Vec<RentalLocation>>;
}

pub struct HttpLocationSearch {
    api_url: String,
    api_token: Option<String>,
    agent: Agent,
    /// 只缓存成功结果
    cache: Cache<String, Vec<RentalLocation>>,
}

impl HttpLocationSearch {
    pub fn new(config: &LocationsConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.http_timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone().filter(|t| !t.is_empty()),
            agent,
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(config.cache_ttl_secs))
                .max_capacity(config.cache_capacity)
                .build(),
        }
    }

    fn request_url(&self, term: &str) -> String {
        let sep = if self.api_url.contains('?') { '&' } else { '?' };
        format!("{}{}q={}", self.api_url, sep, urlencoding::encode(term))
    }

    fn fetch_sync(
        agent: Agent,
        url: String,
        token: Option<String>,
    ) -> Result<Vec<RentalLocation>> {
        let mut request = agent.get(&url).header("Content-Type", "application/json");
        if let Some(token) = token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let resp = request
            .call()
            .map_err(|e| RentrouteError::network(format!("Location API request failed: {}", e)))?;

        let status = resp.status();
        let mut body = resp.into_body();
        if !status.is_success() {
            let text = body.read_to_string().unwrap_or_default();
            warn!("Location API error {}: {}", status, text);
            return Err(RentrouteError::location_api(format!(
                "API returned {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("")
            )));
        }

        let json: serde_json::Value = body.read_json().map_err(|e| {
            RentrouteError::location_api(format!("Location API response parse failed: {}", e))
        })?;
        parse_locations(json)
    }

    async fn fetch(&self, term: &str) -> Result<Vec<RentalLocation>> {
        let agent = self.agent.clone();
        let url = self.request_url(term);
        let token = self.api_token.clone();

        tokio::task::spawn_blocking(move || Self::fetch_sync(agent, url, token))
            .await
            .map_err(|e| RentrouteError::network(format!("Location search task failed: {}", e)))?
    }
}

#[async_trait]
impl LocationSearch for HttpLocationSearch {
    async fn search(&self, term: &str) -> Result<Vec<RentalLocation>> {
        if self.api_url.is_empty() {
            return Err(RentrouteError::location_api(
                "Location API is not configured",
            ));
        }

        let key = term.trim().to_lowercase();
        self.cache
            .try_get_with(key, async {
                trace!("Location cache miss for '{}'", term);
                self.fetch(term).await
            })
            .await
            .map_err(|e: Arc<RentrouteError>| (*e).clone())
    }
}

/// 解析接口返回：带 `error` 字段视为错误，非数组视为空结果
pub fn parse_locations(json: serde_json::Value) -> Result<Vec<RentalLocation>> {
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let message = err
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| err.to_string());
        return Err(RentrouteError::location_api(message));
    }

    let serde_json::Value::Array(items) = json else {
        debug!("Location API returned a non-array body");
        return Ok(Vec::new());
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RentalLocation>(item) {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("Skipping malformed location record: {}", e);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LocationType;
    use serde_json::json;

    #[test]
    fn test_parse_locations_array() {
        let locations = parse_locations(json!([
            {
                "id": "lhr-a1",
                "name": "Heathrow",
                "displayName": "London Heathrow (LHR)",
                "city": "London",
                "country": "United Kingdom",
                "code": "LHR",
                "type": "airport",
                "iconUrl": null
            },
            {"id": "tlh-c2", "name": "Tallahassee", "type": "city"}
        ]))
        .unwrap();
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].location_type, LocationType::Airport);
        assert_eq!(locations[0].icon_url, None);
        assert_eq!(locations[1].code, "");
    }

    #[test]
    fn test_parse_locations_error_body() {
        let err = parse_locations(json!({"error": "upstream failure"})).unwrap_err();
        assert_eq!(err.code(), "E009");
        assert_eq!(err.message(), "upstream failure");
    }

    #[test]
    fn test_parse_locations_non_array_is_empty() {
        assert!(parse_locations(json!({"results": []})).unwrap().is_empty());
    }

    #[test]
    fn test_parse_locations_skips_malformed_records() {
        let locations = parse_locations(json!([{"name": 42}, {"name": "Paris"}])).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "Paris");
    }

    #[test]
    fn test_request_url_encoding() {
        let search = HttpLocationSearch::new(&LocationsConfig {
            api_url: "https://example.com/functions/v1/locations/".to_string(),
            ..Default::default()
        });
        assert_eq!(
            search.request_url("new york"),
            "https://example.com/functions/v1/locations?q=new%20york"
        );
    }

    #[tokio::test]
    async fn test_unconfigured_search_fails() {
        let search = HttpLocationSearch::new(&LocationsConfig::default());
        let err = search.search("lon").await.unwrap_err();
        assert_eq!(err.code(), "E009");
    }
}
