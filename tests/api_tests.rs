//! HTTP 接口测试
//!
//! 完整路由表 + 内存存储，外部地点搜索与 GeoIP 替换为本地实现。

use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::test::{self, TestRequest};
use actix_web::{App, web};
use async_trait::async_trait;
use serde_json::{Value, json};

use rentroute::api::services::{AppStartTime, configure};
use rentroute::config::StaticConfig;
use rentroute::errors::Result;
use rentroute::models::RentalLocation;
use rentroute::services::{AppServices, LocationSearch, NoopGeoLookup};
use rentroute::storage::MemoryStore;

struct StaticLocations;

#[async_trait]
impl LocationSearch for StaticLocations {
    async fn search(&self, term: &str) -> Result<Vec<RentalLocation>> {
        Ok(vec![RentalLocation::airport(
            "LHR".to_string(),
            format!("{} Heathrow", term),
        )])
    }
}

fn app_services(store: Arc<MemoryStore>) -> AppServices {
    AppServices::with_providers(
        store,
        &StaticConfig::default(),
        Arc::new(StaticLocations),
        Arc::new(NoopGeoLookup),
    )
}

macro_rules! init_app {
    ($services:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($services))
                .app_data(web::Data::new(AppStartTime {
                    start_datetime: chrono::Utc::now(),
                }))
                .configure(configure),
        )
        .await
    };
}

fn passthrough_query(with_location: bool) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    serializer
        .append_pair("pickup", "London Heathrow")
        .append_pair("pickupDate", "2025-06-01")
        .append_pair("dropoffDate", "2025-06-04")
        .append_pair("pickupTime", "10:00")
        .append_pair("dropoffTime", "12:00");
    if with_location {
        // 地点 JSON 在 query 中额外编码一次
        let location =
            urlencoding::encode(r#"{"id":"lhr","name":"Heathrow","code":"LHR","type":"airport"}"#)
                .into_owned();
        serializer.append_pair("pickupLocation", &location);
    }
    serializer.finish()
}

fn landing_cookie(resp: &actix_web::dev::ServiceResponse) -> Option<String> {
    resp.response()
        .cookies()
        .find(|c| c.name() == "landing_id")
        .map(|c| c.value().to_string())
}

// =============================================================================
// /search
// =============================================================================

#[actix_rt::test]
async fn test_search_passthrough_redirects_to_partner() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let app = init_app!(app_services(store.clone()));

    let req = TestRequest::get()
        .uri(&format!("/search?{}", passthrough_query(true)))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|h| h.to_str().ok())
        .unwrap()
        .to_string();
    assert!(location.starts_with("https://skyscanner.com/g/referrals/v1/cars/day-view/"));

    let landing_id = landing_cookie(&resp).unwrap();
    assert!(landing_id.starts_with("RB-"));
    assert_eq!(store.clicks().len(), 1);
    assert_eq!(store.clicks()[0].landing_id.as_deref(), Some(landing_id.as_str()));
}

#[actix_rt::test]
async fn test_search_passthrough_reuses_landing_cookie() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let app = init_app!(app_services(store.clone()));

    let req = TestRequest::get()
        .uri(&format!("/search?{}", passthrough_query(true)))
        .cookie(actix_web::cookie::Cookie::new("landing_id", "RB-returning01"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    // 会话未变化，不再下发 cookie
    assert!(landing_cookie(&resp).is_none());
    assert_eq!(store.clicks()[0].landing_id.as_deref(), Some("RB-returning01"));
    // 只有合作方落地，没有新的基础落地
    assert_eq!(store.landings().len(), 1);
}

#[tokio::test]
async fn test_search_passthrough_missing_params() {
    let app = init_app!(app_services(Arc::new(MemoryStore::with_default_partners())));

    let req = TestRequest::get()
        .uri("/search?pickup=LHR&pickupDate=2025-06-01")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3000);
    assert_eq!(body["message"], "Missing required search parameters");
}

#[tokio::test]
async fn test_search_passthrough_without_location() {
    let app = init_app!(app_services(Arc::new(MemoryStore::with_default_partners())));

    let req = TestRequest::get()
        .uri(&format!("/search?{}", passthrough_query(false)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 3001);
    assert_eq!(body["data"]["outcome"]["status"], "missing_location");
    assert_eq!(body["data"]["actions"][0]["title"], "Location Needed");
}

// =============================================================================
// /api
// =============================================================================

fn deeplink_body(mode: &str, popup_blocked: bool) -> Value {
    json!({
        "search": {
            "pickup": "London Heathrow",
            "pickupDate": "2025-06-01",
            "dropoffDate": "2025-06-04",
            "pickupTime": "10:00",
            "dropoffTime": "12:00"
        },
        "location": {"id": "lhr", "name": "Heathrow", "code": "LHR", "type": "airport"},
        "mode": mode,
        "popupBlocked": popup_blocked
    })
}

#[tokio::test]
async fn test_create_deep_links_both() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let app = init_app!(app_services(store.clone()));

    let req = TestRequest::post()
        .uri("/api/deeplinks")
        .set_json(deeplink_body("both", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(landing_cookie(&resp).is_some());

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    let data = &body["data"];
    assert_eq!(data["outcome"]["status"], "completed");

    let actions = data["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 3);
    assert_eq!(actions[0]["type"], "open_new_tab");
    assert_eq!(actions[1]["type"], "notice");
    assert_eq!(actions[1]["title"], "Search Started");
    assert_eq!(actions[2]["type"], "redirect");
    assert!(
        actions[2]["url"]
            .as_str()
            .unwrap()
            .starts_with("https://www.autorentals.com/remotesearch")
    );
    assert_eq!(store.clicks().len(), 2);
}

#[tokio::test]
async fn test_create_deep_links_popup_report_skips_tracking() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let app = init_app!(app_services(store.clone()));

    let req = TestRequest::post()
        .uri("/api/deeplinks")
        .set_json(deeplink_body("both", false))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(store.clicks().len(), 2);
    let landings = store.landings().len();

    // 新标签页被拦截后回报一次：只有提示，不产生新的点击或落地
    let req = TestRequest::post()
        .uri("/api/deeplinks")
        .set_json(deeplink_body("both", true))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"]["status"], "popup_reported");
    let actions = body["data"]["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], "notice");
    assert_eq!(actions[0]["title"], "Almost There!");
    assert_eq!(store.clicks().len(), 2);
    assert_eq!(store.landings().len(), landings);
}

#[tokio::test]
async fn test_create_deep_links_resolves_typed_pickup() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let app = init_app!(app_services(store.clone()));

    let mut body = deeplink_body("redirect", false);
    body["search"]["pickup"] = json!("London");
    body.as_object_mut().unwrap().remove("location");

    let req = TestRequest::post()
        .uri("/api/deeplinks")
        .set_json(body)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["outcome"]["status"], "completed");
    let clicks = store.clicks();
    assert_eq!(clicks.len(), 1);
    assert_eq!(clicks[0].location_id.as_deref(), Some("lhr"));
}

#[tokio::test]
async fn test_create_deep_links_redirect_only() {
    let app = init_app!(app_services(Arc::new(MemoryStore::with_default_partners())));

    let req = TestRequest::post()
        .uri("/api/deeplinks")
        .set_json(deeplink_body("redirect", false))
        .to_request();
    let resp = test::call_service(&app, req).await;

    let body: Value = test::read_body_json(resp).await;
    let actions = body["data"]["actions"].as_array().unwrap();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0]["type"], "redirect");
    assert!(body["data"]["outcome"].get("new_tab_url").is_none());
}

#[tokio::test]
async fn test_search_locations() {
    let app = init_app!(app_services(Arc::new(MemoryStore::with_default_partners())));

    let req = TestRequest::get().uri("/api/locations?q=L").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body, json!([]));

    let req = TestRequest::get().uri("/api/locations?q=London").to_request();
    let resp = test::call_service(&app, req).await;
    let body: Vec<RentalLocation> = test::read_body_json(resp).await;
    assert_eq!(body.len(), 1);
    assert_eq!(body[0].code, "LHR");
    assert_eq!(body[0].name, "London Heathrow");
}

// =============================================================================
// /health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = init_app!(app_services(Arc::new(MemoryStore::with_default_partners())));

    let req = TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["code"], 0);
    assert_eq!(body["data"]["status"], "healthy");
    assert_eq!(body["data"]["storage"]["backend"], "memory");

    let req = TestRequest::get().uri("/health/live").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}
