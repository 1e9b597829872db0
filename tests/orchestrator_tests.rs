//! Deep-link orchestrator tests
//!
//! The full search pipeline against an in-memory store: partner resolution,
//! landing/click tracking, navigation and the fallback path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};

use rentroute::config::StaticConfig;
use rentroute::errors::Result;
use rentroute::models::{LocationType, RentalLocation, SearchParams, VisitContext};
use rentroute::reporting::ErrorType;
use rentroute::services::{
    AppServices, LandingSession, LocationSearch, NavigationAction, Notice, NoopGeoLookup,
    RecordingNavigator, SearchOutcome, SearchRequest,
};
use rentroute::storage::MemoryStore;

// =============================================================================
// Test Setup
// =============================================================================

struct NoLocations;

#[async_trait]
impl LocationSearch for NoLocations {
    async fn search(&self, _term: &str) -> Result<Vec<RentalLocation>> {
        Ok(Vec::new())
    }
}

fn services_with(store: Arc<MemoryStore>, config: StaticConfig) -> AppServices {
    AppServices::with_providers(store, &config, Arc::new(NoLocations), Arc::new(NoopGeoLookup))
}

fn services(store: Arc<MemoryStore>) -> AppServices {
    services_with(store, StaticConfig::default())
}

fn params() -> SearchParams {
    SearchParams::round_trip(
        "London, LHR airport",
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
        NaiveDate::from_ymd_opt(2025, 6, 4).unwrap(),
        NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
    )
}

fn heathrow() -> RentalLocation {
    RentalLocation::airport("LHR", "London, LHR airport")
}

fn session() -> LandingSession {
    LandingSession::new(Duration::from_secs(300))
}

/// 刷盘后读取全部错误日志标题
async fn error_titles(services: &AppServices, store: &MemoryStore) -> Vec<String> {
    services.reporter.flush().await;
    store.error_logs().into_iter().map(|e| e.title).collect()
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_open_both_partners() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let services = services(store.clone());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::with_query("gclid=abc");
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;

    let SearchOutcome::Completed {
        new_tab_url: Some(new_tab_url),
        redirect_url: Some(redirect_url),
    } = outcome
    else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert!(new_tab_url.starts_with("https://skyscanner.com/"));
    assert!(redirect_url.starts_with("https://www.autorentals.com/"));

    // 先开新标签页，再提示，最后跳转当前页
    assert_eq!(
        nav.actions(),
        vec![
            NavigationAction::OpenNewTab {
                url: new_tab_url.clone()
            },
            NavigationAction::Notice(Notice::search_started("Skyscanner", "AutoRentals")),
            NavigationAction::Redirect {
                url: redirect_url.clone()
            },
        ]
    );

    let clicks = store.clicks();
    assert_eq!(clicks.len(), 2);
    assert_eq!(clicks[0].partner, "skyscanner");
    assert_eq!(clicks[1].partner, "autorentals");
    assert!(new_tab_url.contains(&format!("utm_term={}", clicks[0].click_id)));
    assert!(redirect_url.contains(&format!("tpm={}", clicks[1].click_id)));

    // 一条基础落地 + 两条合作方落地，共用一个 landing id
    let landings = store.landings();
    assert_eq!(landings.len(), 3);
    let landing_id = session.current().unwrap();
    assert!(landings.iter().all(|l| l.landing_id == landing_id));
    assert!(clicks.iter().all(|c| c.landing_id.as_deref() == Some(landing_id.as_str())));
    assert_eq!(
        landings[1].metadata.deeplink.as_deref(),
        Some("new_tab_deeplink")
    );
    assert_eq!(
        landings[2].metadata.deeplink.as_deref(),
        Some("redirect_deeplink")
    );
}

#[tokio::test]
async fn test_redirect_only_and_new_tab_only() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let services = services(store.clone());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };

    let nav = RecordingNavigator::new();
    let outcome = services
        .orchestrator
        .generate_redirect_only_deep_link(&req, &nav)
        .await;
    match outcome {
        SearchOutcome::Completed {
            new_tab_url: None,
            redirect_url: Some(url),
        } => assert_eq!(nav.redirect_url(), Some(url)),
        other => panic!("unexpected outcome {:?}", other),
    }

    let nav = RecordingNavigator::new();
    let outcome = services
        .orchestrator
        .generate_new_tab_only_deep_link(&req, &nav)
        .await;
    match outcome {
        SearchOutcome::Completed {
            new_tab_url: Some(url),
            redirect_url: None,
        } => {
            assert!(url.starts_with("https://skyscanner.com/"));
            // new-tab 合作方在当前页打开
            assert_eq!(nav.actions(), vec![NavigationAction::Redirect { url }]);
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[tokio::test]
async fn test_geo_override_from_detected_country() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let config: StaticConfig = toml::from_str(
        r#"
        [partners.geo_overrides.GB]
        new_tab = "kayak"
        "#,
    )
    .unwrap();
    let services = services_with(store, config);
    let params = params();
    let detected = RentalLocation {
        id: "london".to_string(),
        name: "London".to_string(),
        country: "GB".to_string(),
        location_type: LocationType::City,
        ..Default::default()
    };
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: Some(&detected),
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;
    match outcome {
        SearchOutcome::Completed {
            new_tab_url: Some(url),
            ..
        } => assert!(url.starts_with("https://www.kayak.com/in?")),
        other => panic!("unexpected outcome {:?}", other),
    }
}

// =============================================================================
// Degraded paths
// =============================================================================

#[tokio::test]
async fn test_missing_location_aborts_search() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let services = services(store.clone());
    let params = params();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: None,
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;

    assert_eq!(outcome, SearchOutcome::MissingLocation);
    assert_eq!(
        nav.actions(),
        vec![NavigationAction::Notice(Notice::location_needed())]
    );
    assert!(store.clicks().is_empty());

    services.reporter.flush().await;
    let logs = store.error_logs();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].title, "Location Needed");
    assert_eq!(logs[0].error_type, ErrorType::ValidationError);
}

#[tokio::test]
async fn test_default_location_used_when_none_selected() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let services = services(store.clone());
    let params = params();
    let detected = RentalLocation::airport("JFK", "New York JFK");
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: None,
        default_location: Some(&detected),
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_redirect_only_deep_link(&req, &nav)
        .await;
    assert!(matches!(outcome, SearchOutcome::Completed { .. }));
    assert_eq!(store.clicks()[0].iata_code.as_deref(), Some("JFK"));
}

#[tokio::test]
async fn test_click_failure_still_links_with_local_id() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.fail_clicks(true);
    let services = services(store.clone());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;

    let SearchOutcome::Completed {
        new_tab_url: Some(new_tab_url),
        redirect_url: Some(redirect_url),
    } = outcome
    else {
        panic!("unexpected outcome {:?}", outcome);
    };

    let utm_term = url::Url::parse(&new_tab_url)
        .unwrap()
        .query_pairs()
        .find(|(k, _)| k == "utm_term")
        .map(|(_, v)| v.into_owned())
        .unwrap();
    assert_eq!(utm_term.len(), 10);
    assert_ne!(utm_term, "21208037");
    assert!(!redirect_url.contains("tpm=21207214"));
    assert!(store.clicks().is_empty());

    let titles = error_titles(&services, &store).await;
    assert_eq!(
        titles.iter().filter(|t| *t == "Click Tracking Timeout").count(),
        2
    );
}

#[tokio::test]
async fn test_landing_failure_does_not_block_search() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.fail_landings(true);
    let services = services(store.clone());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_redirect_only_deep_link(&req, &nav)
        .await;

    assert!(matches!(outcome, SearchOutcome::Completed { .. }));
    assert_eq!(store.clicks().len(), 1);
    assert!(store.clicks()[0].landing_id.is_none());
    let titles = error_titles(&services, &store).await;
    assert!(titles.contains(&"Landing Service Timeout".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_landing_timeout_leaves_session_unset() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.set_write_delay(Some(Duration::from_secs(6)));
    let services = services(store.clone());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_redirect_only_deep_link(&req, &nav)
        .await;

    // 落地与点击写入都超时，会话里不能留下未落库的 landing id
    assert!(matches!(outcome, SearchOutcome::Completed { .. }));
    assert!(session.current().is_none());
    assert!(store.landings().is_empty());
    assert!(store.clicks().is_empty());
    let titles = error_titles(&services, &store).await;
    assert!(titles.contains(&"Landing Service Timeout".to_string()));
}

#[tokio::test]
async fn test_popup_blocked() {
    let store = Arc::new(MemoryStore::with_default_partners());
    let services = services(store.clone());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::with_popups_blocked(true);

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;

    assert!(matches!(outcome, SearchOutcome::PopupBlocked { .. }));
    assert_eq!(
        nav.actions(),
        vec![NavigationAction::Notice(Notice::allow_popups())]
    );
    assert_eq!(nav.redirect_url(), None);
}

fn slow_partner_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.pipeline.partner_resolution_timeout_ms = 100;
    config
}

#[tokio::test(start_paused = true)]
async fn test_partner_resolution_timeout_uses_fallback() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.set_query_delay(Some(Duration::from_secs(60)));
    let services = services_with(store.clone(), slow_partner_config());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;

    let SearchOutcome::Fallback { url, error_id } = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert!(url.starts_with("https://www.kayak.com/cars?pickuplocation=LHR"));
    assert!(url.contains("pickupdate=2025-06-01-1200"));
    assert!(error_id.starts_with("err_"));
    assert_eq!(
        nav.actions(),
        vec![
            NavigationAction::OpenNewTab { url: url.clone() },
            NavigationAction::Notice(Notice::fallback_started()),
        ]
    );

    let titles = error_titles(&services, &store).await;
    assert!(titles.contains(&"Search Unavailable - Deep Link Generation Failed".to_string()));
    assert!(titles.contains(&"Fallback Search Used".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_fallback_blocked_shows_timeout_notice() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.set_query_delay(Some(Duration::from_secs(60)));
    let services = services_with(store.clone(), slow_partner_config());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::with_popups_blocked(true);

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_and_open_deep_link(&req, &nav)
        .await;

    assert!(matches!(outcome, SearchOutcome::Failed { .. }));
    match nav.actions().as_slice() {
        [NavigationAction::Notice(notice)] => assert_eq!(notice.title, "Connection Timeout"),
        other => panic!("unexpected actions {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_single_role_timeout_redirects_to_fallback() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.set_query_delay(Some(Duration::from_secs(60)));
    let services = services_with(store.clone(), slow_partner_config());
    let params = params();
    let location = heathrow();
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_new_tab_only_deep_link(&req, &nav)
        .await;

    let SearchOutcome::Fallback { url, .. } = outcome else {
        panic!("unexpected outcome {:?}", outcome);
    };
    assert_eq!(nav.actions(), vec![NavigationAction::Redirect { url }]);
}

#[tokio::test(start_paused = true)]
async fn test_location_without_code_cannot_fall_back() {
    let store = Arc::new(MemoryStore::with_default_partners());
    store.set_query_delay(Some(Duration::from_secs(60)));
    let services = services_with(store.clone(), slow_partner_config());
    let params = params();
    let location = RentalLocation {
        name: "Somewhere".to_string(),
        ..Default::default()
    };
    let visit = VisitContext::default();
    let session = session();
    let nav = RecordingNavigator::new();

    let req = SearchRequest {
        params: &params,
        location: Some(&location),
        default_location: None,
        visit: &visit,
        session: &session,
    };
    let outcome = services
        .orchestrator
        .generate_redirect_only_deep_link(&req, &nav)
        .await;

    assert!(matches!(outcome, SearchOutcome::Failed { .. }));
    assert_eq!(
        nav.actions(),
        vec![NavigationAction::Notice(Notice::search_unavailable())]
    );
    let titles = error_titles(&services, &store).await;
    assert!(titles.contains(&"Fallback Search Also Failed".to_string()));
}
