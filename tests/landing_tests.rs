//! Landing tracker tests
//!
//! Session reuse within the TTL, expiry, and store/session consistency.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use rentroute::models::{PartnerVisit, Placement, VisitContext};
use rentroute::services::{Clock, CookieChange, LandingSession, LandingTracker, NoopGeoLookup};
use rentroute::storage::MemoryStore;

const TTL: Duration = Duration::from_secs(300);

/// 手动推进的时钟
struct TestClock(Mutex<DateTime<Utc>>);

impl TestClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(Utc::now())))
    }

    fn advance(&self, by: Duration) {
        *self.0.lock() += chrono::Duration::from_std(by).unwrap();
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

fn tracker(store: &Arc<MemoryStore>) -> LandingTracker {
    LandingTracker::new(store.clone(), Arc::new(NoopGeoLookup))
}

#[tokio::test]
async fn test_same_landing_id_within_ttl() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker(&store);
    let clock = TestClock::new();
    let session = LandingSession::with_clock(TTL, clock.clone());
    let visit = VisitContext::default();

    let first = tracker.get_or_create_landing_id(&session, &visit).await.unwrap();
    clock.advance(Duration::from_secs(299));
    let second = tracker.get_or_create_landing_id(&session, &visit).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.landings().len(), 1);
}

#[tokio::test]
async fn test_new_landing_id_after_ttl() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker(&store);
    let clock = TestClock::new();
    let session = LandingSession::with_clock(TTL, clock.clone());
    let visit = VisitContext::default();

    let first = tracker.get_or_create_landing_id(&session, &visit).await.unwrap();
    clock.advance(Duration::from_secs(301));
    assert!(tracker.current_landing_id(&session).is_none());

    let second = tracker.get_or_create_landing_id(&session, &visit).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(store.landings().len(), 2);
}

#[tokio::test]
async fn test_cookie_changes() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker(&store);
    let session = LandingSession::from_cookie(Some("RB-fromcookie1"), TTL);

    let id = tracker
        .get_or_create_landing_id(&session, &VisitContext::default())
        .await
        .unwrap();
    assert_eq!(id, "RB-fromcookie1");
    assert_eq!(session.take_change(), CookieChange::Unchanged);
    assert!(store.landings().is_empty());

    let fresh = LandingSession::new(TTL);
    let id = tracker
        .get_or_create_landing_id(&fresh, &VisitContext::default())
        .await
        .unwrap();
    assert_eq!(fresh.take_change(), CookieChange::Set(id));
    // 取出后重置
    assert_eq!(fresh.take_change(), CookieChange::Unchanged);
}

#[tokio::test]
async fn test_store_failure_clears_cookie() {
    let store = Arc::new(MemoryStore::new());
    store.fail_landings(true);
    let tracker = tracker(&store);
    let session = LandingSession::new(TTL);

    assert!(
        tracker
            .get_or_create_landing_id(&session, &VisitContext::default())
            .await
            .is_err()
    );
    assert_eq!(session.take_change(), CookieChange::Removed);
    assert!(session.current().is_none());
}

#[tokio::test]
async fn test_partner_landing_records_visit() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker(&store);
    let session = LandingSession::new(TTL);
    let visit = VisitContext {
        user_agent: "Mozilla/5.0 (Windows NT 10.0)".to_string(),
        referrer: "https://www.google.com/".to_string(),
        client_ip: Some("203.0.113.9".to_string()),
        query_string: "gclid=xyz&utm_source=google".to_string(),
        page_url: "https://rentroute.example/search".to_string(),
    };
    let partner = PartnerVisit {
        partner: "autorentals".to_string(),
        deeplink: Placement::Redirect.deeplink_label().to_string(),
        parameters: serde_json::json!({"pickup": "LHR"}),
        method: Placement::Redirect,
    };

    let id = tracker
        .log_partner_landing(&session, &visit, &partner)
        .await
        .unwrap();

    let landings = store.landings();
    // 新会话先写一条基础落地，再写合作方落地
    assert_eq!(landings.len(), 2);
    assert!(landings[0].metadata.partner.is_none());
    let record = &landings[1];
    assert_eq!(record.landing_id, id);
    assert_eq!(record.url_params, "?gclid=xyz&utm_source=google");
    assert_eq!(record.metadata.referrer, "https://www.google.com/");
    assert_eq!(record.metadata.partner.as_deref(), Some("autorentals"));
    assert_eq!(record.metadata.deeplink.as_deref(), Some("redirect_deeplink"));
    assert_eq!(record.metadata.method, Some(Placement::Redirect));
    assert_eq!(record.metadata.ip.as_deref(), Some("203.0.113.9"));
}

#[tokio::test]
async fn test_partner_landing_write_failure_keeps_id() {
    let store = Arc::new(MemoryStore::new());
    let tracker = tracker(&store);
    let session = LandingSession::new(TTL);
    session.set("RB-existing001");
    store.fail_landings(true);

    let partner = PartnerVisit {
        partner: "kayak".to_string(),
        deeplink: "new_tab_deeplink".to_string(),
        parameters: serde_json::Value::Null,
        method: Placement::NewTab,
    };
    let id = tracker
        .log_partner_landing(&session, &VisitContext::default(), &partner)
        .await
        .unwrap();
    assert_eq!(id, "RB-existing001");
}
