//! 落地会话状态
//!
//! 对应浏览器里 5 分钟有效的 `landing_id` cookie：
//! 持有当前 landing id 和过期时间，过期后读取返回 None。
//! HTTP 层通过 `take_change` 把本次请求内的变化回写为 Set-Cookie。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

/// 时间来源（测试中可替换）
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 本次请求内会话的变化
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieChange {
    Unchanged,
    Set(String),
    Removed,
}

#[derive(Debug, Clone)]
struct Entry {
    landing_id: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
struct State {
    entry: Option<Entry>,
    change: CookieChange,
}

pub struct LandingSession {
    state: Mutex<State>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl LandingSession {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State {
                entry: None,
                change: CookieChange::Unchanged,
            }),
            ttl,
            clock,
        }
    }

    /// 从请求携带的 cookie 恢复（浏览器已负责过期，这里重新计一个 TTL）
    pub fn from_cookie(value: Option<&str>, ttl: Duration) -> Self {
        let session = Self::new(ttl);
        if let Some(id) = value.map(str::trim).filter(|v| !v.is_empty()) {
            let expires_at = session.expiry_from_now();
            session.state.lock().entry = Some(Entry {
                landing_id: id.to_string(),
                expires_at,
            });
        }
        session
    }

    fn expiry_from_now(&self) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(self.ttl).unwrap_or(chrono::Duration::minutes(5));
        self.clock.now() + ttl
    }

    /// 当前有效的 landing id（无副作用）
    pub fn current(&self) -> Option<String> {
        let now = self.clock.now();
        let state = self.state.lock();
        state
            .entry
            .as_ref()
            .filter(|e| e.expires_at > now)
            .map(|e| e.landing_id.clone())
    }

    /// 写入 landing id 并重新计时
    pub fn set(&self, landing_id: &str) {
        let expires_at = self.expiry_from_now();
        let mut state = self.state.lock();
        state.entry = Some(Entry {
            landing_id: landing_id.to_string(),
            expires_at,
        });
        state.change = CookieChange::Set(landing_id.to_string());
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entry = None;
        state.change = CookieChange::Removed;
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 取出并重置本次请求内的变化
    pub fn take_change(&self) -> CookieChange {
        std::mem::replace(&mut self.state.lock().change, CookieChange::Unchanged)
    }
}
