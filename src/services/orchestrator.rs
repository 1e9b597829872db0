//! 深链编排
//!
//! 一次搜索提交的完整流程：解析合作方 → 记录落地 → 记录点击 → 生成深链 → 打开/跳转。
//! 落地与点击记录失败只上报不中断；其余任何失败都走后备 Kayak 链接，
//! 保证访客不会停在空白页。

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::landing::LandingTracker;
use super::registry::PartnerRegistry;
use super::session::LandingSession;
use crate::config::PipelineConfig;
use crate::errors::{RentrouteError, Result};
use crate::models::{PartnerVisit, Placement, RentalLocation, SearchParams, VisitContext};
use crate::partners::{Partner, TrackingContext, form_query};
use crate::reporting::{ErrorContext, ErrorReporter};
use crate::storage::TrackingStore;
use crate::utils::{generate_click_id, with_timeout};

const FALLBACK_BASE_URL: &str = "https://www.kayak.com/cars";
const COMPONENT: &str = "DeepLinkOrchestrator";

// ==================== 导航 ====================

/// 给访客看的提示
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn location_needed() -> Self {
        Self::new("Location Needed", "Please enter a pickup location to continue")
    }

    pub fn allow_popups() -> Self {
        Self::new(
            "Almost There!",
            "Please allow popups and try again to start your search",
        )
    }

    pub fn search_started(new_tab: &str, redirect: &str) -> Self {
        Self::new(
            "Search Started",
            format!(
                "Opening {} in a new tab and redirecting to {}",
                new_tab, redirect
            ),
        )
    }

    pub fn fallback_started() -> Self {
        Self::new(
            "Search Started",
            "Opening search in a new tab using fallback service.",
        )
    }

    pub fn search_unavailable() -> Self {
        Self::new(
            "Search Unavailable",
            "We're having trouble starting your search. Please try again in a moment.",
        )
    }

    /// 按错误信息里的关键字给出更具体的提示
    pub fn for_failure(message: &str) -> Self {
        if message.contains("timeout") {
            Self::new(
                "Connection Timeout",
                "The search service is taking longer than expected. Please check your internet connection and try again.",
            )
        } else if message.contains("partner") {
            Self::new(
                "Service Temporarily Unavailable",
                "Our search partners are temporarily unavailable. Please try again in a few minutes.",
            )
        } else if message.contains("network") || message.contains("fetch") {
            Self::new(
                "Network Error",
                "Please check your internet connection and try again.",
            )
        } else {
            Self::search_unavailable()
        }
    }
}

/// 浏览器导航能力
pub trait Navigator: Send + Sync {
    /// 打开新标签页，被拦截时返回 false
    fn open_new_tab(&self, url: &str) -> bool;

    /// 当前页跳转
    fn redirect(&self, url: &str);

    fn notify(&self, notice: Notice);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationAction {
    OpenNewTab { url: String },
    Redirect { url: String },
    Notice(Notice),
}

/// 把导航记录为动作列表，交给前端执行
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    popups_blocked: bool,
    actions: Mutex<Vec<NavigationAction>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 模拟浏览器拦截弹窗
    pub fn with_popups_blocked(blocked: bool) -> Self {
        Self {
            popups_blocked: blocked,
            ..Default::default()
        }
    }

    pub fn actions(&self) -> Vec<NavigationAction> {
        self.actions.lock().clone()
    }

    pub fn into_actions(self) -> Vec<NavigationAction> {
        self.actions.into_inner()
    }

    /// 最后一次跳转的地址
    pub fn redirect_url(&self) -> Option<String> {
        self.actions.lock().iter().rev().find_map(|a| match a {
            NavigationAction::Redirect { url } => Some(url.clone()),
            _ => None,
        })
    }
}

impl Navigator for RecordingNavigator {
    fn open_new_tab(&self, url: &str) -> bool {
        if self.popups_blocked {
            return false;
        }
        self.actions.lock().push(NavigationAction::OpenNewTab {
            url: url.to_string(),
        });
        true
    }

    fn redirect(&self, url: &str) {
        self.actions.lock().push(NavigationAction::Redirect {
            url: url.to_string(),
        });
    }

    fn notify(&self, notice: Notice) {
        self.actions.lock().push(NavigationAction::Notice(notice));
    }
}

// ==================== 请求与结果 ====================

pub struct SearchRequest<'a> {
    pub params: &'a SearchParams,
    /// 访客选中的地点
    pub location: Option<&'a RentalLocation>,
    /// IP 定位得到的默认地点，同时决定访客所在国家
    pub default_location: Option<&'a RentalLocation>,
    pub visit: &'a VisitContext,
    pub session: &'a LandingSession,
}

impl SearchRequest<'_> {
    fn final_location(&self) -> Option<&RentalLocation> {
        self.location.or(self.default_location)
    }

    fn user_country(&self) -> Option<&str> {
        self.default_location.and_then(|l| l.country())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchOutcome {
    Completed {
        #[serde(skip_serializing_if = "Option::is_none")]
        new_tab_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        redirect_url: Option<String>,
    },
    PopupBlocked {
        new_tab_url: String,
        redirect_url: String,
    },
    /// 客户端回报弹窗被拦截，只提示，不重新生成深链
    PopupReported,
    Fallback {
        url: String,
        error_id: String,
    },
    MissingLocation,
    Failed {
        error_id: String,
    },
}

/// 管线各阶段超时
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub partner_resolution: Duration,
    pub landing: Duration,
    pub click: Duration,
}

impl From<&PipelineConfig> for PipelineTimeouts {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            partner_resolution: Duration::from_millis(config.partner_resolution_timeout_ms),
            landing: Duration::from_millis(config.landing_timeout_ms),
            click: Duration::from_millis(config.click_timeout_ms),
        }
    }
}

impl Default for PipelineTimeouts {
    fn default() -> Self {
        Self::from(&PipelineConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Both,
    RedirectOnly,
    NewTabOnly,
}

impl Mode {
    fn function(self) -> &'static str {
        match self {
            Mode::Both => "generate_and_open_deep_link",
            Mode::RedirectOnly => "generate_redirect_only_deep_link",
            Mode::NewTabOnly => "generate_new_tab_only_deep_link",
        }
    }

    fn failure_title(self) -> &'static str {
        match self {
            Mode::Both => "Search Unavailable - Deep Link Generation Failed",
            Mode::RedirectOnly => "Search Unavailable - Redirect Deep Link Generation Failed",
            Mode::NewTabOnly => "Search Unavailable - New Tab Deep Link Generation Failed",
        }
    }
}

fn role_label(placement: Placement) -> &'static str {
    match placement {
        Placement::NewTab => "new tab",
        Placement::Redirect => "redirect",
    }
}

// ==================== 编排器 ====================

#[derive(Clone)]
pub struct DeepLinkOrchestrator {
    registry: Arc<PartnerRegistry>,
    landing: LandingTracker,
    reporter: ErrorReporter,
    store: Arc<dyn TrackingStore>,
    timeouts: PipelineTimeouts,
}

impl DeepLinkOrchestrator {
    pub fn new(
        registry: Arc<PartnerRegistry>,
        landing: LandingTracker,
        reporter: ErrorReporter,
        store: Arc<dyn TrackingStore>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            registry,
            landing,
            reporter,
            store,
            timeouts,
        }
    }

    pub fn registry(&self) -> &Arc<PartnerRegistry> {
        &self.registry
    }

    pub fn landing(&self) -> &LandingTracker {
        &self.landing
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// 新标签页打开 new-tab 合作方，当前页跳转到 redirect 合作方
    pub async fn generate_and_open_deep_link(
        &self,
        req: &SearchRequest<'_>,
        nav: &dyn Navigator,
    ) -> SearchOutcome {
        self.run(Mode::Both, req, nav).await
    }

    /// 只生成 redirect 合作方深链并跳转（搜索表单直接提交）
    pub async fn generate_redirect_only_deep_link(
        &self,
        req: &SearchRequest<'_>,
        nav: &dyn Navigator,
    ) -> SearchOutcome {
        self.run(Mode::RedirectOnly, req, nav).await
    }

    /// 只生成 new-tab 合作方深链，当前页跳转过去（搜索透传页）
    pub async fn generate_new_tab_only_deep_link(
        &self,
        req: &SearchRequest<'_>,
        nav: &dyn Navigator,
    ) -> SearchOutcome {
        self.run(Mode::NewTabOnly, req, nav).await
    }

    /// 客户端打开新标签页失败后的回报：只给出允许弹窗的提示，不跑管线也不记录点击
    pub fn report_popup_blocked(&self, nav: &dyn Navigator) -> SearchOutcome {
        warn!("DeepLinkOrchestrator: popup blocked on client");
        nav.notify(Notice::allow_popups());
        SearchOutcome::PopupReported
    }

    async fn run(&self, mode: Mode, req: &SearchRequest<'_>, nav: &dyn Navigator) -> SearchOutcome {
        let Some(location) = req.final_location() else {
            self.reporter.log_validation_error(
                req.visit,
                "Location Needed",
                "User attempted search without selecting a pickup location",
                ErrorContext::new("SearchForm", mode.function()).with_search_params(req.params),
            );
            nav.notify(Notice::location_needed());
            return SearchOutcome::MissingLocation;
        };

        info!(
            "DeepLinkOrchestrator: starting {} for pickup '{}'",
            mode.function(),
            req.params.pickup
        );

        let result = match mode {
            Mode::Both => self.open_both(req, location, nav).await,
            Mode::RedirectOnly => self
                .single_role(Placement::Redirect, req, location, nav)
                .await,
            Mode::NewTabOnly => self.single_role(Placement::NewTab, req, location, nav).await,
        };

        match result {
            Ok(outcome) => outcome,
            Err(e) => self.recover(mode, req, location, nav, e),
        }
    }

    async fn open_both(
        &self,
        req: &SearchRequest<'_>,
        location: &RentalLocation,
        nav: &dyn Navigator,
    ) -> Result<SearchOutcome> {
        let country = req.user_country();
        let timeout = self.timeouts.partner_resolution;
        let (new_tab, redirect) = tokio::try_join!(
            with_timeout("Partner service", timeout, async {
                Ok(self.registry.default_new_tab_partner(country).await)
            }),
            with_timeout("Partner service", timeout, async {
                Ok(self.registry.default_redirect_partner(country).await)
            }),
        )?;

        // 缺一个时两个角色共用另一个
        let (new_tab, redirect) = match (new_tab, redirect) {
            (Some(n), Some(r)) => (n, r),
            (Some(n), None) => (n.clone(), n),
            (None, Some(r)) => (r.clone(), r),
            (None, None) => {
                error!("DeepLinkOrchestrator: both partners are unavailable");
                self.reporter.log_partner_error(
                    req.visit,
                    "No Partners Available",
                    "Both new tab and redirect partners are unavailable",
                    "unknown",
                    self.context("generate_and_open_deep_link", req, location),
                );
                return Err(RentrouteError::partner_unavailable(
                    "No partners available for search",
                ));
            }
        };

        debug!(
            "DeepLinkOrchestrator: new tab {}, redirect {}",
            new_tab.display_name(),
            redirect.display_name()
        );

        // 落地记录先于点击记录
        self.log_role_landing(Placement::NewTab, &new_tab, req).await;
        self.log_role_landing(Placement::Redirect, &redirect, req).await;
        let new_tab_click = self
            .track_role_click(Placement::NewTab, &new_tab, req, location)
            .await;
        let redirect_click = self
            .track_role_click(Placement::Redirect, &redirect, req, location)
            .await;

        // 两个地址都生成完才开始导航
        let new_tab_url = new_tab.generate_deep_link(req.params, location, Some(&new_tab_click));
        let redirect_url =
            redirect.generate_deep_link(req.params, location, Some(&redirect_click));

        if !nav.open_new_tab(&new_tab_url) {
            warn!("DeepLinkOrchestrator: popup blocked");
            nav.notify(Notice::allow_popups());
            return Ok(SearchOutcome::PopupBlocked {
                new_tab_url,
                redirect_url,
            });
        }

        nav.notify(Notice::search_started(
            new_tab.display_name(),
            redirect.display_name(),
        ));
        nav.redirect(&redirect_url);
        Ok(SearchOutcome::Completed {
            new_tab_url: Some(new_tab_url),
            redirect_url: Some(redirect_url),
        })
    }

    async fn single_role(
        &self,
        placement: Placement,
        req: &SearchRequest<'_>,
        location: &RentalLocation,
        nav: &dyn Navigator,
    ) -> Result<SearchOutcome> {
        let country = req.user_country();
        let partner = with_timeout(
            "Partner service",
            self.timeouts.partner_resolution,
            async {
                Ok(match placement {
                    Placement::NewTab => self.registry.default_new_tab_partner(country).await,
                    Placement::Redirect => self.registry.default_redirect_partner(country).await,
                })
            },
        )
        .await?;

        let Some(partner) = partner else {
            let (title, message, function) = match placement {
                Placement::NewTab => (
                    "No New Tab Partner Available",
                    "New tab partner is unavailable",
                    Mode::NewTabOnly.function(),
                ),
                Placement::Redirect => (
                    "No Redirect Partner Available",
                    "Redirect partner is unavailable",
                    Mode::RedirectOnly.function(),
                ),
            };
            self.reporter.log_partner_error(
                req.visit,
                title,
                message,
                "unknown",
                self.context(function, req, location),
            );
            return Err(RentrouteError::partner_unavailable(format!(
                "No {} partner available for search",
                role_label(placement)
            )));
        };

        self.log_role_landing(placement, &partner, req).await;
        let click_id = self
            .track_role_click(placement, &partner, req, location)
            .await;
        let url = partner.generate_deep_link(req.params, location, Some(&click_id));

        info!(
            "DeepLinkOrchestrator: redirecting to {} ({})",
            partner.display_name(),
            role_label(placement)
        );
        nav.redirect(&url);

        Ok(match placement {
            Placement::NewTab => SearchOutcome::Completed {
                new_tab_url: Some(url),
                redirect_url: None,
            },
            Placement::Redirect => SearchOutcome::Completed {
                new_tab_url: None,
                redirect_url: Some(url),
            },
        })
    }

    /// 记录合作方落地，失败只上报
    async fn log_role_landing(&self, placement: Placement, partner: &Partner, req: &SearchRequest<'_>) {
        let visit = PartnerVisit {
            partner: partner.name().to_string(),
            deeplink: placement.deeplink_label().to_string(),
            parameters: serde_json::to_value(req.params).unwrap_or_default(),
            method: placement,
        };

        let result = with_timeout(
            "Landing service",
            self.timeouts.landing,
            self.landing
                .log_partner_landing(req.session, req.visit, &visit),
        )
        .await;

        match result {
            Ok(landing_id) => debug!(
                "DeepLinkOrchestrator: {} landing {}",
                role_label(placement),
                landing_id
            ),
            Err(e) => {
                warn!(
                    "DeepLinkOrchestrator: failed to log landing for {} partner: {}",
                    role_label(placement),
                    e
                );
                self.reporter.log_network_error(
                    req.visit,
                    "Landing Service Timeout",
                    &format!(
                        "Failed to log landing for {} partner: {}",
                        role_label(placement),
                        e.message()
                    ),
                    ErrorContext::new(COMPONENT, "log_landing")
                        .with_partner(partner.name())
                        .with_search_params(req.params),
                );
            }
        }
    }

    /// 记录点击，失败时上报并在本地生成点击 ID
    async fn track_role_click(
        &self,
        placement: Placement,
        partner: &Partner,
        req: &SearchRequest<'_>,
        location: &RentalLocation,
    ) -> String {
        let ctx = TrackingContext {
            store: self.store.as_ref(),
            session: req.session,
            visit: req.visit,
        };

        let result = with_timeout(
            "Click tracking",
            self.timeouts.click,
            partner.track_click(&ctx, req.params, location, None, None),
        )
        .await;

        match result {
            Ok(click_id) => click_id,
            Err(e) => {
                warn!(
                    "DeepLinkOrchestrator: failed to track click for {} partner: {}",
                    role_label(placement),
                    e
                );
                self.reporter.log_partner_error(
                    req.visit,
                    "Click Tracking Timeout",
                    &format!(
                        "Failed to track click for {} partner: {}",
                        role_label(placement),
                        e.message()
                    ),
                    partner.name(),
                    self.context("track_click", req, location),
                );
                generate_click_id()
            }
        }
    }

    /// 管线失败：上报后尝试后备链接，仍不行则给出提示
    fn recover(
        &self,
        mode: Mode,
        req: &SearchRequest<'_>,
        location: &RentalLocation,
        nav: &dyn Navigator,
        err: RentrouteError,
    ) -> SearchOutcome {
        error!(
            "DeepLinkOrchestrator: {} failed: {}",
            mode.function(),
            err
        );
        let error_id = self.reporter.log_system_error(
            req.visit,
            mode.failure_title(),
            err.message(),
            self.context(mode.function(), req, location)
                .with_extra("error_type", err.error_type()),
            None,
        );

        let Some(fallback_url) = generate_fallback_url(req.params, location) else {
            self.reporter.log_system_error(
                req.visit,
                "Fallback Search Also Failed",
                "Both main and fallback searches failed. Fallback error: location has no code or id",
                self.context("fallback_search", req, location)
                    .with_extra("original_error_id", error_id.as_str()),
                None,
            );
            return self.give_up(mode, nav, &err, error_id);
        };

        match mode {
            Mode::Both => {
                if !nav.open_new_tab(&fallback_url) {
                    warn!("DeepLinkOrchestrator: fallback popup blocked");
                    return self.give_up(mode, nav, &err, error_id);
                }
                self.reporter.log_system_error(
                    req.visit,
                    "Fallback Search Used",
                    "Main search failed but fallback search was successful",
                    self.context("fallback_search", req, location)
                        .with_extra("fallback_url", fallback_url.as_str())
                        .with_extra("original_error_id", error_id.as_str()),
                    None,
                );
                nav.notify(Notice::fallback_started());
            }
            Mode::RedirectOnly | Mode::NewTabOnly => nav.redirect(&fallback_url),
        }

        info!("DeepLinkOrchestrator: using fallback URL {}", fallback_url);
        SearchOutcome::Fallback {
            url: fallback_url,
            error_id,
        }
    }

    fn give_up(
        &self,
        mode: Mode,
        nav: &dyn Navigator,
        err: &RentrouteError,
        error_id: String,
    ) -> SearchOutcome {
        let notice = match mode {
            Mode::Both => Notice::for_failure(err.message()),
            Mode::RedirectOnly | Mode::NewTabOnly => Notice::search_unavailable(),
        };
        nav.notify(notice);
        SearchOutcome::Failed { error_id }
    }

    fn context(
        &self,
        function: &str,
        req: &SearchRequest<'_>,
        location: &RentalLocation,
    ) -> ErrorContext {
        ErrorContext::new(COMPONENT, function)
            .with_search_params(req.params)
            .with_location(location)
    }
}

/// 不依赖合作方与追踪的最简 Kayak 搜索链接
///
/// 地点代码取 code（其次 id），复合 id 只保留 `-` 之前的部分；
/// 两者都为空时无法生成。
pub fn generate_fallback_url(params: &SearchParams, location: &RentalLocation) -> Option<String> {
    let code = location.code_or_id()?;
    let code = code.split('-').next().unwrap_or(code);

    let date_time = |date: String, time: String| format!("{}-{}", date, time.replace(':', ""));
    let pickup = date_time(params.pickup_date_str(), params.pickup_time_str());
    let dropoff = date_time(params.dropoff_date_str(), params.dropoff_time_str());

    Some(format!(
        "{}?{}",
        FALLBACK_BASE_URL,
        form_query(&[
            ("pickuplocation", code),
            ("pickupdate", &pickup),
            ("dropoffdate", &dropoff),
            ("utm_source", "rental-discounts"),
            ("utm_medium", "fallback"),
        ])
    ))
}
