//! `/api/deeplinks`：为前端生成导航计划
//!
//! 浏览器里的 `window.open` / 跳转 / 提示由前端按返回的动作列表执行；
//! 新标签页被拦截时前端带 `popupBlocked=true` 回报一次，服务端只返回
//! 允许弹窗的提示，不重新生成深链，也不再记录点击。

use actix_web::{HttpRequest, HttpResponse, Responder, web};
use tracing::info;

use super::helpers::{apply_session_cookie, session_from_request, visit_from_request};
use super::types::{ApiResponse, DeepLinkMode, DeepLinkRequest, DeepLinkResponse};
use crate::services::{
    AppServices, RecordingNavigator, SearchRequest, detect_location, resolve_pickup_location,
};

pub struct DeepLinkService;

impl DeepLinkService {
    pub async fn create_deep_links(
        req: HttpRequest,
        body: web::Json<DeepLinkRequest>,
        services: web::Data<AppServices>,
    ) -> impl Responder {
        let body = body.into_inner();
        let visit = visit_from_request(&req);
        let session = session_from_request(&req, &services);

        if body.popup_blocked {
            let nav = RecordingNavigator::new();
            let outcome = services.orchestrator.report_popup_blocked(&nav);
            let mut builder = HttpResponse::Ok();
            apply_session_cookie(&mut builder, &session, &services);
            return builder.json(ApiResponse::ok(DeepLinkResponse {
                outcome,
                actions: nav.into_actions(),
            }));
        }

        let default_location = match body.default_location {
            Some(location) => Some(location),
            None => detect_location(services.geo.as_ref(), visit.client_ip.as_deref()).await,
        };
        // 未选中地点时按输入文本解析（自动补全首条或定位地点）
        let selected = body.location.or_else(|| body.search.pickup_location.clone());
        let location = resolve_pickup_location(
            &services.registry,
            &body.search.pickup,
            selected,
            default_location.as_ref(),
        )
        .await;

        let search = SearchRequest {
            params: &body.search,
            location: location.as_ref(),
            default_location: default_location.as_ref(),
            visit: &visit,
            session: &session,
        };
        let nav = RecordingNavigator::new();
        let orchestrator = &services.orchestrator;

        let outcome = match body.mode {
            DeepLinkMode::Both => orchestrator.generate_and_open_deep_link(&search, &nav).await,
            DeepLinkMode::Redirect => {
                orchestrator
                    .generate_redirect_only_deep_link(&search, &nav)
                    .await
            }
            DeepLinkMode::NewTab => {
                orchestrator
                    .generate_new_tab_only_deep_link(&search, &nav)
                    .await
            }
        };
        info!("Deep links generated ({:?}): {:?}", body.mode, outcome);

        let mut builder = HttpResponse::Ok();
        apply_session_cookie(&mut builder, &session, &services);
        builder.json(ApiResponse::ok(DeepLinkResponse {
            outcome,
            actions: nav.into_actions(),
        }))
    }
}
