//! `/search` 透传落地页
//!
//! 解析 query 后走 new-tab-only 流程，直接 307 到合作方深链（或后备链接）。

use actix_web::http::StatusCode;
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::Serialize;
use tracing::{debug, warn};

use super::helpers::{apply_session_cookie, session_from_request, visit_from_request};
use super::types::{ApiResponse, ErrorCode};
use crate::services::{AppServices, NavigationAction, RecordingNavigator, SearchOutcome, detect_location};

#[derive(Serialize)]
struct SearchFailure {
    outcome: SearchOutcome,
    actions: Vec<NavigationAction>,
}

pub struct SearchService;

impl SearchService {
    pub async fn handle_search(
        req: HttpRequest,
        services: web::Data<AppServices>,
    ) -> impl Responder {
        let visit = visit_from_request(&req);
        let session = session_from_request(&req, &services);
        let detected = detect_location(services.geo.as_ref(), visit.client_ip.as_deref()).await;
        let nav = RecordingNavigator::new();

        let result = services
            .passthrough
            .handle(&visit, &session, detected.as_ref(), &nav)
            .await;

        let mut response = match result {
            Ok(outcome) => match nav.redirect_url() {
                Some(url) => {
                    debug!("Search passthrough redirecting to {}", url);
                    let mut builder = HttpResponse::TemporaryRedirect();
                    builder.insert_header(("Location", url));
                    builder
                }
                None => {
                    let (status, code) = match outcome {
                        SearchOutcome::MissingLocation => {
                            (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::SearchLocationNeeded)
                        }
                        _ => (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::SearchFailed),
                    };
                    let body = ApiResponse {
                        code: code as i32,
                        message: "Search could not be started".to_string(),
                        data: Some(SearchFailure {
                            outcome,
                            actions: nav.actions(),
                        }),
                    };
                    let mut builder = HttpResponse::build(status);
                    apply_session_cookie(&mut builder, &session, &services);
                    return builder.json(body);
                }
            },
            Err(e) => {
                warn!("Search passthrough rejected: {}", e);
                let mut builder = HttpResponse::BadRequest();
                apply_session_cookie(&mut builder, &session, &services);
                return builder.json(ApiResponse::<()>::error(
                    ErrorCode::from(&e),
                    e.message(),
                ));
            }
        };

        apply_session_cookie(&mut response, &session, &services);
        response
            .insert_header(("Cache-Control", "no-cache, no-store, must-revalidate"))
            .finish()
    }
}

pub fn search_routes() -> actix_web::Scope {
    web::scope("/search")
        .route("", web::get().to(SearchService::handle_search))
}
