use actix_web::{HttpResponse, Responder, web};
use tracing::trace;

use super::types::LocationQuery;
use crate::models::RentalLocation;
use crate::services::AppServices;

const MIN_QUERY_CHARS: usize = 2;

pub struct LocationService;

impl LocationService {
    /// 地点自动补全（少于 2 个字符直接返回空数组）
    pub async fn search_locations(
        query: web::Query<LocationQuery>,
        services: web::Data<AppServices>,
    ) -> impl Responder {
        let term = query.q.trim();
        if term.chars().count() < MIN_QUERY_CHARS {
            trace!("Location query '{}' too short", term);
            return HttpResponse::Ok().json(Vec::<RentalLocation>::new());
        }

        let locations = services
            .registry
            .search_locations(term, query.partner.as_deref())
            .await;
        HttpResponse::Ok().json(locations)
    }
}
