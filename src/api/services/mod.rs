pub mod deeplinks;
pub mod health;
pub mod helpers;
pub mod locations;
pub mod search;
pub mod types;

use actix_web::web;

pub use deeplinks::DeepLinkService;
pub use health::{AppStartTime, HealthService, health_routes};
pub use locations::LocationService;
pub use search::{SearchService, search_routes};
pub use types::{ApiResponse, DeepLinkMode, DeepLinkRequest, DeepLinkResponse, ErrorCode};

/// `/api` 路由
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .route("/deeplinks", web::post().to(DeepLinkService::create_deep_links))
        .route("/locations", web::get().to(LocationService::search_locations))
}

/// 全部路由注册到 App
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health_routes())
        .service(api_routes())
        .service(search_routes());
}
