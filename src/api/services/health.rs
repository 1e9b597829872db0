use actix_web::http::StatusCode;
use actix_web::{HttpResponse, Responder, web};
use std::time::{Duration, Instant};
use tracing::{error, info, trace};

use super::types::{ApiResponse, ErrorCode, HealthResponse, HealthStorageCheck};
use crate::services::AppServices;

// 应用启动时间结构体
#[derive(Clone, Debug)]
pub struct AppStartTime {
    pub start_datetime: chrono::DateTime<chrono::Utc>,
}

/// Health Service
///
/// 存储连通性 + 已加载的合作方
pub struct HealthService;

impl HealthService {
    pub async fn health_check(
        services: web::Data<AppServices>,
        app_start_time: web::Data<AppStartTime>,
    ) -> impl Responder {
        let start_time = Instant::now();
        trace!("Received health check request");

        let backend = services.store.backend_name().to_string();
        let storage = match tokio::time::timeout(Duration::from_secs(5), services.store.ping()).await
        {
            Ok(Ok(())) => HealthStorageCheck {
                status: "healthy".to_string(),
                backend,
                error: None,
            },
            Ok(Err(e)) => {
                error!("Storage health check failed: {}", e);
                HealthStorageCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    error: Some(format!("database error: {}", e)),
                }
            }
            Err(_) => {
                error!("Storage health check timeout");
                HealthStorageCheck {
                    status: "unhealthy".to_string(),
                    backend,
                    error: Some("timeout".to_string()),
                }
            }
        };

        let partners = services.registry.partner_names().await;
        let now = chrono::Utc::now();
        let uptime_seconds = (now - app_start_time.start_datetime).num_seconds().max(0) as u32;
        let is_healthy = storage.status == "healthy";

        let health = HealthResponse {
            status: if is_healthy { "healthy" } else { "unhealthy" }.to_string(),
            timestamp: now.to_rfc3339(),
            uptime: uptime_seconds,
            storage,
            partners,
            pending_error_logs: services.reporter.pending(),
            response_time_ms: start_time.elapsed().as_millis() as u32,
        };

        info!(
            "Health check completed in {:?}, status: {}",
            start_time.elapsed(),
            health.status
        );

        let (status, body) = if is_healthy {
            (StatusCode::OK, ApiResponse::ok(health))
        } else {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ApiResponse {
                    code: ErrorCode::ServiceUnavailable as i32,
                    message: "Service Unavailable".to_string(),
                    data: Some(health),
                },
            )
        };
        HttpResponse::build(status).json(body)
    }

    // 活跃性检查
    pub async fn liveness_check() -> impl Responder {
        trace!("Received liveness check request");
        HttpResponse::NoContent().finish()
    }
}

/// Health 路由配置
pub fn health_routes() -> actix_web::Scope {
    web::scope("/health")
        .route("", web::get().to(HealthService::health_check))
        .route("", web::head().to(HealthService::health_check))
        .route("/live", web::get().to(HealthService::liveness_check))
        .route("/live", web::head().to(HealthService::liveness_check))
}
