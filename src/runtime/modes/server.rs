//! Server mode
//!
//! This module contains the HTTP server startup logic.
//! It configures and starts the HTTP server with all necessary routes.

use actix_cors::Cors;
use actix_web::{
    App, HttpServer,
    middleware::{Compress, DefaultHeaders, from_fn},
    web,
};
use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::middleware::request_id;
use crate::api::services::{AppStartTime, configure};
use crate::runtime::lifetime;

/// Build CORS middleware from configuration
///
/// 空列表 = 仅同源；`"*"` = 任意来源
fn build_cors_middleware(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::default();
    }

    let mut cors = if allowed_origins.iter().any(|o| o == "*") {
        Cors::default().allow_any_origin()
    } else {
        allowed_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors = cors
        .allowed_methods(vec!["GET", "POST"])
        .allowed_header(actix_web::http::header::CONTENT_TYPE)
        .allowed_header(actix_web::http::header::ACCEPT)
        .max_age(3600);
    cors
}

/// Run the HTTP server
///
/// 1. Records startup time
/// 2. Prepares storage and services
/// 3. Starts the error log flush loop
/// 4. Configures and starts the HTTP server
/// 5. Listens for graceful shutdown signals
///
/// **Note**: Logging system must be initialized before calling this function
pub async fn run_server(use_memory: bool) -> Result<()> {
    let app_start_time = AppStartTime {
        start_datetime: chrono::Utc::now(),
    };

    let startup = lifetime::startup::prepare_server_startup(use_memory)
        .await
        .map_err(|e| {
            tracing::error!("Server startup failed: {}", e);
            e
        })?;
    let services = startup.services;

    let config = crate::config::get_config();
    let cpu_count = config.server.cpu_count.clamp(1, 32);
    warn!("Using {} CPU cores for the server", cpu_count);

    let cors_origins = config.server.cors_allowed_origins.clone();
    if cors_origins.is_empty() {
        info!("CORS: same-origin only");
    } else {
        info!("CORS allowed origins: {:?}", cors_origins);
    }

    // 定时把错误日志写入存储
    let background_reporter = services.reporter.clone();
    tokio::spawn(async move {
        background_reporter.start_background_task().await;
    });

    let shutdown_reporter = services.reporter.clone();
    let app_services = web::Data::new(services);
    let app_start = web::Data::new(app_start_time);

    let bind_address = format!("{}:{}", config.server.host, config.server.port);
    let server = HttpServer::new(move || {
        App::new()
            .wrap(from_fn(request_id))
            .wrap(build_cors_middleware(&cors_origins))
            .wrap(Compress::default())
            .wrap(
                DefaultHeaders::new()
                    .add(("Connection", "keep-alive"))
                    .add(("Keep-Alive", "timeout=30, max=1000")),
            )
            .app_data(app_services.clone())
            .app_data(app_start.clone())
            .app_data(web::JsonConfig::default().limit(64 * 1024))
            .configure(configure)
    })
    .keep_alive(std::time::Duration::from_secs(30))
    .client_request_timeout(std::time::Duration::from_millis(5000))
    .client_disconnect_timeout(std::time::Duration::from_millis(1000))
    .workers(cpu_count);

    warn!("Starting server at http://{}", bind_address);
    let server = server
        .bind(&bind_address)
        .with_context(|| format!("Server binding failed: {}", bind_address))?
        .run();

    // Wait for server or shutdown signal
    tokio::select! {
        res = server => {
            res?;
        }
        _ = lifetime::shutdown::listen_for_shutdown(&shutdown_reporter) => {
            warn!("Graceful shutdown: all tasks completed");
        }
    }

    Ok(())
}
