use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;
use std::sync::Arc;

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod face;
mod model;
mod models;
mod routes;
mod service;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::face::{FaceIdentityProvider, client::RestFaceProvider};
use crate::service::attendance::AttendanceService;
use crate::service::audit::AuditService;
use crate::store::{AuditStore, EmployeeStore, LedgerStore, mysql::MySqlStore};
use crate::utils::time::{Clock, SystemClock};
use crate::utils::{code_filter, token_cache};
use tracing::info;
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "faceclock"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url).await;

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();

    actix_web::rt::spawn(async move {
        if let Err(e) = code_filter::warmup_code_filter(&pool_for_filter_warmup, 100).await {
            eprintln!("Failed to warmup employee code filter: {:?}", e);
        }
    });

    actix_web::rt::spawn(async move {
        if let Err(e) = token_cache::warmup_token_cache(&pool_for_cache_warmup, 250).await {
            eprintln!("Failed to warmup face token cache: {:?}", e);
        }
    });

    // Shared store + injected services. Storage and clock are passed in
    // explicitly; no component reaches for a global handle.
    let store = Arc::new(MySqlStore::new(pool.clone()));
    let ledger: Arc<dyn LedgerStore> = store.clone();
    let directory: Arc<dyn EmployeeStore> = store.clone();
    let audit_store: Arc<dyn AuditStore> = store.clone();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tz = config.org_tz();

    let attendance = Data::new(AttendanceService::new(
        ledger.clone(),
        clock.clone(),
        tz,
        config.auto_close_time,
    ));
    let audit = Data::new(AuditService::new(
        ledger.clone(),
        audit_store,
        clock.clone(),
        tz,
    ));

    let face_provider: Arc<dyn FaceIdentityProvider> = Arc::new(RestFaceProvider::new(
        config.face_api_url.clone(),
        config.face_api_key.clone(),
    ));

    // Clone values for the closure before moving config
    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(attendance.clone())
            .app_data(audit.clone())
            .app_data(Data::from(ledger.clone()))
            .app_data(Data::from(directory.clone()))
            .app_data(Data::from(face_provider.clone()))
            .service(index)
            // Configure auth + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
