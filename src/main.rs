use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use dotenvy::dotenv;

mod api;
mod auth;
mod config;
mod core;
mod db;
mod model;
mod models;
mod notify;
mod routes;
mod docs;

use config::Config;
use db::init_db;

use crate::core::clock::{Clock, ReferenceZone, SystemClock};
use crate::core::token::TokenAuthority;
use crate::notify::{LogNotifier, Notifier};
use std::sync::Arc;
use tracing::info;
use tracing_appender::rolling;
use utoipa_swagger_ui::SwaggerUi;
use crate::docs::ApiDoc;
use utoipa::OpenApi; // ← needed for ApiDoc::openapi()

#[get("/")]
async fn index() -> impl Responder {
    "Presensi QR backend"
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

    let zone = ReferenceZone::from_offset_hours(config.utc_offset_hours)
        .expect("UTC_OFFSET_HOURS must be a valid offset");
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let tokens = Data::new(TokenAuthority::new(
        zone,
        config.qr_token_ttl_secs,
        clock.clone(),
    ));
    let notifier: Arc<dyn Notifier> = Arc::new(LogNotifier);

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // ← important: wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(Data::new(pool.clone()))
            .app_data(Data::new(config.clone()))
            .app_data(Data::new(zone))
            .app_data(tokens.clone())
            .app_data(Data::from(clock.clone()))
            .app_data(Data::from(notifier.clone()))
            .service(index)
            // Configure public + protected routes with rate limiting
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
