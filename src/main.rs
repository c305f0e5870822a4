use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};

mod api;
mod auth;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod models;
mod punch;
mod routes;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::punch::lock::EmployeeLocks;
use crate::utils::{login_id_cache, login_id_filter};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Time clock is running"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let pool = init_db(&config.database_url, config.run_migrations).await?;

    let pool_for_filter_warmup = pool.clone();
    let pool_for_cache_warmup = pool.clone();
    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config);
    let pool_data = Data::new(pool);
    let locks = Data::new(EmployeeLocks::new());

    actix_web::rt::spawn(async move {
        if let Err(e) = login_id_filter::warmup_login_id_filter(&pool_for_filter_warmup, 100).await {
            warn!(error = ?e, "Failed to warm up login id filter");
        }
    });

    actix_web::rt::spawn(async move {
        // Employees who logged in during the last 30 days, in batches of 250
        if let Err(e) = login_id_cache::warmup_login_id_cache(&pool_for_cache_warmup, 30, 250).await {
            warn!(error = ?e, "Failed to warm up login id cache");
        }
    });

    if config_data.kiosk_key.is_none() {
        info!("KIOSK_KEY not set, kiosk routes disabled");
    }

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard needed to serve the JS/CSS assets
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(pool_data.clone())
            .app_data(config_data.clone())
            .app_data(locks.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config_data))
    })
    .bind(server_addr)?
    .run()
    .await?;

    Ok(())
}
