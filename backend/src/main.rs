mod config;
mod error;
mod model;
mod preprocess;
mod routes;
mod runner;

use actix_cors::Cors;
use actix_web::{web, App, HttpServer};
use config::AppConfig;
use routes::configure_routes;
use runner::DualModelRunner;
use std::env;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    if let Ok(current_dir) = env::current_dir() {
        log::info!("Current working directory: {}", current_dir.display());
    } else {
        log::error!("Failed to get the current working directory.");
    }

    let (config, source) = AppConfig::load().map_err(|e| {
        log::error!("Failed to load configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    match &source {
        Some(path) => log::info!("Configuration loaded from {}", path.display()),
        None => log::info!("No config file found, using built-in defaults"),
    }

    let models = model::load_models(&config.models).map_err(|e| {
        log::error!("Failed to load models at startup: {}", e);
        std::io::Error::other(format!("Model loading failed: {}", e))
    })?;
    let runner = DualModelRunner::new(models);
    log::info!("Models ready: {}", runner.model_names().join(", "));

    let frontend_dir = config.server.frontend_dir.clone();
    let max_upload_bytes = config.server.max_upload_bytes;
    let bind_address = config.bind_address();

    log::info!("Serving UI from {}", frontend_dir.display());
    log::info!("Starting server on {}", bind_address);

    let runner = web::Data::new(runner);

    HttpServer::new(move || {
        App::new()
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .max_age(3600),
            )
            .wrap(actix_web::middleware::Logger::default())
            .app_data(runner.clone())
            .configure(|cfg| configure_routes(cfg, frontend_dir.clone(), max_upload_bytes))
    })
    .bind(&bind_address)?
    .run()
    .await
}
