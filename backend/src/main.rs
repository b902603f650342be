mod config;
mod error;
mod job_controller;
mod pipeline;
mod services;
mod storage;

use crate::config::AppConfig;
use crate::job_controller::state::JobsState;
use crate::storage::connect_store;
use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use tokio::sync::mpsc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));
    let config = AppConfig::from_env();

    // Chosen once; every handler shares this store for the process lifetime.
    let store = connect_store(&config);
    info!(
        "Storage backend: {} ({})",
        store.backend_name(),
        if store.is_durable() { "durable" } else { "in-memory" }
    );
    let store = web::Data::from(store);
    let settings = web::Data::new(config.generation_settings());

    let (tx, rx) = mpsc::channel(100);
    let jobs_state = JobsState::new(tx);

    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        job_controller::state::start_job_updater(updater_state, rx).await;
    });

    let bind = (config.host.clone(), config.port);
    info!(
        "Server running at http://{}:{} ({} generation worker(s))",
        bind.0, bind.1, config.generation_workers
    );
    let config = web::Data::new(config);

    HttpServer::new(move || {
        App::new()
            .app_data(services::json_config(config.max_upload_bytes))
            .app_data(services::payload_config(config.max_upload_bytes))
            .app_data(store.clone())
            .app_data(settings.clone())
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(config.clone())
            .configure(services::configure)
    })
    .bind(bind)?
    .run()
    .await
}
