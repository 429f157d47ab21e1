use std::sync::Arc;

use actix_web::middleware::Logger;
use actix_web::{web, App, HttpServer};
use blob_store::GuardedStore;
use clap::Parser;
use file_relay_server::config::RelayConfig;
use file_relay_server::params::Args;
use file_relay_server::{configure, cors_headers, RelayState};
use tracing_subscriber::EnvFilter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = RelayConfig::try_from(args)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    // One store handle for the whole process, shared by every worker.
    let stores = config.storage.open().await?;
    tracing::info!(
        backend = stores.backend_name(),
        key_strategy = ?config.key_strategy,
        public_base = ?config.links.base().map(|u| u.as_str()),
        "blob store ready"
    );
    let store = Arc::new(GuardedStore::new(stores, config.store_policy));

    let state = web::Data::new(RelayState::new(store, config.key_strategy, config.links.clone()));
    let max_upload_bytes = config.max_upload_bytes;

    tracing::info!(addr = %config.http_addr, "starting HTTP server");
    HttpServer::new(move || {
        let state = state.clone();
        App::new()
            .wrap(cors_headers())
            .wrap(Logger::default())
            .configure(move |cfg| configure(cfg, state, max_upload_bytes))
    })
    .bind(config.http_addr.clone())?
    .run()
    .await
}
