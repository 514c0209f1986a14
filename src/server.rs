//! Process wiring: configuration, storage, records and the HTTP listener.

use crate::api::{self, auth::JwtValidator, AppState};
use crate::clock::SystemClock;
use crate::config::Config;
use crate::repository::{MemoryRepository, Repository};
use crate::service::SigningService;
use crate::storage::LocalStorage;
use crate::Error;
use anyhow::Context;
use log::info;
use std::sync::Arc;

/// Lifetime of tokens printed by `pdf-esign token`.
pub const CLI_TOKEN_TTL_HOURS: i64 = 24;

pub fn init_logging() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

/// Build the handler state described by `config`.
pub fn build_state(config: &Config) -> Result<AppState, Error> {
    let storage = Arc::new(LocalStorage::new(&config.upload_dir)?);
    let repository: Arc<dyn Repository> = match &config.data_file {
        Some(path) => {
            info!("Persisting records to {}", path.display());
            Arc::new(MemoryRepository::persistent(path)?)
        }
        None => {
            info!("DATA_FILE not set, records are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };
    let service = SigningService::new(
        repository,
        storage,
        Arc::new(SystemClock),
        chrono::Duration::hours(config.link_ttl_hours),
    );
    Ok(AppState {
        service: Arc::new(service),
        jwt: Arc::new(JwtValidator::new(
            config.jwt_secret.as_bytes(),
            &config.jwt_issuer,
        )),
        public_link_base: config.public_link_base.clone(),
        max_upload_bytes: config.max_upload_bytes,
    })
}

/// Start the HTTP server.
pub async fn run() -> anyhow::Result<()> {
    info!("Starting pdf-esign v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("loading configuration")?;
    let state = build_state(&config).context("preparing storage")?;
    info!("Serving uploads from {}", config.upload_dir.display());

    let app = api::router(state);

    info!("Starting HTTP server on {}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Print a bearer token for `user_id`, for local use and testing.
pub fn print_token(user_id: &str) -> anyhow::Result<()> {
    let user_id: i64 = user_id
        .parse()
        .with_context(|| format!("`{}` is not a numeric user id", user_id))?;
    let config = Config::from_env().context("loading configuration")?;
    let token = JwtValidator::new(config.jwt_secret.as_bytes(), &config.jwt_issuer)
        .issue(user_id, chrono::Duration::hours(CLI_TOKEN_TTL_HOURS))?;
    println!("{}", token);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        log::error!("Could not listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
