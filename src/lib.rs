use std::sync::Arc;
use tracing::{error, info};

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod service;
pub mod storage;

pub use config::Config;
pub use error::{Result, TelemetryError};

pub struct AppState {
    pub ingest: service::IngestService,
    pub query: service::QueryService,
}

/// Wire the store, services and HTTP server together and serve until Ctrl-C.
///
/// An unreachable store is logged but does not stop startup; `/health`
/// reports the degraded state and store-backed routes answer 503 until the
/// store comes back.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let store: Arc<dyn storage::RecordStore> = Arc::new(storage::RedisStore::new(&config.redis())?);
    let clock: Arc<dyn clock::Clock> = Arc::new(clock::SystemClock::new(config.timezone));
    let store_timeout = config.store_timeout();

    let query = service::QueryService::new(store.clone(), clock, store_timeout);
    match query.store_health().await {
        Ok(()) => info!(
            host = %config.redis_host,
            port = config.redis_port,
            db = config.redis_db,
            "connected to redis"
        ),
        Err(err) => error!(
            host = %config.redis_host,
            port = config.redis_port,
            error = %err,
            "redis is not reachable, starting degraded"
        ),
    }

    let ingest = service::IngestService::spawn(store, store_timeout)
        .with_strict_timestamps(config.strict_timestamps);
    let state = Arc::new(AppState {
        ingest: ingest.clone(),
        query,
    });

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);
    let http_shutdown = shutdown_tx.clone();
    let mut server = tokio::spawn(api::http::run(state, config.bind, http_shutdown));

    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res?;
            info!("shutdown requested");
            let _ = shutdown_tx.send(());
            server.await??;
        }
        res = &mut server => {
            // the server only returns on its own when it failed to bind or serve
            res??;
        }
    }

    ingest.shutdown();
    Ok(())
}
