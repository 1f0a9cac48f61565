use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tariff_api::{app, AppState};
use tariff_conflict::{InMemoryScopeLock, PriceWriter, WriterSettings};
use tariff_core::ScopeLock;
use tariff_store::{Config, InMemoryStore, LockBackend, RedisScopeLock, StoreSeed};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tariff_api=debug,tower_http=debug,axum::rejection=trace".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Tariff API on port {}", config.server.port);

    let store = match &config.store.seed_path {
        Some(path) => {
            let store = StoreSeed::from_file(path)?.into_store().await?;
            tracing::info!("Loaded seed from {}", path);
            store
        }
        None => {
            tracing::warn!("No seed configured, starting with an empty store");
            InMemoryStore::default()
        }
    };

    let lock: Arc<dyn ScopeLock> = match config.lock.backend {
        LockBackend::Memory => Arc::new(InMemoryScopeLock::new()),
        LockBackend::Redis => {
            let url = config
                .lock
                .redis_url
                .as_deref()
                .context("lock.redis_url is required for the redis lock backend")?;
            Arc::new(RedisScopeLock::new(url).await.context("Failed to configure Redis")?)
        }
    };

    let settings = WriterSettings {
        lock_timeout: Duration::from_millis(config.pricing.lock_timeout_ms),
        write_timeout: Duration::from_millis(config.pricing.write_timeout_ms),
        poll_interval: Duration::from_millis(config.pricing.lock_poll_ms),
        lease: Duration::from_secs(config.lock.lease_seconds),
    };

    let store = Arc::new(store);
    let writer = PriceWriter::new(store.clone(), lock, settings);
    let app_state = AppState {
        store,
        writer: Arc::new(writer),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
