use std::sync::Arc;

use anyhow::Result;
use feed_client::FeedClient;
use fieldcheck_cache::{CacheConfig, ShardedCache};
use fieldcheck_common::Config;
use fieldcheck_core::{CachedSource, LocationSource, Resolver, Selector};
use fieldcheck_store::PgStore;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use fieldcheck_api::{router, AppState};

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("fieldcheck=info,feed_client=info,tower_http=info"))?;
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received, draining connections");
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.request_timeout)
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgStore::new(pool));
    store.migrate().await?;
    info!("Database migrations applied");

    let cache = Arc::new(ShardedCache::new(CacheConfig::default()));
    let feed = FeedClient::new(config.feed_base_url.clone(), config.feed_api_key.clone());
    let source: Arc<dyn LocationSource> = Arc::new(CachedSource::new(feed, cache.clone()));

    let state = Arc::new(AppState {
        selector: Selector::new(source.clone(), store.clone()),
        resolver: Resolver::new(source, store.clone(), store.clone()),
        store: store.clone(),
        users: store,
        cache,
    });

    let app = router(state, config.request_timeout);

    let addr = config.bind_addr();
    info!("Fieldcheck API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Fieldcheck API stopped");
    Ok(())
}
