use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use keepup_api::{
    config::Config,
    create_router,
    db::{create_pool, create_redis_client, Cache, InMemoryLibrary, PersistedLibrary, PgLibrary},
    services::{HttpStatusClient, TmdbClient},
    AppState,
};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "keepup_api=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let library: Arc<dyn PersistedLibrary> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            tracing::info!("Tracked libraries stored in Postgres");
            Arc::new(PgLibrary::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, tracked libraries are kept in memory");
            Arc::new(InMemoryLibrary::new())
        }
    };

    let (cache, cache_writer) = match &config.redis_url {
        Some(url) => {
            let (cache, handle) = Cache::new(create_redis_client(url)?);
            tracing::info!("Catalog response cache enabled");
            (Some(cache), Some(handle))
        }
        None => (None, None),
    };

    let http_client = reqwest::Client::new();
    let catalog = TmdbClient::new(
        http_client.clone(),
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
        config.tmdb_image_url.clone(),
        cache,
    );
    let status = HttpStatusClient::new(http_client, config.status_api_url.clone());

    let state = AppState::new(
        Arc::new(catalog),
        Arc::new(status),
        library,
        config.recent_window_days,
    );

    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(sweep_idle_sessions(
        state.clone(),
        Duration::from_secs(config.session_idle_secs),
        sweep_cancel.clone(),
    ));

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep_cancel.cancel();
    let _ = sweep_handle.await;

    if let Some(handle) = cache_writer {
        handle.shutdown().await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

/// Evicts idle user sessions until cancelled
async fn sweep_idle_sessions(state: AppState, max_idle: Duration, cancel: CancellationToken) {
    let mut interval = tokio::time::interval(SESSION_SWEEP_INTERVAL);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                state.evict_idle(max_idle).await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
