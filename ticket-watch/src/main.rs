use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use ticket_watch::cache::{CacheConfig, CachedTransport};
use ticket_watch::calendar::{CalendarEngine, OverrideTables};
use ticket_watch::config::AppConfig;
use ticket_watch::poller::{PollerContext, PollerRegistry};
use ticket_watch::purchase::{
    HttpWebhookSender, InMemoryTaskStore, LogNotifier, PurchaseOrchestrator,
};
use ticket_watch::query::QueryClient;
use ticket_watch::stations::{StationCache, StationClient, StationDirectory};
use ticket_watch::web::{AppState, create_router};

/// How often to refresh the station list (24 hours).
const STATION_REFRESH_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ticket_watch=info")),
        )
        .init();

    let config = AppConfig::from_env().expect("Invalid configuration");
    config.warn_missing();

    // Holiday tables: built-in years plus any extra files on disk
    let mut tables = OverrideTables::builtin().expect("Built-in calendar data is malformed");
    if let Some(dir) = &config.calendar_dir {
        match tables.load_dir(dir) {
            Ok(count) => info!(count, dir = %dir.display(), "loaded extra calendar years"),
            Err(e) => warn!(error = %e, dir = %dir.display(), "failed to load calendar directory"),
        }
    }
    let calendar = Arc::new(CalendarEngine::new(tables));

    // Station directory, backed by the upstream list and a disk copy
    let station_client =
        StationClient::new(config.station_client()).expect("Failed to create station client");
    let directory = StationDirectory::new(Arc::new(station_client))
        .with_disk_cache(StationCache::new(config.station_cache()));
    match directory.load().await {
        Ok(count) => info!(count, "station directory ready"),
        Err(e) => warn!(error = %e, "station list unavailable, will retry on first lookup"),
    }

    // Spawn background task to refresh the station list daily
    let directory_refresh = directory.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATION_REFRESH_INTERVAL);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            match directory_refresh.refresh().await {
                Ok(count) => info!(count, "refreshed station list"),
                Err(e) => error!(error = %e, "failed to refresh station list"),
            }
        }
    });

    // Availability queries, shared between pollers through the cache
    let query_client =
        QueryClient::new(config.query_client()).expect("Failed to create query client");
    let transport = Arc::new(CachedTransport::new(
        Arc::new(query_client),
        &CacheConfig::default(),
    ));

    let store = Arc::new(InMemoryTaskStore::new());

    let pollers = PollerRegistry::new(PollerContext {
        directory: directory.clone(),
        calendar,
        transport,
        store: Some(store.clone()),
        config: config.poller(),
    });

    let sender =
        HttpWebhookSender::new(config.webhook()).expect("Failed to create webhook client");
    let orchestrator = PurchaseOrchestrator::new(
        store,
        Arc::new(sender),
        Arc::new(LogNotifier),
        config.orchestrator(),
    );

    let state = AppState::new(directory, pollers.clone(), orchestrator);
    let app = create_router(state);

    let addr = config.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");
    info!(%addr, "ticket watcher listening");

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }

    pollers.shutdown().await;
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
