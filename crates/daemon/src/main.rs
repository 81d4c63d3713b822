use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use drivewatch_engine::{schedule, BenchmarkEngine, Discovery, ScheduleManager, SmartMonitor};
use drivewatch_events::LiveFeed;
use drivewatch_notify::Dispatcher;
use drivewatch_probes::{
    BenchmarkRunner, DiagnosticReader, FioRunner, MockReader, MockRunner, SmartctlReader,
};
use drivewatch_tsdb::{InfluxStore, TimeSeriesStore};

mod config;

use config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drivewatchd=debug,drivewatch_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = Config::from_env();
    tracing::info!(
        database_url = %config.database_url,
        influx_url = %config.influx.url,
        mock_hardware = config.mock_hardware,
        "Loaded configuration"
    );

    // --- Database ---
    let pool = drivewatch_db::create_pool(&config.database_url).await?;
    drivewatch_db::health_check(&pool).await?;
    drivewatch_db::run_migrations(&pool).await?;
    tracing::info!("Database ready");

    // --- Stores and probes ---
    let store: Arc<dyn TimeSeriesStore> = Arc::new(InfluxStore::new(config.influx.clone()));

    // Strategy selection happens exactly once, here; nothing downstream
    // branches on mock-ness.
    let (runner, reader): (Arc<dyn BenchmarkRunner>, Arc<dyn DiagnosticReader>) =
        if config.mock_hardware {
            tracing::warn!("Mock hardware mode: synthetic drives and measurements");
            (Arc::new(MockRunner::new()), Arc::new(MockReader::new()))
        } else {
            (Arc::new(FioRunner::new()), Arc::new(SmartctlReader::new()))
        };

    // --- Core components ---
    let feed = Arc::new(LiveFeed::new());
    let dispatcher = Arc::new(Dispatcher::new(
        pool.clone(),
        config.default_temperature_threshold,
    ));
    let engine = BenchmarkEngine::new(
        pool.clone(),
        Arc::clone(&store),
        runner,
        Arc::clone(&feed),
    );
    let monitor = Arc::new(SmartMonitor::new(
        pool.clone(),
        store,
        Arc::clone(&reader),
        Arc::clone(&feed),
        dispatcher,
    ));
    let discovery = Discovery::new(pool.clone(), reader, Arc::clone(&feed));

    // --- Startup scan and first poll ---
    match discovery.scan_and_register().await {
        Ok(drives) => tracing::info!(count = drives.len(), "Initial scan complete"),
        Err(e) => tracing::error!(error = %e, "Initial scan failed"),
    }
    monitor.poll_all().await;

    // --- Schedules and the poll loop ---
    let schedules = ScheduleManager::start(pool.clone(), Arc::clone(&engine)).await?;
    schedules.load_enabled().await?;

    let cancel = CancellationToken::new();
    let poll_handle = tokio::spawn(schedule::run_poll_loop(
        Arc::clone(&monitor),
        Duration::from_secs(config.smart_poll_interval_minutes * 60),
        cancel.clone(),
    ));

    tracing::info!("drivewatchd running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    cancel.cancel();
    let _ = poll_handle.await;
    if let Err(e) = schedules.shutdown().await {
        tracing::warn!(error = %e, "Scheduler shutdown failed");
    }
    pool.close().await;

    Ok(())
}
