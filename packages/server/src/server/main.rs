// Main entry point for the points engine

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use server_core::domains::activity::{
    ActivityIngestor, FixedStatus, HelixStatusProbe, PresenceLoop, PresenceTracker,
    StreamStatusProbe,
};
use server_core::domains::ledger::LedgerService;
use server_core::kernel::{NatsActivityQueue, NotificationBus};
use server_core::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Points Ledger & Raffle Engine");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Connect to the activity queue
    tracing::info!("Connecting to NATS at {}...", config.nats_url);
    let nats = async_nats::connect(&config.nats_url)
        .await
        .context("Failed to connect to NATS")?;
    let queue = Arc::new(NatsActivityQueue::new(nats));
    tracing::info!("NATS connected");

    // Wire the services
    let bus = Arc::new(NotificationBus::new());
    let ledger = Arc::new(LedgerService::new(pool.clone(), bus.clone()));

    let probe: Arc<dyn StreamStatusProbe> = match config.helix.clone() {
        Some(helix) => Arc::new(HelixStatusProbe::new(helix)?),
        None => {
            tracing::warn!("No Twitch credentials configured; presence uses the offline rate");
            Arc::new(FixedStatus(false))
        }
    };

    let presence_tracker = Arc::new(PresenceTracker::new());
    let ingestor = ActivityIngestor::new(
        queue.clone(),
        ledger,
        pool.clone(),
        presence_tracker.clone(),
    );
    let presence_loop = PresenceLoop::new(
        presence_tracker,
        queue,
        probe,
        config.presence_interval,
    );

    tracing::info!(
        "Presence interval: {}s",
        config.presence_interval.as_secs()
    );

    tokio::select! {
        result = ingestor.run() => {
            result.context("Activity ingestor stopped")?;
        }
        _ = presence_loop.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
    }

    Ok(())
}
