use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub nats_url: String,
    pub presence_interval: Duration,
    /// Present only when all three Twitch variables are set; otherwise the
    /// presence producer runs with the offline award rate.
    pub helix: Option<HelixConfig>,
}

/// Twitch Helix credentials for the stream status probe
#[derive(Debug, Clone)]
pub struct HelixConfig {
    pub client_id: String,
    pub client_secret: String,
    pub channel_login: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let presence_interval_secs: u64 = env::var("PRESENCE_INTERVAL_SECS")
            .unwrap_or_else(|_| "600".to_string())
            .parse()
            .context("PRESENCE_INTERVAL_SECS must be a valid number")?;

        let helix = match (
            env::var("TWITCH_CLIENT_ID").ok(),
            env::var("TWITCH_CLIENT_SECRET").ok(),
            env::var("TWITCH_CHANNEL").ok(),
        ) {
            (Some(client_id), Some(client_secret), Some(channel_login)) => Some(HelixConfig {
                client_id,
                client_secret,
                channel_login,
            }),
            _ => None,
        };

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            nats_url: env::var("NATS_URL").unwrap_or_else(|_| "nats://localhost:4222".to_string()),
            presence_interval: Duration::from_secs(presence_interval_secs),
            helix,
        })
    }
}
