//! Live-status probe for the presence producer.
//!
//! The probe only influences which award rate a tick uses, so it fails
//! closed: any error (missing credentials, timeout, API change) reads as
//! offline and viewers earn the lower rate rather than nothing.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::HelixConfig;

const TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
const STREAMS_URL: &str = "https://api.twitch.tv/helix/streams";
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait StreamStatusProbe: Send + Sync {
    /// Whether the channel is currently live. Never errors; failures read
    /// as offline.
    async fn is_live(&self) -> bool;
}

/// Fixed status for deployments without platform credentials, and for
/// tests.
pub struct FixedStatus(pub bool);

#[async_trait]
impl StreamStatusProbe for FixedStatus {
    async fn is_live(&self) -> bool {
        self.0
    }
}

/// Twitch Helix probe using an app access token per check.
pub struct HelixStatusProbe {
    http: reqwest::Client,
    config: HelixConfig,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct StreamsResponse {
    data: Vec<serde_json::Value>,
}

impl HelixStatusProbe {
    pub fn new(config: HelixConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .context("Failed to build stream status HTTP client")?;
        Ok(Self { http, config })
    }

    async fn app_token(&self) -> Result<String> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await
            .context("Token request failed")?
            .error_for_status()
            .context("Token request rejected")?;
        let token: TokenResponse = response
            .json()
            .await
            .context("Malformed token response")?;
        Ok(token.access_token)
    }

    async fn check(&self) -> Result<bool> {
        let token = self.app_token().await?;
        let response = self
            .http
            .get(STREAMS_URL)
            .query(&[("user_login", self.config.channel_login.as_str())])
            .bearer_auth(&token)
            .header("Client-Id", &self.config.client_id)
            .send()
            .await
            .context("Streams request failed")?
            .error_for_status()
            .context("Streams request rejected")?;
        let streams: StreamsResponse = response
            .json()
            .await
            .context("Malformed streams response")?;
        // Helix returns one entry per live stream matching the login.
        Ok(!streams.data.is_empty())
    }
}

#[async_trait]
impl StreamStatusProbe for HelixStatusProbe {
    async fn is_live(&self) -> bool {
        match self.check().await {
            Ok(live) => live,
            Err(err) => {
                debug!(error = %err, "stream status check failed, assuming offline");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fixed_status_reports_its_value() {
        assert!(FixedStatus(true).is_live().await);
        assert!(!FixedStatus(false).is_live().await);
    }
}
