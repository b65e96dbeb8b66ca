//! Post-run cleanup of the test account's rows in the hosted data plane
//!
//! Talks to the PostgREST endpoint with the service key, which bypasses
//! row level security. Articles go away with their feed through the
//! foreign key cascade, so only three tables are touched.

use std::time::Duration;
use reqwest::{Client, Url};
use tracing::{info, warn};

use crate::config::{DataPlaneConfig, E2eConfig};
use crate::error::{E2eError, E2eResult};

/// Deleted in this order; the first failure stops the cleanup.
pub const CLEANUP_TABLES: [&str; 3] = ["feeds", "summaries", "events"];

pub struct TeardownClient {
    http: Client,
    config: DataPlaneConfig,
}

impl TeardownClient {
    pub fn new(config: DataPlaneConfig) -> E2eResult<Self> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { http, config })
    }

    /// `None`, with a warning, when the data plane is not configured.
    pub fn from_config(config: &E2eConfig) -> E2eResult<Option<Self>> {
        match &config.data_plane {
            Some(data_plane) => Ok(Some(Self::new(data_plane.clone())?)),
            None => {
                warn!("Skipping database cleanup: missing required environment variables");
                warn!("Required: SUPABASE_URL, SUPABASE_KEY, E2E_USERNAME_ID");
                Ok(None)
            }
        }
    }

    /// `{url}/rest/v1/{table}?user_id=eq.{id}`
    pub fn delete_url(&self, table: &str) -> E2eResult<Url> {
        let raw = format!("{}/rest/v1/{}", self.config.url.trim_end_matches('/'), table);
        let mut url = Url::parse(&raw)
            .map_err(|e| E2eError::InvalidConfig(format!("SUPABASE_URL {:?}: {}", self.config.url, e)))?;
        url.query_pairs_mut()
            .append_pair("user_id", &format!("eq.{}", self.config.user_id));
        Ok(url)
    }

    pub async fn delete_user_rows(&self, table: &str) -> E2eResult<()> {
        let url = self.delete_url(table)?;
        let response = self
            .http
            .delete(url)
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .send()
            .await
            .map_err(|e| E2eError::Teardown(format!("deleting {}: {}", table, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(E2eError::Teardown(format!(
                "deleting {} returned {}: {}",
                table, status, body
            )));
        }
        info!("✓ Deleted {} for E2E user", table);
        Ok(())
    }

    pub async fn cleanup(&self) -> E2eResult<()> {
        info!("Cleaning up test data for E2E user {}", self.config.user_id);
        for table in CLEANUP_TABLES {
            self.delete_user_rows(table).await?;
        }
        info!("Test data cleanup completed");
        Ok(())
    }
}

/// Clean up if configured; a missing configuration is not an error.
pub async fn run_teardown(config: &E2eConfig) -> E2eResult<()> {
    match TeardownClient::from_config(config)? {
        Some(client) => client.cleanup().await,
        None => Ok(()),
    }
}
