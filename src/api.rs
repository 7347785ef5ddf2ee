use crate::model::Snapshot;
use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

const USER_AGENT: &str = concat!("armada/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the aggregation backend's workload snapshot endpoint.
#[derive(Debug, Clone)]
pub struct SnapshotClient {
    endpoint: String,
    client: Client,
}

impl SnapshotClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            endpoint: endpoint.into(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn fetch_snapshot(&self) -> Result<Snapshot> {
        let snapshot = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .with_context(|| format!("snapshot request to {} failed", self.endpoint))?
            .error_for_status()
            .context("snapshot endpoint returned an error status")?
            .json::<Snapshot>()
            .await
            .context("failed to parse snapshot payload")?;

        Ok(snapshot)
    }
}
