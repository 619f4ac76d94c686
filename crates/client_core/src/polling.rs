use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use serde::de::DeserializeOwned;
use shared::protocol::{ActiveStatus, FullStatusResponse, RunStatistics};
use tracing::debug;
use url::Url;

use crate::{
    config::{Endpoints, SyncConfig},
    error::PollError,
};

#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn poll_active(&self) -> Result<ActiveStatus, PollError>;
    async fn fetch_full(&self) -> Result<RunStatistics, PollError>;
}

pub struct PollingClient {
    http: Client,
    endpoints: Endpoints,
}

impl PollingClient {
    pub fn new(endpoints: Endpoints, request_timeout: Duration) -> reqwest::Result<Self> {
        let http = Client::builder().timeout(request_timeout).build()?;
        Ok(Self { http, endpoints })
    }

    pub fn from_config(config: &SyncConfig) -> reqwest::Result<Self> {
        Self::new(config.endpoints.clone(), config.request_timeout)
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, PollError> {
        let res = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            return Err(PollError::Network(format!("{url} responded with {status}")));
        }
        let body = res.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl StatusSource for PollingClient {
    async fn poll_active(&self) -> Result<ActiveStatus, PollError> {
        let url = &self.endpoints.active_status;
        debug!(%url, "poll: requesting active status");
        let status: ActiveStatus = self.get_json(url).await?;
        if !status.current_speed.is_finite() || status.current_speed < 0.0 {
            return Err(PollError::Protocol(format!(
                "invalid currentSpeed {}",
                status.current_speed
            )));
        }
        Ok(status)
    }

    async fn fetch_full(&self) -> Result<RunStatistics, PollError> {
        let url = &self.endpoints.full_status;
        debug!(%url, "poll: requesting full statistics");
        let response: FullStatusResponse = self.get_json(url).await?;
        if response.data.sequence_length == 0 {
            return Err(PollError::Protocol("sequenceLength must be positive".into()));
        }
        Ok(response.into())
    }
}

#[cfg(test)]
#[path = "tests/polling_tests.rs"]
mod tests;
