use super::SpeakerService;
use crate::models::{PhysicalSource, SpeakerStatus, SpeakerStatusEntry};
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

const PLAYER_DATA_PATH: &str = "player:player/data";
const SPEAKER_STATUS_PATH: &str = "settings:/kef/host/speakerStatus";
const PHYSICAL_SOURCE_PATH: &str = "settings:/kef/play/physicalSource";

const STATUS_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for a single speaker.
pub struct KefClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
}

impl KefClient {
    pub fn new(speaker_ip: &str) -> Self {
        Self::new_with_client(speaker_ip, Client::new())
    }

    pub fn new_with_client(speaker_ip: &str, client: Client) -> Self {
        Self {
            client,
            base_url: format!("http://{}", speaker_ip),
        }
    }

    /// Points the client at an arbitrary origin, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn api_get(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<String> {
        let url = format!("{}/api/{}", self.base_url, endpoint);
        tracing::debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .timeout(timeout)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to send request to speaker: {}", e);
                e
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await?;
            tracing::error!("Speaker API error (status {}): {}", status, error_text);
            return Err(Error::Speaker(format!(
                "{} returned status {}: {}",
                endpoint, status, error_text
            )));
        }

        Ok(response.text().await?)
    }

    /// `getData` for one path, returning the first element of the reply array.
    pub async fn get_data(&self, path: &str, timeout: Duration) -> Result<Value> {
        let body = self
            .api_get("getData", &[("path", path), ("roles", "value")], timeout)
            .await?;

        let reply: Value = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to parse getData response: {}\nBody: {}", e, body);
            e
        })?;

        match reply {
            Value::Array(mut items) if !items.is_empty() => Ok(items.swap_remove(0)),
            other => Err(Error::UnexpectedResponse(format!(
                "getData {} did not return a non-empty array: {}",
                path, other
            ))),
        }
    }

    pub async fn set_data(&self, path: &str, value: &str, timeout: Duration) -> Result<()> {
        self.api_get(
            "setData",
            &[("path", path), ("roles", "value"), ("value", value)],
            timeout,
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SpeakerService for KefClient {
    async fn player_data(&self) -> Result<Value> {
        self.get_data(PLAYER_DATA_PATH, REQUEST_TIMEOUT).await
    }

    async fn speaker_status(&self) -> Result<SpeakerStatus> {
        let entry = self.get_data(SPEAKER_STATUS_PATH, STATUS_TIMEOUT).await?;
        let entry: SpeakerStatusEntry = serde_json::from_value(entry).map_err(|e| {
            Error::UnexpectedResponse(format!("speakerStatus missing kefSpeakerStatus: {}", e))
        })?;

        tracing::debug!("Speaker status: {}", entry.kef_speaker_status);
        Ok(SpeakerStatus::parse(&entry.kef_speaker_status))
    }

    async fn set_physical_source(&self, source: PhysicalSource) -> Result<()> {
        let value = source.to_value_json()?;
        self.set_data(PHYSICAL_SOURCE_PATH, &value, REQUEST_TIMEOUT)
            .await?;
        tracing::info!("Physical source set to {}", source.as_str());
        Ok(())
    }
}
