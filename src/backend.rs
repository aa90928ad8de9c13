//! Backend transport
//!
//! One trait seam between the orchestrator and the plant pot backend so the
//! interaction cycle can be exercised without a network.

use async_trait::async_trait;
use url::Url;

use crate::audio::WavBlob;
use crate::protocol::{ConversationRecord, QueryEnvelope, QueryInput, ReplyEnvelope};
use crate::{Error, Result};

/// Remote conversational backend
#[async_trait]
pub trait Backend: Send + Sync {
    /// Submit a query envelope and receive the initial reply
    async fn submit(&self, query: &QueryEnvelope) -> Result<ReplyEnvelope>;

    /// Fetch the conversation history for a device, freshest data included
    async fn history(&self, device_id: &str) -> Result<Vec<ConversationRecord>>;

    /// Update the configured plant species; fire-and-forget
    async fn update_species(&self, device_id: &str, species: &str) -> Result<()>;
}

/// HTTP implementation against the plant pot backend
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpBackend {
    /// Create a backend client for `base_url`
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// Base URL this client talks to
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::Config(format!("bad backend url: {e}")))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn submit(&self, query: &QueryEnvelope) -> Result<ReplyEnvelope> {
        let url = self.endpoint("/v1/ingest")?;

        let mut request = self.client.post(url).query(&[
            ("device_id", query.device_id.as_str()),
            ("event", query.event.as_str()),
        ]);
        request = request.query(&[
            ("temperature", query.sensors.temperature),
            ("moisture", query.sensors.moisture),
            ("light", query.sensors.light),
        ]);

        match &query.input {
            Some(QueryInput::Audio(blob)) => {
                tracing::debug!(
                    audio_bytes = blob.len(),
                    event = query.event.as_str(),
                    "submitting voice query"
                );
                let form = reqwest::multipart::Form::new().part(
                    "audio",
                    reqwest::multipart::Part::bytes(blob.as_bytes().to_vec())
                        .file_name("simulation.wav")
                        .mime_str(WavBlob::MIME_TYPE)
                        .map_err(|e| Error::Audio(e.to_string()))?,
                );
                request = request.multipart(form);
            }
            Some(QueryInput::Text(text)) => {
                tracing::debug!(query = %text, "submitting text query");
                request = request.query(&[("user_query", text.as_str())]);
            }
            None => {
                tracing::debug!(event = query.event.as_str(), "submitting sensor-only event");
            }
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "ingest failed");
            return Err(Error::Backend(format!("ingest failed with {status}: {body}")));
        }

        let reply: ReplyEnvelope = response.json().await?;
        tracing::info!(
            conversation_id = reply.id,
            mood = %reply.display.mood,
            "reply received"
        );
        Ok(reply)
    }

    async fn history(&self, device_id: &str) -> Result<Vec<ConversationRecord>> {
        let url = self.endpoint("/v1/history")?;

        let response = self
            .client
            .get(url)
            .query(&[("device_id", device_id)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("history failed with {status}")));
        }

        let records: Vec<ConversationRecord> = response.json().await?;
        tracing::debug!(records = records.len(), "history fetched");
        Ok(records)
    }

    async fn update_species(&self, device_id: &str, species: &str) -> Result<()> {
        let url = self.endpoint(&format!("/v1/device/{device_id}/species"))?;

        let response = self
            .client
            .post(url)
            .query(&[("species", species)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Backend(format!("species update failed with {status}")));
        }

        tracing::info!(device_id, species, "species updated");
        Ok(())
    }
}
