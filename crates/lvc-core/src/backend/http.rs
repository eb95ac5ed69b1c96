use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{AnalysisBackend, BackendError, ChatRequest, ChatResponse};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Talks to the analysis service over its `/chat` and `/download` endpoints
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client whose requests give up after `timeout`.
    /// Without a timeout a request runs until the server answers or the
    /// connection drops.
    pub fn with_timeout(base_url: &str, timeout: Option<Duration>) -> Result<Self, BackendError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Link to the original report file, with the name percent-encoded
    pub fn download_url(&self, filename: &str) -> Result<String, BackendError> {
        let request = self
            .client
            .get(format!("{}/download", self.base_url))
            .query(&[("filename", filename)])
            .build()?;
        Ok(request.url().to_string())
    }

    /// Fetch the report file behind a report reference
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>, BackendError> {
        let url = self.download_url(filename)?;
        debug!(%url, "downloading report");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status, body });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn chat(&self, message: &str) -> Result<ChatResponse, BackendError> {
        let url = format!("{}/chat", self.base_url);
        debug!(%url, "sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&ChatRequest { message })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }

        // A JSON error body still counts as a reply, missing fields and all
        match serde_json::from_str(&body) {
            Ok(reply) => {
                warn!(%status, "backend answered with an error status");
                Ok(reply)
            }
            Err(_) => Err(BackendError::Status { status, body }),
        }
    }
}
