//! Contract with the analysis backend

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpBackend;

/// Body of a `POST /chat` request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

/// Body of a `/chat` response.
///
/// The backend answers either with a disambiguation prompt (`reply` plus
/// `options`) or with a terminal answer (`reply` plus an optional
/// `pdf_name`). Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub reply: Option<String>,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub pdf_name: Option<String>,
}

impl ChatResponse {
    pub fn answer(reply: impl Into<String>, pdf_name: Option<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            options: None,
            pdf_name,
        }
    }

    pub fn choose(reply: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            reply: Some(reply.into()),
            options: Some(options),
            pdf_name: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("request to analysis backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("analysis backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("could not decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything that can answer a chat query the way the analysis service does
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn chat(&self, message: &str) -> Result<ChatResponse, BackendError>;
}
