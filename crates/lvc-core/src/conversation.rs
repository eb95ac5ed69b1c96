//! The conversation controller.
//!
//! A submission cycle runs in two halves so that a front end can keep drawing
//! while the request is in flight:
//!
//! 1. [`Conversation::begin_submit`] validates the query, records the user's
//!    turn, clears the input and any pending options, and marks the
//!    conversation busy. It hands back the text to send.
//! 2. [`Conversation::finish_submit`] records exactly one assistant turn for
//!    whatever the backend produced and leaves the busy state.
//!
//! [`Conversation::submit`] runs both halves around a single backend call.

use tracing::{debug, info, warn};

use crate::backend::{AnalysisBackend, BackendError, ChatResponse};
use crate::state::{ChatMessage, Phase, CONNECTION_ERROR_TEXT, NO_REPLY_TEXT};

/// Empty strings from the backend count as absent
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[derive(Debug, Default)]
pub struct Conversation {
    history: Vec<ChatMessage>,
    phase: Phase,
    input: String,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn pending_options(&self) -> &[String] {
        self.phase.options()
    }

    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    pub fn has_started(&self) -> bool {
        !self.history.is_empty()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Start a submission cycle.
    ///
    /// With `choice` set the text is a pick from the pending options and no
    /// user turn is recorded; otherwise the input buffer is the query.
    /// Returns `None` without touching anything when the query is blank or a
    /// request is already outstanding.
    pub fn begin_submit(&mut self, choice: Option<&str>) -> Option<String> {
        if self.is_busy() {
            debug!("submission ignored, request already outstanding");
            return None;
        }

        let query = choice.unwrap_or(&self.input).to_string();
        if query.trim().is_empty() {
            return None;
        }

        if choice.is_none() {
            self.history.push(ChatMessage::user(query.clone()));
        }

        self.input.clear();
        self.phase = Phase::Waiting;
        info!(query = %query, choice = choice.is_some(), "submitting query");

        Some(query)
    }

    /// Close the cycle opened by [`begin_submit`](Self::begin_submit).
    pub fn finish_submit(&mut self, result: Result<ChatResponse, BackendError>) {
        if !self.is_busy() {
            debug!("reply arrived with no request outstanding");
        }

        let (message, phase) = match result {
            Ok(ChatResponse {
                reply,
                options: Some(options),
                ..
            }) => {
                info!(count = options.len(), "backend asked for disambiguation");
                let prompt = non_empty(reply).unwrap_or_else(|| NO_REPLY_TEXT.to_string());
                let phase = if options.is_empty() {
                    Phase::Idle
                } else {
                    Phase::Choosing(options)
                };
                (ChatMessage::assistant(prompt, None), phase)
            }
            Ok(ChatResponse {
                reply, pdf_name, ..
            }) => {
                let pdf_name = non_empty(pdf_name);
                info!(report = ?pdf_name, "backend answered");
                let content = non_empty(reply).unwrap_or_else(|| NO_REPLY_TEXT.to_string());
                (ChatMessage::assistant(content, pdf_name), Phase::Idle)
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                (ChatMessage::assistant(CONNECTION_ERROR_TEXT, None), Phase::Idle)
            }
        };

        self.history.push(message);
        self.phase = phase;
    }

    /// Run a whole submission cycle against `backend`.
    /// Returns whether a request was actually sent.
    pub async fn submit(&mut self, backend: &dyn AnalysisBackend, choice: Option<&str>) -> bool {
        let Some(query) = self.begin_submit(choice) else {
            return false;
        };

        let result = backend.chat(&query).await;
        self.finish_submit(result);
        true
    }

    /// Start a cycle for the pending option at `index`
    pub fn begin_select_option(&mut self, index: usize) -> Option<String> {
        let choice = self.pending_options().get(index)?.clone();
        self.begin_submit(Some(&choice))
    }

    /// Pick one of the pending options and send it
    pub async fn select_option(&mut self, backend: &dyn AnalysisBackend, index: usize) -> bool {
        let Some(choice) = self.pending_options().get(index).cloned() else {
            return false;
        };
        self.submit(backend, Some(&choice)).await
    }

    /// Start a new conversation. An outstanding request stays outstanding.
    pub fn reset(&mut self) {
        self.history.clear();
        self.input.clear();
        if !self.is_busy() {
            self.phase = Phase::Idle;
        }
        info!("conversation reset");
    }
}
