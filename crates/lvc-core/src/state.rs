//! UI-agnostic conversation types
//!
//! These structures are shared by every front end and don't depend on any
//! specific UI framework.

use serde::{Deserialize, Serialize};

/// Shown when the backend could not be reached or answered with garbage.
pub const CONNECTION_ERROR_TEXT: &str = "❌ Erro de conexão.";

/// Shown when a terminal answer arrives without reply text.
pub const NO_REPLY_TEXT: &str = "Erro: Sem resposta.";

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    /// File name of the downloadable report attached to a terminal answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_ref: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            report_ref: None,
        }
    }

    pub fn assistant(content: impl Into<String>, report_ref: Option<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            report_ref,
        }
    }

    pub fn is_assistant(&self) -> bool {
        self.role == ChatRole::Assistant
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Where the conversation stands between submissions
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    /// Ready for a free-text query
    #[default]
    Idle,
    /// One request is outstanding
    Waiting,
    /// The last assistant turn asked the user to pick one of these
    Choosing(Vec<String>),
}

impl Phase {
    pub fn is_busy(&self) -> bool {
        matches!(self, Phase::Waiting)
    }

    pub fn options(&self) -> &[String] {
        match self {
            Phase::Choosing(options) => options,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatMessage::user("oi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"oi"}"#);
    }

    #[test]
    fn test_phase_options_only_when_choosing() {
        assert!(Phase::Idle.options().is_empty());
        assert!(Phase::Waiting.options().is_empty());
        let phase = Phase::Choosing(vec!["a.pdf".into()]);
        assert_eq!(phase.options(), ["a.pdf".to_string()]);
        assert!(!phase.is_busy());
        assert!(Phase::Waiting.is_busy());
    }
}
