pub mod backend;
pub mod clipboard;
pub mod config;
pub mod conversation;
pub mod state;

// Re-export main types for convenience
pub use backend::{AnalysisBackend, BackendError, ChatResponse, HttpBackend};
pub use clipboard::to_plain_text;
pub use config::{Config, ConfigError};
pub use conversation::Conversation;
pub use state::{ChatMessage, ChatRole, Phase, CONNECTION_ERROR_TEXT, NO_REPLY_TEXT};
