use std::path::{Path, PathBuf};

use lvc_core::{to_plain_text, AnalysisBackend, BackendError, ChatResponse, Conversation, HttpBackend};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::clipboard;
use crate::tui::AppEvent;

/// Ticks a status message stays on screen (about two seconds)
const STATUS_TICKS: u8 = 8;

/// Fallback name when a report reference has no usable file name
const DEFAULT_REPORT_NAME: &str = "relatorio.pdf";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Chat,
    Options,
    Sidebar,
}

/// A short-lived message in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub is_error: bool,
    ticks_left: u8,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,
    pub focus: FocusPane,
    pub show_sidebar: bool,

    // Conversation
    pub conversation: Conversation,
    pub input_cursor: usize, // cursor position in the input buffer, in chars
    pub option_state: ListState,
    /// History index of the assistant message targeted by copy/download
    pub selected_message: Option<usize>,

    // Chat viewport
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_total_lines: u16,
    /// Keep the newest content in view on the next render
    pub follow_bottom: bool,
    /// Bring the selected message into view on the next render
    pub reveal_selected: bool,

    // Animation and feedback
    pub animation_frame: u8,
    pub status: Option<Status>,
    pub downloading: bool,

    // Panel areas for mouse hit-testing (updated during render)
    pub chat_area: Option<Rect>,
    pub options_area: Option<Rect>,
    pub sidebar_area: Option<Rect>,

    // Collaborators
    pub backend: HttpBackend,
    pub download_dir: PathBuf,
    events: UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(backend: HttpBackend, download_dir: PathBuf, events: UnboundedSender<AppEvent>) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,
            focus: FocusPane::Chat,
            show_sidebar: true,

            conversation: Conversation::new(),
            input_cursor: 0,
            option_state: ListState::default(),
            selected_message: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_total_lines: 0,
            follow_bottom: true,
            reveal_selected: false,

            animation_frame: 0,
            status: None,
            downloading: false,

            chat_area: None,
            options_area: None,
            sidebar_area: None,

            backend,
            download_dir,
            events,
        }
    }

    /// Send whatever is in the input box
    pub fn submit_input(&mut self) {
        if let Some(query) = self.conversation.begin_submit(None) {
            self.input_cursor = 0;
            self.spawn_request(query);
        }
    }

    /// Send the pending option at `index`
    pub fn select_option(&mut self, index: usize) {
        if let Some(choice) = self.conversation.begin_select_option(index) {
            self.option_state.select(None);
            self.focus = FocusPane::Chat;
            self.spawn_request(choice);
        }
    }

    pub fn select_highlighted_option(&mut self) {
        if let Some(index) = self.option_state.selected() {
            self.select_option(index);
        }
    }

    fn spawn_request(&mut self, query: String) {
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = backend.chat(&query).await;
            let _ = events.send(AppEvent::Reply(result));
        });

        self.animation_frame = 0;
        self.follow_bottom = true;
    }

    /// Record the backend's answer to the outstanding request
    pub fn on_reply(&mut self, result: Result<ChatResponse, BackendError>) {
        self.conversation.finish_submit(result);

        if self.conversation.pending_options().is_empty() {
            self.option_state.select(None);
            if self.focus == FocusPane::Options {
                self.focus = FocusPane::Chat;
            }
        } else {
            self.option_state.select(Some(0));
            self.focus = FocusPane::Options;
            self.input_mode = InputMode::Normal;
        }

        self.selected_message = self.conversation.history().len().checked_sub(1);
        self.follow_bottom = true;
    }

    /// Clear everything and start over ("new analysis")
    pub fn new_conversation(&mut self) {
        self.conversation.reset();
        self.input_cursor = 0;
        self.option_state.select(None);
        self.selected_message = None;
        self.chat_scroll = 0;
        self.follow_bottom = true;
        self.focus = FocusPane::Chat;
        self.input_mode = InputMode::Editing;
    }

    pub fn toggle_sidebar(&mut self) {
        self.show_sidebar = !self.show_sidebar;
        if !self.show_sidebar && self.focus == FocusPane::Sidebar {
            self.focus = FocusPane::Chat;
        }
    }

    /// Cycle focus through the visible panes
    pub fn next_focus(&mut self) {
        let has_options = !self.conversation.pending_options().is_empty();
        self.focus = match self.focus {
            FocusPane::Chat if has_options => FocusPane::Options,
            FocusPane::Chat | FocusPane::Options if self.show_sidebar => FocusPane::Sidebar,
            _ => FocusPane::Chat,
        };
    }

    fn assistant_indices(&self) -> Vec<usize> {
        self.conversation
            .history()
            .iter()
            .enumerate()
            .filter(|(_, msg)| msg.is_assistant())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn select_next_message(&mut self) {
        let indices = self.assistant_indices();
        self.selected_message = match self.selected_message {
            Some(current) => indices.iter().copied().find(|&i| i > current).or(Some(current)),
            None => indices.first().copied(),
        };
        self.follow_bottom = false;
        self.reveal_selected = true;
    }

    pub fn select_prev_message(&mut self) {
        let indices = self.assistant_indices();
        self.selected_message = match self.selected_message {
            Some(current) => indices.iter().rev().copied().find(|&i| i < current).or(Some(current)),
            None => indices.last().copied(),
        };
        self.follow_bottom = false;
        self.reveal_selected = true;
    }

    pub fn options_nav_down(&mut self) {
        let len = self.conversation.pending_options().len();
        if len > 0 {
            let i = self.option_state.selected().unwrap_or(0);
            self.option_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn options_nav_up(&mut self) {
        let i = self.option_state.selected().unwrap_or(0);
        self.option_state.select(Some(i.saturating_sub(1)));
    }

    pub fn scroll_down(&mut self, lines: u16) {
        let max = self.chat_total_lines.saturating_sub(self.chat_height);
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(max);
        self.follow_bottom = self.chat_scroll >= max;
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
        self.follow_bottom = false;
    }

    /// Copy the selected report, stripped of Markdown, to the system clipboard
    pub fn copy_selected(&mut self) {
        let Some(message) = self
            .selected_message
            .and_then(|i| self.conversation.history().get(i))
        else {
            self.set_status("Selecione uma resposta para copiar", true);
            return;
        };

        let text = to_plain_text(&message.content);
        match clipboard::copy(&text) {
            Ok(tool) => {
                info!(tool, chars = text.chars().count(), "report copied");
                self.set_status("Copiado!", false);
            }
            Err(err) => {
                warn!(error = %err, "clipboard copy failed");
                self.set_status(format!("Falha ao copiar: {}", err), true);
            }
        }
    }

    /// Report reference of the selected message, if it has one
    pub fn selected_report(&self) -> Option<&str> {
        self.selected_message
            .and_then(|i| self.conversation.history().get(i))
            .and_then(|msg| msg.report_ref.as_deref())
    }

    /// Fetch the selected message's original PDF into the download dir
    pub fn download_selected(&mut self) {
        if self.downloading {
            return;
        }
        let Some(report) = self.selected_report().map(str::to_string) else {
            self.set_status("Esta resposta não tem PDF", true);
            return;
        };

        let target = self.download_dir.join(report_file_name(&report));
        let backend = self.backend.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = match backend.download(&report).await {
                Ok(bytes) => {
                    let written = tokio::fs::write(&target, bytes).await;
                    written.map(|_| target).map_err(|e| e.to_string())
                }
                Err(e) => Err(e.to_string()),
            };
            let _ = events.send(AppEvent::Downloaded(result));
        });

        self.downloading = true;
        self.set_status("Baixando PDF...", false);
    }

    pub fn on_downloaded(&mut self, result: Result<PathBuf, String>) {
        self.downloading = false;
        match result {
            Ok(path) => {
                info!(path = %path.display(), "report downloaded");
                self.set_status(format!("PDF salvo em {}", path.display()), false);
            }
            Err(err) => {
                warn!(error = %err, "report download failed");
                self.set_status(format!("Falha no download: {}", err), true);
            }
        }
    }

    pub fn set_status(&mut self, text: impl Into<String>, is_error: bool) {
        self.status = Some(Status {
            text: text.into(),
            is_error,
            ticks_left: STATUS_TICKS,
        });
    }

    /// Advance the spinner and age the status line
    pub fn tick(&mut self) {
        if self.conversation.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 4;
        }

        // Downloads keep their status up until they finish
        if self.downloading {
            return;
        }
        if let Some(status) = &mut self.status {
            status.ticks_left = status.ticks_left.saturating_sub(1);
            if status.ticks_left == 0 {
                self.status = None;
            }
        }
    }
}

/// Final path component of a report reference, so a hostile name can't
/// escape the download directory
fn report_file_name(report: &str) -> PathBuf {
    Path::new(report)
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REPORT_NAME))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use lvc_core::{ChatRole, CONNECTION_ERROR_TEXT};
    use tokio::sync::mpsc;

    pub(crate) fn test_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = App::new(
            HttpBackend::new("http://127.0.0.1:9"),
            PathBuf::from("."),
            tx,
        );
        (app, rx)
    }

    fn arraial_choice() -> ChatResponse {
        ChatResponse::choose("Qual arquivo?", vec!["a.pdf".into(), "b.pdf".into()])
    }

    #[test]
    fn test_report_file_name_strips_directories() {
        assert_eq!(report_file_name("BR-101.pdf"), PathBuf::from("BR-101.pdf"));
        assert_eq!(report_file_name("../../etc/passwd"), PathBuf::from("passwd"));
        assert_eq!(report_file_name(".."), PathBuf::from(DEFAULT_REPORT_NAME));
    }

    #[test]
    fn test_options_reply_moves_focus() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("arraial");
        app.conversation.begin_submit(None);

        app.on_reply(Ok(arraial_choice()));

        assert_eq!(app.focus, FocusPane::Options);
        assert_eq!(app.option_state.selected(), Some(0));
        assert_eq!(app.selected_message, Some(1));

        app.options_nav_down();
        app.options_nav_down();
        assert_eq!(app.option_state.selected(), Some(1));
    }

    #[tokio::test]
    async fn test_selecting_option_sends_it_without_user_turn() {
        let (mut app, mut rx) = test_app();
        app.conversation.set_input("arraial");
        app.conversation.begin_submit(None);
        app.on_reply(Ok(arraial_choice()));

        app.options_nav_down();
        app.select_highlighted_option();
        assert!(app.conversation.is_busy());
        assert_eq!(app.focus, FocusPane::Chat);

        // Port 9 refuses connections, so the reply is a transport error
        let Some(AppEvent::Reply(result)) = rx.recv().await else {
            panic!("expected a reply event");
        };
        app.on_reply(result);

        let roles: Vec<ChatRole> = app.conversation.history().iter().map(|m| m.role).collect();
        assert_eq!(roles, [ChatRole::User, ChatRole::Assistant, ChatRole::Assistant]);
        assert_eq!(app.conversation.history()[2].content, CONNECTION_ERROR_TEXT);
        assert!(!app.conversation.is_busy());
    }

    #[test]
    fn test_message_selection_skips_user_turns() {
        let (mut app, _rx) = test_app();
        for query in ["a", "b"] {
            app.conversation.set_input(query);
            app.conversation.begin_submit(None);
            app.on_reply(Ok(ChatResponse::answer("ok", None)));
        }
        assert_eq!(app.selected_message, Some(3));

        app.select_prev_message();
        assert_eq!(app.selected_message, Some(1));
        app.select_prev_message();
        assert_eq!(app.selected_message, Some(1));
        app.select_next_message();
        assert_eq!(app.selected_message, Some(3));
    }

    #[test]
    fn test_new_conversation_clears_view() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("arraial");
        app.conversation.begin_submit(None);
        app.on_reply(Ok(arraial_choice()));

        app.new_conversation();

        assert!(!app.conversation.has_started());
        assert_eq!(app.option_state.selected(), None);
        assert_eq!(app.selected_message, None);
        assert_eq!(app.focus, FocusPane::Chat);
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[test]
    fn test_download_needs_report() {
        let (mut app, _rx) = test_app();
        app.conversation.set_input("x");
        app.conversation.begin_submit(None);
        app.on_reply(Ok(ChatResponse::answer("ok", None)));

        app.download_selected();

        assert!(!app.downloading);
        assert!(app.status.as_ref().unwrap().is_error);
    }

    #[test]
    fn test_status_expires() {
        let (mut app, _rx) = test_app();
        app.set_status("Copiado!", false);

        for _ in 0..STATUS_TICKS - 1 {
            app.tick();
        }
        assert!(app.status.is_some());
        app.tick();
        assert!(app.status.is_none());
    }

    #[test]
    fn test_focus_cycle() {
        let (mut app, _rx) = test_app();
        app.next_focus();
        assert_eq!(app.focus, FocusPane::Sidebar);
        app.next_focus();
        assert_eq!(app.focus, FocusPane::Chat);

        app.toggle_sidebar();
        app.next_focus();
        assert_eq!(app.focus, FocusPane::Chat);
    }
}
