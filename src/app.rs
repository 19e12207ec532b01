use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::chat::{ChatMessage, ChatRole, ChatSession, StaticIdentity};
use crate::config::Config;
use crate::error::TransportError;
use crate::picker::FilePicker;
use crate::shell::{ViewState, Viewport};
use crate::transport::TransportClient;
use crate::tui::AppEvent;
use crate::upload::{SelectedFile, UploadSession, UploadTicket};

/// One row of the conversation panel after wrapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationRow {
    Label(ChatRole),
    Text(String),
    Blank,
    /// Second line of the typing indicator; the dots are drawn at render time.
    Typing,
}

/// Lays the log out at `width` columns: a role line, the wrapped text and a
/// blank separator per message, plus two rows for the typing indicator.
pub fn conversation_rows(messages: &[ChatMessage], pending: bool, width: u16) -> Vec<ConversationRow> {
    let mut rows = Vec::new();
    for msg in messages {
        rows.push(ConversationRow::Label(msg.role));
        // Plain text only; each newline starts a new row
        for line in msg.text.split('\n') {
            rows.extend(
                wrap_text_to_width(line, width as usize)
                    .into_iter()
                    .map(ConversationRow::Text),
            );
        }
        rows.push(ConversationRow::Blank);
    }
    if pending {
        rows.push(ConversationRow::Label(ChatRole::Assistant));
        rows.push(ConversationRow::Typing);
    }
    rows
}

/// Wraps one line of text at word boundaries so that no row is wider than
/// `width` terminal cells. Words wider than a row are split between glyphs.
pub fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();

        if current_width > 0 && current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
            continue;
        }

        if current_width > 0 {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        for c in word.chars() {
            let glyph_width = c.width().unwrap_or(0);
            if current_width > 0 && current_width + glyph_width > width {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += glyph_width;
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Scroll position of the conversation panel.
///
/// Whenever the log changes (or the typing indicator appears or goes away)
/// the view jumps to the bottom so the newest message is visible.
#[derive(Debug, Default)]
pub struct ConversationView {
    pub scroll: u16,
    height: u16,
    total_rows: usize,
    seen_revision: Option<u64>,
    seen_pending: bool,
}

impl ConversationView {
    /// Wraps the log for a `width` x `height` panel, follows new messages and
    /// returns the rows to draw. `scroll` indexes into the returned rows.
    pub fn layout(&mut self, chat: &ChatSession, width: u16, height: u16) -> Vec<ConversationRow> {
        let rows = conversation_rows(chat.messages(), chat.is_pending(), width);
        self.height = height;
        self.total_rows = rows.len();

        let revision = chat.revision();
        let pending = chat.is_pending();
        if self.seen_revision != Some(revision) || self.seen_pending != pending {
            self.seen_revision = Some(revision);
            self.seen_pending = pending;
            self.scroll_to_bottom();
        } else {
            // A narrower panel can leave the old offset past the end
            self.scroll = self.scroll.min(self.max_scroll());
        }
        rows
    }

    pub fn scroll_to_bottom(&mut self) {
        self.scroll = self.max_scroll();
    }

    pub fn page_up(&mut self) {
        self.scroll = self.scroll.saturating_sub(self.page());
    }

    pub fn page_down(&mut self) {
        self.scroll = self.scroll.saturating_add(self.page()).min(self.max_scroll());
    }

    fn page(&self) -> u16 {
        (self.height / 2).max(1)
    }

    fn max_scroll(&self) -> u16 {
        let max = self.total_rows.saturating_sub(self.height.max(1) as usize);
        max.min(u16::MAX as usize) as u16
    }
}

pub struct App {
    pub should_quit: bool,
    pub shell: ViewState,
    pub chat: ChatSession,
    pub upload: UploadSession,
    pub picker: Option<FilePicker>,
    pub conversation: ConversationView,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    pub config: Config,
    pub picker_dir: PathBuf,
    transport: TransportClient,
    events: mpsc::UnboundedSender<AppEvent>,
}

impl App {
    pub fn new(config: Config, events: mpsc::UnboundedSender<AppEvent>, viewport: Viewport) -> Self {
        let transport = TransportClient::new(&config.api_base_url);
        let identity = Arc::new(StaticIdentity::new(config.user_id.clone()));
        let picker_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        Self {
            should_quit: false,
            shell: ViewState::mount(viewport),
            chat: ChatSession::new(identity),
            upload: UploadSession::new(),
            picker: None,
            conversation: ConversationView::default(),
            animation_frame: 0,
            config,
            picker_dir,
            transport,
            events,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat

    pub fn submit_chat(&mut self) {
        let Some(request) = self.chat.send() else {
            return;
        };

        // Spawn background task; the outcome comes back through the event loop
        let transport = self.transport.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = transport.chat(&request).await;
            let _ = events.send(AppEvent::ChatSettled(outcome));
        });
    }

    pub fn settle_chat(&mut self, outcome: Result<String, TransportError>) {
        self.chat.settle(outcome);
    }

    // Upload

    pub fn open_picker(&mut self) {
        match FilePicker::open(&self.picker_dir) {
            Ok(picker) => self.picker = Some(picker),
            Err(err) => warn!(dir = %self.picker_dir.display(), error = %err, "could not list directory"),
        }
    }

    /// Dismissing the picker is an empty selection: whatever was chosen
    /// before is cleared.
    pub fn cancel_picker(&mut self) {
        self.picker = None;
        self.upload.select_file(std::iter::empty());
    }

    /// Selects the highlighted picker entry and closes the picker.
    pub fn confirm_picker(&mut self) {
        let Some(picker) = self.picker.take() else {
            return;
        };
        match picker.selected() {
            Some(path) => match SelectedFile::read(path) {
                Ok(file) => self.upload.select_file([file]),
                Err(err) => self.upload.reject_selection(path, &err),
            },
            None => self.upload.select_file(std::iter::empty()),
        }
    }

    /// Files dropped onto the terminal. Only the first path is used.
    pub fn drop_paths(&mut self, paths: &[PathBuf]) {
        let Some(first) = paths.first() else {
            return;
        };
        if paths.len() > 1 {
            info!(ignored = paths.len() - 1, "multiple files dropped; keeping the first");
        }
        self.picker = None;
        match SelectedFile::read(first) {
            Ok(file) => self.upload.drop_file([file]),
            Err(err) => self.upload.reject_selection(first, &err),
        }
    }

    pub fn start_upload(&mut self) {
        let Some(request) = self.upload.begin_upload() else {
            return;
        };

        let transport = self.transport.clone();
        let events = self.events.clone();
        let ticket = request.ticket;
        tokio::spawn(async move {
            let progress_events = events.clone();
            let outcome = transport
                .upload(&request.file_name, request.bytes, move |loaded, total| {
                    let _ = progress_events.send(AppEvent::UploadProgress {
                        ticket,
                        loaded,
                        total,
                    });
                })
                .await;
            let _ = events.send(AppEvent::UploadSettled { ticket, outcome });
        });
    }

    pub fn record_upload_progress(&mut self, ticket: UploadTicket, loaded: u64, total: u64) {
        self.upload.record_progress(ticket, loaded, Some(total));
    }

    pub fn settle_upload(&mut self, ticket: UploadTicket, outcome: Result<String, TransportError>) {
        self.upload.settle(ticket, outcome);
    }

    // Dashboard

    /// Opens the dashboard in the system browser. Best effort.
    pub fn open_dashboard(&self) {
        self.open_dashboard_with(|url| open::that(url));
    }

    fn open_dashboard_with<F>(&self, opener: F)
    where
        F: FnOnce(&str) -> io::Result<()>,
    {
        let url = self.config.dashboard_url.as_str();
        match opener(url) {
            Ok(()) => info!(url, "opened dashboard in browser"),
            Err(err) => warn!(url, error = %err, "could not open dashboard"),
        }
    }

    pub fn set_picker_dir(&mut self, dir: &Path) {
        self.picker_dir = dir.to_path_buf();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::{ChatRole, APOLOGY};
    use crate::upload::{StatusTone, UploadStatus};

    fn offline_app() -> (App, mpsc::UnboundedReceiver<AppEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut config = Config::new();
        config.api_base_url = "http://127.0.0.1:1".to_string();
        (App::new(config, tx, Viewport::new(1280, 800)), rx)
    }

    #[tokio::test]
    async fn test_chat_transport_failure_becomes_apology() {
        let (mut app, mut rx) = offline_app();
        app.chat.set_draft("Check engine light?");
        app.submit_chat();
        assert!(app.chat.is_pending());

        // A second submit while pending issues nothing.
        app.chat.set_draft("again?");
        app.submit_chat();
        assert_eq!(app.chat.messages().len(), 2);

        match rx.recv().await {
            Some(AppEvent::ChatSettled(outcome)) => app.settle_chat(outcome),
            other => panic!("unexpected event: {:?}", other),
        }

        let messages = app.chat.messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].text, "Check engine light?");
        assert_eq!(messages[2].role, ChatRole::Assistant);
        assert_eq!(messages[2].text, APOLOGY);
        assert!(!app.chat.is_pending());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_upload_transport_failure_reports_reason() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("readings.csv");
        std::fs::write(&path, "rpm\n900\n").unwrap();

        let (mut app, mut rx) = offline_app();
        app.drop_paths(&[path]);
        assert_eq!(app.upload.selected().unwrap().name, "readings.csv");

        app.start_upload();
        assert!(app.upload.is_uploading());

        loop {
            match rx.recv().await {
                Some(AppEvent::UploadProgress { ticket, loaded, total }) => {
                    app.record_upload_progress(ticket, loaded, total)
                }
                Some(AppEvent::UploadSettled { ticket, outcome }) => {
                    app.settle_upload(ticket, outcome);
                    break;
                }
                other => panic!("unexpected event: {:?}", other),
            }
        }

        assert!(!app.upload.is_uploading());
        assert_eq!(app.upload.status().tone(), StatusTone::Negative);
        assert!(app.upload.status().message().starts_with("❌ Upload failed: Network error"));
    }

    #[tokio::test]
    async fn test_upload_without_file_issues_nothing() {
        let (mut app, mut rx) = offline_app();
        app.start_upload();
        assert_eq!(app.upload.status(), &UploadStatus::MissingFile);
        assert_eq!(app.upload.progress(), 0);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_of_unreadable_path_is_reported() {
        let (mut app, _rx) = offline_app();
        app.drop_paths(&[PathBuf::from("/definitely/not/here.csv")]);
        assert!(app.upload.selected().is_none());
        assert_eq!(app.upload.status().tone(), StatusTone::Negative);
    }

    #[test]
    fn test_drop_keeps_only_first_path() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.csv");
        let second = dir.path().join("second.csv");
        std::fs::write(&first, "a").unwrap();
        std::fs::write(&second, "b").unwrap();

        let (mut app, _rx) = offline_app();
        app.drop_paths(&[first, second]);
        assert_eq!(app.upload.selected().unwrap().name, "first.csv");
    }

    #[test]
    fn test_picker_selection_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("log.csv"), "speed\n42\n").unwrap();

        let (mut app, _rx) = offline_app();
        app.set_picker_dir(dir.path());
        app.open_picker();
        assert!(app.picker.is_some());
        app.confirm_picker();

        assert!(app.picker.is_none());
        let selected = app.upload.selected().unwrap();
        assert_eq!(selected.name, "log.csv");
        assert_eq!(selected.bytes, b"speed\n42\n");
        assert_eq!(app.upload.progress(), 0);
        assert_eq!(app.upload.status(), &UploadStatus::Idle);
    }

    #[test]
    fn test_cancelled_picker_clears_selection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.csv");
        std::fs::write(&path, "a").unwrap();

        let (mut app, _rx) = offline_app();
        app.drop_paths(&[path]);
        assert!(app.upload.selected().is_some());

        app.set_picker_dir(dir.path());
        app.open_picker();
        app.cancel_picker();
        assert!(app.picker.is_none());
        assert!(app.upload.selected().is_none());
        assert_eq!(app.upload.status(), &UploadStatus::Idle);
    }

    #[test]
    fn test_conversation_follows_new_messages() {
        let (mut app, _rx) = offline_app();
        // greeting: role line + 5 wrapped rows + blank = 7
        let rows = app.conversation.layout(&app.chat, 10, 4);
        assert_eq!(rows.len(), 7);
        assert_eq!(app.conversation.scroll, 3);

        app.conversation.page_up();
        app.conversation.page_up();
        assert_eq!(app.conversation.scroll, 0);
        app.conversation.layout(&app.chat, 10, 4);
        assert_eq!(app.conversation.scroll, 0);

        app.chat.set_draft("line one\nline two");
        app.chat.send();
        // + user (1 + 2 + 1) + typing indicator (2) = 13
        let rows = app.conversation.layout(&app.chat, 10, 4);
        assert_eq!(rows.len(), 13);
        assert_eq!(app.conversation.scroll, 9);
        assert_eq!(rows[rows.len() - 1], ConversationRow::Typing);

        app.conversation.page_down();
        assert_eq!(app.conversation.scroll, 9);
    }

    #[test]
    fn test_rows_split_on_newlines() {
        let messages = vec![ChatMessage {
            role: ChatRole::Assistant,
            text: "a\n\nb".to_string(),
        }];
        assert_eq!(conversation_rows(&messages, false, 20).len(), 5);
        assert_eq!(conversation_rows(&messages, true, 20).len(), 7);
        assert_eq!(
            conversation_rows(&messages, false, 20)[2],
            ConversationRow::Text(String::new())
        );
    }

    #[test]
    fn test_wrap_breaks_at_words_and_counts_cells() {
        assert_eq!(
            wrap_text_to_width("Hello! Ask me anything about your car. 🚗", 10),
            vec!["Hello! Ask", "me", "anything", "about your", "car. 🚗"]
        );
        // The car glyph is two cells wide
        assert_eq!(wrap_text_to_width("car. 🚗", 6), vec!["car.", "🚗"]);
        assert_eq!(wrap_text_to_width("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert_eq!(wrap_text_to_width("", 8), vec![String::new()]);
    }

    #[test]
    fn test_dashboard_opens_configured_address() {
        let (app, _rx) = offline_app();
        let mut opened = None;
        app.open_dashboard_with(|url| {
            opened = Some(url.to_string());
            Ok(())
        });
        assert_eq!(opened.as_deref(), Some(crate::config::DEFAULT_DASHBOARD_URL));

        // A missing browser is logged, not fatal
        app.open_dashboard_with(|_| Err(io::Error::new(io::ErrorKind::NotFound, "no browser")));
    }

    #[test]
    fn test_tick_animates_only_while_pending() {
        let (mut app, _rx) = offline_app();
        app.tick_animation();
        assert_eq!(app.animation_frame, 0);
    }
}
