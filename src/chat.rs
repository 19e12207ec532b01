//! Conversation state machine.
//!
//! The session owns the message log, the draft being typed and the pending
//! flag of the single in-flight request. It never performs I/O itself:
//! [`ChatSession::send`] hands back the request to issue and the caller feeds
//! the outcome into [`ChatSession::settle`] once the call completes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::TransportError;
use crate::transport::ChatRequest;

pub const GREETING: &str = "Hello! Ask me anything about your car. 🚗";
pub const APOLOGY: &str = "⚠️ Sorry, something went wrong while talking to the AI.";

/// A chat message in the conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatMessage {
    fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// Supplies the identifier every chat request is attributed to.
pub trait IdentityProvider: Send + Sync {
    fn user_id(&self) -> String;
}

/// Identity fixed at startup (from configuration).
#[derive(Debug, Clone)]
pub struct StaticIdentity {
    user_id: String,
}

impl StaticIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

impl IdentityProvider for StaticIdentity {
    fn user_id(&self) -> String {
        self.user_id.clone()
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct ChatSession {
    messages: Vec<ChatMessage>,
    draft: String,
    cursor: usize, // cursor position in draft, in chars
    pending: bool,
    revision: u64,
    identity: Arc<dyn IdentityProvider>,
}

impl ChatSession {
    pub fn new(identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(GREETING)],
            draft: String::new(),
            cursor: 0,
            pending: false,
            revision: 0,
            identity,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Bumped on every append to the log.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
        self.revision += 1;
    }

    /// Submits the draft.
    ///
    /// Returns the request to issue, or `None` when the draft is blank or a
    /// request is already outstanding. In the `None` case nothing changes.
    pub fn send(&mut self) -> Option<ChatRequest> {
        if self.pending || self.draft.trim().is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.draft);
        self.cursor = 0;
        self.push(ChatMessage::user(text.clone()));
        self.pending = true;

        info!(chars = text.chars().count(), "chat request issued");
        Some(ChatRequest {
            message: text,
            user_id: self.identity.user_id(),
        })
    }

    /// Records the outcome of the outstanding request and returns to idle.
    /// Failures become the apology message; nothing is propagated.
    pub fn settle(&mut self, outcome: Result<String, TransportError>) {
        if !self.pending {
            warn!("chat outcome arrived with no request outstanding; ignored");
            return;
        }

        match outcome {
            Ok(response) => {
                info!("chat response received");
                self.push(ChatMessage::assistant(response));
            }
            Err(err) => {
                warn!(error = %err, "chat request failed");
                self.push(ChatMessage::assistant(APOLOGY));
            }
        }
        self.pending = false;
    }

    // Draft editing

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
        self.cursor = self.draft.chars().count();
    }

    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.draft, self.cursor);
        self.draft.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn insert_str(&mut self, text: &str) {
        for c in text.chars() {
            self.insert_char(c);
        }
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.draft.chars().count() {
            let byte_pos = char_to_byte_index(&self.draft, self.cursor);
            self.draft.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.draft.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.draft.chars().count();
    }
}
