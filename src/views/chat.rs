//! Research assistant conversation.
//!
//! A model reply moves through pending-send → streaming → complete, or ends in
//! failed. Only one reply may be in flight; while it is, sends are refused.

use crate::model::{ChatMessage, Sender};
use crate::service::{ChatEvent, ChatSession};
use super::TextInput;

pub const GREETING: &str = "Hello! I am your UFO research assistant. How can I help you analyze data or draft requests today?";
pub const ERROR_REPLY: &str = "Sorry, I encountered an error. Please try again.";

/// What the shell needs to run one send in the background
pub struct PendingSend {
    pub session: ChatSession,
    pub message: String,
}

pub struct ChatView {
    pub messages: Vec<ChatMessage>,
    pub input: TextInput,
    pub scroll: u16,
    session: Option<ChatSession>,
    /// Id of the model placeholder being streamed into
    in_flight: Option<String>,
    next_id: u64,
}

impl ChatView {
    pub fn new(session: Option<ChatSession>) -> Self {
        Self {
            messages: vec![ChatMessage::model("init", GREETING)],
            input: TextInput::default(),
            scroll: 0,
            session,
            in_flight: None,
            next_id: 0,
        }
    }

    pub fn set_session(&mut self, session: Option<ChatSession>) {
        self.session = session;
    }

    #[cfg(test)]
    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("msg-{}", self.next_id)
    }

    /// Start a send from the current input.
    ///
    /// Refused (message list untouched) for blank input, while another reply
    /// is in flight, or without a session.
    pub fn begin_send(&mut self) -> Option<PendingSend> {
        if self.input.is_blank() || self.in_flight.is_some() {
            return None;
        }
        let session = self.session.clone()?;

        let message = self.input.take();
        let user_id = self.allocate_id();
        self.messages.push(ChatMessage::user(user_id, message.clone()));

        let model_id = self.allocate_id();
        self.messages.push(ChatMessage {
            is_streaming: true,
            ..ChatMessage::model(model_id.clone(), "")
        });
        self.in_flight = Some(model_id);

        Some(PendingSend { session, message })
    }

    pub fn apply(&mut self, event: ChatEvent) {
        let Some(id) = self.in_flight.clone() else {
            return;
        };

        match event {
            ChatEvent::Fragment(text) => {
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
                    msg.text.push_str(&text);
                }
            }
            ChatEvent::Completed => {
                if let Some(msg) = self.messages.iter_mut().find(|m| m.id == id) {
                    msg.is_streaming = false;
                }
                self.in_flight = None;
            }
            ChatEvent::Failed(_) => {
                // Drop the partial reply; the error message takes its place
                self.messages.retain(|m| m.id != id);
                let error_id = self.allocate_id();
                self.messages.push(ChatMessage::model(error_id, ERROR_REPLY));
                self.in_flight = None;
            }
        }
    }

    #[cfg(test)]
    pub fn last_model_message(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.sender == Sender::Model)
    }

    /// Total rendered lines for a given wrap width, used to keep the latest
    /// reply in view while it streams
    pub fn rendered_line_count(&self, wrap_width: usize) -> u16 {
        let wrap_width = wrap_width.max(1);
        let mut total_lines: usize = 0;

        for msg in &self.messages {
            total_lines = total_lines.saturating_add(1); // Sender line ("You:" or "AI:")
            for line in msg.text.lines() {
                let char_count = line.chars().count();
                total_lines = total_lines.saturating_add(char_count / wrap_width + 1);
            }
            if msg.text.is_empty() {
                total_lines = total_lines.saturating_add(1); // Cursor / "Thinking..." line
            }
            total_lines = total_lines.saturating_add(1); // Blank line after message
        }
        u16::try_from(total_lines).unwrap_or(u16::MAX)
    }

    pub fn scroll_to_bottom(&mut self, visible_height: u16, wrap_width: usize) {
        let total_lines = self.rendered_line_count(wrap_width);
        self.scroll = total_lines.saturating_sub(visible_height);
    }
}
