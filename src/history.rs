//! Conversation history with an explicit retention policy.
//!
//! A [`History`] is an append-only, ordered list of [`Message`]s for one
//! chat surface. With [`Retention::Unbounded`] it grows for the whole
//! session; with [`Retention::Window`] the oldest non-system messages are
//! evicted once the cap is exceeded. System messages are never evicted.

use serde::Serialize;

use crate::models::{Message, Role};

/// How much history a chat surface keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Retention {
    /// Keep every message for the lifetime of the session.
    #[default]
    Unbounded,
    /// Keep at most `max_messages` non-system messages.
    Window { max_messages: usize },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct History {
    messages: Vec<Message>,
    #[serde(skip)]
    retention: Retention,
}

impl History {
    pub fn new(retention: Retention) -> Self {
        Self {
            messages: Vec::new(),
            retention,
        }
    }

    /// A history seeded with a system instruction.
    pub fn with_system(system: impl Into<String>, retention: Retention) -> Self {
        let mut history = Self::new(retention);
        history.messages.push(Message::system(system));
        history
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.enforce_retention();
    }

    /// Append a completed `(user, assistant)` exchange.
    pub fn push_turn(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.messages.push(Message::user(user));
        self.messages.push(Message::assistant(assistant));
        self.enforce_retention();
    }

    fn enforce_retention(&mut self) {
        let Retention::Window { max_messages } = self.retention else {
            return;
        };
        let mut excess = self
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .count()
            .saturating_sub(max_messages);
        if excess == 0 {
            return;
        }
        self.messages.retain(|m| {
            if excess > 0 && m.role != Role::System {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop everything except system messages.
    pub fn clear(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }

    /// Render as `ROLE: text` lines, oldest first, one per message.
    pub fn transcript(&self) -> String {
        let mut out = String::new();
        for m in &self.messages {
            push_line(&mut out, m);
        }
        out
    }

    /// [`transcript`](Self::transcript) followed by a message that is not
    /// stored yet, such as the question currently being answered.
    pub fn transcript_with(&self, pending: &Message) -> String {
        let mut out = self.transcript();
        push_line(&mut out, pending);
        out
    }
}

fn push_line(out: &mut String, message: &Message) {
    out.push_str(&message.role.as_str().to_uppercase());
    out.push_str(": ");
    out.push_str(&message.content);
    out.push('\n');
}
