//! Core data models shared by the research and timeline flows.
//!
//! These types represent the chunks of an indexed case file and the
//! messages exchanged with the language model.

use serde::{Deserialize, Serialize};

/// Document-type tag attached to every indexed chunk.
pub const DOC_TYPE: &str = "fiction_forensic";

/// Safety annotation attached to every indexed chunk.
pub const SAFETY_NOTE: &str = "This content is fictional or academic training material.";

/// Metadata stored alongside each chunk in the document index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkMetadata {
    /// Sequence index of the chunk within its document (0-based).
    pub chunk: usize,
    pub doc_type: &'static str,
    pub safety_note: &'static str,
}

/// An ordered, provenance-wrapped fragment of an indexed document.
///
/// Created in bulk when a document is indexed and never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Sequence index, contiguous from 0 in document order.
    pub index: usize,
    /// The slice of the cleaned document, without the banner.
    pub source: String,
    /// `source` prefixed with the provenance banner. This is what gets
    /// embedded and shown to the model.
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Speaker role of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Wire name used by chat APIs (`"system"`, `"user"`, `"assistant"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A single `(role, content)` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}
