//! User-visible backend failures.
//!
//! Policy blocks and empty retrieval results are ordinary values; the only
//! error a chat turn can end in is a failed call to one of the two model
//! backends. The message keeps the backend's own wording and comes with a
//! fixed remediation hint for display.

use thiserror::Error;

/// Hint shown alongside every backend failure.
pub const REMEDIATION: &str =
    "Ensure Ollama is running locally and the required models are pulled.";

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("embedding backend failed: {0}")]
    Embedding(String),
    #[error("language model failed: {0}")]
    Model(String),
}

impl ChatError {
    pub(crate) fn embedding(err: anyhow::Error) -> Self {
        ChatError::Embedding(format!("{:#}", err))
    }

    pub(crate) fn model(err: anyhow::Error) -> Self {
        ChatError::Model(format!("{:#}", err))
    }

    pub fn remediation(&self) -> &'static str {
        REMEDIATION
    }
}
