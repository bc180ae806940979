//! Session state and the assistant that operates on it.
//!
//! A [`Session`] is the only mutable state of the system: the active
//! document index and the two independent chat histories. It is passed by
//! `&mut` reference into every [`Assistant`] operation, so a session has a
//! single writer and one request in flight at a time.
//!
//! Failed operations leave the session exactly as it was: a failed upload
//! keeps the previous index, a failed turn is not recorded.

use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::chunk::RecursiveSplitter;
use crate::config::Config;
use crate::embedding::{Embedder, OllamaEmbedder};
use crate::error::ChatError;
use crate::history::{History, Retention};
use crate::llm::{ChatModel, OllamaChat};
use crate::prompt::{timeline_artifact_prompt, TIMELINE_SYSTEM_PROMPT};
use crate::research::{self, Answer, AnswerOptions};
use crate::store::DocumentIndex;
use crate::timeline;

/// Mutable per-user state.
#[derive(Debug)]
pub struct Session {
    document: Option<DocumentIndex>,
    research: History,
    timeline: History,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Retention::Unbounded)
    }
}

impl Session {
    pub fn new(retention: Retention) -> Self {
        Self {
            document: None,
            research: History::new(retention),
            timeline: History::with_system(TIMELINE_SYSTEM_PROMPT, retention),
        }
    }

    /// The active document index, if a document has been uploaded.
    pub fn document(&self) -> Option<&DocumentIndex> {
        self.document.as_ref()
    }

    pub fn research_history(&self) -> &History {
        &self.research
    }

    pub fn timeline_history(&self) -> &History {
        &self.timeline
    }

    pub fn clear_research(&mut self) {
        self.research.clear();
    }

    /// Clear the timeline workspace back to its system instruction.
    pub fn reset_timeline(&mut self) {
        self.timeline.clear();
    }
}

/// What an upload did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadOutcome {
    /// A new index replaced the previous one.
    Indexed { chunks: usize },
    /// Same identity as the active document; the index was kept.
    Unchanged { chunks: usize },
}

impl UploadOutcome {
    pub fn chunks(&self) -> usize {
        match self {
            UploadOutcome::Indexed { chunks } | UploadOutcome::Unchanged { chunks } => *chunks,
        }
    }

    pub fn rebuilt(&self) -> bool {
        matches!(self, UploadOutcome::Indexed { .. })
    }

    /// Confirmation line shown after an upload.
    pub fn message(&self) -> String {
        format!(
            "File uploaded successfully! Indexed {} chunks.",
            self.chunks()
        )
    }
}

/// Model collaborators plus tuning, shared across sessions.
#[derive(Clone)]
pub struct Assistant {
    embedder: Arc<dyn Embedder>,
    model: Arc<dyn ChatModel>,
    splitter: RecursiveSplitter,
    options: AnswerOptions,
}

impl Assistant {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        model: Arc<dyn ChatModel>,
        splitter: RecursiveSplitter,
        options: AnswerOptions,
    ) -> Self {
        Self {
            embedder,
            model,
            splitter,
            options,
        }
    }

    /// Build an assistant backed by the configured Ollama instance.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            Arc::new(OllamaEmbedder::new(&config.ollama)?),
            Arc::new(OllamaChat::new(&config.ollama)?),
            config.chunking.splitter(),
            AnswerOptions {
                top_k: config.retrieval.top_k,
                segment_width: config.display.segment_width,
            },
        ))
    }

    pub fn options(&self) -> &AnswerOptions {
        &self.options
    }

    /// Make `text` the session's active document.
    ///
    /// The index is rebuilt only when `identity` differs from the active
    /// document's; the old index is dropped entirely.
    pub async fn upload(
        &self,
        session: &mut Session,
        identity: &str,
        text: &str,
    ) -> Result<UploadOutcome, ChatError> {
        if let Some(active) = session.document.as_ref() {
            if active.identity() == identity {
                return Ok(UploadOutcome::Unchanged {
                    chunks: active.len(),
                });
            }
        }

        let (chunks, index) =
            research::index_document(identity, text, &self.splitter, self.embedder.as_ref())
                .await?;
        if let Some(previous) = session.document.replace(index) {
            info!(
                previous = previous.identity(),
                current = identity,
                "active document replaced"
            );
        }
        Ok(UploadOutcome::Indexed { chunks })
    }

    /// Answer a question about the active document and record the turn.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<Answer, ChatError> {
        let answer = research::answer(
            question,
            &session.research,
            session.document.as_ref(),
            self.embedder.as_ref(),
            self.model.as_ref(),
            &self.options,
        )
        .await?;
        session.research.push_turn(question, answer.text());
        Ok(answer)
    }

    /// Run a timeline analysis over pasted artifacts and record the turn.
    pub async fn analyze_timeline<F>(
        &self,
        session: &mut Session,
        input: &str,
        on_partial: F,
    ) -> Result<String, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        self.timeline_turn(session, timeline_artifact_prompt(input), on_partial)
            .await
    }

    /// Ask a follow-up question about the current timeline.
    pub async fn follow_up_timeline<F>(
        &self,
        session: &mut Session,
        question: &str,
        on_partial: F,
    ) -> Result<String, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        self.timeline_turn(session, question.to_string(), on_partial)
            .await
    }

    async fn timeline_turn<F>(
        &self,
        session: &mut Session,
        user_message: String,
        on_partial: F,
    ) -> Result<String, ChatError>
    where
        F: FnMut(&str) + Send,
    {
        let report = timeline::stream_turn(
            &session.timeline,
            &user_message,
            self.model.as_ref(),
            on_partial,
        )
        .await?;
        session.timeline.push_turn(user_message, report.clone());
        Ok(report)
    }
}
