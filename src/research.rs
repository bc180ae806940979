//! Document chat: intent screen, retrieval, prompt assembly, segmentation.
//!
//! # Turn
//!
//! 1. [`classify`] the question; a block returns [`REFUSAL`] with no
//!    retrieval and no model call.
//! 2. Retrieve the top `k` chunks from the active index (none → the
//!    [`NO_EVIDENCE`](crate::prompt::NO_EVIDENCE) placeholder).
//! 3. Build the user prompt from the evidence, the full history transcript
//!    (ending with the pending question) and the question.
//! 4. One blocking [`ChatModel::complete`] call with the fixed system prompt.
//! 5. [`segment`] the reply for paced display.
//!
//! Nothing here mutates history; the caller records the turn on success.

use serde::Serialize;
use tracing::{debug, warn};

use crate::chunk::RecursiveSplitter;
use crate::embedding::Embedder;
use crate::error::ChatError;
use crate::history::History;
use crate::intent::{classify, Verdict, REFUSAL};
use crate::llm::ChatModel;
use crate::models::Message;
use crate::prompt::{build_user_prompt, render_context, RESEARCH_SYSTEM_PROMPT};
use crate::segment::segment;
use crate::store::DocumentIndex;

/// Per-turn tuning for the document chat.
#[derive(Debug, Clone)]
pub struct AnswerOptions {
    pub top_k: usize,
    pub segment_width: usize,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            top_k: 6,
            segment_width: crate::segment::DEFAULT_SEGMENT_WIDTH,
        }
    }
}

/// Result of one document-chat turn.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub verdict: Verdict,
    pub segments: Vec<String>,
}

impl Answer {
    /// Segments joined with single spaces, as stored in history.
    pub fn text(&self) -> String {
        self.segments.join(" ")
    }
}

/// Chunk and embed a document, returning `(chunk_count, index)`.
pub async fn index_document(
    identity: &str,
    text: &str,
    splitter: &RecursiveSplitter,
    embedder: &dyn Embedder,
) -> Result<(usize, DocumentIndex), ChatError> {
    let index = DocumentIndex::build(identity, text, splitter, embedder)
        .await
        .map_err(|e| {
            warn!(identity, error = %e, "indexing failed");
            ChatError::embedding(e)
        })?;
    Ok((index.len(), index))
}

/// Answer one question against the active document.
///
/// `index` of `None` behaves like an index with zero chunks.
pub async fn answer(
    question: &str,
    history: &History,
    index: Option<&DocumentIndex>,
    embedder: &dyn Embedder,
    model: &dyn ChatModel,
    options: &AnswerOptions,
) -> Result<Answer, ChatError> {
    let verdict = classify(question);
    if verdict.is_blocked() {
        debug!("question blocked by intent screen");
        return Ok(Answer {
            verdict,
            segments: vec![REFUSAL.to_string()],
        });
    }

    let evidence = match index {
        Some(index) => index
            .search(question, options.top_k, embedder)
            .await
            .map_err(|e| {
                warn!(error = %e, "retrieval failed");
                ChatError::embedding(e)
            })?,
        None => Vec::new(),
    };

    let context = render_context(&evidence);
    // The pending question closes the transcript but is only stored on success.
    let transcript = history.transcript_with(&Message::user(question));
    let prompt = build_user_prompt(&context, &transcript, question);
    let messages = [
        Message::system(RESEARCH_SYSTEM_PROMPT),
        Message::user(prompt),
    ];

    debug!(
        evidence = evidence.len(),
        history = history.len(),
        model = model.model_name(),
        "invoking model"
    );

    let reply = model.complete(&messages).await.map_err(|e| {
        warn!(error = %e, "model call failed");
        ChatError::model(e)
    })?;

    Ok(Answer {
        verdict,
        segments: segment(&reply, options.segment_width),
    })
}
