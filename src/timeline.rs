//! Log timeline reconstruction.
//!
//! Same shape as the document chat without retrieval: the timeline history
//! (system instruction first) plus the new user message is streamed to the
//! model, and every fragment extends a buffer that is handed to the caller
//! immediately. The stream runs until the model signals completion.

use futures::StreamExt;
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::history::History;
use crate::llm::ChatModel;
use crate::models::{Message, Role};
use crate::prompt::TIMELINE_ARTIFACT_PREFIX;

/// Stream one timeline turn.
///
/// `on_partial` receives the accumulated response after each fragment.
/// Returns the complete response; `history` is not modified.
pub async fn stream_turn<F>(
    history: &History,
    user_message: &str,
    model: &dyn ChatModel,
    mut on_partial: F,
) -> Result<String, ChatError>
where
    F: FnMut(&str) + Send,
{
    let mut messages: Vec<Message> = history.messages().to_vec();
    messages.push(Message::user(user_message));

    debug!(
        messages = messages.len(),
        model = model.model_name(),
        "streaming timeline turn"
    );

    let mut stream = model.stream(&messages).await.map_err(|e| {
        warn!(error = %e, "timeline model call failed");
        ChatError::model(e)
    })?;

    let mut buf = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment.map_err(|e| {
            warn!(error = %e, received = buf.len(), "timeline stream failed");
            ChatError::model(e)
        })?;
        buf.push_str(&fragment);
        on_partial(&buf);
    }

    Ok(buf)
}

/// Messages worth showing in a history view: no system instruction and no
/// raw artifact dumps.
pub fn visible_messages(history: &History) -> impl Iterator<Item = &Message> {
    history.messages().iter().filter(|m| match m.role {
        Role::System => false,
        Role::User => !m.content.starts_with(TIMELINE_ARTIFACT_PREFIX),
        Role::Assistant => true,
    })
}
