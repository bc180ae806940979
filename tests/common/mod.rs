//! Deterministic stand-ins for the embedding and chat backends.

#![allow(dead_code)]

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use sherlock::chunk::RecursiveSplitter;
use sherlock::embedding::Embedder;
use sherlock::llm::{ChatModel, FragmentStream};
use sherlock::models::Message;
use sherlock::research::AnswerOptions;
use sherlock::session::Assistant;

const DIMS: usize = 64;

/// Bag-of-words embedder: each lowercase word bumps one hashed dimension.
#[derive(Default)]
pub struct HashEmbedder {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
}

impl HashEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn word_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIMS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
    {
        let h = word
            .to_lowercase()
            .bytes()
            .fold(5381u64, |h, b| h.wrapping_mul(33) ^ b as u64);
        v[(h % DIMS as u64) as usize] += 1.0;
    }
    v
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        "hash-embed"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("connection refused");
        }
        Ok(texts.iter().map(|t| word_vector(t)).collect())
    }
}

/// Chat model that records every request and replies with a fixed text.
pub struct ScriptedModel {
    pub reply: String,
    pub requests: Mutex<Vec<Vec<Message>>>,
    pub fail: AtomicBool,
    /// When set, streams end with an error after this many fragments.
    pub fail_after: Mutex<Option<usize>>,
}

impl ScriptedModel {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            fail_after: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Vec<Message> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("model was never called")
    }

    fn record(&self, messages: &[Message]) -> Result<()> {
        self.requests.lock().unwrap().push(messages.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            bail!("model 'llama3.2' not found");
        }
        Ok(())
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        self.record(messages)?;
        Ok(self.reply.clone())
    }

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        self.record(messages)?;
        let mut fragments: Vec<Result<String>> = self
            .reply
            .split_inclusive(' ')
            .map(|s| Ok(s.to_string()))
            .collect();
        if let Some(n) = *self.fail_after.lock().unwrap() {
            fragments.truncate(n);
            fragments.push(Err(anyhow!("ollama chat stream interrupted")));
        }
        Ok(stream::iter(fragments).boxed())
    }
}

pub fn assistant(embedder: Arc<HashEmbedder>, model: Arc<ScriptedModel>) -> Assistant {
    Assistant::new(
        embedder,
        model,
        RecursiveSplitter::default(),
        AnswerOptions::default(),
    )
}

pub const CASE_A: &str = "The Hartwell Case. The victim, Edgar Hartwell, was found in the \
library of Ashgrove Manor. A cup of cold tea stood beside him and the coroner later \
identified arsenic in the residue. The butler, Mr. Pike, claimed he had served the tea \
at nine o'clock.\n\nThe gardener reported footprints in the flower bed beneath the \
library window. The prints matched a pair of riding boots owned by the victim's nephew. The nephew, Julian Hartwell, had \
argued with his uncle about the will on the evening of the murder.";

pub const CASE_B: &str = "The Quayside Affair. A ledger recovered from the harbour office \
showed irregular payments to a shipping clerk named Dorothy Vance. Customs officers \
traced three crates of contraband tobacco to warehouse seven.\n\nA witness on the night \
shift saw a grey van leave the warehouse shortly after midnight.";
