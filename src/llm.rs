//! Language model capability and the Ollama chat client.
//!
//! Both chat surfaces talk to the model through [`ChatModel`]:
//!
//! | Method | Used by | Behavior |
//! |--------|---------|----------|
//! | [`complete`](ChatModel::complete) | document chat | one blocking call, full text |
//! | [`stream`](ChatModel::stream) | timeline | incremental fragments until done |
//!
//! [`OllamaChat`] implements both against `POST /api/chat`. Streaming
//! responses are newline-delimited JSON objects; the stream ends at the
//! first object with `"done": true` or when the body closes.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;
use crate::embedding::normalize_err_body;
use crate::models::Message;

/// Incremental text fragments produced by [`ChatModel::stream`].
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// A chat-capable language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Returns the model identifier (e.g. `"llama3.2"`).
    fn model_name(&self) -> &str;

    /// Send `messages` and wait for the complete response text.
    async fn complete(&self, messages: &[Message]) -> Result<String>;

    /// Send `messages` and receive the response as it is generated.
    ///
    /// Errors establishing the call are returned directly; errors after the
    /// first fragment arrive as `Err` items in the stream.
    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

/// One NDJSON line of a streaming `/api/chat` response.
#[derive(Deserialize)]
struct StreamLine {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Chat model served by a local Ollama instance.
#[derive(Clone)]
pub struct OllamaChat {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl OllamaChat {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.chat_model.clone(),
        })
    }

    async fn post_chat(&self, messages: &[Message], stream: bool) -> Result<reqwest::Response> {
        let url = format!("{}/api/chat", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&ChatRequest {
                model: &self.model,
                messages,
                stream,
            })
            .send()
            .await
            .with_context(|| {
                format!(
                    "Ollama connection error (is Ollama running at {}?)",
                    self.base_url
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!(
                "ollama /api/chat returned {}: {}",
                status,
                normalize_err_body(&body)
            );
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OllamaChat {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[Message]) -> Result<String> {
        let response = self.post_chat(messages, false).await?;
        let parsed = response
            .json::<ChatResponse>()
            .await
            .context("failed to decode ollama /api/chat response")?;
        Ok(parsed.message.content)
    }

    async fn stream(&self, messages: &[Message]) -> Result<FragmentStream> {
        let response = self.post_chat(messages, true).await?;
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()))
            .boxed();
        Ok(ndjson_fragments(body))
    }
}

struct LineReader {
    body: BoxStream<'static, reqwest::Result<Vec<u8>>>,
    buf: Vec<u8>,
    finished: bool,
}

/// Decode an NDJSON byte stream into content fragments.
fn ndjson_fragments(body: BoxStream<'static, reqwest::Result<Vec<u8>>>) -> FragmentStream {
    let reader = LineReader {
        body,
        buf: Vec::new(),
        finished: false,
    };

    stream::unfold(reader, |mut reader| async move {
        loop {
            if reader.finished {
                return None;
            }

            if let Some(pos) = reader.buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = reader.buf.drain(..=pos).collect();
                match parse_line(&line) {
                    Ok(None) => continue,
                    Ok(Some((content, done))) => {
                        reader.finished = done;
                        if content.is_empty() {
                            continue;
                        }
                        return Some((Ok(content), reader));
                    }
                    Err(e) => {
                        reader.finished = true;
                        return Some((Err(e), reader));
                    }
                }
            }

            match reader.body.next().await {
                Some(Ok(bytes)) => reader.buf.extend_from_slice(&bytes),
                Some(Err(e)) => {
                    reader.finished = true;
                    let err = anyhow!(e).context("ollama chat stream interrupted");
                    return Some((Err(err), reader));
                }
                None => {
                    reader.finished = true;
                    let rest = std::mem::take(&mut reader.buf);
                    return match parse_line(&rest) {
                        Ok(Some((content, _))) if !content.is_empty() => {
                            Some((Ok(content), reader))
                        }
                        Ok(_) => None,
                        Err(e) => Some((Err(e), reader)),
                    };
                }
            }
        }
    })
    .boxed()
}

/// Parse one NDJSON line into `(content, done)`. Blank lines yield `None`.
fn parse_line(line: &[u8]) -> Result<Option<(String, bool)>> {
    let text = std::str::from_utf8(line).context("ollama stream is not valid UTF-8")?;
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }

    let parsed: StreamLine =
        serde_json::from_str(text).context("failed to decode ollama stream line")?;
    if let Some(err) = parsed.error {
        bail!("ollama stream error: {}", err);
    }
    let content = parsed.message.map(|m| m.content).unwrap_or_default();
    Ok(Some((content, parsed.done)))
}
