//! Embedding provider abstraction and the Ollama implementation.
//!
//! - [`Embedder`]: the capability the document index depends on.
//! - [`OllamaEmbedder`]: calls a local Ollama instance's `/api/embed`
//!   endpoint, falling back to the legacy `/api/embeddings` route.
//! - [`cosine_similarity`]: ranking function used by the index.
//!
//! Failures are returned as errors and never retried here: a failed upload
//! or query is terminal for that request.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::OllamaConfig;

/// Turns text into vectors.
///
/// Implementations must return one vector per input text, in input order.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"mxbai-embed-large"`).
    fn model_name(&self) -> &str;

    /// Embed a batch of texts.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        self.embed(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Empty embedding response"))
    }
}

/// Embedder backed by a local Ollama instance.
///
/// Requires Ollama to be running with the model pulled
/// (e.g. `ollama pull mxbai-embed-large`).
#[derive(Clone)]
pub struct OllamaEmbedder {
    client: reqwest::Client,
    base_url: String,
    model: String,
    batch_size: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.embedding_model.clone(),
            batch_size: config.batch_size.max(1),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        match self.embed_modern(texts).await {
            Ok(vectors) => Ok(vectors),
            Err(EmbedFailure::RouteMissing) => {
                let mut vectors = Vec::with_capacity(texts.len());
                for text in texts {
                    vectors.push(self.embed_legacy(text).await?);
                }
                Ok(vectors)
            }
            Err(EmbedFailure::Other(err)) => Err(err),
        }
    }

    async fn embed_modern(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedFailure> {
        #[derive(Serialize)]
        struct EmbedReq<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbedResp {
            embeddings: Vec<Vec<f32>>,
        }

        let url = format!("{}/api/embed", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&EmbedReq {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| {
                EmbedFailure::Other(anyhow!(
                    "Ollama connection error (is Ollama running at {}?): {}",
                    self.base_url,
                    e
                ))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            // A missing model is also a 404; only fall back for a missing route.
            if body.contains("model") {
                return Err(EmbedFailure::Other(anyhow!(
                    "ollama /api/embed returned {}: {}",
                    status,
                    normalize_err_body(&body)
                )));
            }
            return Err(EmbedFailure::RouteMissing);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbedFailure::Other(anyhow!(
                "ollama /api/embed returned {}: {}",
                status,
                normalize_err_body(&body)
            )));
        }

        let parsed = response
            .json::<EmbedResp>()
            .await
            .context("failed to decode ollama /api/embed response")
            .map_err(EmbedFailure::Other)?;
        Ok(parsed.embeddings)
    }

    async fn embed_legacy(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct EmbeddingReq<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct EmbeddingResp {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.base_url);
        let response = self
            .client
            .post(url)
            .json(&EmbeddingReq {
                model: &self.model,
                prompt: text,
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
                "ollama /api/embeddings returned {}: {}",
                status,
                normalize_err_body(&body)
            );
        }

        let parsed = response
            .json::<EmbeddingResp>()
            .await
            .context("failed to decode ollama /api/embeddings response")?;
        Ok(parsed.embedding)
    }
}

enum EmbedFailure {
    RouteMissing,
    Other(anyhow::Error),
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let batch_vectors = self.embed_batch(batch).await?;
            if batch_vectors.len() != batch.len() {
                bail!(
                    "ollama returned {} embeddings for {} inputs",
                    batch_vectors.len(),
                    batch.len()
                );
            }
            vectors.extend(batch_vectors);
        }
        Ok(vectors)
    }
}

/// Pull the `error` field out of an Ollama JSON error body, if present.
pub(crate) fn normalize_err_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "<empty body>".to_string();
    }

    if let Ok(json) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Some(err) = json.get("error").and_then(|v| v.as_str()) {
            return err.to_string();
        }
    }

    trimmed.to_string()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors, vectors
/// of different lengths, or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let sim = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_normalize_err_body() {
        assert_eq!(
            normalize_err_body(r#"{"error":"model \"x\" not found"}"#),
            "model \"x\" not found"
        );
        assert_eq!(normalize_err_body("  "), "<empty body>");
        assert_eq!(normalize_err_body("plain"), "plain");
    }
}
