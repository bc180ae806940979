//! In-memory similarity index for the session's active document.
//!
//! A [`DocumentIndex`] holds the chunks of exactly one document together
//! with their embedding vectors. Search is brute-force cosine similarity
//! over all stored vectors; ties keep document order.

use anyhow::{bail, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chunk::{build_chunks, RecursiveSplitter};
use crate::embedding::{cosine_similarity, Embedder};
use crate::models::Chunk;

/// A chunk returned from [`DocumentIndex::search`].
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk: Chunk,
    pub score: f32,
}

struct StoredChunk {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Chunks and vectors of a single uploaded document.
pub struct DocumentIndex {
    id: Uuid,
    identity: String,
    fingerprint: String,
    entries: Vec<StoredChunk>,
}

impl std::fmt::Debug for DocumentIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIndex")
            .field("id", &self.id)
            .field("identity", &self.identity)
            .field("chunks", &self.entries.len())
            .finish()
    }
}

impl DocumentIndex {
    /// Chunk `text` and embed every chunk.
    ///
    /// Empty input produces an index with zero chunks and makes no
    /// embedding call. Embedding failures are returned as errors.
    pub async fn build(
        identity: &str,
        text: &str,
        splitter: &RecursiveSplitter,
        embedder: &dyn Embedder,
    ) -> Result<Self> {
        let chunks = build_chunks(text, splitter);
        let fingerprint = fingerprint(text);

        let vectors = if chunks.is_empty() {
            Vec::new()
        } else {
            let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
            embedder.embed(&texts).await?
        };

        if vectors.len() != chunks.len() {
            bail!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            );
        }

        let index = Self {
            id: Uuid::new_v4(),
            identity: identity.to_string(),
            fingerprint,
            entries: chunks
                .into_iter()
                .zip(vectors)
                .map(|(chunk, vector)| StoredChunk { chunk, vector })
                .collect(),
        };

        info!(
            index_id = %index.id,
            identity = %index.identity,
            chunks = index.entries.len(),
            model = embedder.model_name(),
            "document indexed"
        );

        Ok(index)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Upload identity (file name) this index was built from.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// SHA-256 of the raw uploaded text, hex encoded.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All chunks in sequence order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.entries.iter().map(|e| &e.chunk)
    }

    /// Return up to `k` chunks ranked by similarity to `query`.
    ///
    /// An empty index returns no results without calling the embedder.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        embedder: &dyn Embedder,
    ) -> Result<Vec<RetrievedChunk>> {
        if self.entries.is_empty() || k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = embedder.embed_query(query).await?;

        let mut ranked: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|e| RetrievedChunk {
                chunk: e.chunk.clone(),
                score: cosine_similarity(&query_vec, &e.vector),
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(k);

        debug!(
            index_id = %self.id,
            hits = ranked.len(),
            top_score = ranked.first().map(|r| r.score),
            "retrieved chunks"
        );

        Ok(ranked)
    }
}

fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Two-dimensional embedder: mentions of "knife" vs "poison".
    struct AxisEmbedder {
        calls: AtomicUsize,
    }

    impl AxisEmbedder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Embedder for AxisEmbedder {
        fn model_name(&self) -> &str {
            "axis"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(texts
                .iter()
                .map(|t| {
                    let t = t.to_lowercase();
                    vec![
                        t.matches("knife").count() as f32,
                        t.matches("poison").count() as f32,
                    ]
                })
                .collect())
        }
    }

    fn splitter() -> RecursiveSplitter {
        RecursiveSplitter::new(40, 0)
    }

    #[tokio::test]
    async fn test_empty_document_has_no_chunks() {
        let embedder = AxisEmbedder::new();
        let index = DocumentIndex::build("empty.txt", "  \n ", &splitter(), &embedder)
            .await
            .unwrap();
        assert!(index.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);

        let hits = index.search("knife", 6, &embedder).await.unwrap();
        assert!(hits.is_empty());
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let embedder = AxisEmbedder::new();
        let text = "The poison was in the cup of tea. The knife lay under the sofa cushion.";
        let index = DocumentIndex::build("case.txt", text, &splitter(), &embedder)
            .await
            .unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.search("where was the knife", 1, &embedder).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].chunk.source.contains("knife"));
    }

    #[tokio::test]
    async fn test_ties_keep_document_order() {
        let embedder = AxisEmbedder::new();
        let text = "Alpha notes about the hallway carpet. Beta notes about the garden shed.";
        let index = DocumentIndex::build("case.txt", text, &splitter(), &embedder)
            .await
            .unwrap();
        let hits = index.search("nothing relevant", 6, &embedder).await.unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.chunk.index).collect();
        assert_eq!(order, vec![0, 1]);
    }

    #[tokio::test]
    async fn test_identity_and_fingerprint() {
        let embedder = AxisEmbedder::new();
        let a = DocumentIndex::build("a.txt", "same text", &splitter(), &embedder)
            .await
            .unwrap();
        let b = DocumentIndex::build("b.txt", "same text", &splitter(), &embedder)
            .await
            .unwrap();
        assert_eq!(a.identity(), "a.txt");
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
        assert_ne!(a.id(), b.id());
    }
}
