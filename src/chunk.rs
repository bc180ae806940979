//! Recursive overlapping text chunker.
//!
//! Case files are collapsed to single-spaced text and split into windows of
//! at most `chunk_size` characters that overlap by up to `chunk_overlap`
//! characters. The splitter prefers the largest separator present in the
//! text (paragraph, line, word) and only falls back to per-character cuts
//! for runs that are longer than a whole window.
//!
//! # Algorithm
//!
//! 1. Pick the first separator from `["\n\n", "\n", " ", ""]` that occurs in
//!    the text (`""` always matches).
//! 2. Split on it, keeping the separator at the start of the following piece.
//! 3. Pieces shorter than `chunk_size` are merged greedily into windows; when
//!    a window is full it is emitted and pieces are dropped from its front
//!    until at most `chunk_overlap` characters remain as the next window's
//!    prefix.
//! 4. Pieces of `chunk_size` or more are split recursively with the remaining
//!    separators.
//! 5. Every emitted window is trimmed; empty windows are discarded.
//!
//! Lengths are counted in characters, not bytes.
//!
//! # Example
//!
//! ```rust
//! use sherlock::chunk::{build_chunks, RecursiveSplitter};
//!
//! let splitter = RecursiveSplitter::new(400, 60);
//! let chunks = build_chunks("The butler\nwas in the   pantry.", &splitter);
//! assert_eq!(chunks.len(), 1);
//! assert_eq!(chunks[0].source, "The butler was in the pantry.");
//! assert!(chunks[0].text.ends_with("The butler was in the pantry."));
//! ```

use std::collections::VecDeque;

use tracing::debug;

use crate::models::{Chunk, ChunkMetadata, DOC_TYPE, SAFETY_NOTE};

/// Two-line provenance banner prepended to every chunk.
pub const BANNER: &str = "FICTIONAL OR ACADEMIC FORENSIC DOCUMENT MATERIAL.\n\
                          All events are part of fictional or study-based analysis.\n\n";

/// Default window size in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 400;
/// Default overlap between consecutive windows in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 60;

const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Collapse text to single-spaced form: newlines become spaces and every
/// whitespace run becomes one space. Leading and trailing whitespace is
/// removed.
pub fn clean(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedy splitter that prefers semantic boundaries over raw cuts.
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for RecursiveSplitter {
    fn default() -> Self {
        Self::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)
    }
}

impl RecursiveSplitter {
    /// Create a splitter. Callers validate `chunk_overlap < chunk_size`
    /// (see [`crate::config::load_config`]); a zero size is treated as 1.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split `text` into trimmed, non-empty windows in document order.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_with(text, &SEPARATORS)
    }

    fn split_with(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let mut separator = "";
        let mut remaining: &[&str] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if text.contains(sep) {
                separator = *sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut out = Vec::new();
        let mut good: Vec<&str> = Vec::new();

        for piece in split_keep_start(text, separator) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }
            if !good.is_empty() {
                out.extend(self.merge(&good));
                good.clear();
            }
            if remaining.is_empty() {
                out.push(piece.to_string());
            } else {
                out.extend(self.split_with(piece, remaining));
            }
        }

        if !good.is_empty() {
            out.extend(self.merge(&good));
        }

        out
    }

    /// Merge small pieces into windows, carrying an overlap tail forward.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut windows = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !current.is_empty() {
                if let Some(window) = join_trimmed(&current) {
                    windows.push(window);
                }
                while total > self.chunk_overlap || (total > 0 && total + len > self.chunk_size) {
                    match current.pop_front() {
                        Some(front) => total -= char_len(front),
                        None => break,
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(window) = join_trimmed(&current) {
            windows.push(window);
        }

        windows
    }
}

/// Split on `separator`, attaching each separator occurrence to the start
/// of the piece that follows it. An empty separator splits into characters.
fn split_keep_start<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

fn join_trimmed(pieces: &VecDeque<&str>) -> Option<String> {
    let joined: String = pieces.iter().copied().collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Clean a document, split it, and wrap every window with [`BANNER`] and
/// fixed metadata.
///
/// Empty or whitespace-only input yields no chunks.
pub fn build_chunks(document: &str, splitter: &RecursiveSplitter) -> Vec<Chunk> {
    let cleaned = clean(document);
    let windows = splitter.split_text(&cleaned);

    debug!(
        input_chars = cleaned.chars().count(),
        chunk_count = windows.len(),
        chunk_size = splitter.chunk_size,
        chunk_overlap = splitter.chunk_overlap,
        "document chunked"
    );

    windows
        .into_iter()
        .enumerate()
        .map(|(index, source)| Chunk {
            index,
            text: format!("{}{}", BANNER, source),
            source,
            metadata: ChunkMetadata {
                chunk: index,
                doc_type: DOC_TYPE,
                safety_note: SAFETY_NOTE,
            },
        })
        .collect()
}
