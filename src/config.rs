//! TOML configuration.
//!
//! Every section is optional; missing keys fall back to the defaults the
//! assistant ships with (`llama3.2` for chat, `mxbai-embed-large` for
//! embeddings, 400/60 character chunks, top-6 retrieval, unbounded history).
//! See `config/sherlock.example.toml`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::chunk::{RecursiveSplitter, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::history::Retention;
use crate::segment::DEFAULT_SEGMENT_WIDTH;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OllamaConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Request timeout. Unset means requests may run indefinitely.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_model: default_chat_model(),
            embedding_model: default_embedding_model(),
            timeout_secs: None,
            batch_size: default_batch_size(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_chat_model() -> String {
    "llama3.2".to_string()
}
fn default_embedding_model() -> String {
    "mxbai-embed-large".to_string()
}
fn default_batch_size() -> usize {
    64
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_chunk_overlap() -> usize {
    DEFAULT_CHUNK_OVERLAP
}

impl ChunkingConfig {
    pub fn splitter(&self) -> RecursiveSplitter {
        RecursiveSplitter::new(self.chunk_size, self.chunk_overlap)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// `"unbounded"` or `"window"`.
    #[serde(default = "default_retention")]
    pub retention: String,
    #[serde(default)]
    pub max_messages: Option<usize>,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            retention: default_retention(),
            max_messages: None,
        }
    }
}

fn default_retention() -> String {
    "unbounded".to_string()
}

impl HistoryConfig {
    /// Resolve the configured policy. Only valid after [`load_config`]
    /// validation; an incomplete window falls back to unbounded.
    pub fn policy(&self) -> Retention {
        match (self.retention.as_str(), self.max_messages) {
            ("window", Some(max_messages)) => Retention::Window { max_messages },
            _ => Retention::Unbounded,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DisplayConfig {
    #[serde(default = "default_segment_width")]
    pub segment_width: usize,
    #[serde(default = "default_segment_delay_ms")]
    pub segment_delay_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            segment_width: default_segment_width(),
            segment_delay_ms: default_segment_delay_ms(),
        }
    }
}

fn default_segment_width() -> usize {
    DEFAULT_SEGMENT_WIDTH
}
fn default_segment_delay_ms() -> u64 {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Built-in defaults with environment overrides applied. Used when no
    /// config file exists.
    pub fn minimal() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("OLLAMA_HOST") {
            let host = host.trim();
            if !host.is_empty() {
                self.ollama.base_url = if host.starts_with("http://") || host.starts_with("https://") {
                    host.to_string()
                } else {
                    format!("http://{}", host)
                };
            }
        }
    }
}

/// Parse and validate configuration from a TOML string.
pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.apply_env();
    validate(&config)?;
    Ok(config)
}

/// Read, parse and validate a config file.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_minimal(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        Ok(Config::minimal())
    }
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.chunk_overlap,
            config.chunking.chunk_size
        );
    }

    if config.retrieval.top_k < 1 {
        bail!("retrieval.top_k must be >= 1");
    }

    match config.history.retention.as_str() {
        "unbounded" => {}
        "window" => match config.history.max_messages {
            Some(n) if n >= 2 => {}
            Some(_) => bail!("history.max_messages must be >= 2"),
            None => bail!("history.max_messages is required when history.retention = \"window\""),
        },
        other => bail!(
            "Unknown history retention: '{}'. Must be unbounded or window.",
            other
        ),
    }

    if config.display.segment_width == 0 {
        bail!("display.segment_width must be > 0");
    }

    if config.ollama.batch_size == 0 {
        bail!("ollama.batch_size must be > 0");
    }

    if config.ollama.timeout_secs == Some(0) {
        bail!("ollama.timeout_secs must be > 0 when set");
    }

    Ok(())
}
