//! # Sherlock
//!
//! A forensic research assistant: retrieval-augmented chat over fictional
//! or academic case files, gated by a rule-based intent screen, plus a
//! streaming log-timeline builder. Both flows talk to a local Ollama
//! instance through two small capability traits.
//!
//! ## Architecture
//!
//! ```text
//!   question ──▶ ┌─────────┐ BLOCKED ──▶ fixed refusal
//!                │ intent  │
//!                └────┬────┘ ALLOWED
//!                     ▼
//! ┌──────────┐   ┌──────────┐   ┌──────────┐   ┌──────────┐
//! │  chunk   │──▶│  store   │──▶│  prompt  │──▶│   llm    │──▶ segment
//! │ 400 / 60 │   │ top-k=6  │   │ +history │   │ complete │
//! └──────────┘   └──────────┘   └──────────┘   └──────────┘
//!
//!   artifacts ──▶ timeline history ──▶ llm stream ──▶ partial buffers
//! ```
//!
//! All mutable state lives in a [`session::Session`] that each
//! [`session::Assistant`] operation borrows mutably.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Chunks, roles, messages |
//! | [`intent`] | Rule-based intent screen |
//! | [`chunk`] | Recursive text splitting and banner wrapping |
//! | [`embedding`] | Embedding provider abstraction and Ollama client |
//! | [`store`] | Per-document in-memory vector index |
//! | [`llm`] | Chat model abstraction and Ollama client |
//! | [`prompt`] | System prompts and prompt assembly |
//! | [`segment`] | Display segmentation |
//! | [`history`] | Conversation history and retention |
//! | [`research`] | Document chat turn |
//! | [`timeline`] | Streaming timeline turn |
//! | [`session`] | Session state and the assistant |
//! | [`extract`] | Case-file loading (text, PDF) |
//! | [`error`] | User-visible backend failures |
//! | [`repl`] | Console commands |
//! | [`server`] | HTTP API |

pub mod chunk;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod history;
pub mod intent;
pub mod llm;
pub mod models;
pub mod prompt;
pub mod repl;
pub mod research;
pub mod segment;
pub mod server;
pub mod session;
pub mod store;
pub mod timeline;
