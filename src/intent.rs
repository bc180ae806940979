//! Rule-based intent screen.
//!
//! Decides whether a question asks for real-world harmful instructions, as
//! opposed to asking about the (fictional or academic) content of the case
//! file. The matcher is plain lowercase substring search over fixed phrase
//! lists: no stemming, no negation handling, no multi-lingual support.
//!
//! # Algorithm
//!
//! 1. Lowercase the query.
//! 2. Any document-reference phrase present → [`Verdict::Allowed`].
//! 3. Any (intent phrase, action phrase) pair both present → [`Verdict::Blocked`].
//! 4. Otherwise → [`Verdict::Allowed`].
//!
//! ```rust
//! use sherlock::intent::{classify, Verdict};
//!
//! assert_eq!(classify("How do I kill someone?"), Verdict::Blocked);
//! assert_eq!(classify("According to the file, who killed him?"), Verdict::Allowed);
//! ```

use serde::Serialize;

/// Fixed reply returned instead of an answer when a query is blocked.
pub const REFUSAL: &str =
    "❌ I cannot provide real-world instructions for illegal or harmful activities.";

/// Phrases marking a question as scoped to the uploaded document.
const DOCUMENT_REFERENCES: [&str; 4] = ["in the file", "in the document", "in the case", "according to"];

const INTENT_PHRASES: [&str; 5] = [
    "how do i",
    "how can i",
    "show me how",
    "steps to",
    "instructions to",
];

const ACTION_PHRASES: [&str; 9] = [
    "kill",
    "murder",
    "poison",
    "hurt someone",
    "harm someone",
    "commit a crime",
    "evade police",
    "hide evidence",
    "break into",
];

/// Outcome of screening a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Allowed,
    Blocked,
}

impl Verdict {
    pub fn is_blocked(&self) -> bool {
        matches!(self, Verdict::Blocked)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Allowed => "ALLOWED",
            Verdict::Blocked => "BLOCKED",
        }
    }
}

/// Screen a query. Pure function.
pub fn classify(query: &str) -> Verdict {
    let q = query.to_lowercase();

    if DOCUMENT_REFERENCES.iter().any(|r| q.contains(r)) {
        return Verdict::Allowed;
    }

    let has_intent = INTENT_PHRASES.iter().any(|p| q.contains(p));
    let has_action = ACTION_PHRASES.iter().any(|a| q.contains(a));

    if has_intent && has_action {
        Verdict::Blocked
    } else {
        Verdict::Allowed
    }
}
