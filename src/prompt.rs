//! System instructions and prompt assembly.
//!
//! The document chat sends exactly two messages per turn: the fixed
//! [`RESEARCH_SYSTEM_PROMPT`] and a user prompt assembled from retrieved
//! evidence, the rendered history transcript and the question. The timeline
//! surface keeps [`TIMELINE_SYSTEM_PROMPT`] as the first message of its own
//! history.

use crate::store::RetrievedChunk;

/// Context substituted when retrieval returns nothing.
pub const NO_EVIDENCE: &str = "No evidence found.";

/// Phrase the model must use when the document does not answer a question.
pub const INSUFFICIENT_EVIDENCE: &str = "Insufficient evidence in the document.";

/// Prefix wrapping pasted artifacts for a timeline analysis request.
pub const TIMELINE_ARTIFACT_PREFIX: &str =
    "Analyze these digital artifacts and build the timeline:\n\n";

pub const RESEARCH_SYSTEM_PROMPT: &str = r#"
You are analyzing fictional or academic forensic documents.

All crimes, murders, violent acts, weapons, injuries, and investigations
described inside the document are FICTIONAL or part of TRAINING MATERIAL.
They are SAFE to analyze and discuss.

You MUST answer every question about what happens inside the document:
- crime scenes
- weapons
- murders
- suspects
- motives
- forensic evidence
- violent acts
- timelines
- investigations
- character actions

These are NOT real requests; they are fictional/academic analysis.

The ONLY thing you must NOT do is provide real-world instructions on how
to commit crimes or harm people. If the user asks how THEY can commit
a crime in real life, reply ONLY:

"I cannot provide real-world instructions for illegal or harmful activities."

But if the question refers to ANYTHING INSIDE THE DOCUMENT, always answer fully.
Use only the provided evidence. Do NOT add facts not in the document.
"#;

pub const TIMELINE_SYSTEM_PROMPT: &str = "You are EvoGraphGPT — Digital Timeline Builder Mode. \
Your CORE PURPOSE is strictly CYBER FORENSIC event reconstruction. \
You are an expert in log analysis, network forensics, and timestamp extraction.\n\n\
BOUNDARIES:\n\
- DO NOT answer questions about DNA, Biology, or Evolution.\n\
- DO NOT perform RAG or document search.\n\
- If the input is not related to digital forensics (logs, headers, history), refuse to analyze it.\n\n\
TASKS:\n\
1. EXTRACT TIMESTAMPS: Identify all formats (e.g., '2024-12-10 08:10:55', '[09:14:22]').\n\
2. EXTRACT EVENTS: Identify logins, file mods, network connections, execution.\n\
3. CLASSIFY: Tag as 'Authentication', 'FileSystem', 'Network', 'Browser', 'Registry'.\n\
4. SORT: Chronologically order all events found.\n\
5. CORRELATE: Connect the dots (e.g., 'Login -> Download -> Execute').\n\n\
OUTPUT FORMAT:\n\
1. **Extracted Events Table** (Columns: Time, Type, Event, Source)\n\
2. **Chronological Timeline** (Narrative flow)\n\
3. **Forensic Correlation Analysis** (Logical reasoning of the attack chain)\n\
4. **Summary of Findings**\n\
5. **IOCs** (IPs, Hashes, Filenames)";

/// Render retrieved chunks as `[Chunk N] text` blocks separated by blank
/// lines, or [`NO_EVIDENCE`] when there are none.
pub fn render_context(chunks: &[RetrievedChunk]) -> String {
    if chunks.is_empty() {
        return NO_EVIDENCE.to_string();
    }
    chunks
        .iter()
        .map(|r| format!("[Chunk {}] {}", r.chunk.metadata.chunk, r.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Assemble the per-turn user prompt for the document chat.
pub fn build_user_prompt(context: &str, transcript: &str, question: &str) -> String {
    format!(
        "\nDocument Context (Fictional/Academic):\n{context}\n\n\
         Previous Conversation:\n{transcript}\n\n\
         User Question:\n{question}\n\n\
         Answer based ONLY on the document evidence.\n\
         If information is missing, say: \"{INSUFFICIENT_EVIDENCE}\"\n"
    )
}

/// Wrap pasted log data for the first timeline analysis request.
pub fn timeline_artifact_prompt(input: &str) -> String {
    format!("{}{}", TIMELINE_ARTIFACT_PREFIX, input)
}
