//! Pulls "memories" out of exported chat transcripts: the message right before each
//! assistant block containing a marker phrase.

pub mod document;
pub mod error;
pub mod extract;
pub mod report;

use std::path::{Path, PathBuf};

pub use document::{load_messages, parse_messages, MessageNode};
pub use error::ExtractError;
pub use extract::{
    extract, ExtractConfig, ExtractedRecord, Extraction, SkipReason, SkippedRecord,
    ASSISTANT_SENTINEL, DEFAULT_PHRASE,
};
pub use report::{render_report, write_report, ReportContext};

pub const OUTPUT_SUFFIX: &str = "_extracted_with_debug.txt";

/// `<input stem>_extracted_with_debug.txt`, relative to the working directory.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    PathBuf::from(format!("{stem}{OUTPUT_SUFFIX}"))
}

/// Trims a pasted path and drops surrounding quote characters.
pub fn clean_input_path(raw: &str) -> String {
    raw.trim().trim_matches(|c| c == '"' || c == '\'').to_string()
}

/// Non-overlapping, case-insensitive occurrences of `phrase` in `haystack`.
pub fn count_phrase(haystack: &str, phrase: &str) -> usize {
    let phrase = phrase.to_lowercase();
    if phrase.is_empty() {
        return 0;
    }
    haystack.to_lowercase().matches(phrase.as_str()).count()
}

pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
