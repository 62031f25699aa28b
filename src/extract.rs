use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::document::MessageNode;

pub const DEFAULT_PHRASE: &str = "Model set context updated";
pub const ASSISTANT_SENTINEL: &str = "ChatGPT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractConfig {
    pub phrase: String,
    /// Case-sensitive substring the marker block's author label must contain.
    pub assistant_sentinel: String,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            phrase: DEFAULT_PHRASE.to_string(),
            assistant_sentinel: ASSISTANT_SENTINEL.to_string(),
        }
    }
}

impl ExtractConfig {
    pub fn with_phrase(phrase: impl Into<String>) -> Self {
        Self {
            phrase: phrase.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SkipReason {
    NoPreviousMessage,
    InvalidPreviousStructure,
    EmptyPreviousContent,
    DuplicateContent,
}

impl SkipReason {
    pub fn label(self) -> &'static str {
        match self {
            SkipReason::NoPreviousMessage => "No previous message (first in conversation)",
            SkipReason::InvalidPreviousStructure => "Invalid previous block structure",
            SkipReason::EmptyPreviousContent => "Empty previous content",
            SkipReason::DuplicateContent => "Duplicate content",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedRecord {
    pub author: String,
    pub content: String,
    /// Index of the marker block, not of the block the content came from.
    pub source_position: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    pub position: usize,
    pub reason: SkipReason,
    pub previous_content_preview: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub extracted: Vec<ExtractedRecord>,
    pub skipped: Vec<SkippedRecord>,
    pub total_blocks: usize,
}

impl Extraction {
    pub fn marker_count(&self) -> usize {
        self.extracted.len() + self.skipped.len()
    }

    pub fn skipped_by_reason(&self) -> BTreeMap<SkipReason, Vec<&SkippedRecord>> {
        let mut groups: BTreeMap<SkipReason, Vec<&SkippedRecord>> = BTreeMap::new();
        for s in &self.skipped {
            groups.entry(s.reason).or_default().push(s);
        }
        groups
    }
}

pub fn is_marker(node: &MessageNode, config: &ExtractConfig) -> bool {
    if !node
        .raw_text
        .to_lowercase()
        .contains(&config.phrase.to_lowercase())
    {
        return false;
    }
    node.author_label
        .as_deref()
        .map(|a| a.contains(config.assistant_sentinel.as_str()))
        .unwrap_or(false)
}

enum Outcome {
    Extracted(ExtractedRecord),
    Skipped(SkippedRecord),
}

fn classify(
    nodes: &[MessageNode],
    position: usize,
    seen: &mut HashSet<String>,
) -> Outcome {
    let skip = |reason: SkipReason, preview: Option<String>| {
        Outcome::Skipped(SkippedRecord {
            position,
            reason,
            previous_content_preview: preview,
        })
    };

    let Some(prev) = position.checked_sub(1).and_then(|p| nodes.get(p)) else {
        return skip(SkipReason::NoPreviousMessage, None);
    };
    let (Some(author), Some(field)) = (prev.author_label.as_deref(), prev.content_fields.get(1))
    else {
        return skip(SkipReason::InvalidPreviousStructure, None);
    };

    let content = field.trim();
    if content.is_empty() {
        return skip(SkipReason::EmptyPreviousContent, None);
    }
    if seen.contains(content) {
        return skip(SkipReason::DuplicateContent, Some(content.to_string()));
    }
    seen.insert(content.to_string());
    Outcome::Extracted(ExtractedRecord {
        author: author.trim().to_string(),
        content: content.to_string(),
        source_position: position,
    })
}

pub fn extract(nodes: &[MessageNode], config: &ExtractConfig) -> Extraction {
    let mut out = Extraction {
        total_blocks: nodes.len(),
        ..Extraction::default()
    };
    let mut seen: HashSet<String> = HashSet::new();

    for (i, node) in nodes.iter().enumerate() {
        if !is_marker(node, config) {
            continue;
        }
        match classify(nodes, i, &mut seen) {
            Outcome::Extracted(rec) => {
                tracing::debug!(position = i, author = %rec.author, "extracted memory");
                out.extracted.push(rec);
            }
            Outcome::Skipped(rec) => {
                tracing::debug!(position = i, reason = %rec.reason, "skipped memory");
                out.skipped.push(rec);
            }
        }
    }

    tracing::info!(
        markers = out.marker_count(),
        extracted = out.extracted.len(),
        skipped = out.skipped.len(),
        "extraction finished"
    );
    out
}
