//! Plain-text report of extracted and skipped memories.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use crate::error::{ExtractError, Result};
use crate::extract::Extraction;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const GUIDANCE: &str = "\nHOW TO FIND BLOCKS MANUALLY:
1. Open your HTML file in a text editor (Notepad++, VS Code, etc.)
2. Use Ctrl+F to search for the text previews shown above
3. Block position X means it's the X-th <pre class=\"message\"> tag in the file
4. You can also search for '<pre class=\"message\">' and count to find the right block
";

#[derive(Debug, Clone)]
pub struct ReportContext {
    pub phrase: String,
    pub timestamp: String,
    pub source: String,
}

impl ReportContext {
    pub fn now(phrase: &str, source: &str) -> Self {
        Self {
            phrase: phrase.to_string(),
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            source: source.to_string(),
        }
    }
}

fn rule(ch: char, n: usize) -> String {
    std::iter::repeat(ch).take(n).collect()
}

// `write!` into a String cannot fail.
pub fn render_report(ctx: &ReportContext, extraction: &Extraction) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Memories are the paragraph before the phrase: '{}'", ctx.phrase);
    let _ = writeln!(out, "Extraction date: {}", ctx.timestamp);
    let _ = writeln!(out, "Source file: {}", ctx.source);
    let _ = writeln!(out, "Total memories found: {}", extraction.marker_count());
    let _ = writeln!(out, "Successfully extracted memories: {}", extraction.extracted.len());
    let _ = writeln!(out, "Skipped memory records: {}", extraction.skipped.len());
    let _ = writeln!(out, "{}\n", rule('=', 50));

    out.push_str("EXTRACTED MEMORIES:\n");
    let _ = writeln!(out, "{}\n", rule('=', 30));

    for (i, rec) in extraction.extracted.iter().enumerate() {
        let _ = writeln!(out, "Memory {} (Author: {}):", i + 1, rec.author);
        let _ = writeln!(out, "Block position: {}", rec.source_position);
        let _ = writeln!(out, "Content: {}", rec.content);
        let _ = writeln!(out, "\n{}\n", rule('-', 30));
    }

    if extraction.skipped.is_empty() {
        return out;
    }

    out.push_str("\n\nSKIPPED MEMORIES DEBUG INFO:\n");
    let _ = writeln!(out, "{}\n", rule('=', 35));

    for (reason, records) in extraction.skipped_by_reason() {
        let _ = writeln!(
            out,
            "{}: {} memories",
            reason.label().to_uppercase(),
            records.len()
        );
        let _ = writeln!(out, "{}", rule('-', 40));

        for (k, rec) in records.iter().enumerate() {
            let _ = writeln!(out, "\nSkipped memory record {}:", k + 1);
            let _ = writeln!(
                out,
                "  Block position: {} (out of {} total blocks)",
                rec.position, extraction.total_blocks
            );
            if let Some(preview) = rec.previous_content_preview.as_deref().filter(|p| !p.is_empty()) {
                let _ = writeln!(out, "  Memory: {}", preview);
            }
            let _ = writeln!(out, "  {}", rule('-', 30));
        }
        out.push('\n');
    }

    out.push_str(GUIDANCE);
    out
}

pub fn write_report(path: &Path, report: &str) -> Result<()> {
    fs::write(path, report).map_err(|source| ExtractError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), bytes = report.len(), "report written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{ExtractedRecord, SkipReason, SkippedRecord};

    fn ctx() -> ReportContext {
        ReportContext {
            phrase: "Model set context updated".into(),
            timestamp: "2025-01-02 03:04:05".into(),
            source: "chat.html".into(),
        }
    }

    fn sample() -> Extraction {
        Extraction {
            extracted: vec![ExtractedRecord {
                author: "user".into(),
                content: "Hello".into(),
                source_position: 1,
            }],
            skipped: vec![
                SkippedRecord {
                    position: 7,
                    reason: SkipReason::DuplicateContent,
                    previous_content_preview: Some("Hello".into()),
                },
                SkippedRecord {
                    position: 0,
                    reason: SkipReason::NoPreviousMessage,
                    previous_content_preview: None,
                },
            ],
            total_blocks: 8,
        }
    }

    #[test]
    fn header_lists_counts_and_source() {
        let report = render_report(&ctx(), &sample());
        let expected_header = "Memories are the paragraph before the phrase: 'Model set context updated'\n\
Extraction date: 2025-01-02 03:04:05\n\
Source file: chat.html\n\
Total memories found: 3\n\
Successfully extracted memories: 1\n\
Skipped memory records: 2\n";
        assert!(report.starts_with(expected_header));
    }

    #[test]
    fn extracted_entry_layout() {
        let report = render_report(&ctx(), &sample());
        assert!(report.contains(
            "Memory 1 (Author: user):\nBlock position: 1\nContent: Hello\n\n------------------------------\n\n"
        ));
    }

    #[test]
    fn skipped_groups_follow_reason_order_with_previews() {
        let report = render_report(&ctx(), &sample());
        let no_prev = report
            .find("NO PREVIOUS MESSAGE (FIRST IN CONVERSATION): 1 memories")
            .unwrap();
        let dup = report.find("DUPLICATE CONTENT: 1 memories").unwrap();
        assert!(no_prev < dup);
        assert!(report.contains("  Block position: 7 (out of 8 total blocks)\n  Memory: Hello\n"));
        assert!(report.contains("  Block position: 0 (out of 8 total blocks)\n  ---"));
        assert!(report.contains("HOW TO FIND BLOCKS MANUALLY:"));
    }

    #[test]
    fn no_skip_section_without_skips() {
        let mut extraction = sample();
        extraction.skipped.clear();
        let report = render_report(&ctx(), &extraction);
        assert!(!report.contains("SKIPPED MEMORIES DEBUG INFO"));
        assert!(!report.contains("HOW TO FIND BLOCKS MANUALLY"));
    }

    #[test]
    fn empty_extraction_still_has_header() {
        let report = render_report(&ctx(), &Extraction::default());
        assert!(report.contains("Total memories found: 0\n"));
        assert!(report.contains("EXTRACTED MEMORIES:\n"));
    }

    #[test]
    fn render_depends_only_on_inputs() {
        assert_eq!(render_report(&ctx(), &sample()), render_report(&ctx(), &sample()));
    }

    #[test]
    fn write_report_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old contents that are longer than the new ones").unwrap();
        write_report(&path, "new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
    }

    #[test]
    fn write_report_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let err = write_report(&path, "x").unwrap_err();
        assert!(matches!(err, ExtractError::Write { .. }));
    }
}
