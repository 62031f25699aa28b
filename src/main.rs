use anyhow::Result;
use clap::Parser;
use memory_extract::{
    clean_input_path, count_phrase, default_output_path, document, extract, parse_messages,
    render_report, truncate_chars, write_report, ExtractConfig, ExtractError, Extraction,
    ReportContext, DEFAULT_PHRASE,
};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Exported chat HTML file. Prompted for on stdin when omitted.
    input: Option<PathBuf>,

    /// Report path. Defaults to `<input stem>_extracted_with_debug.txt`.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Phrase the assistant writes right after a stored memory.
    #[arg(short, long, default_value = DEFAULT_PHRASE)]
    phrase: String,

    /// Log every classified block.
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .init();
}

fn prompt(question: &str) -> Result<String> {
    print!("{question}");
    io::stdout().flush().map_err(ExtractError::Prompt)?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(ExtractError::Prompt)?;
    Ok(line.trim().to_string())
}

fn resolve_paths(args: &Args) -> Result<(PathBuf, PathBuf)> {
    let interactive = args.input.is_none();
    let input = match &args.input {
        Some(p) => p.clone(),
        None => PathBuf::from(clean_input_path(&prompt("Enter the path to your HTML file: ")?)),
    };
    if !input.is_file() {
        return Err(ExtractError::InputNotFound(input).into());
    }

    let mut out = args.out.clone().unwrap_or_else(|| default_output_path(&input));
    if interactive && args.out.is_none() {
        let custom = prompt(&format!(
            "Output will be saved as '{}'. Press Enter to continue or type a new filename: ",
            out.display()
        ))?;
        if !custom.is_empty() {
            out = PathBuf::from(custom);
        }
    }
    Ok((input, out))
}

fn print_summary(phrase: &str, extraction: &Extraction, out: &Path, manual_count: usize) {
    println!("=== EXTRACTION AND DEBUG REPORT ===");
    println!("Total <pre class='message'> blocks found: {}", extraction.total_blocks);
    println!();
    println!("Total instances of '{}' found: {}", phrase, extraction.marker_count());
    println!("Successfully extracted: {}", extraction.extracted.len());
    println!("Skipped instances: {}", extraction.skipped.len());

    if !extraction.skipped.is_empty() {
        println!("\n=== SKIPPED MEMORIES SUMMARY ===");
        for (reason, records) in extraction.skipped_by_reason() {
            println!("{}: {} instances", reason, records.len());
            for (i, rec) in records.iter().enumerate() {
                println!("  {}. Block {}", i + 1, rec.position);
                if let Some(preview) = rec.previous_content_preview.as_deref() {
                    println!("     Content: {}", truncate_chars(preview, 60));
                }
            }
        }
    }

    println!("\nResults saved to: {}", out.display());
    println!("\nVerification: Manual count of '{}' in HTML: {}", phrase, manual_count);

    if !extraction.extracted.is_empty() {
        println!("\nExtracted memories preview:");
        for (i, rec) in extraction.extracted.iter().take(3).enumerate() {
            println!("\n{}. Author: {}", i + 1, rec.author);
            println!("   Memory: {}", truncate_chars(&rec.content, 100));
            println!("   Location: Block {}", rec.source_position);
        }
        if extraction.extracted.len() > 3 {
            println!("\n... and {} more memories", extraction.extracted.len() - 3);
        }
    }
    println!("\nCheck the output file for complete results and debug information!");
}

fn run(args: &Args) -> Result<()> {
    let (input, out) = resolve_paths(args)?;
    let config = ExtractConfig::with_phrase(args.phrase.as_str());

    println!("Processing HTML file...");
    let html = document::read_html(&input)?;
    let messages = parse_messages(&html);
    tracing::info!(blocks = messages.len(), path = %input.display(), "parsed transcript");

    let extraction = extract(&messages, &config);
    let ctx = ReportContext::now(&config.phrase, &input.display().to_string());
    write_report(&out, &render_report(&ctx, &extraction))?;

    print_summary(
        &config.phrase,
        &extraction,
        &out,
        count_phrase(&html, &config.phrase),
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "extraction failed");
            match err.downcast_ref::<ExtractError>() {
                Some(ExtractError::InputNotFound(path)) => {
                    eprintln!("Error: HTML file not found at {}", path.display());
                }
                _ => eprintln!("Error processing file: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}
