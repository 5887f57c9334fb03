//! txtz - EPUB to Markdown converter

use std::process::ExitCode;

use clap::Parser;

use txtz::{book_to_markdown, read_epub, unpack_txtz, write_txtz};

#[derive(Parser)]
#[command(name = "txtz")]
#[command(version, about = "EPUB to Markdown (TXTZ) converter", long_about = None)]
#[command(after_help = "EXAMPLES:
    txtz book.epub book.txtz    Convert EPUB to TXTZ
    txtz book.epub notes.md     Convert EPUB to plain Markdown
    txtz -i book.epub           Show book metadata
    txtz -u book.txtz notes/    Unpack a TXTZ into a notes folder")]
struct Cli {
    /// Input file (EPUB, or TXTZ with --unpack)
    #[arg(value_name = "INPUT")]
    input: String,

    /// Output file (.txtz, .md, .txt) or folder with --unpack
    #[arg(value_name = "OUTPUT", required_unless_present = "info")]
    output: Option<String>,

    /// Show book metadata without converting
    #[arg(short, long)]
    info: bool,

    /// Unpack a TXTZ archive into a Markdown folder
    #[arg(short, long)]
    unpack: bool,

    /// Suppress output messages
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = if cli.info {
        show_info(&cli.input)
    } else {
        let output = cli.output.expect("output required");
        if cli.unpack {
            unpack(&cli.input, &output, cli.quiet)
        } else {
            convert(&cli.input, &output, cli.quiet)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn show_info(path: &str) -> Result<(), String> {
    let book = read_epub(path).map_err(|e| e.to_string())?;

    let meta = &book.metadata;
    println!("File: {path}");
    println!("Title: {}", meta.title);
    if !meta.authors.is_empty() {
        println!("Authors: {}", meta.authors.join(", "));
    }
    if !meta.language.is_empty() {
        println!("Language: {}", meta.language);
    }
    println!("Chapters: {}", book.spine.len());
    println!("Images: {}", book.images().len());

    Ok(())
}

fn convert(input: &str, output: &str, quiet: bool) -> Result<(), String> {
    let book = read_epub(input).map_err(|e| e.to_string())?;

    if output.ends_with(".txtz") {
        write_txtz(&book, output).map_err(|e| e.to_string())?;
    } else if output.ends_with(".md") || output.ends_with(".txt") {
        let text = book_to_markdown(&book).map_err(|e| e.to_string())?;
        std::fs::write(output, text).map_err(|e| e.to_string())?;
    } else {
        return Err(txtz::Error::UnsupportedFormat(output.to_string()).to_string());
    }

    if !quiet {
        println!("{input} -> {output}");
    }
    Ok(())
}

fn unpack(input: &str, output: &str, quiet: bool) -> Result<(), String> {
    let markdown = unpack_txtz(input, output).map_err(|e| e.to_string())?;
    if !quiet {
        println!("{input} -> {}", markdown.display());
    }
    Ok(())
}
