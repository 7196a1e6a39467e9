//! pdfdump CLI - PDF internal structure dumping tool
//!
//! Renders the trailers, objects, and pages of PDF files as pseudo-XML
//! and extracts embedded file attachments.

use clap::Parser;
use colored::*;
use pdfdump::{dump, extract_embedded_files, Document, DumpOptions, LoadOptions, StreamMode};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

/// Dump the internal structure of PDF files
#[derive(Parser, Debug)]
#[command(
    name = "pdfdump",
    version,
    about = "Dump the internal structure of PDF files as pseudo-XML",
    long_about = "pdfdump - PDF object graph inspection tool.\n\n\
                  Dumps cross reference trailers, indirect objects, and page\n\
                  contents as pseudo-XML, and extracts embedded files. With no\n\
                  selector flags only the trailers are dumped."
)]
struct Cli {
    /// Object ids to dump, comma separated
    #[arg(
        short = 'i',
        long = "objects",
        value_name = "ID",
        value_delimiter = ','
    )]
    objects: Vec<u32>,

    /// Page numbers to dump, comma separated, starting at 1
    #[arg(
        short = 'p',
        long = "pages",
        value_name = "PAGE",
        value_delimiter = ',',
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pages: Vec<u32>,

    /// Password for encrypted documents
    #[arg(
        short = 'P',
        long = "password",
        value_name = "PASSWORD",
        default_value = ""
    )]
    password: String,

    /// Emit stream payloads raw, without decoding
    #[arg(short = 'r', long = "raw", group = "mode")]
    raw: bool,

    /// Emit stream payloads decoded, without markup
    #[arg(short = 'b', long = "binary", group = "mode")]
    binary: bool,

    /// Emit stream payloads decoded and escaped inside the markup
    #[arg(short = 't', long = "text", group = "mode")]
    text: bool,

    /// Dump every object of every revision
    #[arg(short = 'a', long = "all")]
    all: bool,

    /// Extract embedded files into this directory instead of dumping
    #[arg(short = 'E', long = "extract-embedded", value_name = "DIR")]
    extract_dir: Option<PathBuf>,

    /// Write output to a file instead of stdout
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    output: Option<PathBuf>,

    /// PDF files to process
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mode = if cli.raw {
        Some(StreamMode::Raw)
    } else if cli.binary {
        Some(StreamMode::Binary)
    } else if cli.text {
        Some(StreamMode::Text)
    } else {
        None
    };

    let load = LoadOptions::new().with_password(&cli.password);

    let mut options = DumpOptions::new()
        .with_object_ids(cli.objects.clone())
        .with_pages(
            cli.pages
                .iter()
                .map(|&n| (n - 1) as usize)
                .collect::<Vec<_>>(),
        )
        .with_dump_all(cli.all);
    if let Some(mode) = mode {
        options = options.with_mode(mode);
    }

    let mut sink: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(io::stdout().lock()),
    };

    for file in &cli.files {
        let doc = Document::open_with(file, &load)?;

        match &cli.extract_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                for path in extract_embedded_files(&doc, dir)? {
                    eprintln!("{} {}", "extracted:".green().bold(), path.display());
                }
            }
            None => {
                sink.write_all(&dump(&doc, &options)?)?;
            }
        }
    }
    sink.flush()?;

    Ok(())
}
