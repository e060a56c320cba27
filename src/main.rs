mod export;
mod extract;
mod normalizer;
mod pdf;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use extract::{ExtractError, RawPage};

#[derive(Parser)]
#[command(
    name = "carga_normalizador",
    about = "Normalizes Profesor-Asignatura teaching-load PDFs into flat spreadsheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize documents and export one workbook each
    Run {
        /// Input documents: .pdf files or .csv raw table dumps.
        /// Default: every PDF in the current directory.
        inputs: Vec<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
        /// Also write a CSV next to each workbook
        #[arg(long)]
        csv: bool,
    },
    /// Dump the raw detected tables of one document to CSV
    Raw {
        /// Input document (.pdf)
        input: PathBuf,
        /// Output directory
        #[arg(short, long, default_value = "out")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run { inputs, out, csv } => run_batch(inputs, &out, csv),
        Commands::Raw { input, out } => dump_raw(&input, &out),
    }
}

/// Pick the source by extension: raw-dump CSVs round-trip straight back into
/// pages, everything else goes through the PDF table detector.
fn load_pages(path: &Path) -> Result<Vec<RawPage>, ExtractError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => extract::read_raw_dump(path),
        _ => pdf::load_tables(path),
    }
}

fn run_batch(inputs: Vec<PathBuf>, out_dir: &Path, with_csv: bool) -> Result<()> {
    let inputs = if inputs.is_empty() {
        discover_pdfs()?
    } else {
        inputs
    };
    if inputs.is_empty() {
        println!("No PDF documents found in the current directory.");
        return Ok(());
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;
    println!("Detected {} document(s)\n", inputs.len());

    let pb = ProgressBar::new(inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len}")
            .unwrap()
            .progress_chars("#>-"),
    );

    // Documents are independent (one engine instance each); only the batch
    // fans out, never the pages within a document.
    let results: Vec<(PathBuf, Result<usize, String>)> = inputs
        .par_iter()
        .map(|path| {
            let result = process_document(path, out_dir, with_csv).map_err(|e| format!("{e:#}"));
            pb.inc(1);
            (path.clone(), result)
        })
        .collect();
    pb.finish_and_clear();

    let mut processed = 0;
    let mut failed: Vec<(String, String)> = Vec::new();
    for (path, result) in results {
        let name = display_name(&path);
        match result {
            Ok(rows) => {
                println!("  {} OK ({} rows)", name, rows);
                processed += 1;
            }
            Err(message) => failed.push((name, message)),
        }
    }

    println!("\nDone. {}/{} documents processed.", processed, inputs.len());
    if !failed.is_empty() {
        println!("Failed:");
        for (name, message) in &failed {
            println!("  - {}: {}", name, message);
        }
    }
    Ok(())
}

fn process_document(path: &Path, out_dir: &Path, with_csv: bool) -> Result<usize> {
    let pages = load_pages(path)?;
    let records = normalizer::normalize_pages(&pages);

    let stem = file_stem(path)?;
    export::write_xlsx(&records, &out_dir.join(format!("{stem}_normalizado.xlsx")))?;
    if with_csv {
        export::write_csv(&records, &out_dir.join(format!("{stem}_normalizado.csv")))?;
    }
    Ok(records.len())
}

fn dump_raw(input: &Path, out_dir: &Path) -> Result<()> {
    let pages = pdf::load_tables(input)?;
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("cannot create {}", out_dir.display()))?;

    let stem = file_stem(input)?;
    let out_path = out_dir.join(format!("{stem}_raw.csv"));
    extract::write_raw_dump(&pages, &out_path)?;

    let rows: usize = pages.iter().map(|p| p.rows.len()).sum();
    println!(
        "Extracted {} raw rows from {} page(s) -> {}",
        rows,
        pages.len(),
        out_path.display()
    );
    Ok(())
}

/// Every .pdf in the working directory, sorted by name.
fn discover_pdfs() -> Result<Vec<PathBuf>> {
    let mut pdfs: Vec<PathBuf> = std::fs::read_dir(".")
        .context("cannot read the current directory")?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
        })
        .collect();
    pdfs.sort();
    Ok(pdfs)
}

fn file_stem(path: &Path) -> Result<&str> {
    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) => Ok(stem),
        None => bail!("cannot derive an output name from {}", path.display()),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unnamed>")
        .to_string()
}
