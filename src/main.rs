//! Veles CLI - Command-line tool for reading Bethesda BSA archives.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use veles::prelude::*;

/// Veles - BSA game archive reading tool
#[derive(Parser)]
#[command(name = "veles")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List contents of a BSA archive
    List {
        /// Path to the BSA file
        #[arg(short, long, env = "INPUT_BSA")]
        bsa: PathBuf,

        /// Filter pattern (substring match)
        #[arg(short, long)]
        filter: Option<String>,

        /// Show detailed information
        #[arg(short, long)]
        detailed: bool,
    },

    /// Extract files from a BSA archive
    Extract {
        /// Path to the BSA file
        #[arg(short, long, env = "INPUT_BSA")]
        bsa: PathBuf,

        /// Output directory
        #[arg(short, long, env = "OUTPUT_FOLDER")]
        output: PathBuf,

        /// Filter pattern (substring match)
        #[arg(short, long)]
        filter: Option<String>,

        /// External decompression tool to try when a payload is rejected
        #[arg(long)]
        fallback_tool: Option<PathBuf>,
    },

    /// Write one archived file to stdout or a file
    Cat {
        /// Path to the BSA file
        #[arg(short, long, env = "INPUT_BSA")]
        bsa: PathBuf,

        /// Composite path inside the archive (folder\file)
        path: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show archive header information
    Info {
        /// Path to the BSA file
        #[arg(short, long, env = "INPUT_BSA")]
        bsa: PathBuf,
    },

    /// Scan a directory and summarize every BSA archive in it
    Scan {
        /// Directory containing BSA files
        #[arg(short, long, env = "DATA_FOLDER")]
        dir: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::List { bsa, filter, detailed } => {
            cmd_list(&bsa, filter.as_deref(), detailed)?;
        }
        Commands::Extract { bsa, output, filter, fallback_tool } => {
            cmd_extract(&bsa, &output, filter.as_deref(), fallback_tool)?;
        }
        Commands::Cat { bsa, path, output } => {
            cmd_cat(&bsa, &path, output.as_deref())?;
        }
        Commands::Info { bsa } => {
            cmd_info(&bsa)?;
        }
        Commands::Scan { dir } => {
            cmd_scan(&dir)?;
        }
    }

    Ok(())
}

fn cmd_list(bsa_path: &PathBuf, filter: Option<&str>, detailed: bool) -> Result<()> {
    let archive = Bsa::open(bsa_path).context("Failed to open BSA archive")?;

    let mut count = 0;
    for path in archive.paths() {
        if let Some(pattern) = filter {
            if !substring_match(pattern, path) {
                continue;
            }
        }

        if detailed {
            if let Some(record) = archive.find(path) {
                println!(
                    "{:>12} {} {}",
                    record.size,
                    if record.compressed { "C" } else { " " },
                    path
                );
            }
        } else {
            println!("{path}");
        }
        count += 1;
    }

    println!("\nTotal: {count} files");

    Ok(())
}

fn cmd_extract(
    bsa_path: &PathBuf,
    output: &PathBuf,
    filter: Option<&str>,
    fallback_tool: Option<PathBuf>,
) -> Result<()> {
    println!("Opening BSA archive: {}", bsa_path.display());

    let start = Instant::now();
    let mut archive = Bsa::open(bsa_path).context("Failed to open BSA archive")?;
    if let Some(tool) = fallback_tool {
        archive = archive.with_fallback_tool(FallbackTool::new(tool));
    }

    println!(
        "Indexed {} files in {:?}",
        archive.paths().len(),
        start.elapsed()
    );

    let paths: Vec<String> = archive
        .paths()
        .iter()
        .filter(|p| filter.map_or(true, |pattern| substring_match(pattern, p)))
        .cloned()
        .collect();

    println!("Extracting {} files...", paths.len());

    let pb = ProgressBar::new(paths.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    fs::create_dir_all(output)?;

    let start = Instant::now();
    let mut errors = 0;
    for path in &paths {
        let output_path = output.join(path.replace('\\', "/"));

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)?;
        }

        match archive.load(path) {
            Ok(data) => fs::write(&output_path, data)?,
            Err(e) => {
                eprintln!("Error extracting {path}: {e}");
                errors += 1;
            }
        }

        pb.inc(1);
    }

    pb.finish_with_message("Done");
    println!(
        "Extraction completed in {:?} ({errors} errors)",
        start.elapsed()
    );

    Ok(())
}

fn cmd_cat(bsa_path: &PathBuf, path: &str, output: Option<&std::path::Path>) -> Result<()> {
    let archive = Bsa::open(bsa_path).context("Failed to open BSA archive")?;
    let data = archive
        .load(path)
        .with_context(|| format!("Failed to load {path}"))?;

    match output {
        Some(out) => fs::write(out, data).context("Failed to write output file")?,
        None => std::io::stdout().write_all(&data)?,
    }

    Ok(())
}

fn cmd_info(bsa_path: &PathBuf) -> Result<()> {
    let archive = Bsa::open(bsa_path).context("Failed to open BSA archive")?;

    println!("Archive:  {}", archive.name());
    println!("Version:  {}", archive.version());
    println!("Flags:    {:#010x}", archive.archive_flags());
    println!("Category: {}", archive.category());
    println!("Folders:  {}", archive.folders().len());
    println!("Files:    {}", archive.paths().len());

    Ok(())
}

fn cmd_scan(dir: &PathBuf) -> Result<()> {
    let start = Instant::now();
    let mut repo = BsaRepository::new();
    repo.open_dir(dir).context("Failed to scan directory")?;

    for archive in repo.archives() {
        println!(
            "{:>7} v{} {:>8} files  {}",
            archive.category().to_string(),
            archive.version(),
            archive.paths().len(),
            archive.name()
        );
    }

    println!("\n{} archives in {:?}", repo.len(), start.elapsed());

    Ok(())
}

/// Case-insensitive substring filter for list/extract.
fn substring_match(pattern: &str, path: &str) -> bool {
    path.to_lowercase().contains(&pattern.to_lowercase())
}
