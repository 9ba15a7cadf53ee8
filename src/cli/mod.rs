//! # CLI Module
//!
//! Command-line interface for the image sorter.
//!
//! ## Usage
//! ```bash
//! # Sort ./images/ with the defaults (pHash, precision 2, size factor 8)
//! img-sort sort
//!
//! # Another directory, stricter matching, nothing moved
//! img-sort --working-dir ~/Pictures sort --precision 0 --keep-in-place
//!
//! # JSON output for scripting
//! img-sort sort --output json
//!
//! # Never group these two again
//! img-sort exclude cat.png cat-drawing.png
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use image_sorter::core::cache::{FingerprintStore, SqliteStore, StoreOptions};
use image_sorter::core::hasher::FingerprintMethod;
use image_sorter::core::pipeline::{Batch, BatchReport};
use image_sorter::error::{ConfigError, Result};
use image_sorter::events::{CompareEvent, Event, EventChannel, FingerprintEvent, StageEvent};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Image Sorter - group exact and near-duplicate images
#[derive(Parser, Debug)]
#[command(name = "img-sort")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding the images to sort
    #[arg(long, global = true, default_value = "./images/")]
    working_dir: PathBuf,

    /// Fingerprint store location
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Seconds to wait on a locked store
    #[arg(long, global = true, default_value_t = 5)]
    db_timeout: u64,

    /// Run without a store: no lookups, no writes
    #[arg(long, global = true)]
    no_store: bool,

    /// Keep a store with an outdated schema instead of rebuilding it
    #[arg(long, global = true)]
    skip_migration: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Group the images of the working directory
    Sort {
        /// Fingerprint method used for comparison
        #[arg(short, long, value_enum, default_value_t = Method::Perceptual)]
        method: Method,

        /// Largest fingerprint distance still counted as alike
        #[arg(short, long, default_value_t = 2)]
        precision: u32,

        /// Resampling scale; fingerprints have size_factor² bits
        #[arg(short, long, default_value_t = 8)]
        size_factor: u32,

        /// Do not write fingerprints to the store
        #[arg(long)]
        skip_persist: bool,

        /// Report groups without moving any file
        #[arg(long)]
        keep_in_place: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Mark two images in the working directory as never alike
    Exclude {
        /// File name of the first image
        first: String,
        /// File name of the second image
        second: String,
    },

    /// Drop and recreate the store tables
    ResetStore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Method {
    /// Average Hash - Fast, good for exact duplicates
    #[value(alias = "a")]
    Average,
    /// Difference Hash - Compares brightness gradients
    #[value(alias = "d")]
    Difference,
    /// Perceptual Hash - Most robust to edits (default)
    #[value(aliases = ["p", "perception"])]
    Perceptual,
}

impl From<Method> for FingerprintMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Average => FingerprintMethod::Average,
            Method::Difference => FingerprintMethod::Difference,
            Method::Perceptual => FingerprintMethod::Perceptual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
    /// Minimal output (one group per line)
    Minimal,
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    image_sorter::init_tracing(cli.verbose);

    match &cli.command {
        Commands::Sort {
            method,
            precision,
            size_factor,
            skip_persist,
            keep_in_place,
            output,
        } => {
            let store = open_store(&cli)?;
            let mut builder = Batch::builder()
                .working_dir(&cli.working_dir)
                .method((*method).into())
                .precision(*precision)
                .size_factor(*size_factor)
                .persist(!skip_persist)
                .relocate(!keep_in_place);
            if let Some(store) = store {
                builder = builder.store(store);
            }
            run_sort(&builder.build(), *output, cli.verbose)
        }
        Commands::Exclude { first, second } => {
            let store = open_store(&cli)?.ok_or(ConfigError::StoreRequired)?;
            let batch = Batch::builder()
                .working_dir(&cli.working_dir)
                .store(store)
                .build();

            let pair = batch.exclude(first, second)?;
            println!(
                "{} {} and {} will never be grouped ({} / {})",
                style("✓").green().bold(),
                style(first).cyan(),
                style(second).cyan(),
                style(pair.first().short(12)).dim(),
                style(pair.second().short(12)).dim()
            );
            Ok(())
        }
        Commands::ResetStore => {
            if cli.no_store {
                return Err(ConfigError::StoreRequired.into());
            }
            let path = db_path(&cli);
            let store = SqliteStore::open_with(&path, &store_options(&cli))?;
            store.reset()?;
            println!(
                "{} Store reset: {}",
                style("✓").green().bold(),
                path.display()
            );
            Ok(())
        }
    }
}

fn db_path(cli: &Cli) -> PathBuf {
    cli.db_path.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("image-sorter")
            .join("image_store.db")
    })
}

fn store_options(cli: &Cli) -> StoreOptions {
    StoreOptions {
        busy_timeout: Duration::from_secs(cli.db_timeout),
        migrate: !cli.skip_migration,
    }
}

fn open_store(cli: &Cli) -> Result<Option<Arc<dyn FingerprintStore>>> {
    if cli.no_store {
        return Ok(None);
    }

    let store: Arc<dyn FingerprintStore> =
        Arc::new(SqliteStore::open_with(&db_path(cli), &store_options(cli))?);
    Ok(Some(store))
}

fn run_sort(batch: &Batch, output: OutputFormat, verbose: bool) -> Result<()> {
    let term = Term::stderr();

    if output == OutputFormat::Pretty {
        term.write_line(&format!(
            "{} {}",
            style("Image Sorter").bold().cyan(),
            style(concat!("v", env!("CARGO_PKG_VERSION"))).dim()
        ))
        .ok();
        term.write_line("").ok();
    }

    let (sender, receiver) = EventChannel::new();

    let progress = if output == OutputFormat::Pretty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );
        Some(pb)
    } else {
        None
    };

    let progress_clone = progress.clone();

    // Handle events in a separate thread
    let event_thread = thread::spawn(move || {
        let Some(pb) = progress_clone else {
            // Drain so senders never see a full channel
            for _ in receiver.iter() {}
            return;
        };

        for event in receiver.iter() {
            match event {
                Event::Stage(StageEvent::Changed { stage }) => {
                    pb.set_message(stage.to_string());
                }
                Event::Fingerprint(FingerprintEvent::Started { total_files }) => {
                    pb.set_length(total_files as u64);
                    pb.set_position(0);
                }
                Event::Fingerprint(FingerprintEvent::Progress(p)) => {
                    pb.set_position(p.completed as u64);
                    if verbose {
                        pb.set_message(format!(
                            "{}{}",
                            p.current_path
                                .file_name()
                                .unwrap_or_default()
                                .to_string_lossy(),
                            if p.cache_hit { " (cached)" } else { "" }
                        ));
                    }
                }
                Event::Compare(CompareEvent::Started { total_records }) => {
                    pb.set_length(total_records as u64);
                    pb.set_position(0);
                }
                Event::Compare(CompareEvent::Progress(p)) => {
                    pb.set_position(p.processed as u64);
                }
                Event::Stage(StageEvent::Completed { .. } | StageEvent::Failed { .. }) => {
                    pb.finish_and_clear();
                }
                _ => {}
            }
        }
    });

    let result = batch.run_with_events(&sender);

    // Drop sender to signal event thread to finish
    drop(sender);
    event_thread.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    let report = result?;

    match output {
        OutputFormat::Pretty => print_pretty_results(&term, &report, verbose),
        OutputFormat::Json => print_json_results(&report),
        OutputFormat::Minimal => print_minimal_results(&report),
    }

    Ok(())
}

fn print_pretty_results(term: &Term, report: &BatchReport, verbose: bool) {
    term.write_line(&format!("{} Sort Complete", style("✓").green().bold()))
        .ok();
    term.write_line("").ok();

    term.write_line(&format!(
        "  {} images processed in {:.1}s",
        style(report.total_files).cyan(),
        report.duration_ms as f64 / 1000.0
    ))
    .ok();
    term.write_line(&format!(
        "  {} alike groups covering {} files",
        style(report.groups.len()).cyan(),
        style(report.grouped_files()).cyan()
    ))
    .ok();

    if report.cache_hits > 0 {
        term.write_line(&format!(
            "  {} fingerprints loaded from the store",
            style(report.cache_hits).dim()
        ))
        .ok();
    }
    if verbose {
        term.write_line(&format!(
            "  {} comparisons, {} records persisted",
            style(report.comparisons).dim(),
            style(report.persisted).dim()
        ))
        .ok();
    }

    term.write_line("").ok();

    if report.groups.is_empty() {
        term.write_line(&format!("  {}", style("No alike images found.").green()))
            .ok();
    } else {
        for (i, group) in report.groups.iter().enumerate() {
            let location = group
                .directory
                .as_ref()
                .and_then(|d| d.file_name())
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "kept in place".to_string());

            term.write_line(&format!(
                "  {} {} ({} files)",
                style(format!("Group {}:", i + 1)).bold(),
                style(location).yellow(),
                group.file_count()
            ))
            .ok();

            for (idx, member) in group.members.iter().enumerate() {
                let marker = if idx == 0 {
                    style("★").green().to_string()
                } else {
                    style("○").dim().to_string()
                };
                term.write_line(&format!("    {} {}", marker, member.name)).ok();

                for duplicate in &member.exact_duplicates {
                    term.write_line(&format!("      {} {}", style("=").dim(), duplicate))
                        .ok();
                }
            }

            term.write_line("").ok();
        }
    }

    if !report.errors.is_empty() {
        term.write_line(&format!(
            "{}",
            style(format!("{} problems:", report.errors.len()))
                .yellow()
                .bold()
        ))
        .ok();
        for error in &report.errors {
            term.write_line(&format!("  {} {}", style("!").yellow(), error))
                .ok();
        }
    }
}

fn print_json_results(report: &BatchReport) {
    match serde_json::to_string_pretty(report) {
        Ok(json) => println!("{}", json),
        Err(e) => tracing::error!(error = %e, "Failed to serialize report"),
    }
}

fn print_minimal_results(report: &BatchReport) {
    for group in &report.groups {
        let names: Vec<&str> = group
            .members
            .iter()
            .flat_map(|m| {
                std::iter::once(m.name.as_str()).chain(m.exact_duplicates.iter().map(String::as_str))
            })
            .collect();
        println!("{}", names.join("\t"));
    }
}
