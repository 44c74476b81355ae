//! photo-organizer - content-deduplicating media organizer
//!
//! Gathers media files from one or more source trees, keeps exactly one copy
//! of each distinct content, and copies the survivors into a destination tree
//! keyed by capture date.
//!
//! The pipeline:
//! 1. [`scanner`] walks the sources and fingerprints files (FNV-1a over a short prefix)
//! 2. [`duplicates`] spreads paths over partition workers with private
//!    registries, then merges them into one content-unique registry
//! 3. [`organize`] resolves capture dates, plans destination paths and copies

pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod organize;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use crate::cli::{Cli, OutputFormat};
use crate::config::{paths_overlap, Config};
use crate::duplicates::{DedupReport, DuplicateFinder, FinderConfig};
use crate::error::ExitCode;
use crate::organize::{
    DateResolver, FileSystemMetadata, OrganizeConfig, OrganizeSummary, Organizer,
};
use crate::output::RunSummary;
use crate::progress::{Progress, ProgressCallback};
use crate::signal::ShutdownHandler;

/// Load the configuration for `cli`: file, profile, environment, then flags.
///
/// # Errors
///
/// Returns an error if an explicit `--config` file does not exist or the
/// merged settings are invalid.
pub fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config {
        Some(ref path) => {
            if !path.is_file() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Config::load_from_path(path.clone(), cli.profile.as_deref())
        }
        None => Config::load(cli.profile.as_deref()),
    };
    config.merge_cli(cli);
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

/// Run the whole pipeline and return its summary without printing it.
///
/// # Errors
///
/// Returns an error for invalid arguments or configuration, a destination
/// overlapping a source, a traversal or merge failure, or a destination that
/// cannot be prepared.
pub fn run(cli: &Cli) -> Result<RunSummary> {
    let config = load_config(cli)?;
    run_with_config(cli, &config)
}

fn run_with_config(cli: &Cli, config: &Config) -> Result<RunSummary> {
    let start = Instant::now();
    let destination = cli
        .destination()
        .context("Expected at least one source and a destination")?
        .to_path_buf();
    let sources = cli.sources().to_vec();

    for source in &sources {
        if paths_overlap(source, &destination) {
            anyhow::bail!(
                "Destination {} overlaps source {}",
                destination.display(),
                source.display()
            );
        }
    }

    log::debug!("Configuration: {:?}", config);

    let handler = signal::install_handler();
    let progress: Option<Arc<dyn ProgressCallback>> =
        if cli.quiet || config.output == OutputFormat::Json {
            None
        } else {
            Some(Arc::new(Progress::new(false)))
        };

    let mut finder_config = FinderConfig::default()
        .with_workers(config.workers)
        .with_queue_capacity(config.queue_capacity)
        .with_fingerprint_prefix(config.fingerprint_prefix)
        .with_walker_config(config.walker_config())
        .with_shutdown_flag(handler.get_flag());
    if let Some(ref callback) = progress {
        finder_config = finder_config.with_progress_callback(Arc::clone(callback));
    }

    let mut report = DuplicateFinder::new(finder_config)
        .find_unique_in_roots(&sources)
        .context("Deduplication failed")?;
    log::info!(
        "{} files seen, {} unique",
        report.summary.total_files,
        report.summary.unique_files
    );

    let organize = organize_phase(
        cli,
        config,
        &destination,
        &mut report,
        &handler,
        progress.as_ref(),
    )?;

    Ok(RunSummary::new(
        sources,
        destination,
        &report.summary,
        organize,
        start.elapsed(),
    ))
}

/// Clear the destination and copy the survivors, unless a shutdown has been
/// requested at any point up to now.
///
/// The flag is read again here because a request can land after the engine
/// returned; `report.summary.interrupted` is updated to match.
fn organize_phase(
    cli: &Cli,
    config: &Config,
    destination: &Path,
    report: &mut DedupReport,
    handler: &ShutdownHandler,
    progress: Option<&Arc<dyn ProgressCallback>>,
) -> Result<OrganizeSummary> {
    report.summary.interrupted |= handler.is_shutdown_requested();
    if report.summary.interrupted {
        log::warn!("Interrupted before organizing; destination left untouched");
        return Ok(OrganizeSummary {
            dry_run: cli.dry_run,
            ..OrganizeSummary::default()
        });
    }

    if !cli.dry_run {
        prepare_destination(destination, cli.keep_destination)?;
    }

    let mut organize_config = OrganizeConfig::new(destination)
        .with_io_threads(config.io_threads)
        .with_dry_run(cli.dry_run)
        .with_keep_existing(cli.keep_destination)
        .with_shutdown_flag(handler.get_flag());
    if let Some(callback) = progress {
        organize_config = organize_config.with_progress_callback(Arc::clone(callback));
    }

    let resolver = DateResolver::new(Box::new(FileSystemMetadata::new(config.use_file_mtime)));
    Ok(Organizer::new(organize_config)
        .with_resolver(resolver)
        .organize(report.registry.iter()))
}

/// Run the application and print the summary.
///
/// # Errors
///
/// See [`run`]; also fails if the summary cannot be written to stdout.
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    let summary = run_with_config(&cli, &config)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    match config.output {
        OutputFormat::Json => summary
            .write_json(&mut out, true)
            .context("Failed to write summary")?,
        OutputFormat::Text if !cli.quiet => summary
            .write_text(&mut out)
            .context("Failed to write summary")?,
        OutputFormat::Text => {}
    }
    out.flush().context("Failed to write summary")?;

    Ok(summary.exit_code())
}

/// Clear (unless `keep`) and create the destination root.
fn prepare_destination(destination: &Path, keep: bool) -> Result<()> {
    if !keep && destination.exists() {
        log::info!("Clearing destination {}", destination.display());
        fs::remove_dir_all(destination)
            .with_context(|| format!("Failed to clear {}", destination.display()))?;
    }
    fs::create_dir_all(destination)
        .with_context(|| format!("Failed to create {}", destination.display()))
}
