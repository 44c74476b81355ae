//! Command-line interface definitions for photo-organizer.
//!
//! This module defines all CLI arguments and options using the clap derive API.
//! Options left unset fall back to the loaded configuration (see [`crate::config`]).
//!
//! # Example
//!
//! ```bash
//! # Deduplicate two camera dumps into a dated library
//! photo-organizer /media/card1 /media/card2 ~/Pictures/library
//!
//! # See what would be copied, with a JSON summary
//! photo-organizer ~/Downloads ~/Pictures/library --dry-run --output json
//!
//! # Restrict to videos above 1MB, with 8 partition workers
//! photo-organizer -j 8 --ext mp4,mov --min-size 1MB /media/card ~/Videos
//!
//! # Verbose mode for debugging
//! photo-organizer -v /media/card ~/Pictures/library
//! ```

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Deduplicate media files and organize them by capture date.
///
/// Every file under the SOURCE directories is fingerprinted and compared
/// byte-for-byte against files sharing its fingerprint. One copy of each
/// distinct file is written to DEST/<year>/<month>/<fingerprint><ext>.
#[derive(Debug, Parser)]
#[command(name = "photo-organizer")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Source directories, followed by the destination directory
    #[arg(value_name = "PATH", num_args = 2.., required = true)]
    pub paths: Vec<PathBuf>,

    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Report fatal errors as JSON on stderr
    #[arg(long)]
    pub json_errors: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Named profile from the configuration file
    #[arg(long, value_name = "NAME")]
    pub profile: Option<String>,

    /// Summary format
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Number of partition workers (0 = one per CPU)
    #[arg(short = 'j', long, value_name = "N")]
    pub workers: Option<usize>,

    /// Capacity of the queue feeding the workers (0 = hand-off)
    #[arg(long, value_name = "N")]
    pub queue_capacity: Option<usize>,

    /// Bytes hashed for each fingerprint
    #[arg(long, value_name = "BYTES")]
    pub prefix_bytes: Option<usize>,

    /// Number of concurrent copies
    ///
    /// Lower values reduce disk thrashing on HDDs.
    #[arg(long, value_name = "N")]
    pub io_threads: Option<usize>,

    /// File extensions to include (comma-separated, replaces the configured list)
    #[arg(short, long = "ext", value_name = "EXT", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Minimum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub min_size: Option<u64>,

    /// Maximum file size to consider (e.g., 1KB, 1MB, 1GB)
    ///
    /// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
    #[arg(long, value_name = "SIZE", value_parser = parse_size)]
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (can be specified multiple times)
    #[arg(short, long = "ignore", value_name = "PATTERN")]
    pub ignore_patterns: Vec<String>,

    /// Follow symbolic links during discovery
    ///
    /// Symlink cycles abort the run.
    #[arg(long, overrides_with = "no_follow_symlinks")]
    pub follow_symlinks: bool,

    /// Do not follow symbolic links
    #[arg(long, overrides_with = "follow_symlinks")]
    pub no_follow_symlinks: bool,

    /// Skip hidden files and directories (starting with .)
    #[arg(long, overrides_with = "no_skip_hidden")]
    pub skip_hidden: bool,

    /// Include hidden files and directories
    #[arg(long, overrides_with = "skip_hidden")]
    pub no_skip_hidden: bool,

    /// Do not date files by their modification time
    #[arg(long)]
    pub no_mtime: bool,

    /// Plan and report without creating or copying anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Do not clear the destination first; existing files are never overwritten
    #[arg(long)]
    pub keep_destination: bool,
}

impl Cli {
    /// Source roots, in command-line order.
    #[must_use]
    pub fn sources(&self) -> &[PathBuf] {
        self.paths.split_last().map_or(&[], |(_, sources)| sources)
    }

    /// Destination root.
    #[must_use]
    pub fn destination(&self) -> Option<&Path> {
        if self.paths.len() < 2 {
            return None;
        }
        self.paths.last().map(PathBuf::as_path)
    }
}

/// Output format for the run summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Parse a human-readable size string into bytes.
///
/// Supports suffixes: B, KB, KiB, MB, MiB, GB, GiB, TB, TiB
/// Case-insensitive. Numbers without suffix are treated as bytes.
///
/// # Examples
///
/// ```
/// use photo_organizer::cli::parse_size;
///
/// assert_eq!(parse_size("1024").unwrap(), 1024);
/// assert_eq!(parse_size("1KB").unwrap(), 1000);
/// assert_eq!(parse_size("1KiB").unwrap(), 1024);
/// assert_eq!(parse_size("1MB").unwrap(), 1_000_000);
/// assert_eq!(parse_size("1MiB").unwrap(), 1_048_576);
/// ```
/// # Errors
///
/// Returns an error if the string is empty, contains an invalid number,
/// a negative number, or an unknown size suffix.
pub fn parse_size(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("Size cannot be empty".to_string());
    }

    let (num_str, suffix) = match s.find(|c: char| !c.is_ascii_digit() && c != '.') {
        Some(idx) => (&s[..idx], s[idx..].trim().to_uppercase()),
        None => (s, String::new()),
    };

    let num: f64 = num_str
        .parse()
        .map_err(|_| format!("Invalid number: '{num_str}'"))?;

    if num < 0.0 {
        return Err("Size cannot be negative".to_string());
    }

    let multiplier: u64 = match suffix.as_str() {
        "" | "B" => 1,
        "KB" | "K" => 1_000,
        "KIB" => 1_024,
        "MB" | "M" => 1_000_000,
        "MIB" => 1_048_576,
        "GB" | "G" => 1_000_000_000,
        "GIB" => 1_073_741_824,
        "TB" | "T" => 1_000_000_000_000,
        "TIB" => 1_099_511_627_776,
        _ => return Err(format!("Unknown size suffix: '{suffix}'")),
    };

    Ok((num * multiplier as f64) as u64)
}
