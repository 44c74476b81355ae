//! Application configuration management.
//!
//! Settings are layered, lowest priority first:
//! 1. Built-in defaults
//! 2. `config.toml` (the `--config` path, or the platform config directory)
//! 3. The `[profile.<name>]` table selected with `--profile`
//! 4. `PHOTO_ORGANIZER_*` environment variables (`__` separates nested keys)
//! 5. Command-line flags, via [`Config::merge_cli`]

use std::path::{Path, PathBuf};

use anyhow::Result;
use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::cli::{Cli, OutputFormat};
use crate::duplicates::finder::DEFAULT_QUEUE_CAPACITY;
use crate::organize::DEFAULT_IO_THREADS;
use crate::scanner::{WalkerConfig, DEFAULT_EXTENSIONS, DEFAULT_PREFIX_SIZE};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "PHOTO_ORGANIZER_";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Partition workers (0 = one per CPU)
    pub workers: usize,
    /// Capacity of the distribution queue
    pub queue_capacity: usize,
    /// Bytes hashed for each fingerprint
    pub fingerprint_prefix: usize,
    /// Extensions accepted during discovery, without dots
    pub extensions: Vec<String>,
    /// Follow symbolic links during discovery
    pub follow_symlinks: bool,
    /// Skip hidden files and directories
    pub skip_hidden: bool,
    /// Gitignore-style patterns to skip
    pub ignore_patterns: Vec<String>,
    /// Minimum file size in bytes
    pub min_size: Option<u64>,
    /// Maximum file size in bytes
    pub max_size: Option<u64>,
    /// Concurrent copies
    pub io_threads: usize,
    /// Whether the modification time can date a file
    pub use_file_mtime: bool,
    /// Summary format
    pub output: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            fingerprint_prefix: DEFAULT_PREFIX_SIZE,
            extensions: DEFAULT_EXTENSIONS.iter().map(|s| (*s).to_string()).collect(),
            follow_symlinks: false,
            skip_hidden: false,
            ignore_patterns: Vec::new(),
            min_size: None,
            max_size: None,
            io_threads: DEFAULT_IO_THREADS,
            use_file_mtime: true,
            output: OutputFormat::Text,
        }
    }
}

impl Config {
    /// Load from the default platform-specific path.
    #[must_use]
    pub fn load(profile: Option<&str>) -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from_path(path, profile),
            None => {
                log::debug!("No platform config directory, using defaults");
                Self::load_from_figment(Self::base_figment(), profile)
            }
        }
    }

    /// Load from `path`, falling back to defaults if it is unreadable.
    ///
    /// A missing file is not an error.
    #[must_use]
    pub fn load_from_path(path: PathBuf, profile: Option<&str>) -> Self {
        let figment = Self::base_figment().merge(Toml::file(&path));
        log::debug!("Loading configuration from {}", path.display());
        Self::load_from_figment(figment, profile)
    }

    fn base_figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default()))
    }

    fn load_from_figment(mut figment: Figment, profile: Option<&str>) -> Self {
        if let Some(name) = profile {
            let key = format!("profile.{}", name);
            if figment.find_value(&key).is_ok() {
                let selected = figment.focus(&key);
                figment = figment.merge(selected);
            } else {
                log::warn!("Profile '{}' not found in configuration", name);
            }
        }

        let figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));
        match figment.extract() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Write this configuration as TOML, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "photo-organizer", "photo-organizer")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Apply command-line overrides.
    pub fn merge_cli(&mut self, cli: &Cli) {
        if let Some(workers) = cli.workers {
            self.workers = workers;
        }
        if let Some(capacity) = cli.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(prefix) = cli.prefix_bytes {
            self.fingerprint_prefix = prefix;
        }
        if let Some(threads) = cli.io_threads {
            self.io_threads = threads;
        }
        if let Some(output) = cli.output {
            self.output = output;
        }
        if !cli.extensions.is_empty() {
            self.extensions = cli.extensions.clone();
        }
        if cli.min_size.is_some() {
            self.min_size = cli.min_size;
        }
        if cli.max_size.is_some() {
            self.max_size = cli.max_size;
        }
        self.ignore_patterns
            .extend(cli.ignore_patterns.iter().cloned());

        if cli.follow_symlinks {
            self.follow_symlinks = true;
        } else if cli.no_follow_symlinks {
            self.follow_symlinks = false;
        }
        if cli.skip_hidden {
            self.skip_hidden = true;
        } else if cli.no_skip_hidden {
            self.skip_hidden = false;
        }
        if cli.no_mtime {
            self.use_file_mtime = false;
        }
    }

    /// Check the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an error for a zero fingerprint prefix, an empty extension
    /// list, or a minimum size above the maximum.
    pub fn validate(&self) -> Result<()> {
        if self.fingerprint_prefix == 0 {
            anyhow::bail!("fingerprint_prefix must be at least 1 byte");
        }
        if self
            .extensions
            .iter()
            .all(|e| e.trim_start_matches('.').is_empty())
        {
            anyhow::bail!("extensions must name at least one file extension");
        }
        if let (Some(min), Some(max)) = (self.min_size, self.max_size) {
            if min > max {
                anyhow::bail!("min_size ({}) is larger than max_size ({})", min, max);
            }
        }
        Ok(())
    }

    /// Discovery settings derived from this configuration.
    #[must_use]
    pub fn walker_config(&self) -> WalkerConfig {
        WalkerConfig {
            follow_symlinks: self.follow_symlinks,
            skip_hidden: self.skip_hidden,
            min_size: self.min_size,
            max_size: self.max_size,
            ignore_patterns: self.ignore_patterns.clone(),
            ..WalkerConfig::default()
        }
        .with_extensions(&self.extensions)
    }
}

/// Whether `a` and `b` overlap (equal, or one contains the other).
///
/// Paths are canonicalized when they exist; a missing destination is
/// resolved through its nearest existing ancestor.
#[must_use]
pub fn paths_overlap(a: &Path, b: &Path) -> bool {
    let a = resolve(a);
    let b = resolve(b);
    a.starts_with(&b) || b.starts_with(&a)
}

fn resolve(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut existing = absolute.as_path();
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}
