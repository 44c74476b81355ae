//! Integration tests for configuration loading.
//!
//! Covers defaults, TOML files, named profiles, environment overrides and
//! command-line flags, in their order of precedence.

use clap::Parser;
use photo_organizer::cli::{Cli, OutputFormat};
use photo_organizer::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tempfile::tempdir;

// =============================================================================
// Helper Functions
// =============================================================================

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Clear all PHOTO_ORGANIZER_* environment variables to avoid interference.
fn clear_env() {
    for (key, _) in std::env::vars() {
        if key.starts_with("PHOTO_ORGANIZER_") {
            std::env::remove_var(key);
        }
    }
}

fn cli_with_config(path: &Path, extra: &[&str]) -> Cli {
    let mut args = vec![
        "photo-organizer".to_string(),
        "--config".to_string(),
        path.to_string_lossy().into_owned(),
    ];
    args.extend(extra.iter().map(|s| (*s).to_string()));
    args.push("/src".to_string());
    args.push("/dst".to_string());
    Cli::try_parse_from(args).unwrap()
}

// =============================================================================
// Files and Defaults
// =============================================================================

#[test]
fn test_missing_file_gives_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();

    let config = Config::load_from_path(dir.path().join("nope.toml"), None);
    assert_eq!(config, Config::default());
}

#[test]
fn test_load_from_toml() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
workers = 6
queue_capacity = 16
extensions = ["jpg", "cr2"]
skip_hidden = true
ignore_patterns = ["@eaDir/"]
use_file_mtime = false
output = "json"
"#,
    )
    .unwrap();

    let config = Config::load_from_path(path, None);
    assert_eq!(config.workers, 6);
    assert_eq!(config.queue_capacity, 16);
    assert_eq!(config.extensions, vec!["jpg", "cr2"]);
    assert!(config.skip_hidden);
    assert_eq!(config.ignore_patterns, vec!["@eaDir/"]);
    assert!(!config.use_file_mtime);
    assert_eq!(config.output, OutputFormat::Json);
    // Unset keys keep their defaults.
    assert_eq!(config.fingerprint_prefix, 64);
    assert_eq!(config.io_threads, 4);
}

#[test]
fn test_malformed_toml_falls_back_to_defaults() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = \"many\"\n").unwrap();

    let config = Config::load_from_path(path, None);
    assert_eq!(config, Config::default());
}

// =============================================================================
// Profiles
// =============================================================================

#[test]
fn test_profile_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
workers = 2
io_threads = 3

[profile.nas]
workers = 1
follow_symlinks = true
"#,
    )
    .unwrap();

    let plain = Config::load_from_path(path.clone(), None);
    assert_eq!(plain.workers, 2);
    assert!(!plain.follow_symlinks);

    let nas = Config::load_from_path(path, Some("nas"));
    assert_eq!(nas.workers, 1);
    assert_eq!(nas.io_threads, 3);
    assert!(nas.follow_symlinks);
}

#[test]
fn test_unknown_profile_is_ignored() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 5\n").unwrap();

    let config = Config::load_from_path(path, Some("missing"));
    assert_eq!(config.workers, 5);
}

// =============================================================================
// Precedence
// =============================================================================

#[test]
fn test_env_overrides_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "io_threads = 8\nworkers = 2\n").unwrap();

    std::env::set_var("PHOTO_ORGANIZER_IO_THREADS", "12");
    let config = Config::load_from_path(path, None);
    clear_env();

    assert_eq!(config.io_threads, 12);
    assert_eq!(config.workers, 2);
}

#[test]
fn test_cli_overrides_env_and_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "workers = 2\nskip_hidden = true\n").unwrap();

    std::env::set_var("PHOTO_ORGANIZER_WORKERS", "7");
    let cli = cli_with_config(&path, &["-j", "9", "--no-skip-hidden"]);
    let config = photo_organizer::load_config(&cli);
    clear_env();

    let config = config.unwrap();
    assert_eq!(config.workers, 9);
    assert!(!config.skip_hidden);
}

#[test]
fn test_last_boolean_flag_wins() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "").unwrap();

    let cli = cli_with_config(&path, &["--follow-symlinks", "--no-follow-symlinks"]);
    assert!(!photo_organizer::load_config(&cli).unwrap().follow_symlinks);

    let cli = cli_with_config(&path, &["--no-follow-symlinks", "--follow-symlinks"]);
    assert!(photo_organizer::load_config(&cli).unwrap().follow_symlinks);
}

#[test]
fn test_profile_flag_selects_profile() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "[profile.fast]\nfingerprint_prefix = 4096\n").unwrap();

    let cli = cli_with_config(&path, &["--profile", "fast"]);
    let config = photo_organizer::load_config(&cli).unwrap();
    assert_eq!(config.fingerprint_prefix, 4096);
}

#[test]
fn test_save_then_load_round_trip() {
    let _lock = ENV_MUTEX.lock().unwrap();
    clear_env();
    let dir = tempdir().unwrap();
    let path = dir.path().join("saved/config.toml");

    let config = Config {
        queue_capacity: 8,
        extensions: vec!["mov".to_string()],
        max_size: Some(5_000_000),
        ..Config::default()
    };
    config.save_to_path(&path).unwrap();

    assert_eq!(Config::load_from_path(path, None), config);
}
