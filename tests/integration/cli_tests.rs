use clap::Parser;
use photo_organizer::cli::{Cli, OutputFormat};
use std::fs;
use tempfile::tempdir;

#[test]
fn test_requires_source_and_destination() {
    assert!(Cli::try_parse_from(["photo-organizer"]).is_err());
    assert!(Cli::try_parse_from(["photo-organizer", "/only/one"]).is_err());

    let cli = Cli::try_parse_from(["photo-organizer", "/a", "/b", "/c"]).unwrap();
    assert_eq!(cli.sources().len(), 2);
    assert_eq!(cli.destination().unwrap().to_str(), Some("/c"));
}

#[test]
fn test_flags_reach_config() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "io_threads = 2\n").unwrap();

    let cli = Cli::try_parse_from([
        "photo-organizer",
        "--config",
        config_path.to_str().unwrap(),
        "--workers",
        "3",
        "--prefix-bytes",
        "128",
        "--min-size",
        "1KB",
        "-e",
        "jpg,heic",
        "--output",
        "json",
        "/src",
        "/dst",
    ])
    .unwrap();
    let config = photo_organizer::load_config(&cli).unwrap();

    assert_eq!(config.workers, 3);
    assert_eq!(config.io_threads, 2);
    assert_eq!(config.fingerprint_prefix, 128);
    assert_eq!(config.min_size, Some(1000));
    assert_eq!(config.extensions, vec!["jpg", "heic"]);
    assert_eq!(config.output, OutputFormat::Json);
}

#[test]
fn test_missing_config_file_is_an_error() {
    let dir = tempdir().unwrap();
    let cli = Cli::try_parse_from([
        "photo-organizer",
        "--config",
        dir.path().join("absent.toml").to_str().unwrap(),
        "/src",
        "/dst",
    ])
    .unwrap();

    let err = photo_organizer::load_config(&cli).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
}

#[test]
fn test_invalid_settings_are_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");
    fs::write(&config_path, "").unwrap();

    let cli = Cli::try_parse_from([
        "photo-organizer",
        "--config",
        config_path.to_str().unwrap(),
        "--prefix-bytes",
        "0",
        "/src",
        "/dst",
    ])
    .unwrap();
    let err = photo_organizer::load_config(&cli).unwrap_err();
    assert!(format!("{:#}", err).contains("fingerprint_prefix"));

    let cli = Cli::try_parse_from([
        "photo-organizer",
        "--config",
        config_path.to_str().unwrap(),
        "--min-size",
        "10MB",
        "--max-size",
        "1MB",
        "/src",
        "/dst",
    ])
    .unwrap();
    assert!(photo_organizer::load_config(&cli).is_err());
}

#[test]
fn test_invalid_size_is_a_parse_error() {
    let result = Cli::try_parse_from(["photo-organizer", "--min-size", "lots", "/src", "/dst"]);
    assert!(result.is_err());
}
