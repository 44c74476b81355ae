use photo_organizer::duplicates::{DuplicateFinder, ExactComparator, FinderConfig, FinderError};
use photo_organizer::scanner::{fingerprint_bytes, ScanError, WalkerConfig};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, bytes).unwrap();
    path
}

fn file_names(report: &photo_organizer::duplicates::DedupReport) -> BTreeSet<String> {
    report
        .registry
        .iter()
        .map(|m| m.path().file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_identical_content_keeps_one() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jpg", b"bytes X");
    write(dir.path(), "b.jpg", b"bytes X");
    write(dir.path(), "c.jpg", b"bytes Y");

    let report = DuplicateFinder::with_defaults()
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.unique_files, 2);
    assert_eq!(report.summary.duplicate_files(), 1);

    let names = file_names(&report);
    assert!(names.contains("c.jpg"));
    assert_eq!(
        names.contains("a.jpg") as u8 + names.contains("b.jpg") as u8,
        1
    );
}

#[test]
fn test_extension_mismatch_keeps_both() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jpg", b"bytes X");
    write(dir.path(), "b.png", b"bytes X");

    let report = DuplicateFinder::with_defaults()
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(report.summary.unique_files, 2);
}

#[test]
fn test_extension_case_is_significant() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.JPG", b"same");
    write(dir.path(), "b.jpg", b"same");

    let report = DuplicateFinder::with_defaults()
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();
    assert_eq!(report.summary.total_files, 2);
    assert_eq!(report.summary.unique_files, 2);
}

#[test]
fn test_empty_input() {
    let dir = tempdir().unwrap();

    let report = DuplicateFinder::with_defaults()
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();
    assert!(report.registry.is_empty());
    assert_eq!(report.summary.total_files, 0);
    assert!(!report.summary.interrupted);
}

#[test]
fn test_unreadable_file_is_skipped() {
    let dir = tempdir().unwrap();
    let good = write(dir.path(), "good.jpg", b"fine");
    let twin = write(dir.path(), "twin.jpg", b"fine");
    let missing = dir.path().join("missing.jpg");

    let finder = DuplicateFinder::new(FinderConfig::default().with_workers(2));
    let report = finder
        .find_unique(vec![Ok(good), Ok(missing.clone()), Ok(twin)])
        .unwrap();

    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.fingerprinted, 2);
    assert_eq!(report.summary.unique_files, 1);
    assert_eq!(report.summary.skipped.len(), 1);
    assert_eq!(report.summary.skipped[0].path, missing);
}

#[test]
fn test_shared_prefix_files_survive_separately() {
    let dir = tempdir().unwrap();
    let prefix = [0x5Au8; 64];
    let mut first = prefix.to_vec();
    first.extend_from_slice(b"tail one");
    let mut second = prefix.to_vec();
    second.extend_from_slice(b"tail two");
    let mut third = prefix.to_vec();
    third.extend_from_slice(b"tail one");

    write(dir.path(), "a.jpg", &first);
    write(dir.path(), "b.jpg", &second);
    write(dir.path(), "c.jpg", &third);

    let report = DuplicateFinder::new(FinderConfig::default().with_workers(1))
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.unique_files, 2);
    let fingerprint = fingerprint_bytes(&prefix);
    assert_eq!(report.registry.bucket(fingerprint).count(), 2);
    assert_eq!(report.registry.bucket_count(), 1);
}

#[test]
fn test_duplicates_spread_over_many_workers() {
    let dir = tempdir().unwrap();
    for copy in 0..6 {
        for content in 0..8 {
            write(
                dir.path(),
                &format!("set{}/img_{}.jpg", copy, content),
                format!("content number {}", content).as_bytes(),
            );
        }
    }

    for (workers, capacity) in [(1, 64), (4, 0), (8, 1)] {
        let finder = DuplicateFinder::new(
            FinderConfig::default()
                .with_workers(workers)
                .with_queue_capacity(capacity),
        );
        let report = finder
            .find_unique_in_roots(&[dir.path().to_path_buf()])
            .unwrap();

        assert_eq!(report.summary.total_files, 48);
        assert_eq!(report.summary.unique_files, 8);
        assert_eq!(report.summary.partitions, workers);
        assert_eq!(
            report.summary.partition_duplicates + report.summary.merge_duplicates,
            40
        );
    }
}

#[test]
fn test_no_two_representatives_are_equal() {
    let dir = tempdir().unwrap();
    for i in 0..20 {
        write(
            dir.path(),
            &format!("f{}.jpg", i),
            format!("{}", i % 7).as_bytes(),
        );
    }

    let report = DuplicateFinder::new(FinderConfig::default().with_workers(3))
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();
    let reps: Vec<_> = report.registry.iter().collect();
    assert_eq!(reps.len(), 7);

    let comparator = ExactComparator::default();
    for (i, a) in reps.iter().enumerate() {
        for b in &reps[i + 1..] {
            assert!(!comparator.compare(a, b).unwrap());
        }
    }
}

#[test]
fn test_multiple_roots_are_deduplicated_together() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    write(first.path(), "a.mp4", b"movie");
    write(second.path(), "nested/b.mp4", b"movie");
    write(second.path(), "c.mov", b"other movie");

    let report = DuplicateFinder::with_defaults()
        .find_unique_in_roots(&[first.path().to_path_buf(), second.path().to_path_buf()])
        .unwrap();
    assert_eq!(report.summary.total_files, 3);
    assert_eq!(report.summary.unique_files, 2);
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jpg", b"x");
    let missing = dir.path().join("nope");

    let err = DuplicateFinder::with_defaults()
        .find_unique_in_roots(&[dir.path().to_path_buf(), missing])
        .unwrap_err();
    assert!(matches!(
        err,
        FinderError::Traversal(ScanError::NotFound(_))
    ));
}

#[test]
fn test_walker_filters_apply() {
    let dir = tempdir().unwrap();
    write(dir.path(), "small.jpg", b"x");
    write(dir.path(), "large.jpg", &[1u8; 4096]);
    write(dir.path(), "notes.txt", &[2u8; 4096]);
    write(dir.path(), "thumbs/large_copy.jpg", &[3u8; 4096]);
    write(dir.path(), ".hidden/large.jpg", &[4u8; 4096]);

    let walker_config = WalkerConfig {
        min_size: Some(100),
        skip_hidden: true,
        ignore_patterns: vec!["thumbs/".to_string()],
        ..WalkerConfig::default()
    };
    let report = DuplicateFinder::new(FinderConfig::default().with_walker_config(walker_config))
        .find_unique_in_roots(&[dir.path().to_path_buf()])
        .unwrap();

    assert_eq!(report.summary.total_files, 1);
    assert_eq!(file_names(&report), BTreeSet::from(["large.jpg".to_string()]));
}

#[test]
fn test_prefix_length_does_not_change_result() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.gif", b"abcdef");
    write(dir.path(), "b.gif", b"abcdeg");
    write(dir.path(), "c.gif", b"abcdef");

    for prefix in [1, 4, 64, 4096] {
        let report = DuplicateFinder::new(FinderConfig::default().with_fingerprint_prefix(prefix))
            .find_unique_in_roots(&[dir.path().to_path_buf()])
            .unwrap();
        assert_eq!(report.summary.unique_files, 2, "prefix {}", prefix);
    }
}
