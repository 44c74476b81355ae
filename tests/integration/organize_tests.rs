use clap::Parser;
use filetime::FileTime;
use photo_organizer::cli::Cli;
use photo_organizer::error::ExitCode;
use photo_organizer::scanner::fingerprint_bytes;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

// 2015-03-15 12:00:00 UTC: mid-month, so every local timezone agrees on the month.
const MARCH_2015: i64 = 1_426_420_800;

struct Fixture {
    _root: TempDir,
    source: PathBuf,
    dest: PathBuf,
    config: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let root = tempdir().unwrap();
        let source = root.path().join("source");
        let dest = root.path().join("library");
        let config = root.path().join("config.toml");
        fs::create_dir_all(&source).unwrap();
        fs::write(&config, "").unwrap();
        Self {
            _root: root,
            source,
            dest,
            config,
        }
    }

    fn write(&self, rel: &str, bytes: &[u8]) -> PathBuf {
        let path = self.source.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, bytes).unwrap();
        path
    }

    fn cli(&self, extra: &[&str]) -> Cli {
        let mut args = vec![
            "photo-organizer".to_string(),
            "-q".to_string(),
            "--config".to_string(),
            self.config.to_string_lossy().into_owned(),
        ];
        args.extend(extra.iter().map(|s| (*s).to_string()));
        args.push(self.source.to_string_lossy().into_owned());
        args.push(self.dest.to_string_lossy().into_owned());
        Cli::try_parse_from(args).unwrap()
    }
}

fn files_under(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| e.path().strip_prefix(dir).unwrap().to_path_buf())
        .collect();
    files.sort();
    files
}

#[test]
fn test_dates_from_file_names_and_directories() {
    let fx = Fixture::new();
    fx.write("19-07-04 15-30-00.jpg", b"fireworks");
    fx.write("copies/19-07-04 15-30-00 (1).jpg", b"fireworks");
    fx.write("2018/5/clip.mov", b"a clip");
    fx.write("misc/IMG_0001.png", b"no date anywhere");

    let summary = photo_organizer::run(&fx.cli(&["--no-mtime"])).unwrap();

    assert_eq!(summary.total_files, 4);
    assert_eq!(summary.unique_files, 3);
    assert_eq!(summary.copied, 3);
    assert_eq!(summary.unknown_dates, 1);
    assert_eq!(summary.exit_code(), ExitCode::Success);

    assert_eq!(
        files_under(&fx.dest),
        vec![
            PathBuf::from(format!("2018/5/{}.mov", fingerprint_bytes(b"a clip"))),
            PathBuf::from(format!("2019/7/{}.jpg", fingerprint_bytes(b"fireworks"))),
            PathBuf::from(format!(
                "unknown/{}.png",
                fingerprint_bytes(b"no date anywhere")
            )),
        ]
    );
}

#[test]
fn test_dates_from_modification_time() {
    let fx = Fixture::new();
    let path = fx.write("IMG_0002.jpg", b"pinned mtime");
    filetime::set_file_mtime(&path, FileTime::from_unix_time(MARCH_2015, 0)).unwrap();

    let summary = photo_organizer::run(&fx.cli(&[])).unwrap();

    assert_eq!(summary.copied, 1);
    let expected = fx
        .dest
        .join(format!("2015/3/{}.jpg", fingerprint_bytes(b"pinned mtime")));
    assert_eq!(fs::read(expected).unwrap(), b"pinned mtime");
}

#[test]
fn test_copied_bytes_match_source() {
    let fx = Fixture::new();
    let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
    fx.write("big.mp4", &content);

    let summary = photo_organizer::run(&fx.cli(&["--no-mtime"])).unwrap();

    assert_eq!(summary.bytes_copied, content.len() as u64);
    let expected = fx
        .dest
        .join(format!("unknown/{}.mp4", fingerprint_bytes(&content[..64])));
    assert_eq!(fs::read(expected).unwrap(), content);
}

#[test]
fn test_destination_is_cleared() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"a");
    fs::create_dir_all(fx.dest.join("old")).unwrap();
    fs::write(fx.dest.join("old/stale.jpg"), b"stale").unwrap();

    photo_organizer::run(&fx.cli(&["--no-mtime"])).unwrap();

    assert!(!fx.dest.join("old").exists());
    assert_eq!(files_under(&fx.dest).len(), 1);
}

#[test]
fn test_keep_destination_never_overwrites() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"new content");
    let name = format!("{}.jpg", fingerprint_bytes(b"new content"));
    fs::create_dir_all(fx.dest.join("unknown")).unwrap();
    fs::write(fx.dest.join("unknown").join(&name), b"older import").unwrap();

    let summary = photo_organizer::run(&fx.cli(&["--no-mtime", "--keep-destination"])).unwrap();

    assert_eq!(summary.copied, 1);
    assert_eq!(
        fs::read(fx.dest.join("unknown").join(&name)).unwrap(),
        b"older import"
    );
    let suffixed = format!("{}-1.jpg", fingerprint_bytes(b"new content"));
    assert_eq!(
        fs::read(fx.dest.join("unknown").join(suffixed)).unwrap(),
        b"new content"
    );
}

#[test]
fn test_dry_run_writes_nothing() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"a");
    fx.write("b.jpg", b"b");

    let summary = photo_organizer::run(&fx.cli(&["--dry-run", "--no-mtime"])).unwrap();

    assert!(summary.dry_run);
    assert_eq!(summary.plans.len(), 2);
    assert_eq!(summary.copied, 0);
    assert!(!fx.dest.exists());
}

#[test]
fn test_fingerprint_collision_gets_suffix() {
    let fx = Fixture::new();
    let mut first = vec![9u8; 64];
    first.extend_from_slice(b"one");
    let mut second = vec![9u8; 64];
    second.extend_from_slice(b"two");
    fx.write("a.jpg", &first);
    fx.write("b.jpg", &second);

    let summary = photo_organizer::run(&fx.cli(&["--no-mtime"])).unwrap();
    assert_eq!(summary.copied, 2);

    let fp = fingerprint_bytes(&[9u8; 64]);
    let base = fs::read(fx.dest.join(format!("unknown/{}.jpg", fp))).unwrap();
    let suffixed = fs::read(fx.dest.join(format!("unknown/{}-1.jpg", fp))).unwrap();
    // Plans follow source path order.
    assert_eq!(base, first);
    assert_eq!(suffixed, second);
}

#[test]
fn test_extension_filter_from_cli() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"photo");
    fx.write("b.mov", b"movie");
    fx.write("c.txt", b"text");

    let summary = photo_organizer::run(&fx.cli(&["--no-mtime", "--ext", "mov"])).unwrap();
    assert_eq!(summary.total_files, 1);
    assert_eq!(summary.copied, 1);
}

#[test]
fn test_destination_inside_source_is_refused() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"a");
    let inside = fx.source.join("organized");

    let cli = Cli::try_parse_from([
        "photo-organizer",
        "-q",
        "--config",
        fx.config.to_str().unwrap(),
        fx.source.to_str().unwrap(),
        inside.to_str().unwrap(),
    ])
    .unwrap();
    let err = photo_organizer::run(&cli).unwrap_err();
    assert!(err.to_string().contains("overlaps"));
    assert!(fx.source.join("a.jpg").exists());
}

#[test]
fn test_missing_source_is_fatal_and_leaves_destination() {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.dest).unwrap();
    fs::write(fx.dest.join("keep.jpg"), b"keep").unwrap();
    fs::remove_dir_all(&fx.source).unwrap();

    let err = photo_organizer::run(&fx.cli(&[])).unwrap_err();
    assert!(format!("{:#}", err).contains("not found"));
    assert!(fx.dest.join("keep.jpg").exists());
}

#[test]
fn test_run_app_json_exit_code() {
    let fx = Fixture::new();
    fx.write("a.jpg", b"a");

    let code = photo_organizer::run_app(fx.cli(&["--output", "json", "--no-mtime"])).unwrap();
    assert_eq!(code, ExitCode::Success);
}
