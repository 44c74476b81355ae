//! Capture date resolution.
//!
//! # Overview
//!
//! A [`DateResolver`] tries, in order:
//! 1. Metadata fields, via a [`MetadataSource`]: `DateTimeOriginal`,
//!    `CreateDate`, `MediaCreateDate`, `FileModifyDate`
//! 2. A timestamp in the file name (`19-07-04 15-30-00.jpg`,
//!    `IMG_20190704_153000.jpg`, `2019-07-04 party.jpg`)
//! 3. Year/month directory segments (`.../2019/7/clip.mov`)
//!
//! and falls back to [`CaptureDate::Unknown`]. An unknown date is a normal
//! result, not an error.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use regex::Regex;
use serde::Serialize;

/// Resolved capture date of a media file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum CaptureDate {
    /// A timestamp was found.
    Known(NaiveDateTime),
    /// No probe produced a usable timestamp.
    Unknown,
}

impl CaptureDate {
    /// Year and month, if known.
    #[must_use]
    pub fn year_month(&self) -> Option<(i32, u32)> {
        use chrono::Datelike;

        match self {
            Self::Known(ts) => Some((ts.year(), ts.month())),
            Self::Unknown => None,
        }
    }

    /// Whether no date could be resolved.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

/// Metadata fields probed for a capture timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MetadataField {
    /// EXIF original capture time
    DateTimeOriginal,
    /// EXIF/XMP creation time
    CreateDate,
    /// QuickTime media creation time
    MediaCreateDate,
    /// Filesystem modification time
    FileModifyDate,
}

impl MetadataField {
    /// Fields in the order they are probed.
    pub const PROBE_ORDER: [Self; 4] = [
        Self::DateTimeOriginal,
        Self::CreateDate,
        Self::MediaCreateDate,
        Self::FileModifyDate,
    ];

    /// Conventional tag name.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::DateTimeOriginal => "DateTimeOriginal",
            Self::CreateDate => "CreateDate",
            Self::MediaCreateDate => "MediaCreateDate",
            Self::FileModifyDate => "FileModifyDate",
        }
    }
}

/// Provides raw metadata values as strings (`"2019:07:04 15:30:00"`).
pub trait MetadataSource: Send + Sync {
    /// Value of `field` for the file at `path`, if present.
    fn field(&self, path: &Path, field: MetadataField) -> Option<String>;
}

/// Metadata answered from the filesystem alone.
///
/// Only [`MetadataField::FileModifyDate`] is available, and only when
/// enabled; embedded EXIF/QuickTime fields are reported absent.
#[derive(Debug, Clone, Copy)]
pub struct FileSystemMetadata {
    use_file_mtime: bool,
}

impl FileSystemMetadata {
    /// Create a source; `use_file_mtime` controls whether mtime is reported.
    #[must_use]
    pub fn new(use_file_mtime: bool) -> Self {
        Self { use_file_mtime }
    }
}

impl Default for FileSystemMetadata {
    fn default() -> Self {
        Self::new(true)
    }
}

impl MetadataSource for FileSystemMetadata {
    fn field(&self, path: &Path, field: MetadataField) -> Option<String> {
        if field != MetadataField::FileModifyDate || !self.use_file_mtime {
            return None;
        }

        let modified = match std::fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                log::debug!("No modification time for {}: {}", path.display(), e);
                return None;
            }
        };
        let local: DateTime<Local> = modified.into();
        Some(local.format("%Y:%m:%d %H:%M:%S%:z").to_string())
    }
}

/// Which probe produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateSource {
    /// A metadata field
    Metadata(MetadataField),
    /// The file name
    FileName,
    /// Enclosing directory names
    Directory,
    /// Nothing matched
    Unknown,
}

/// A capture date and where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    /// The date
    pub date: CaptureDate,
    /// The probe that produced it
    pub source: DateSource,
}

/// Resolves capture dates through the ordered probe chain.
pub struct DateResolver {
    metadata: Box<dyn MetadataSource>,
}

impl std::fmt::Debug for DateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DateResolver")
            .field("metadata", &"<metadata source>")
            .finish()
    }
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(Box::new(FileSystemMetadata::default()))
    }
}

impl DateResolver {
    /// Create a resolver backed by `metadata`.
    #[must_use]
    pub fn new(metadata: Box<dyn MetadataSource>) -> Self {
        Self { metadata }
    }

    /// Resolve the capture date for `path`.
    #[must_use]
    pub fn resolve(&self, path: &Path) -> ResolvedDate {
        for field in MetadataField::PROBE_ORDER {
            let Some(raw) = self.metadata.field(path, field) else {
                continue;
            };
            match parse_metadata_timestamp(&raw) {
                Some(ts) => {
                    return ResolvedDate {
                        date: CaptureDate::Known(ts),
                        source: DateSource::Metadata(field),
                    }
                }
                None => log::debug!(
                    "Unparseable {} '{}' for {}",
                    field.name(),
                    raw,
                    path.display()
                ),
            }
        }

        if let Some(ts) = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(parse_file_name)
        {
            return ResolvedDate {
                date: CaptureDate::Known(ts),
                source: DateSource::FileName,
            };
        }

        if let Some(ts) = parse_directory(path) {
            return ResolvedDate {
                date: CaptureDate::Known(ts),
                source: DateSource::Directory,
            };
        }

        log::debug!("No capture date for {}", path.display());
        ResolvedDate {
            date: CaptureDate::Unknown,
            source: DateSource::Unknown,
        }
    }
}

/// Parse `YYYY:MM:DD HH:MM:SS[+HH:MM]`, keeping the wall-clock time.
#[must_use]
pub fn parse_metadata_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S%:z")
        .map(|ts| ts.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y:%m:%d %H:%M:%S"))
        .ok()
}

fn compact_timestamp_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})(\d{2})(\d{2})[_-](\d{2})(\d{2})(\d{2})")
            .unwrap_or_else(|e| panic!("invalid built-in regex: {e}"))
    })
}

fn iso_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\d{4})-(\d{2})-(\d{2})")
            .unwrap_or_else(|e| panic!("invalid built-in regex: {e}"))
    })
}

/// Parse a timestamp from a file stem.
#[must_use]
pub fn parse_file_name(stem: &str) -> Option<NaiveDateTime> {
    if let Some(ts) = stem
        .get(..17)
        .and_then(|head| NaiveDateTime::parse_from_str(head, "%y-%m-%d %H-%M-%S").ok())
    {
        return Some(ts);
    }

    if let Some(caps) = compact_timestamp_re().captures(stem) {
        let n = |i: usize| caps[i].parse::<u32>().ok();
        let ts = NaiveDate::from_ymd_opt(caps[1].parse().ok()?, n(2)?, n(3)?)
            .and_then(|d| d.and_hms_opt(n(4)?, n(5)?, n(6)?));
        if ts.is_some() {
            return ts;
        }
    }

    let caps = iso_date_re().captures(stem)?;
    NaiveDate::from_ymd_opt(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
    .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Parse `.../<yyyy>/<m>/...` (or a bare year) from the enclosing directories.
///
/// The deepest match wins. A bare year resolves to January.
#[must_use]
pub fn parse_directory(path: &Path) -> Option<NaiveDateTime> {
    let segments: Vec<&str> = path
        .parent()?
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();

    let mut found = None;
    for (i, segment) in segments.iter().enumerate() {
        let Some(year) = parse_year(segment) else {
            continue;
        };
        let month = segments.get(i + 1).and_then(|s| parse_month(s)).unwrap_or(1);
        found = NaiveDate::from_ymd_opt(year, month, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .or(found);
    }
    found
}

fn parse_year(segment: &str) -> Option<i32> {
    if segment.len() != 4 || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment
        .parse()
        .ok()
        .filter(|year| (1900..=2100).contains(year))
}

fn parse_month(segment: &str) -> Option<u32> {
    if segment.is_empty() || segment.len() > 2 || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok().filter(|month| (1..=12).contains(month))
}
