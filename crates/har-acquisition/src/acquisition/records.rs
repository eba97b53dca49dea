use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Errors raised while opening or decoding an export file.
#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("failed to open {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid CSV header: {0}")]
    Csv(#[from] csv::Error),
}

/// Image coverage state tracked per listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Unknown,
    Complete,
    NoImages,
    Partial,
    Failed,
}

impl ImageStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Complete => "complete",
            Self::NoImages => "no_images",
            Self::Partial => "partial",
            Self::Failed => "failed",
        }
    }

    /// A listing counts as covered once any photos were captured.
    pub const fn has_images(self) -> bool {
        matches!(self, Self::Complete | Self::Partial)
    }
}

impl fmt::Display for ImageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported status: {0}")]
pub struct UnsupportedStatus(pub String);

impl FromStr for ImageStatus {
    type Err = UnsupportedStatus;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "complete" => Ok(Self::Complete),
            "no_images" => Ok(Self::NoImages),
            "partial" => Ok(Self::Partial),
            "failed" => Ok(Self::Failed),
            _ => Err(UnsupportedStatus(value.to_string())),
        }
    }
}

/// Identity of a listing inside one business domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ListingIdentity {
    pub listing_key: String,
    pub domain: String,
}

impl ListingIdentity {
    pub fn new(listing_key: impl AsRef<str>, domain: impl AsRef<str>) -> Self {
        Self {
            listing_key: listing_key.as_ref().trim().to_string(),
            domain: domain.as_ref().trim().to_ascii_uppercase(),
        }
    }
}

/// One row of the daily listing export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
    pub listing_key: String,
    pub domain: String,
    pub zip: String,
    pub modified_at: NaiveDateTime,
}

impl ListingRecord {
    pub fn identity(&self) -> ListingIdentity {
        ListingIdentity::new(&self.listing_key, &self.domain)
    }
}

/// One row of the image coverage export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub identity: ListingIdentity,
    pub status: ImageStatus,
    pub notes: Option<String>,
}

pub type ListingIndex = BTreeMap<NaiveDate, Vec<ListingRecord>>;
pub type ImageIndex = HashMap<ListingIdentity, ImageRecord>;

#[derive(Debug, Deserialize)]
struct ListingRow {
    #[serde(default)]
    listing_key: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    zip: String,
    #[serde(default)]
    matrix_modified_dt: String,
}

#[derive(Debug, Deserialize)]
struct ImageRow {
    #[serde(default)]
    listing_key: String,
    #[serde(default)]
    domain: String,
    #[serde(default)]
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    notes: Option<String>,
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

/// Parses the export timestamp, keeping the wall-clock date it was written in.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_local());
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f%z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y-%m-%dT%H:%M%z",
        "%Y-%m-%d %H:%M%z",
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%dT%H:%M%:z",
        "%Y-%m-%d %H:%M%:z",
    ] {
        if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
            return Some(dt.naive_local());
        }
    }

    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

fn csv_reader<R: Read>(reader: R) -> Result<csv::Reader<R>, csv::Error> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    // Excel exports prefix the first header with a byte-order mark.
    let headers: csv::StringRecord = csv_reader
        .headers()?
        .iter()
        .map(|name| name.trim_start_matches('\u{feff}').trim())
        .collect();
    csv_reader.set_headers(headers);
    Ok(csv_reader)
}

fn open_optional(path: &Path) -> Result<Option<File>, ReaderError> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "export not found, using empty index");
            Ok(None)
        }
        Err(source) => Err(ReaderError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Groups listing rows by the calendar date of `matrix_modified_dt`.
pub fn read_listings<R: Read>(reader: R) -> Result<ListingIndex, ReaderError> {
    let mut csv_reader = csv_reader(reader)?;
    let mut index = ListingIndex::new();

    for (position, record) in csv_reader.deserialize::<ListingRow>().enumerate() {
        let row_number = position + 2;
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                warn!(row = row_number, error = %err, "skipping unreadable listing row");
                continue;
            }
        };

        let Some(modified_at) = parse_timestamp(&row.matrix_modified_dt) else {
            warn!(
                row = row_number,
                listing_key = %row.listing_key,
                matrix_modified_dt = %row.matrix_modified_dt,
                "skipping listing row with invalid timestamp"
            );
            continue;
        };

        index
            .entry(modified_at.date())
            .or_default()
            .push(ListingRecord {
                listing_key: row.listing_key,
                domain: row.domain.to_ascii_uppercase(),
                zip: row.zip,
                modified_at,
            });
    }

    Ok(index)
}

/// Indexes image rows by listing identity; later rows replace earlier ones.
pub fn read_images<R: Read>(reader: R) -> Result<ImageIndex, ReaderError> {
    let mut csv_reader = csv_reader(reader)?;
    let mut index = ImageIndex::new();

    for (position, record) in csv_reader.deserialize::<ImageRow>().enumerate() {
        let row_number = position + 2;
        let row = match record {
            Ok(row) => row,
            Err(err) => {
                warn!(row = row_number, error = %err, "skipping unreadable image row");
                continue;
            }
        };

        let identity = ListingIdentity::new(&row.listing_key, &row.domain);
        if identity.listing_key.is_empty() || identity.domain.is_empty() {
            continue;
        }

        let status = match row.status.parse::<ImageStatus>() {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    row = row_number,
                    listing_key = %identity.listing_key,
                    status = %row.status,
                    "unrecognised image status, treating as unknown"
                );
                ImageStatus::Unknown
            }
        };

        index.insert(
            identity.clone(),
            ImageRecord {
                identity,
                status,
                notes: row.notes,
            },
        );
    }

    Ok(index)
}

/// File-backed pair of exports the gap detector works from.
#[derive(Debug, Clone)]
pub struct GapDetector {
    listings_csv: PathBuf,
    images_csv: Option<PathBuf>,
}

impl GapDetector {
    pub fn new(listings_csv: impl Into<PathBuf>, images_csv: Option<PathBuf>) -> Self {
        Self {
            listings_csv: listings_csv.into(),
            images_csv,
        }
    }

    pub fn listings_csv(&self) -> &Path {
        &self.listings_csv
    }

    pub fn images_csv(&self) -> Option<&Path> {
        self.images_csv.as_deref()
    }

    pub fn listings_by_date(&self) -> Result<ListingIndex, ReaderError> {
        match open_optional(&self.listings_csv)? {
            Some(file) => read_listings(file),
            None => Ok(ListingIndex::new()),
        }
    }

    pub fn images_by_listing(&self) -> Result<ImageIndex, ReaderError> {
        let Some(path) = self.images_csv.as_deref() else {
            return Ok(ImageIndex::new());
        };

        match open_optional(path)? {
            Some(file) => read_images(file),
            None => Ok(ImageIndex::new()),
        }
    }

    /// Reads both exports into a fresh, independent snapshot.
    pub fn snapshot(&self) -> Result<SourceSnapshot, ReaderError> {
        Ok(SourceSnapshot {
            listings: self.listings_by_date()?,
            images: self.images_by_listing()?,
        })
    }
}

/// In-memory view of both exports for a single planning call.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    pub listings: ListingIndex,
    pub images: ImageIndex,
}

impl SourceSnapshot {
    pub fn listings_on(&self, day: NaiveDate) -> &[ListingRecord] {
        self.listings.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn image_status(&self, identity: &ListingIdentity) -> Option<ImageStatus> {
        self.images.get(identity).map(|record| record.status)
    }

    pub fn has_images(&self, identity: &ListingIdentity) -> bool {
        self.image_status(identity)
            .map(ImageStatus::has_images)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).expect("valid date")
    }

    #[test]
    fn parse_timestamp_keeps_written_date() {
        let with_offset = parse_timestamp("2025-10-05T23:30:00-05:00").expect("offset form");
        assert_eq!(with_offset.date(), day(5));

        let compact_offset =
            parse_timestamp("2025-10-05T08:12:00+0000").expect("colon-less offset");
        assert_eq!(compact_offset, day(5).and_hms_opt(8, 12, 0).expect("valid time"));

        let spaced_offset =
            parse_timestamp("2025-10-05 23:12:00.250-0500").expect("spaced offset");
        assert_eq!(spaced_offset.date(), day(5));

        let naive = parse_timestamp("2025-10-06 08:15:00").expect("naive form");
        assert_eq!(naive.date(), day(6));

        let bare = parse_timestamp("2025-10-07").expect("date form");
        assert_eq!(bare.date(), day(7));

        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn listings_are_grouped_by_day_and_bad_timestamps_skipped() {
        let csv = "\u{feff}listing_key,domain,zip,matrix_modified_dt\n\
HAR1,sale,77002,2025-10-05T10:00:00\n\
HAR2,rental,77002,not-a-date\n\
HAR3,Sale,73301,2025-10-05T18:00:00\n\
HAR4,sale,,2025-10-06T09:00:00\n";

        let index = read_listings(Cursor::new(csv)).expect("listings parse");
        assert_eq!(index.len(), 2);

        let first = &index[&day(5)];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].listing_key, "HAR1");
        assert_eq!(first[0].domain, "SALE");
        assert_eq!(first[1].domain, "SALE");
        assert_eq!(index[&day(6)][0].zip, "");
    }

    #[test]
    fn undecodable_header_is_a_csv_error() {
        let bytes = vec![0xff, 0xfe, b',', b'z', b'i', b'p', b'\n'];
        assert!(matches!(
            read_listings(Cursor::new(bytes)),
            Err(ReaderError::Csv(_))
        ));
    }

    #[test]
    fn images_use_last_row_and_skip_missing_identity() {
        let csv = "\u{feff}listing_key,domain,status,notes\n\
HAR1,sale,failed,first attempt\n\
HAR1,SALE,COMPLETE,\n\
,sale,complete,\n\
HAR2,,complete,\n\
HAR3,rental,bogus,\n";

        let index = read_images(Cursor::new(csv)).expect("images parse");
        assert_eq!(index.len(), 2);

        let record = &index[&ListingIdentity::new("HAR1", "sale")];
        assert_eq!(record.status, ImageStatus::Complete);
        assert!(record.notes.is_none());

        let unknown = &index[&ListingIdentity::new("HAR3", "RENTAL")];
        assert_eq!(unknown.status, ImageStatus::Unknown);
    }

    #[test]
    fn image_status_parsing_is_case_insensitive() {
        assert_eq!("No_Images".parse::<ImageStatus>(), Ok(ImageStatus::NoImages));
        assert!("PARTIAL".parse::<ImageStatus>().expect("parses").has_images());
        assert!(!ImageStatus::Failed.has_images());
        assert!("missing".parse::<ImageStatus>().is_err());
    }

    #[test]
    fn missing_files_produce_empty_snapshot() {
        let detector = GapDetector::new(
            "./does-not-exist/listings.csv",
            Some(PathBuf::from("./does-not-exist/images.csv")),
        );
        let snapshot = detector.snapshot().expect("missing files degrade");
        assert!(snapshot.listings.is_empty());
        assert!(snapshot.images.is_empty());
        assert!(snapshot.listings_on(day(5)).is_empty());
    }
}
