use super::classifier::DayStatus;
use super::records::{ImageStatus, ListingIdentity, UnsupportedStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Per-day acquisition ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStatusRow {
    pub date: NaiveDate,
    pub status: DayStatus,
    pub last_attempt_ts: DateTime<Utc>,
    pub files_count: Option<u32>,
    pub notes: Option<String>,
}

/// Per-listing image ledger entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageStatusRow {
    pub listing_key: String,
    pub domain: String,
    pub status: ImageStatus,
    pub last_attempt_ts: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error(transparent)]
    UnsupportedStatus(#[from] UnsupportedStatus),
    #[error("listing key and domain are required")]
    MissingIdentity,
    #[error("ledger storage failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("ledger file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

/// Upsert interface onto the acquisition ledger. Both calls are keyed by
/// their identity fields, so repeating them is safe.
pub trait StatusUpdater: Send + Sync {
    fn mark_day(
        &self,
        day: NaiveDate,
        status: DayStatus,
        files_count: Option<u32>,
        notes: Option<&str>,
    ) -> Result<DailyStatusRow, StatusError>;

    fn mark_listing_images(
        &self,
        listing_key: &str,
        domain: &str,
        status: ImageStatus,
        notes: Option<&str>,
    ) -> Result<ImageStatusRow, StatusError>;
}

/// Serialized shape of the whole ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerState {
    #[serde(default)]
    pub days: Vec<DailyStatusRow>,
    #[serde(default)]
    pub images: Vec<ImageStatusRow>,
}

impl LedgerState {
    fn upsert_day(
        &mut self,
        day: NaiveDate,
        status: DayStatus,
        files_count: Option<u32>,
        notes: Option<&str>,
    ) -> DailyStatusRow {
        let row = DailyStatusRow {
            date: day,
            status,
            last_attempt_ts: Utc::now(),
            files_count,
            notes: notes.map(str::to_string),
        };
        match self.days.iter_mut().find(|existing| existing.date == day) {
            Some(existing) => *existing = row.clone(),
            None => {
                let position = self.days.partition_point(|existing| existing.date < day);
                self.days.insert(position, row.clone());
            }
        }
        row
    }

    fn upsert_images(
        &mut self,
        listing_key: &str,
        domain: &str,
        status: ImageStatus,
        notes: Option<&str>,
    ) -> Result<ImageStatusRow, StatusError> {
        let identity = ListingIdentity::new(listing_key, domain);
        if identity.listing_key.is_empty() || identity.domain.is_empty() {
            return Err(StatusError::MissingIdentity);
        }

        let row = ImageStatusRow {
            listing_key: identity.listing_key,
            domain: identity.domain,
            status,
            last_attempt_ts: Utc::now(),
            notes: notes.map(str::to_string),
        };

        match self
            .images
            .iter_mut()
            .find(|existing| existing.listing_key == row.listing_key && existing.domain == row.domain)
        {
            Some(existing) => *existing = row.clone(),
            None => self.images.push(row.clone()),
        }

        Ok(row)
    }

    pub fn day(&self, day: NaiveDate) -> Option<&DailyStatusRow> {
        self.days.iter().find(|row| row.date == day)
    }

    pub fn image(&self, listing_key: &str, domain: &str) -> Option<&ImageStatusRow> {
        let identity = ListingIdentity::new(listing_key, domain);
        self.images.iter().find(|row| {
            row.listing_key == identity.listing_key && row.domain == identity.domain
        })
    }
}

#[derive(Debug, Default)]
pub struct InMemoryStatusLedger {
    state: Mutex<LedgerState>,
}

impl InMemoryStatusLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>, StatusError> {
        self.state
            .lock()
            .map_err(|_| StatusError::Unavailable("ledger mutex poisoned".to_string()))
    }

    pub fn state(&self) -> Result<LedgerState, StatusError> {
        Ok(self.lock()?.clone())
    }
}

impl StatusUpdater for InMemoryStatusLedger {
    fn mark_day(
        &self,
        day: NaiveDate,
        status: DayStatus,
        files_count: Option<u32>,
        notes: Option<&str>,
    ) -> Result<DailyStatusRow, StatusError> {
        Ok(self.lock()?.upsert_day(day, status, files_count, notes))
    }

    fn mark_listing_images(
        &self,
        listing_key: &str,
        domain: &str,
        status: ImageStatus,
        notes: Option<&str>,
    ) -> Result<ImageStatusRow, StatusError> {
        self.lock()?
            .upsert_images(listing_key, domain, status, notes)
    }
}

/// Ledger persisted as a JSON document; a missing file is an empty ledger.
#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<LedgerState, StatusError> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(LedgerState::default())
            }
            Err(source) => {
                return Err(StatusError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let mut state: LedgerState =
            serde_json::from_str(&raw).map_err(|source| StatusError::Corrupt {
                path: self.path.clone(),
                source,
            })?;
        // Files may come from other writers in any order.
        state.days.sort_by_key(|row| row.date);
        Ok(state)
    }

    fn store(&self, state: &LedgerState) -> Result<(), StatusError> {
        let io_error = |source: std::io::Error| StatusError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let body = serde_json::to_string_pretty(state).map_err(|source| StatusError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        let staging = self.path.with_extension("json.tmp");
        std::fs::write(&staging, body).map_err(io_error)?;
        std::fs::rename(&staging, &self.path).map_err(io_error)
    }

    fn update<T>(
        &self,
        apply: impl FnOnce(&mut LedgerState) -> Result<T, StatusError>,
    ) -> Result<T, StatusError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StatusError::Unavailable("ledger mutex poisoned".to_string()))?;
        let mut state = self.load()?;
        let result = apply(&mut state)?;
        self.store(&state)?;
        Ok(result)
    }
}

impl StatusUpdater for JsonFileLedger {
    fn mark_day(
        &self,
        day: NaiveDate,
        status: DayStatus,
        files_count: Option<u32>,
        notes: Option<&str>,
    ) -> Result<DailyStatusRow, StatusError> {
        self.update(|state| Ok(state.upsert_day(day, status, files_count, notes)))
    }

    fn mark_listing_images(
        &self,
        listing_key: &str,
        domain: &str,
        status: ImageStatus,
        notes: Option<&str>,
    ) -> Result<ImageStatusRow, StatusError> {
        self.update(|state| state.upsert_images(listing_key, domain, status, notes))
    }
}
