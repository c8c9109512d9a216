use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    core::utils::{ensure_dir, PathResolver},
    domain::{AttendanceEntry, CalendarDay},
};

use super::{LedgerStore, StoreError, StoreResult};

pub const CURRENT_SCHEMA_VERSION: u8 = 1;
const LEDGER_FILE: &str = "ledger.json";
const TMP_SUFFIX: &str = "tmp";

/// On-disk layout of the attendance ledger.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerFile {
    #[serde(default = "LedgerFile::default_schema_version")]
    pub schema_version: u8,
    #[serde(default)]
    pub calendar_days: Vec<CalendarDay>,
    #[serde(default)]
    pub entries: Vec<AttendanceEntry>,
    #[serde(default)]
    pub holidays: Vec<NaiveDate>,
}

impl LedgerFile {
    fn default_schema_version() -> u8 {
        CURRENT_SCHEMA_VERSION
    }
}

impl Default for LedgerFile {
    fn default() -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            calendar_days: Vec::new(),
            entries: Vec::new(),
            holidays: Vec::new(),
        }
    }
}

/// File-backed store keeping the whole ledger in one JSON document.
///
/// Each mutation reads the file, applies the change, and replaces the file
/// atomically, so a crash never leaves a half-written ledger behind.
#[derive(Debug)]
pub struct JsonLedgerStore {
    path: PathBuf,
    io_lock: Mutex<()>,
}

impl JsonLedgerStore {
    /// Opens (or prepares) `ledger.json` under `root`, defaulting to the app data directory.
    pub fn new(root: Option<PathBuf>) -> StoreResult<Self> {
        let base = PathResolver::resolve_base(root);
        ensure_dir(&base)?;
        Ok(Self {
            path: base.join(LEDGER_FILE),
            io_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> StoreResult<LedgerFile> {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        load_ledger_file(&self.path)
    }

    fn mutate<F>(&self, change: F) -> StoreResult<()>
    where
        F: FnOnce(&mut LedgerFile) -> StoreResult<()>,
    {
        let _guard = self.io_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = load_ledger_file(&self.path)?;
        change(&mut file)?;
        save_ledger_file(&file, &self.path)
    }
}

impl LedgerStore for JsonLedgerStore {
    fn list_calendar_days(&self) -> StoreResult<Vec<CalendarDay>> {
        Ok(self.load()?.calendar_days)
    }

    fn insert_calendar_day(&self, day: &CalendarDay) -> StoreResult<()> {
        self.mutate(|file| {
            if file.calendar_days.iter().any(|existing| existing.id == day.id) {
                return Err(StoreError::Conflict(format!(
                    "calendar day id {} already exists",
                    day.id
                )));
            }
            file.calendar_days.push(*day);
            Ok(())
        })
    }

    fn delete_calendar_day(&self, day: &CalendarDay) -> StoreResult<()> {
        self.mutate(|file| {
            let before = file.calendar_days.len();
            file.calendar_days.retain(|existing| existing.id != day.id);
            if file.calendar_days.len() == before {
                return Err(StoreError::NotFound(format!("calendar day {}", day.id)));
            }
            file.entries.retain(|entry| entry.calendar_day_id != day.id);
            Ok(())
        })
    }

    fn list_entries(&self) -> StoreResult<Vec<AttendanceEntry>> {
        Ok(self.load()?.entries)
    }

    fn insert_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        self.mutate(|file| {
            if file.entries.iter().any(|existing| existing.id == entry.id) {
                return Err(StoreError::Conflict(format!(
                    "attendance entry id {} already exists",
                    entry.id
                )));
            }
            file.entries.push(*entry);
            Ok(())
        })
    }

    fn update_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        self.mutate(|file| {
            let existing = file
                .entries
                .iter_mut()
                .find(|existing| existing.id == entry.id)
                .ok_or_else(|| StoreError::NotFound(format!("attendance entry {}", entry.id)))?;
            *existing = *entry;
            Ok(())
        })
    }

    fn delete_entry(&self, entry: &AttendanceEntry) -> StoreResult<()> {
        self.mutate(|file| {
            let before = file.entries.len();
            file.entries.retain(|existing| existing.id != entry.id);
            if file.entries.len() == before {
                return Err(StoreError::NotFound(format!("attendance entry {}", entry.id)));
            }
            Ok(())
        })
    }

    fn list_holidays(&self) -> StoreResult<Vec<NaiveDate>> {
        Ok(self.load()?.holidays)
    }

    fn insert_holiday(&self, date: NaiveDate) -> StoreResult<()> {
        self.mutate(|file| {
            if file.holidays.contains(&date) {
                return Err(StoreError::Conflict(format!("{date} is already a holiday")));
            }
            file.holidays.push(date);
            Ok(())
        })
    }

    fn delete_holiday(&self, date: NaiveDate) -> StoreResult<()> {
        self.mutate(|file| {
            let before = file.holidays.len();
            file.holidays.retain(|existing| *existing != date);
            if file.holidays.len() == before {
                return Err(StoreError::NotFound(format!("holiday {date}")));
            }
            Ok(())
        })
    }
}

/// Reads a ledger file, treating a missing file as an empty ledger.
pub fn load_ledger_file(path: &Path) -> StoreResult<LedgerFile> {
    if !path.exists() {
        return Ok(LedgerFile::default());
    }
    let data = fs::read_to_string(path)?;
    let file: LedgerFile = serde_json::from_str(&data)?;
    if file.schema_version > CURRENT_SCHEMA_VERSION {
        return Err(StoreError::Serde(format!(
            "ledger schema v{} is newer than supported v{}",
            file.schema_version, CURRENT_SCHEMA_VERSION
        )));
    }
    Ok(file)
}

/// Writes the ledger next to its final location, then renames it into place.
pub fn save_ledger_file(file: &LedgerFile, path: &Path) -> StoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let json = serde_json::to_string_pretty(file)?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> StoreResult<()> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
