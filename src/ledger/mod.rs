//! Durable outputs: the append-only CSV ledger, the trip-id dedup
//! checkpoint, and the startup resume scan.
//!
//! Ordering contract: a trip id is marked in the checkpoint *before* its row
//! is appended to the CSV. A crash between the two leaves the trip absent
//! from the ledger (and permanently skipped for that id) rather than ever
//! double-counted: earnings rows must not duplicate across runs.

use crate::models::{LEDGER_HEADERS, TripRecord};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ── CSV ledger ────────────────────────────────────────────────────────────────

/// Append-only CSV of trip rows with the fixed 26-column header.
pub struct CsvLedger {
    path: PathBuf,
}

impl CsvLedger {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create dir {:?}", parent))?;
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a batch of records, writing the header first iff the file is
    /// new. The whole batch is flushed before returning, so a row is either
    /// fully on disk or not there at all.
    pub fn append_records(&self, records: &[TripRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let fresh = std::fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open ledger {:?}", self.path))?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if fresh {
            writer.write_record(LEDGER_HEADERS)?;
        }
        for record in records {
            writer
                .write_record(record.to_row())
                .with_context(|| format!("write row for trip {}", record.trip_id))?;
        }
        writer.flush().context("flush ledger")?;

        Ok(records.len())
    }

    /// Scan the existing file for resume reporting: row count and the most
    /// recent `Date` value. Missing or unreadable file is just an empty
    /// ledger, not an error.
    pub fn scan_existing(&self) -> ResumeReport {
        let mut report = ResumeReport::default();

        let Ok(mut reader) = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&self.path)
        else {
            return report;
        };

        let date_idx = reader
            .headers()
            .ok()
            .and_then(|h| h.iter().position(|c| c == "Date"));

        for (i, result) in reader.records().enumerate() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!("Row {} in {:?}: {}", i + 1, self.path, e);
                    continue;
                }
            };
            report.rows += 1;
            if let Some(idx) = date_idx {
                if let Some(d) = record
                    .get(idx)
                    .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%b %d, %Y").ok())
                {
                    report.last_date = Some(report.last_date.map_or(d, |prev| prev.max(d)));
                }
            }
        }

        report
    }
}

/// What a startup scan of the CSV found.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResumeReport {
    pub rows: usize,
    pub last_date: Option<NaiveDate>,
}

// ── Dedup checkpoint ──────────────────────────────────────────────────────────

/// Trip identifiers already persisted, across runs.
///
/// Backing store is a newline-delimited id file, loaded once at startup and
/// append-only afterward. `mark` syncs before returning so a restart after a
/// crash never reprocesses a marked trip.
pub struct SeenTrips {
    ids: HashSet<String>,
    file: File,
}

impl SeenTrips {
    pub fn load(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Could not create dir {:?}", parent))?;
            }
        }

        let mut ids = HashSet::new();
        if path.exists() {
            let reader = BufReader::new(
                File::open(path).with_context(|| format!("open checkpoint {:?}", path))?,
            );
            for line in reader.lines() {
                let line = line?;
                let id = line.trim();
                if !id.is_empty() {
                    ids.insert(id.to_string());
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("open checkpoint {:?} for append", path))?;

        info!("{} previously scraped trips in checkpoint", ids.len());
        Ok(Self { ids, file })
    }

    pub fn contains(&self, trip_id: &str) -> bool {
        self.ids.contains(trip_id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Durably record a trip id. Returns once the append has reached disk.
    pub fn mark(&mut self, trip_id: &str) -> Result<()> {
        if !self.ids.insert(trip_id.to_string()) {
            return Ok(());
        }
        writeln!(self.file, "{trip_id}").context("append checkpoint")?;
        self.file.flush()?;
        self.file.sync_data().context("sync checkpoint")?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str, date: &str) -> TripRecord {
        TripRecord {
            trip_id: id.to_string(),
            date: date.to_string(),
            total_earnings: "10.00".to_string(),
            ..TripRecord::default()
        }
    }

    #[test]
    fn header_written_once_across_sessions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rides.csv");

        // Two separate "runs", two separate ledger handles
        CsvLedger::open(&path).unwrap().append_records(&[record("a", "Jul 1, 2024")]).unwrap();
        CsvLedger::open(&path)
            .unwrap()
            .append_records(&[record("b", "Jul 2, 2024"), record("c", "Jul 3, 2024")])
            .unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, LEDGER_HEADERS.to_vec());
        assert_eq!(reader.records().count(), 3);

        // No stray header rows in the data
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("Ride Type").count(), 1);
    }

    #[test]
    fn empty_batch_creates_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rides.csv");
        let ledger = CsvLedger::open(&path).unwrap();
        assert_eq!(ledger.append_records(&[]).unwrap(), 0);
        assert!(!path.exists());
    }

    #[test]
    fn scan_reports_rows_and_latest_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rides.csv");
        let ledger = CsvLedger::open(&path).unwrap();

        assert_eq!(ledger.scan_existing(), ResumeReport::default());

        ledger
            .append_records(&[
                record("a", "Jul 8, 2024"),
                record("b", "Jul 1, 2024"),
                record("c", ""),
            ])
            .unwrap();

        let report = ledger.scan_existing();
        assert_eq!(report.rows, 3);
        assert_eq!(report.last_date, NaiveDate::from_ymd_opt(2024, 7, 8));
    }

    #[test]
    fn seen_mark_then_contains() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        let mut seen = SeenTrips::load(&path).unwrap();
        assert!(!seen.contains("x"));
        seen.mark("x").unwrap();
        assert!(seen.contains("x"));
        // Idempotent
        seen.mark("x").unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn seen_survives_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        {
            let mut seen = SeenTrips::load(&path).unwrap();
            seen.mark("trip-1").unwrap();
            seen.mark("trip-2").unwrap();
        }

        let seen = SeenTrips::load(&path).unwrap();
        assert!(seen.contains("trip-1"));
        assert!(seen.contains("trip-2"));
        assert!(!seen.contains("trip-3"));
        assert_eq!(seen.len(), 2);
    }
}
