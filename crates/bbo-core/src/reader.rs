//! Read-only access to a capture log.
//!
//! [`LogReader`] maps a finished or in-progress log file, classifies each slot
//! with the record codec and exposes the valid ones in on-disk (= write)
//! order. Zero-timestamp slots are the never-written suffix and are skipped.
//!
//! A reader racing a live writer may see the newest slot only partly
//! updated. No synchronization exists between the processes; the result is
//! eventually consistent and is not masked here.

use std::fs::File;
use std::path::{Path, PathBuf};

use memmap2::Mmap;
use tracing::debug;

use crate::error::OpenError;
use crate::types::{RECORD_SIZE, Record, Slot, decode};

/// Mapped file contents. Empty files are not mapped.
enum Backing {
    Mapped(Mmap),
    Empty,
}

impl Backing {
    fn bytes(&self) -> &[u8] {
        match self {
            Self::Mapped(m) => &m[..],
            Self::Empty => &[],
        }
    }
}

/// Handle on an opened capture log.
pub struct LogReader {
    path: PathBuf,
    data: Backing,
}

/// Per-class slot counts from a full scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotCounts {
    pub filled: usize,
    pub empty: usize,
    pub malformed: usize,
}

impl LogReader {
    /// Open `path` read-only. Fails if the file cannot be opened or mapped,
    /// or if its size is not a whole number of records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, OpenError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| OpenError::Io { path: path.clone(), source };

        let file = File::open(&path).map_err(io_err)?;
        let size = file.metadata().map_err(io_err)?.len();
        if size % RECORD_SIZE as u64 != 0 {
            return Err(OpenError::Misaligned { path, size, record_size: RECORD_SIZE });
        }

        let data = if size == 0 {
            Backing::Empty
        } else {
            // SAFETY: mapped read-only. A concurrent writer may still be
            // changing the newest slot; decoding tolerates any byte pattern.
            Backing::Mapped(unsafe { Mmap::map(&file) }.map_err(io_err)?)
        };

        debug!("[reader] opened {} ({size} bytes)", path.display());
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_size(&self) -> u64 {
        self.data.bytes().len() as u64
    }

    /// Total number of slots, written or not.
    pub fn slot_count(&self) -> usize {
        self.data.bytes().len() / RECORD_SIZE
    }

    /// Every slot, classified. Restartable: each call starts from slot 0.
    pub fn slots(&self) -> impl Iterator<Item = Slot> + '_ {
        self.data
            .bytes()
            .chunks_exact(RECORD_SIZE)
            .filter_map(|chunk| chunk.first_chunk::<RECORD_SIZE>())
            .map(decode)
    }

    /// Valid records in on-disk order. Empty and malformed slots are skipped.
    pub fn records(&self) -> impl Iterator<Item = Record> + '_ {
        self.slots().filter_map(|slot| match slot {
            Slot::Filled(rec) => Some(rec),
            Slot::Empty | Slot::Malformed { .. } => None,
        })
    }

    pub fn scan(&self) -> SlotCounts {
        self.slots().fold(SlotCounts::default(), |mut acc, slot| {
            match slot {
                Slot::Filled(_) => acc.filled += 1,
                Slot::Empty => acc.empty += 1,
                Slot::Malformed { .. } => acc.malformed += 1,
            }
            acc
        })
    }
}

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Aggregate price statistics over valid records.
///
/// With no records, `count` is 0 and the price fields are `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub mean_price: Option<f64>,
}

/// Compute [`Summary`] over a record sequence in one pass.
pub fn summary<I>(records: I) -> Summary
where
    I: IntoIterator<Item = Record>,
{
    let mut count = 0usize;
    let mut sum = 0.0f64;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for rec in records {
        count += 1;
        sum += rec.price;
        min = min.min(rec.price);
        max = max.max(rec.price);
    }

    if count == 0 {
        return Summary::default();
    }

    Summary {
        count,
        min_price: Some(min),
        max_price: Some(max),
        mean_price: Some(sum / count as f64),
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.min_price, self.max_price, self.mean_price) {
            (Some(min), Some(max), Some(mean)) => write!(
                f,
                "Price statistics ({} records):\n  Min price: {min:.2}\n  Max price: {max:.2}\n  Avg price: {mean:.2}",
                self.count
            ),
            _ => write!(f, "Price statistics: no valid records"),
        }
    }
}

/// Render the first `limit` records as a fixed-width table.
pub fn format_table<I>(records: I, limit: usize) -> String
where
    I: IntoIterator<Item = Record>,
{
    use std::fmt::Write;

    let rule = "-".repeat(80);
    let mut out = String::new();
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:<6}{:<12}{:<12}{:<15}{:<8}", "#", "Price", "Quantity", "Event time", "Side");
    let _ = writeln!(out, "{rule}");
    for (i, rec) in records.into_iter().take(limit).enumerate() {
        let _ = writeln!(
            out,
            "{:<6}{:<12.2}{:<12.8}{:<15}{:<8}",
            i + 1,
            rec.price,
            rec.quantity,
            rec.event_time,
            rec.side
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AppendLog;
    use crate::types::Side;

    fn rec(price: f64, qty: f64, t: i64) -> Record {
        Record::encode(price, qty, t, Side::Bid)
    }

    #[test]
    fn round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("md.bin");
        let written: Vec<Record> = (0..5)
            .map(|i| Record::encode(27000.0 + i as f64, 0.01 * (i + 1) as f64, 1_700_000_000_000 + i, if i % 2 == 0 { Side::Bid } else { Side::Ask }))
            .collect();

        let mut log = AppendLog::open_or_create(&path, 16).unwrap();
        for r in &written {
            log.append(r).unwrap();
        }
        assert_eq!(log.len(), written.len());
        log.close().unwrap();

        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.slot_count(), 16);
        let read: Vec<Record> = reader.records().collect();
        assert_eq!(read, written);
        // Restartable.
        assert_eq!(reader.records().count(), written.len());
        assert_eq!(reader.scan(), SlotCounts { filled: 5, empty: 11, malformed: 0 });
    }

    #[test]
    fn round_trip_at_full_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full.bin");
        let written: Vec<Record> = (1..=3).map(|i| rec(100.0 * i as f64, 0.5, i)).collect();

        let mut log = AppendLog::open_or_create(&path, written.len()).unwrap();
        for r in &written {
            log.append(r).unwrap();
        }
        assert!(log.is_full());
        assert_eq!(log.close().unwrap(), 3);

        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.file_size(), (3 * RECORD_SIZE) as u64);
        assert_eq!(reader.records().collect::<Vec<_>>(), written);
        assert_eq!(reader.scan(), SlotCounts { filled: 3, empty: 0, malformed: 0 });
    }

    #[test]
    fn reads_while_writer_is_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live.bin");
        let mut log = AppendLog::open_or_create(&path, 4).unwrap();
        log.append(&rec(1.0, 1.0, 1)).unwrap();
        log.flush().unwrap();

        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.records().count(), 1);
        drop(log);
    }

    #[test]
    fn misaligned_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, vec![0u8; RECORD_SIZE * 2 + 7]).unwrap();
        let err = LogReader::open(&path).err().unwrap();
        assert!(matches!(err, OpenError::Misaligned { size, .. } if size == (RECORD_SIZE * 2 + 7) as u64));
    }

    #[test]
    fn missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = LogReader::open(dir.path().join("nope.bin")).err().unwrap();
        assert!(matches!(err, OpenError::Io { .. }));
    }

    #[test]
    fn empty_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.bin");
        std::fs::write(&path, []).unwrap();
        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.slot_count(), 0);
        assert_eq!(reader.records().count(), 0);
        assert_eq!(summary(reader.records()).count, 0);
    }

    #[test]
    fn malformed_slots_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("foreign.bin");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&rec(10.0, 1.0, 5).to_bytes());
        let mut bad = rec(11.0, 1.0, 6).to_bytes();
        bad[24] = b'?';
        bytes.extend_from_slice(&bad);
        bytes.extend_from_slice(&[0u8; RECORD_SIZE]);
        std::fs::write(&path, bytes).unwrap();

        let reader = LogReader::open(&path).unwrap();
        assert_eq!(reader.records().count(), 1);
        assert_eq!(reader.scan(), SlotCounts { filled: 1, empty: 1, malformed: 1 });
    }

    #[test]
    fn summary_of_nothing() {
        let s = summary(Vec::new());
        assert_eq!(s.count, 0);
        assert!(s.min_price.is_none() && s.max_price.is_none() && s.mean_price.is_none());
        assert_eq!(s.to_string(), "Price statistics: no valid records");
    }

    #[test]
    fn summary_min_max_mean() {
        let s = summary(vec![rec(100.0, 100.0, 1), rec(200.00000001, 50.0, 2)]);
        assert_eq!(s.count, 2);
        assert_eq!(s.min_price, Some(100.0));
        assert_eq!(s.max_price, Some(200.00000001));
        assert!((s.mean_price.unwrap() - 150.000000005).abs() < 1e-9);
    }

    #[test]
    fn table_is_limited() {
        let recs: Vec<Record> = (1..=20).map(|i| rec(i as f64, 0.5, i)).collect();
        let table = format_table(recs, 10);
        // Two rules, one header, ten rows.
        assert_eq!(table.lines().count(), 13);
        assert!(table.contains("0.50000000"));
    }
}
