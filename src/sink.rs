use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;

use crate::delay_manager::{Sleeper, DEFAULT_BATCH_PAUSE};
use crate::error::Result;
use crate::input_loader;
use crate::search_engine::JobRecord;

/// Tabular store keyed by the `Link` column.
pub trait RecordSink {
    /// Links already persisted, used to seed a run's `SeenLinks`.
    fn existing_links(&self) -> Result<HashSet<String>>;

    fn insert_batch(&mut self, batch: &[JobRecord]) -> Result<()>;
}

/// Appends records to a CSV spreadsheet, writing the header on first use.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CsvSink { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn needs_header(&self) -> bool {
        fs::metadata(&self.path).map(|m| m.len() == 0).unwrap_or(true)
    }
}

impl RecordSink for CsvSink {
    fn existing_links(&self) -> Result<HashSet<String>> {
        if !self.path.exists() {
            return Ok(HashSet::new());
        }
        Ok(input_loader::load_links(&self.path))
    }

    fn insert_batch(&mut self, batch: &[JobRecord]) -> Result<()> {
        let write_header = self.needs_header();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut csv_writer = csv::WriterBuilder::new()
            .has_headers(write_header)
            .from_writer(file);

        for record in batch {
            csv_writer.serialize(record)?;
        }
        csv_writer.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct BatchSettings {
    pub batch_size: usize,
    pub pause: Duration,
}

impl Default for BatchSettings {
    fn default() -> Self {
        BatchSettings {
            batch_size: 10,
            pause: DEFAULT_BATCH_PAUSE,
        }
    }
}

/// Inserts the records whose links the sink does not have yet, in fixed-size
/// batches with a pause between them. Returns how many were inserted.
pub fn save_new_records<K, S>(
    sink: &mut K,
    records: &[JobRecord],
    batch: &BatchSettings,
    sleeper: &S,
) -> Result<usize>
where
    K: RecordSink + ?Sized,
    S: Sleeper + ?Sized,
{
    let mut known = sink.existing_links()?;
    let new_jobs: Vec<JobRecord> = records
        .iter()
        .filter(|record| known.insert(record.link.clone()))
        .cloned()
        .collect();

    if new_jobs.is_empty() {
        info!("No new job listings to save");
        return Ok(0);
    }

    for (i, chunk) in new_jobs.chunks(batch.batch_size.max(1)).enumerate() {
        if i > 0 {
            sleeper.sleep(batch.pause);
        }
        sink.insert_batch(chunk)?;
    }

    info!("Saved {} new job listings", new_jobs.len());
    Ok(new_jobs.len())
}

/// Writes a run's records as pretty-printed JSON.
pub fn write_json_snapshot(records: &[JobRecord], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    info!("Successfully saved {} job listings to {:?}", records.len(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::Currency;
    use crate::testing::RecordingSleeper;
    use pretty_assertions::assert_eq;

    fn record(link: &str) -> JobRecord {
        JobRecord {
            title: "Backend Engineer".to_string(),
            link: link.to_string(),
            snippet: "Remote, $90k - $120k".to_string(),
            company: "Acme".to_string(),
            location: "Remote".to_string(),
            description: None,
            compensation: "$90k - $120k".to_string(),
            compensation_currency: Currency::Usd,
        }
    }

    #[derive(Default)]
    struct MemorySink {
        existing: HashSet<String>,
        batches: Vec<Vec<String>>,
    }

    impl RecordSink for MemorySink {
        fn existing_links(&self) -> Result<HashSet<String>> {
            Ok(self.existing.clone())
        }

        fn insert_batch(&mut self, batch: &[JobRecord]) -> Result<()> {
            self.batches.push(batch.iter().map(|r| r.link.clone()).collect());
            Ok(())
        }
    }

    #[test]
    fn test_save_skips_existing_and_batches() {
        let mut sink = MemorySink {
            existing: HashSet::from(["l0".to_string()]),
            ..Default::default()
        };
        let records: Vec<JobRecord> = (0..25).map(|i| record(&format!("l{i}"))).collect();
        let sleeper = RecordingSleeper::default();

        let saved =
            save_new_records(&mut sink, &records, &BatchSettings::default(), &sleeper).unwrap();

        assert_eq!(saved, 24);
        let sizes: Vec<usize> = sink.batches.iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![10, 10, 4]);
        assert_eq!(sink.batches[0][0], "l1");
        assert_eq!(sleeper.waits(), vec![DEFAULT_BATCH_PAUSE, DEFAULT_BATCH_PAUSE]);
    }

    #[test]
    fn test_nothing_new_inserts_nothing() {
        let mut sink = MemorySink {
            existing: HashSet::from(["a".to_string()]),
            ..Default::default()
        };
        let sleeper = RecordingSleeper::default();

        let batch = BatchSettings::default();
        let saved =
            save_new_records(&mut sink, &[record("a"), record("a")], &batch, &sleeper).unwrap();

        assert_eq!(saved, 0);
        assert!(sink.batches.is_empty());
    }

    #[test]
    fn test_csv_sink_round_trips_links() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("jobs.csv"));
        let sleeper = RecordingSleeper::default();

        let batch = BatchSettings::default();
        save_new_records(&mut sink, &[record("a"), record("b")], &batch, &sleeper).unwrap();
        let saved =
            save_new_records(&mut sink, &[record("b"), record("c")], &batch, &sleeper).unwrap();

        assert_eq!(saved, 1);
        let links = sink.existing_links().unwrap();
        assert_eq!(links, HashSet::from(["a".to_string(), "b".to_string(), "c".to_string()]));

        let stored = input_loader::load_records(sink.path());
        assert_eq!(stored.len(), 3);
        assert_eq!(stored[2], record("c"));
        let contents = fs::read_to_string(sink.path()).unwrap();
        assert_eq!(contents.matches("Compensation Currency").count(), 1);
    }

    #[test]
    fn test_json_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job_listings.json");

        write_json_snapshot(&[record("a")], &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["Link"], "a");
        assert_eq!(value[0]["Compensation Currency"], "USD");
    }
}
