use anyhow::Result;
use bytesize::ByteSize;
use chrono::{DateTime, FixedOffset};
use log::{debug, error, info};
use std::time::Instant;

use crate::config::DumpConfig;
use crate::dumper::{DumpOutcome, Dumper};
use crate::error::DumpError;
use crate::external::{Compressor, QueryClient};
use crate::progress::setup_progress_bar;

/// Options shared by every date of a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub compression: Option<String>,
    pub min_size: u64,
    pub strict: bool,
    pub quiet: bool,
}

/// Per-date results aggregated over a run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub written: usize,
    pub written_bytes: u64,
    pub skipped: usize,
    pub missing: usize,
    pub empty: usize,
    pub failed: Vec<(String, DumpError)>,
}

impl RunSummary {
    pub fn record(&mut self, date: &DateTime<FixedOffset>, result: Result<DumpOutcome, DumpError>) {
        match result {
            Ok(DumpOutcome::Written { bytes, .. }) => {
                self.written += 1;
                self.written_bytes += bytes;
            }
            Ok(DumpOutcome::AlreadyExists(_)) => self.skipped += 1,
            Ok(DumpOutcome::Missing(_)) => self.missing += 1,
            Ok(DumpOutcome::Empty { .. }) => self.empty += 1,
            Err(e) => {
                let date = date.format("%Y-%m-%d").to_string();
                error!("Error dumping {}: {}", date, e);
                self.failed.push((date, e));
            }
        }
    }

    pub fn total(&self) -> usize {
        self.written + self.skipped + self.missing + self.empty + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.missing == 0 && self.failed.is_empty()
    }
}

/// Dump every date in turn, never letting one date stop the others
pub async fn dump_dates<Q: QueryClient, C: Compressor>(
    config: &DumpConfig,
    client: &Q,
    compressor: &C,
    dates: &[DateTime<FixedOffset>],
    options: &RunOptions,
) -> Result<RunSummary> {
    debug!("Dumping {} date(s)", dates.len());
    let start_time = Instant::now();
    let progress = setup_progress_bar(dates.len() as u64, options.quiet)?;
    let mut summary = RunSummary::default();

    for date in dates {
        let day = date.format("%Y-%m-%d").to_string();
        if let Some(pb) = &progress {
            pb.set_message(day.clone());
        }
        debug!("Dumping {}", day);

        let dumper = Dumper::new(config, client, compressor)
            .with_min_size(options.min_size)
            .with_strict(options.strict);
        let result = dumper.dump(date, options.compression.as_deref()).await;
        summary.record(date, result);

        if let Some(pb) = &progress {
            pb.inc(1);
        }
    }

    if let Some(pb) = progress {
        pb.finish_with_message("done");
    }

    info!(
        "Finished {} date(s) in {:.2?}: {} written ({}), {} skipped, {} empty, {} missing, {} failed",
        summary.total(),
        start_time.elapsed(),
        summary.written,
        ByteSize::b(summary.written_bytes),
        summary.skipped,
        summary.empty,
        summary.missing,
        summary.failed.len()
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::ExitOutcome;
    use chrono::{TimeZone, Utc};
    use std::path::Path;
    use tempfile::TempDir;
    use tokio::fs;

    /// Writes a file whose size depends on the day of month
    struct DayClient;

    impl QueryClient for DayClient {
        async fn export(
            &self,
            _database: &str,
            query: &str,
            output: &Path,
        ) -> Result<ExitOutcome, DumpError> {
            let size = if query.contains("2022-01-21T") { 10 } else { 2048 };
            fs::write(output, vec![b'x'; size]).await.unwrap();
            Ok(ExitOutcome::Success)
        }
    }

    struct NoCompressor;

    impl Compressor for NoCompressor {
        async fn compress(
            &self,
            _program: &str,
            _input: &Path,
            _output: &Path,
        ) -> Result<ExitOutcome, DumpError> {
            Ok(ExitOutcome::Failed(Some(127)))
        }
    }

    fn config(root: &Path, query: &str) -> DumpConfig {
        DumpConfig {
            dump_root: root.to_path_buf(),
            dump_fname: "events".to_string(),
            database: "db1".to_string(),
            query: query.to_string(),
        }
    }

    fn options(compression: Option<&str>) -> RunOptions {
        RunOptions {
            compression: compression.map(str::to_string),
            min_size: 1000,
            strict: false,
            quiet: true,
        }
    }

    fn day(d: u32) -> DateTime<FixedOffset> {
        Utc.with_ymd_and_hms(2022, 1, d, 0, 0, 0).unwrap().fixed_offset()
    }

    #[tokio::test]
    async fn test_summary_counts_each_outcome() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), "SELECT '{startdate}'");
        let existing = dir.path().join("2022/01/22");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("events_2022-01-22.csv"), b"kept").unwrap();

        let summary = dump_dates(
            &config,
            &DayClient,
            &NoCompressor,
            &[day(20), day(21), day(22)],
            &options(None),
        )
        .await
        .unwrap();

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.written, 1);
        assert_eq!(summary.written_bytes, 2048);
        assert_eq!(summary.empty, 1);
        assert_eq!(summary.skipped, 1);
        assert!(summary.is_clean());
        assert!(dir.path().join("2022/01/20/events_2022-01-20.csv").exists());
        assert!(!dir.path().join("2022/01/21/events_2022-01-21.csv").exists());
    }

    #[tokio::test]
    async fn test_failed_dates_do_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), "SELECT '{start}'");

        let summary = dump_dates(
            &config,
            &DayClient,
            &NoCompressor,
            &[day(20), day(21)],
            &options(None),
        )
        .await
        .unwrap();

        assert_eq!(summary.total(), 2);
        assert_eq!(summary.failed.len(), 2);
        assert_eq!(summary.failed[0].0, "2022-01-20");
        assert_eq!(summary.failed[1].0, "2022-01-21");
        assert!(!summary.is_clean());
    }

    #[tokio::test]
    async fn test_missing_compressed_output() {
        let dir = TempDir::new().unwrap();
        let config = config(dir.path(), "SELECT '{startdate}'");

        let summary = dump_dates(
            &config,
            &DayClient,
            &NoCompressor,
            &[day(20)],
            &options(Some("lz4")),
        )
        .await
        .unwrap();

        assert_eq!(summary.missing, 1);
        assert!(!dir.path().join("2022/01/20/events_2022-01-20.csv").exists());
        assert!(!dir.path().join("2022/01/20/events_2022-01-20.csv.lz4").exists());
    }
}
