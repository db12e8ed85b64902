use bytesize::ByteSize;
use chrono::{DateTime, Duration, FixedOffset};
use log::{debug, error, info, warn};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::config::DumpConfig;
use crate::error::DumpError;
use crate::external::{Compressor, ExitOutcome, QueryClient};
use crate::query::render_query;

/// Outputs below this size are header-only or truncated
pub const DEFAULT_MIN_SIZE: u64 = 1000;

/// How the dump of a single date ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    Written { path: PathBuf, bytes: u64 },
    /// The final file was already on disk; nothing was run
    AlreadyExists(PathBuf),
    /// Neither the client nor the compressor left a final file behind
    Missing(PathBuf),
    /// The final file was below the size floor and has been deleted
    Empty { path: PathBuf, bytes: u64 },
}

/// Paths involved in the dump of one date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DumpPaths {
    pub folder: PathBuf,
    pub intermediate: PathBuf,
    pub output: PathBuf,
}

/// Folder and file name for a date: `<dump_root>/YYYY/MM/DD` and
/// `<dump_fname>_YYYY-MM-DD.csv`
pub fn fname(config: &DumpConfig, date: &DateTime<FixedOffset>) -> (PathBuf, String) {
    let folder = config.dump_root.join(date.format("%Y/%m/%d").to_string());
    let file = format!("{}_{}.csv", config.dump_fname, date.format("%Y-%m-%d"));
    (folder, file)
}

/// Dump paths for a date, with the compression extension appended when enabled
pub fn dump_paths(
    config: &DumpConfig,
    date: &DateTime<FixedOffset>,
    compression: Option<&str>,
) -> DumpPaths {
    let (folder, file) = fname(config, date);
    let intermediate = folder.join(&file);
    let output = match compression {
        Some(ext) => folder.join(format!("{}.{}", file, ext)),
        None => intermediate.clone(),
    };

    DumpPaths {
        folder,
        intermediate,
        output,
    }
}

/// Dumps the query result of a single date to disk
pub struct Dumper<'a, Q, C> {
    config: &'a DumpConfig,
    client: &'a Q,
    compressor: &'a C,
    min_size: u64,
    strict: bool,
}

impl<'a, Q: QueryClient, C: Compressor> Dumper<'a, Q, C> {
    pub fn new(config: &'a DumpConfig, client: &'a Q, compressor: &'a C) -> Self {
        Self {
            config,
            client,
            compressor,
            min_size: DEFAULT_MIN_SIZE,
            strict: false,
        }
    }

    pub fn with_min_size(mut self, min_size: u64) -> Self {
        self.min_size = min_size;
        self
    }

    /// Stop before compression when the query fails
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Dump the `[date, date + 1 day)` window, compressing with `compression` if set
    pub async fn dump(
        &self,
        date: &DateTime<FixedOffset>,
        compression: Option<&str>,
    ) -> Result<DumpOutcome, DumpError> {
        let startdate = *date;
        let enddate = startdate + Duration::days(1);

        let query = render_query(&self.config.query, &startdate, &enddate)?;
        let paths = dump_paths(self.config, &startdate, compression);

        if path_exists(&paths.output).await? {
            error!("{} already exists", paths.output.display());
            return Ok(DumpOutcome::AlreadyExists(paths.output));
        }

        fs::create_dir_all(&paths.folder)
            .await
            .map_err(|e| DumpError::io(&paths.folder, e))?;

        let outcome = self
            .client
            .export(&self.config.database, &query, &paths.intermediate)
            .await?;
        if let ExitOutcome::Failed(code) = outcome {
            error!("Could not dump data? Returned value: {:?}", code);
            if self.strict {
                remove_if_exists(&paths.intermediate).await?;
                return Err(DumpError::QueryFailed {
                    date: startdate.format("%Y-%m-%d").to_string(),
                    code,
                });
            }
        }

        if let Some(program) = compression {
            let result = self
                .compressor
                .compress(program, &paths.intermediate, &paths.output)
                .await;
            // The intermediate file is consumed even when the compressor could not run
            remove_if_exists(&paths.intermediate).await?;
            let outcome = result?;
            if let ExitOutcome::Failed(code) = outcome {
                error!("Could not compress data? Returned value: {:?}", code);
            }
        }

        let bytes = match fs::metadata(&paths.output).await {
            Ok(metadata) => metadata.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!("No output file created: {}", paths.output.display());
                return Ok(DumpOutcome::Missing(paths.output));
            }
            Err(e) => return Err(DumpError::io(&paths.output, e)),
        };

        if bytes < self.min_size {
            warn!(
                "Output file was empty ({}). Deleting {}",
                ByteSize::b(bytes),
                paths.output.display()
            );
            fs::remove_file(&paths.output)
                .await
                .map_err(|e| DumpError::io(&paths.output, e))?;
            return Ok(DumpOutcome::Empty {
                path: paths.output,
                bytes,
            });
        }

        info!(
            "Wrote {} ({})",
            paths.output.display(),
            ByteSize::b(bytes)
        );
        Ok(DumpOutcome::Written {
            path: paths.output,
            bytes,
        })
    }
}

async fn path_exists(path: &Path) -> Result<bool, DumpError> {
    fs::try_exists(path)
        .await
        .map_err(|e| DumpError::io(path, e))
}

async fn remove_if_exists(path: &Path) -> Result<(), DumpError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DumpError::io(path, e)),
    }
}
