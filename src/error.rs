use std::path::PathBuf;
use thiserror::Error;

/// Failures that end the dump of a single date
#[derive(Error, Debug)]
pub enum DumpError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid query template: {0}")]
    Template(String),

    #[error("Query for {date} failed with exit code {code:?}")]
    QueryFailed { date: String, code: Option<i32> },
}

impl DumpError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DumpError::Io {
            path: path.into(),
            source,
        }
    }
}
