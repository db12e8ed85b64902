use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

/// Query and file layout details loaded from the JSON configuration file
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DumpConfig {
    /// Root directory under which the `YYYY/MM/DD` folders are created
    pub dump_root: PathBuf,
    /// File name prefix, completed with `_<YYYY-MM-DD>.csv`
    pub dump_fname: String,
    /// Database the query runs against
    pub database: String,
    /// SQL template with `{startdate}` and `{enddate}` markers
    pub query: String,
}

impl DumpConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading configuration from {}", path.display());
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid configuration file: {}", path.display()))
    }

    pub fn from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse configuration JSON")
    }
}

/// Connection details handed to the database client
#[derive(Debug, Clone, PartialEq)]
pub struct ClientSettings {
    pub program: String,
    pub host: String,
    pub role: String,
}

impl ClientSettings {
    pub fn from_cli(args: &Cli) -> Self {
        Self {
            program: args.psql_bin.clone(),
            host: args.psql_host.clone(),
            role: args.psql_role.clone(),
        }
    }
}
