use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Step unit used to enumerate a `--startdate`/`--enddate` range
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Frequency {
    #[clap(name = "year", alias = "years")]
    Year,
    #[clap(name = "quarter", alias = "quarters")]
    Quarter,
    #[clap(name = "month", alias = "months")]
    Month,
    #[clap(name = "week", alias = "weeks")]
    Week,
    #[clap(name = "day", alias = "days")]
    Day,
    #[clap(name = "hour", alias = "hours")]
    Hour,
    #[clap(name = "minute", alias = "minutes")]
    Minute,
    #[clap(name = "second", alias = "seconds")]
    Second,
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about = "Dump data from the database to a CSV file")]
pub struct Cli {
    /// Configuration file with query and file structure details
    #[clap(long, required = true)]
    pub config: PathBuf,

    /// File containing a list of dates to dump (one date per line)
    #[clap(long)]
    pub dates: Option<PathBuf>,

    /// Date to dump (e.g. 2022-01-20)
    #[clap(long)]
    pub date: Option<String>,

    /// Start date for a range of dates. Should also specify enddate
    #[clap(long)]
    pub startdate: Option<String>,

    /// End date for a range of dates (inclusive). Should also specify startdate
    #[clap(long)]
    pub enddate: Option<String>,

    /// Frequency for a range of dates
    #[clap(long, default_value = "day")]
    pub frequency: Frequency,

    /// Compression program, also used as the file extension ('none' to disable)
    #[clap(long, default_value = "lz4")]
    pub compress: String,

    /// Outputs smaller than this many bytes are treated as empty and deleted
    #[clap(long("min-size"), default_value = "1000")]
    pub min_size: u64,

    /// Database host passed to the client
    #[clap(long("psql-host"), env = "PSQL_HOST")]
    pub psql_host: String,

    /// Database role passed to the client
    #[clap(long("psql-role"), env = "PSQL_ROLE")]
    pub psql_role: String,

    /// Database client program
    #[clap(long("psql-bin"), default_value = "psql")]
    pub psql_bin: String,

    /// Skip compression and validation for a date whose query failed
    #[clap(long)]
    pub strict: bool,

    /// Quiet mode, suppress progress output
    #[clap(long)]
    pub quiet: bool,

    /// Debug mode, enable verbose logging
    #[clap(long)]
    pub debug: bool,
}

impl Cli {
    /// Compression identifier, or `None` when compression is disabled
    pub fn compression(&self) -> Option<&str> {
        let compress = self.compress.trim();
        if compress.is_empty() || compress.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(compress)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Cli {
        let mut args = vec![
            "dumpit",
            "--config",
            "config.json",
            "--psql-host",
            "db.internal",
            "--psql-role",
            "reader",
        ];
        args.extend_from_slice(extra);
        Cli::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.config, PathBuf::from("config.json"));
        assert_eq!(cli.frequency, Frequency::Day);
        assert_eq!(cli.compression(), Some("lz4"));
        assert_eq!(cli.min_size, 1000);
        assert_eq!(cli.psql_bin, "psql");
        assert!(cli.dates.is_none());
        assert!(cli.date.is_none());
        assert!(!cli.strict);
    }

    #[test]
    fn test_compression_disabled() {
        assert_eq!(parse(&["--compress", "none"]).compression(), None);
        assert_eq!(parse(&["--compress", ""]).compression(), None);
        assert_eq!(parse(&["--compress", "zstd"]).compression(), Some("zstd"));
    }

    #[test]
    fn test_frequency_aliases() {
        assert_eq!(parse(&["--frequency", "weeks"]).frequency, Frequency::Week);
        assert_eq!(parse(&["--frequency", "month"]).frequency, Frequency::Month);
    }

    #[test]
    fn test_config_is_required() {
        let result = Cli::try_parse_from([
            "dumpit",
            "--psql-host",
            "db.internal",
            "--psql-role",
            "reader",
        ]);
        assert!(result.is_err(), "--config must be mandatory");
    }
}
