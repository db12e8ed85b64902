use anyhow::{Context, Result, anyhow, bail};
use chrono::{DateTime, Duration, FixedOffset, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use log::debug;
use std::path::Path;

use crate::cli::{Cli, Frequency};

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a date string. An explicit offset is kept so the date is filed
/// under its own calendar day; values without one are taken as UTC.
pub fn parse_date(input: &str) -> Result<DateTime<FixedOffset>> {
    let input = input.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Ok(date);
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&naive).fixed_offset());
        }
    }

    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|_| anyhow!("Could not parse date '{}'", input))?;
    Ok(Utc
        .from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
        .fixed_offset())
}

/// Shift `start` by `steps` units of `frequency`
fn shift(
    start: &DateTime<FixedOffset>,
    frequency: Frequency,
    steps: u32,
) -> Option<DateTime<FixedOffset>> {
    let steps_i64 = i64::from(steps);
    match frequency {
        Frequency::Year => start.checked_add_months(Months::new(steps.checked_mul(12)?)),
        Frequency::Quarter => start.checked_add_months(Months::new(steps.checked_mul(3)?)),
        Frequency::Month => start.checked_add_months(Months::new(steps)),
        Frequency::Week => start.checked_add_signed(Duration::try_weeks(steps_i64)?),
        Frequency::Day => start.checked_add_signed(Duration::try_days(steps_i64)?),
        Frequency::Hour => start.checked_add_signed(Duration::try_hours(steps_i64)?),
        Frequency::Minute => start.checked_add_signed(Duration::try_minutes(steps_i64)?),
        Frequency::Second => start.checked_add_signed(Duration::try_seconds(steps_i64)?),
    }
}

/// Every point from `start` to `end` (inclusive) at the given frequency.
///
/// Points are computed from `start` rather than from the previous point, so
/// a range starting on the 31st keeps returning to the 31st when it can.
pub fn date_range(
    start: &DateTime<FixedOffset>,
    end: &DateTime<FixedOffset>,
    frequency: Frequency,
) -> Vec<DateTime<FixedOffset>> {
    let mut dates = Vec::new();
    let mut step = 0u32;

    while let Some(current) = shift(start, frequency, step) {
        if current > *end {
            break;
        }
        dates.push(current);
        step += 1;
    }

    dates
}

/// Read newline-separated dates, skipping blank lines
pub fn read_dates_file<P: AsRef<Path>>(path: P) -> Result<Vec<DateTime<FixedOffset>>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dates file: {}", path.display()))?;

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            parse_date(line).with_context(|| format!("{}:{}", path.display(), idx + 1))
        })
        .collect()
}

/// Yesterday relative to the current UTC time
pub fn yesterday() -> DateTime<FixedOffset> {
    (Utc::now() - Duration::days(1)).fixed_offset()
}

/// Resolve the dates to dump from CLI arguments.
///
/// Precedence: `--dates` file, then `--startdate`/`--enddate`, then `--date`,
/// and finally yesterday.
pub fn resolve_dates(args: &Cli) -> Result<Vec<DateTime<FixedOffset>>> {
    if let Some(path) = &args.dates {
        debug!("Reading dates from {}", path.display());
        return read_dates_file(path);
    }

    match (&args.startdate, &args.enddate) {
        (Some(start), Some(end)) => {
            let start = parse_date(start).context("Invalid --startdate")?;
            let end = parse_date(end).context("Invalid --enddate")?;
            debug!(
                "Enumerating dates from {} to {} by {:?}",
                start, end, args.frequency
            );
            return Ok(date_range(&start, &end, args.frequency));
        }
        (Some(_), None) | (None, Some(_)) if args.date.is_none() => {
            bail!("--startdate and --enddate must be given together");
        }
        _ => {}
    }

    if let Some(date) = &args.date {
        return Ok(vec![parse_date(date).context("Invalid --date")?]);
    }

    Ok(vec![yesterday()])
}
