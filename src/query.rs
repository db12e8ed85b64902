use chrono::{DateTime, FixedOffset, SecondsFormat, SubsecRound, Timelike};

use crate::error::DumpError;

/// Render a query template, replacing `{startdate}` and `{enddate}`.
///
/// `{{` and `}}` produce literal braces. Any other marker is rejected so a
/// typo in the configuration does not silently reach the database.
pub fn render_query(
    template: &str,
    start: &DateTime<FixedOffset>,
    end: &DateTime<FixedOffset>,
) -> Result<String, DumpError> {
    let start = format_timestamp(start);
    let end = format_timestamp(end);

    let mut rendered = String::with_capacity(template.len() + 2 * start.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                rendered.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                rendered.push('}');
            }
            '{' => {
                let mut name = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => name.push(c),
                        None => {
                            return Err(DumpError::Template(format!(
                                "unterminated marker '{{{}'",
                                name
                            )));
                        }
                    }
                }
                match name.as_str() {
                    "startdate" => rendered.push_str(&start),
                    "enddate" => rendered.push_str(&end),
                    other => {
                        return Err(DumpError::Template(format!(
                            "unknown marker '{{{}}}'",
                            other
                        )));
                    }
                }
            }
            '}' => {
                return Err(DumpError::Template(
                    "single '}' encountered in query".to_string(),
                ));
            }
            c => rendered.push(c),
        }
    }

    Ok(rendered)
}

/// Timestamps are substituted as RFC 3339 with an explicit offset, with
/// microseconds only when there is a fractional part
pub fn format_timestamp(date: &DateTime<FixedOffset>) -> String {
    let date = date.trunc_subsecs(6);
    let precision = if date.nanosecond() == 0 {
        SecondsFormat::Secs
    } else {
        SecondsFormat::Micros
    };
    date.to_rfc3339_opts(precision, false)
}
