//! Reading snapshot lines from stdin and turning them into timestamps.

use anyhow::{Result, bail};
use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::bytes::Regex;
use std::io::{BufRead, Write};
use tracing::debug;

/// Zone for timestamps that do not carry an offset of their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Utc,
    Local,
}

impl Zone {
    fn place_utc(self, at: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Utc => at.fixed_offset(),
            Self::Local => at.with_timezone(&Local).fixed_offset(),
        }
    }

    fn place_naive(self, naive: NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Utc => Some(Utc.from_utc_datetime(&naive).fixed_offset()),
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|at| at.fixed_offset()),
        }
    }
}

/// Compile an `--extract` regexp, which may have at most one capture group.
///
/// # Errors
///
/// Returns an error if the regexp is invalid or has several groups.
pub fn compile_extract(pattern: &str) -> Result<Regex> {
    let regex = Regex::new(pattern)?;
    // group 0 is the whole match
    if regex.captures_len() > 2 {
        bail!("must contain up to one capture group");
    }
    Ok(regex)
}

/// How each input line becomes a timestamp.
#[derive(Debug, Clone)]
pub struct Scanner {
    pub extract: Option<Regex>,
    pub only: bool,
    /// strftime format; unix seconds when unset.
    pub format: Option<String>,
    pub zone: Zone,
    pub quiet: bool,
}

/// The non-empty input lines, in order, with their timestamps. Lines that
/// did not yield a timestamp have `None`. Lines are kept as raw bytes, without
/// the line terminator, so they echo back unchanged even when not UTF-8.
#[derive(Debug, Default)]
pub struct Scanned {
    pub lines: Vec<Vec<u8>>,
    pub times: Vec<Option<DateTime<FixedOffset>>>,
}

impl Scanned {
    /// The valid timestamps, with the index of the line each came from.
    pub fn snapshots(&self) -> (Vec<DateTime<FixedOffset>>, Vec<usize>) {
        self.times
            .iter()
            .enumerate()
            .filter_map(|(line, at)| at.map(|at| (at, line)))
            .unzip()
    }
}

impl Scanner {
    /// Read every line from `input`. Warnings about unusable lines go to
    /// `warn` unless quiet. Invalid UTF-8 is matched and parsed lossily.
    ///
    /// # Errors
    ///
    /// Returns an error if `input` cannot be read or a warning cannot be
    /// written.
    pub fn scan(&self, input: impl BufRead, warn: &mut dyn Write) -> Result<Scanned> {
        let mut scanned = Scanned::default();
        for line in input.split(b'\n') {
            let mut line = line?;
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.is_empty() {
                continue;
            }

            let at = match self.extract(&line) {
                Some((matched, text)) => {
                    let at = self.parse(&String::from_utf8_lossy(text));
                    if let Err(reason) = &at {
                        self.warn(warn, reason)?;
                    }
                    if self.only {
                        line = matched.to_vec();
                    }
                    at.ok()
                }
                None => {
                    let text = String::from_utf8_lossy(&line);
                    self.warn(warn, &format!("no --extract match in line {text:?}"))?;
                    None
                }
            };
            scanned.times.push(at);
            scanned.lines.push(line);
        }
        debug!(
            lines = scanned.lines.len(),
            valid = scanned.times.iter().flatten().count(),
            "scanned input"
        );
        Ok(scanned)
    }

    /// The matched bytes and timestamp bytes of a line, or `None` without a
    /// match.
    fn extract<'l>(&self, line: &'l [u8]) -> Option<(&'l [u8], &'l [u8])> {
        let Some(regex) = &self.extract else {
            return Some((line, line.trim_ascii()));
        };
        let captures = regex.captures(line)?;
        let whole = captures.get(0).map_or(&line[..0], |m| m.as_bytes());
        let text = captures
            .get(captures.len() - 1)
            .map_or(&line[..0], |m| m.as_bytes());
        Some((whole, text))
    }

    fn parse(&self, text: &str) -> std::result::Result<DateTime<FixedOffset>, String> {
        match &self.format {
            None => parse_unix(text, self.zone)
                .map_err(|err| format!("failed to parse unix timestamp {text:?}: {err}")),
            Some(format) => parse_format(text, format, self.zone).map_err(|err| {
                format!("failed to parse timestamp {text:?} using format {format:?}: {err}")
            }),
        }
    }

    fn warn(&self, warn: &mut dyn Write, reason: &str) -> std::io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(warn, "snapkeep: warning: {reason}")
    }
}

fn parse_unix(text: &str, zone: Zone) -> Result<DateTime<FixedOffset>> {
    let seconds: i64 = text.parse()?;
    match DateTime::from_timestamp(seconds, 0) {
        Some(at) => Ok(zone.place_utc(at)),
        None => bail!("out of range"),
    }
}

/// Parse with an offset if the format has one, else as a naive date-time,
/// else as a date at midnight. Naive values are placed in `zone`.
fn parse_format(text: &str, format: &str, zone: Zone) -> Result<DateTime<FixedOffset>> {
    let err = match DateTime::parse_from_str(text, format) {
        Ok(at) => return Ok(at),
        Err(err) => err,
    };
    let naive = NaiveDateTime::parse_from_str(text, format).or_else(|_| {
        NaiveDate::parse_from_str(text, format).map(|date| date.and_time(chrono::NaiveTime::MIN))
    });
    match naive {
        Ok(naive) => match zone.place_naive(naive) {
            Some(at) => Ok(at),
            None => bail!("{naive} does not exist in the local time zone"),
        },
        Err(_) => Err(err.into()),
    }
}
