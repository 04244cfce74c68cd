//! Diagnostics about a prune: `--why`, `--summarize` and the `--json` report.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use snapkeep_core::{Need, Period, Policy};
use std::borrow::Cow;
use std::io::{self, Write};

/// Decimal width of `n`.
pub const fn digits(mut n: usize) -> usize {
    let mut count = 1;
    while n >= 10 {
        n /= 10;
        count += 1;
    }
    count
}

fn reasons(reason: &[Period]) -> String {
    reason
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// One line per kept snapshot, numbered over the valid snapshots.
pub fn write_why(
    w: &mut dyn Write,
    snapshots: &[DateTime<FixedOffset>],
    keep: &[Vec<Period>],
) -> io::Result<()> {
    let total = keep.len();
    let width = digits(total);
    for (i, (at, reason)) in snapshots.iter().zip(keep).enumerate() {
        if reason.is_empty() {
            continue;
        }
        writeln!(
            w,
            "snapkeep: why: keep [{:>width$}/{total:>width$}] {} :: {}",
            i + 1,
            at.format("%a %Y %b %e %H:%M:%S"),
            reasons(reason),
        )?;
    }
    Ok(())
}

/// One line per rule with what it still needs, then the prune total.
pub fn write_summary(
    w: &mut dyn Write,
    policy: &Policy,
    need: &Need,
    pruned: usize,
    total: usize,
) -> io::Result<()> {
    let largest = policy.iter().map(|(_, count)| count).max().unwrap_or(0);
    let width = digits(usize::try_from(largest).unwrap_or(0));
    for (period, missing) in need.iter() {
        if missing < 0 {
            writeln!(w, "snapkeep: summary: ({}) {period}", "*".repeat(width))?;
            continue;
        }
        let wanted = policy.get(period);
        if missing == 0 {
            writeln!(w, "snapkeep: summary: ({wanted:>width$}) {period}")?;
        } else {
            writeln!(
                w,
                "snapkeep: summary: ({wanted:>width$}) {period} (missing {missing})"
            )?;
        }
    }
    writeln!(w, "snapkeep: summary: pruning {pruned}/{total} snapshots")
}

/// Machine-readable result of a run.
#[derive(Debug, Serialize)]
pub struct Report<'a> {
    pub policy: String,
    pub snapshots: Vec<SnapshotEntry<'a>>,
    pub need: Vec<NeedEntry>,
    pub pruned: usize,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct SnapshotEntry<'a> {
    /// The input line, with invalid UTF-8 replaced.
    pub line: Cow<'a, str>,
    /// RFC 3339, or `None` for lines without a timestamp.
    pub timestamp: Option<String>,
    pub keep: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NeedEntry {
    pub rule: String,
    pub period: String,
    /// `None` when unbounded.
    pub wanted: Option<i64>,
    pub missing: Option<i64>,
}

impl<'a> Report<'a> {
    /// Build the report. `reasons[i]` belongs to `lines[i]`; lines without a
    /// timestamp have no reasons.
    pub fn new(
        policy: &Policy,
        need: &Need,
        lines: &'a [Vec<u8>],
        times: &[Option<DateTime<FixedOffset>>],
        reasons: &[Vec<Period>],
    ) -> Self {
        let snapshots = lines
            .iter()
            .zip(times)
            .zip(reasons)
            .map(|((line, at), reason)| SnapshotEntry {
                line: String::from_utf8_lossy(line),
                timestamp: at.map(|at| at.to_rfc3339()),
                keep: reason.iter().map(ToString::to_string).collect(),
            })
            .collect();
        let need = policy
            .rules()
            .map(|(period, rule)| {
                let finite = |count: i64| (count >= 0).then_some(count);
                NeedEntry {
                    rule,
                    period: period.to_string(),
                    wanted: finite(policy.get(period)),
                    missing: finite(need.get(period)),
                }
            })
            .collect();
        let total = times.iter().flatten().count();
        let pruned = times
            .iter()
            .zip(reasons)
            .filter(|(at, reason)| at.is_some() && reason.is_empty())
            .count();
        Self {
            policy: policy.to_string(),
            snapshots,
            need,
            pruned,
            total,
        }
    }
}
