//! Snapshot pruning.
//!
//! [`prune`] walks snapshots from newest to oldest. Every period in the
//! policy keeps the first snapshot it sees, then waits until a snapshot
//! falls at or before one interval (in the period's unit) before the last one
//! it kept, and keeps the newest such snapshot. `last` keeps the newest
//! snapshots by position. Each period stops once its count is used up.
//!
//! Guarantees (exercised by `tests/prune_properties.rs`):
//!
//! - The result only depends on the input instants, so pruning is
//!   reproducible.
//! - For a finite count, `need + kept == count`; for an infinite count, need
//!   stays [`INFINITE`](crate::policy::INFINITE).
//! - Pruning the kept subset again gives the same reasons and need.
//! - Adding snapshots never increases need.
//! - For each unit, at most one snapshot is kept per bucket (calendar day,
//!   month, year, or UTC second) across all periods of that unit.
//!
//! Known limitation: when a policy has several intervals for one unit and
//! snapshots are deleted between runs, a snapshot the longer interval would
//! eventually need can be discarded because, at the time, only the shorter
//! interval was due.

use crate::period::{Period, Unit};
use crate::policy::{Policy, describe};
use chrono::{DateTime, TimeZone};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Remaining snapshots needed to fulfill a policy.
///
/// Holds exactly the periods of the policy it was computed from. A count of 0
/// means the period is satisfied; [`INFINITE`](crate::policy::INFINITE)
/// means it never will be.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Need {
    remaining: BTreeMap<Period, i64>,
}

impl Need {
    fn from_policy(policy: &Policy) -> Self {
        Self {
            remaining: policy.iter().collect(),
        }
    }

    /// Remaining count for a period, or 0 if the period is not in the policy.
    #[must_use]
    pub fn get(&self, period: Period) -> i64 {
        period
            .normalize()
            .and_then(|period| self.remaining.get(&period).copied())
            .unwrap_or(0)
    }

    /// All periods and remaining counts in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Period, i64)> + '_ {
        self.remaining.iter().map(|(period, count)| (*period, *count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.remaining.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Whether every finite period has all its snapshots.
    #[must_use]
    pub fn is_satisfied(&self) -> bool {
        self.remaining.values().all(|&count| count <= 0)
    }

    /// Take one snapshot off a period's remaining count.
    fn consume(&mut self, period: Period) {
        if let Some(count) = self.remaining.get_mut(&period) {
            if *count > 0 {
                *count -= 1;
            }
        }
    }
}

impl fmt::Display for Need {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&describe(self.iter()))
    }
}

/// Result of [`prune`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pruned {
    /// For each input snapshot (same index), the periods it is kept for, in
    /// canonical order. Empty means it can be pruned.
    pub keep: Vec<Vec<Period>>,
    /// Snapshots still needed per period.
    pub need: Need,
}

impl Pruned {
    /// Number of snapshots not kept by any period.
    #[must_use]
    pub fn pruned(&self) -> usize {
        self.keep.iter().filter(|reason| reason.is_empty()).count()
    }
}

/// Decide which snapshots to keep under `policy`.
///
/// Snapshots are ordered by their absolute instant; the time zone of each
/// only decides where its calendar days, months and years begin. Duplicate
/// instants are treated as separate snapshots.
pub fn prune<Tz: TimeZone>(snapshots: &[DateTime<Tz>], policy: &Policy) -> Pruned {
    let mut need = Need::from_policy(policy);
    let mut keep = vec![Vec::new(); snapshots.len()];

    if snapshots.is_empty() {
        return Pruned { keep, need };
    }
    debug!(
        snapshots = snapshots.len(),
        periods = policy.len(),
        "pruning snapshots"
    );

    // newest first; the sort is stable so equal instants keep input order
    let mut sorted: Vec<usize> = (0..snapshots.len()).collect();
    sorted.sort_by(|&a, &b| snapshots[b].cmp(&snapshots[a]));

    let periods: Vec<Period> = policy.iter().map(|(period, _)| period).collect();
    // last snapshot kept per period (same index as `periods`)
    let mut last: Vec<Option<DateTime<Tz>>> = vec![None; periods.len()];
    // last snapshot kept per unit by any period, as (position in `sorted`, time)
    let mut last_unit: [Option<(usize, DateTime<Tz>)>; Unit::COUNT] = Default::default();

    for (position, &index) in sorted.iter().enumerate() {
        let at = &snapshots[index];
        for (slot, &period) in periods.iter().enumerate() {
            if need.get(period) == 0 {
                continue;
            }

            if period.unit != Unit::Last {
                if let Some(prev) = &last[slot] {
                    let due = period.prev_time(prev);
                    if due < *at && !period.unit.time_equals(at, &due) {
                        continue;
                    }
                }
                if let Some((other, kept)) = &last_unit[period.unit.index()] {
                    if *other != position && period.unit.time_equals(at, kept) {
                        continue;
                    }
                }
                last[slot] = Some(at.clone());
                last_unit[period.unit.index()] = Some((position, at.clone()));
            }

            trace!(snapshot = index, %period, "keeping snapshot");
            keep[index].push(period);
            need.consume(period);
        }
    }

    debug!(
        kept = keep.iter().filter(|reason| !reason.is_empty()).count(),
        satisfied = need.is_satisfied(),
        "pruned snapshots"
    );
    Pruned { keep, need }
}
