//! Retention policies: a set of periods, each with a target snapshot count.

mod rule;

pub use rule::PolicyError;

use crate::period::{Period, Unit};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

/// Count meaning "retain unboundedly many snapshots".
pub const INFINITE: i64 = -1;

/// A retention policy.
///
/// Every stored period is normalized and valid, and every stored count is
/// either positive or [`INFINITE`]. Iteration is always in [`Period`] order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Policy {
    count: BTreeMap<Period, i64>,
}

impl Policy {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: BTreeMap::new(),
        }
    }

    /// Like [`Policy::set`], but panics if the period is invalid or already
    /// has a count.
    ///
    /// # Panics
    ///
    /// Panics on an invalid or duplicate period.
    pub fn must_set(&mut self, unit: Unit, interval: i64, count: i64) {
        let period = Period::new(unit, interval);
        assert!(self.get(period) == 0, "duplicate period {unit}:{interval}");
        assert!(self.set(period, count), "invalid period {unit}:{interval}");
    }

    /// Set the count for a period, replacing any existing count.
    ///
    /// Negative counts become [`INFINITE`]; a count of zero removes the
    /// period. Returns `false`, leaving the policy untouched, if the period
    /// is invalid.
    pub fn set(&mut self, period: Period, count: i64) -> bool {
        let Some(period) = period.normalize() else {
            return false;
        };
        match count {
            0 => {
                self.count.remove(&period);
            }
            n if n < 0 => {
                self.count.insert(period, INFINITE);
            }
            n => {
                self.count.insert(period, n);
            }
        }
        true
    }

    /// The count for a period, or 0 if unset or invalid.
    #[must_use]
    pub fn get(&self, period: Period) -> i64 {
        period
            .normalize()
            .and_then(|period| self.count.get(&period).copied())
            .unwrap_or(0)
    }

    /// All periods and counts in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (Period, i64)> + '_ {
        self.count.iter().map(|(period, count)| (*period, *count))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.count.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count.is_empty()
    }

    /// Canonical text of each rule, in canonical order.
    pub fn rules(&self) -> impl Iterator<Item = (Period, String)> + '_ {
        self.iter()
            .map(|(period, count)| (period, Rule(period, count).to_string()))
    }

    /// Human-readable summary, e.g. `last (3), every day (7), every year (inf)`.
    #[must_use]
    pub fn describe(&self) -> String {
        describe(self.iter())
    }
}

pub(crate) fn describe(entries: impl Iterator<Item = (Period, i64)>) -> String {
    entries
        .map(|(period, count)| {
            if count < 0 {
                format!("{period} (inf)")
            } else {
                format!("{period} ({count})")
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

struct Rule(Period, i64);

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        rule::write_rule(f, self.0, self.1)
    }
}

/// Canonical rule text, accepted back by [`FromStr`].
impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (period, count)) in self.iter().enumerate() {
            if i != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", Rule(period, count))?;
        }
        Ok(())
    }
}

impl FromStr for Policy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.split_whitespace())
    }
}

impl Serialize for Policy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Policy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
