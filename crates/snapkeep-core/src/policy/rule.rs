//! The `[N@]unit[:X]` rule grammar.

use super::Policy;
use crate::duration::{format_seconds, parse_seconds};
use crate::period::{Period, Unit};
use std::fmt;
use std::num::ParseIntError;

/// Error returned when a policy rule cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PolicyError {
    #[error("rule {rule:?}: unknown unit {unit:?}")]
    UnknownUnit { rule: String, unit: String },

    #[error("rule {rule:?}: parse count {count:?}: {source}")]
    BadCount {
        rule: String,
        count: String,
        source: ParseIntError,
    },

    #[error("rule {rule:?}: count must not be zero")]
    ZeroCount { rule: String },

    #[error("rule {rule:?}: parse interval {interval:?}: {reason}")]
    BadInterval {
        rule: String,
        interval: String,
        reason: String,
    },

    #[error("rule {rule:?}: interval must be > 0")]
    NonPositiveInterval { rule: String },

    #[error("rule {rule:?}: interval must be 1 for unit last")]
    LastInterval { rule: String },

    #[error("rule {rule:?}: duplicate {}:{}", .period.unit, .period.interval)]
    Duplicate { rule: String, period: Period },

    #[error("rule {rule:?}: invalid period {}:{}", .period.unit, .period.interval)]
    InvalidPeriod { rule: String, period: Period },
}

impl PolicyError {
    /// The rule string that failed to parse.
    #[must_use]
    pub fn rule(&self) -> &str {
        match self {
            Self::UnknownUnit { rule, .. }
            | Self::BadCount { rule, .. }
            | Self::ZeroCount { rule }
            | Self::BadInterval { rule, .. }
            | Self::NonPositiveInterval { rule }
            | Self::LastInterval { rule }
            | Self::Duplicate { rule, .. }
            | Self::InvalidPeriod { rule, .. } => rule,
        }
    }
}

impl Policy {
    /// Parse a policy from rules of the form `N@unit:X`.
    ///
    /// `N` is the snapshot count: negative keeps an infinite number, zero is
    /// rejected, and an omitted `N@` means infinite. `X` is the interval and
    /// defaults to 1; it must be 1 for `last`, and may be a duration like
    /// `1h30m` for `secondly`. Each `unit:X` may appear only once.
    ///
    /// # Errors
    ///
    /// Returns the first rule that fails to parse; no partial policy is
    /// returned.
    pub fn parse<I, S>(rules: I) -> Result<Self, PolicyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut policy = Self::new();
        for rule in rules {
            let (period, count) = parse_rule(rule.as_ref())?;
            if policy.get(period) != 0 {
                return Err(PolicyError::Duplicate {
                    rule: rule.as_ref().to_string(),
                    period,
                });
            }
            if !policy.set(period, count) {
                return Err(PolicyError::InvalidPeriod {
                    rule: rule.as_ref().to_string(),
                    period,
                });
            }
        }
        Ok(policy)
    }
}

fn parse_rule(rule: &str) -> Result<(Period, i64), PolicyError> {
    let (count, rest) = rule.split_once('@').unwrap_or(("-1", rule));
    let (unit, interval) = rest.split_once(':').unwrap_or((rest, "1"));

    let unit: Unit = unit.parse().map_err(|_| PolicyError::UnknownUnit {
        rule: rule.to_string(),
        unit: unit.to_string(),
    })?;

    let count: i64 = count.parse().map_err(|source| PolicyError::BadCount {
        rule: rule.to_string(),
        count: count.to_string(),
        source,
    })?;
    if count == 0 {
        return Err(PolicyError::ZeroCount {
            rule: rule.to_string(),
        });
    }

    let interval = match interval.parse::<i64>() {
        Ok(n) => n,
        Err(_) if unit == Unit::Secondly => {
            parse_seconds(interval).map_err(|err| PolicyError::BadInterval {
                rule: rule.to_string(),
                interval: interval.to_string(),
                reason: err.to_string(),
            })?
        }
        Err(err) => {
            return Err(PolicyError::BadInterval {
                rule: rule.to_string(),
                interval: interval.to_string(),
                reason: err.to_string(),
            });
        }
    };
    if interval < 1 {
        return Err(PolicyError::NonPositiveInterval {
            rule: rule.to_string(),
        });
    }
    if unit == Unit::Last && interval != 1 {
        return Err(PolicyError::LastInterval {
            rule: rule.to_string(),
        });
    }

    Ok((Period::new(unit, interval), count))
}

/// Write one rule in canonical form: the count only when finite, the
/// interval only when not 1, and long `secondly` intervals as durations.
pub(super) fn write_rule(f: &mut fmt::Formatter<'_>, period: Period, count: i64) -> fmt::Result {
    if count > 0 {
        write!(f, "{count}@")?;
    }
    write!(f, "{}", period.unit)?;
    if period.interval != 1 {
        if period.unit == Unit::Secondly && period.interval >= 60 {
            write!(f, ":{}", format_seconds(period.interval))?;
        } else {
            write!(f, ":{}", period.interval)?;
        }
    }
    Ok(())
}
