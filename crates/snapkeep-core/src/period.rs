use chrono::{DateTime, Datelike, Days, Months, NaiveDateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::duration::format_seconds;

/// The granularity a retention rule is measured in.
///
/// Variants are declared in canonical order; the derived `Ord` is the order
/// rules are iterated and rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Snapshot count.
    Last,
    /// Wall-clock seconds.
    Secondly,
    /// Calendar days.
    Daily,
    /// Calendar months.
    Monthly,
    /// Calendar years.
    Yearly,
}

impl Unit {
    /// Number of units, for fixed-size per-unit tables.
    pub const COUNT: usize = 5;

    /// Every unit, in canonical order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Last,
        Self::Secondly,
        Self::Daily,
        Self::Monthly,
        Self::Yearly,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Last => "last",
            Self::Secondly => "secondly",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    /// Look up a unit by its position in canonical order.
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Position of this unit in canonical order (also its table slot).
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Whether the unit is one of the known units. Always true for a
    /// constructed value; raw input goes through [`Unit::from_index`] or
    /// [`FromStr`] instead.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.index() < Self::COUNT
    }

    /// Whether `a` and `b` fall into the same bucket of this unit.
    ///
    /// Calendar buckets are taken in each value's own time zone, so callers
    /// wanting a particular zone should convert first.
    pub fn time_equals<Tz: TimeZone>(self, a: &DateTime<Tz>, b: &DateTime<Tz>) -> bool {
        match self {
            Self::Last => a == b,
            Self::Secondly => a.timestamp() == b.timestamp(),
            Self::Daily => a.date_naive() == b.date_naive(),
            Self::Monthly => a.year() == b.year() && a.month() == b.month(),
            Self::Yearly => a.year() == b.year(),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a unit name is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit {0:?}")]
pub struct ParseUnitError(pub String);

impl FromStr for Unit {
    type Err = ParseUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "secondly" => Ok(Self::Secondly),
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            _ => Err(ParseUnitError(s.to_string())),
        }
    }
}

/// One retained snapshot every `interval` units.
///
/// Ordered by unit, then by interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Period {
    pub unit: Unit,
    /// Forced to 1 for [`Unit::Last`]; must be positive otherwise.
    pub interval: i64,
}

impl Period {
    #[must_use]
    pub const fn new(unit: Unit, interval: i64) -> Self {
        Self { unit, interval }
    }

    /// Canonicalize the period, or `None` if it can never be valid.
    #[must_use]
    pub const fn normalize(self) -> Option<Self> {
        match self.unit {
            Unit::Last => Some(Self {
                unit: Unit::Last,
                interval: 1,
            }),
            _ if self.interval <= 0 => None,
            unit => Some(Self {
                unit,
                interval: self.interval,
            }),
        }
    }

    /// The instant one interval before `t`.
    ///
    /// Calendar units subtract in local time and clamp the day of month, so
    /// the result is never later than `t` moved back by the same amount from
    /// any earlier instant. For [`Unit::Last`] this is just the instant
    /// before `t`.
    pub fn prev_time<Tz: TimeZone>(&self, t: &DateTime<Tz>) -> DateTime<Tz> {
        let interval = self.interval.max(1);
        match self.unit {
            Unit::Last => t
                .clone()
                .checked_sub_signed(TimeDelta::nanoseconds(1))
                .unwrap_or_else(|| min_time(&t.timezone())),
            Unit::Secondly => TimeDelta::try_seconds(interval)
                .and_then(|delta| t.clone().checked_sub_signed(delta))
                .unwrap_or_else(|| min_time(&t.timezone())),
            Unit::Daily => {
                let days = Days::new(interval.unsigned_abs());
                shift_local(t, |naive| naive.checked_sub_days(days))
            }
            Unit::Monthly => {
                let months = Months::new(u32::try_from(interval).unwrap_or(u32::MAX));
                shift_local(t, |naive| naive.checked_sub_months(months))
            }
            Unit::Yearly => {
                let months = interval
                    .checked_mul(12)
                    .and_then(|m| u32::try_from(m).ok())
                    .unwrap_or(u32::MAX);
                shift_local(t, |naive| naive.checked_sub_months(Months::new(months)))
            }
        }
    }
}

/// Apply a calendar shift to the local wall time of `t`.
fn shift_local<Tz: TimeZone>(
    t: &DateTime<Tz>,
    shift: impl Fn(NaiveDateTime) -> Option<NaiveDateTime>,
) -> DateTime<Tz> {
    let tz = t.timezone();
    shift(t.naive_local())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .or_else(|| shift(t.naive_utc()).map(|naive| tz.from_utc_datetime(&naive)))
        .unwrap_or_else(|| min_time(&tz))
}

/// Earliest instant whose local time is representable in any offset.
fn min_time<Tz: TimeZone>(tz: &Tz) -> DateTime<Tz> {
    let min = DateTime::<Utc>::MIN_UTC.naive_utc();
    tz.from_utc_datetime(&min.checked_add_days(Days::new(2)).unwrap_or(min))
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(period) = self.normalize() else {
            return Ok(());
        };
        let (singular, plural) = match period.unit {
            Unit::Last => return f.write_str("last"),
            Unit::Secondly => return write!(f, "every {}", format_seconds(period.interval)),
            Unit::Daily => ("day", "days"),
            Unit::Monthly => ("month", "months"),
            Unit::Yearly => ("year", "years"),
        };
        if period.interval == 1 {
            write!(f, "every {singular}")
        } else {
            write!(f, "every {} {plural}", period.interval)
        }
    }
}
