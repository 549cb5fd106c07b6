//! Expiry specifications and their resolution into store lifetimes.
//!
//! An [`Expiry`] is what callers hand to a write: a raw TTL in seconds, a relative
//! expression such as `"+5 seconds"`, an absolute instant, or one of the `Default` /
//! `Never` markers. It is resolved into a [`Lifetime`] only when the write executes,
//! so relative expressions are measured from execution time.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use shared::{Error, Result};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ExpiryRepr", into = "ExpiryRepr")]
pub enum Expiry {
    /// Use the adapter's configured default.
    Default,
    /// Keep until deleted or cleared.
    Never,
    /// Seconds from now. Never interpreted as a timestamp.
    Ttl(u64),
    /// Offset from the moment the write executes.
    Relative(TimeDelta),
    /// Absolute point in time.
    At(DateTime<Utc>),
}

/// Concrete lifetime handed to a backing store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifetime {
    Forever,
    /// A zero duration means the entry is already expired.
    Expires(Duration),
}

impl Lifetime {
    pub fn ttl(&self) -> Option<Duration> {
        match self {
            Lifetime::Forever => None,
            Lifetime::Expires(duration) => Some(*duration),
        }
    }
}

impl Expiry {
    pub fn parse(raw: &str) -> Result<Self> {
        raw.parse()
    }

    /// Resolve against `fallback` (the adapter default) using the current time.
    pub fn resolve(&self, fallback: &Expiry) -> Lifetime {
        self.resolve_at(fallback, Utc::now())
    }

    pub fn resolve_at(&self, fallback: &Expiry, now: DateTime<Utc>) -> Lifetime {
        match self {
            Expiry::Default => match fallback {
                // A default that points at itself has nothing to fall back to.
                Expiry::Default => Lifetime::Forever,
                other => other.resolve_at(&Expiry::Never, now),
            },
            Expiry::Never => Lifetime::Forever,
            Expiry::Ttl(secs) => Lifetime::Expires(Duration::from_secs(*secs)),
            Expiry::Relative(delta) => Lifetime::Expires(non_negative(*delta)),
            Expiry::At(instant) => Lifetime::Expires(non_negative(*instant - now)),
        }
    }
}

fn non_negative(delta: TimeDelta) -> Duration {
    delta.to_std().unwrap_or(Duration::ZERO)
}

/// Text that matches no known form is an `Error::InvalidExpiry`, never a permanent entry.
impl FromStr for Expiry {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(Error::InvalidExpiry("empty expiry".to_string()));
        }

        let lower = text.to_ascii_lowercase();
        match lower.as_str() {
            "default" => return Ok(Expiry::Default),
            "never" | "none" | "forever" => return Ok(Expiry::Never),
            "now" => return Ok(Expiry::Relative(TimeDelta::zero())),
            _ => {}
        }

        // Bare digits are a TTL, not a unix timestamp. Timestamps need the '@' prefix.
        if text.bytes().all(|b| b.is_ascii_digit()) {
            return text
                .parse::<u64>()
                .map(Expiry::Ttl)
                .map_err(|e| Error::InvalidExpiry(format!("{}: {}", text, e)));
        }

        if let Some(stamp) = text.strip_prefix('@') {
            let secs = stamp
                .parse::<i64>()
                .map_err(|e| Error::InvalidExpiry(format!("{}: {}", text, e)))?;
            return DateTime::from_timestamp(secs, 0)
                .map(Expiry::At)
                .ok_or_else(|| Error::InvalidExpiry(format!("timestamp out of range: {}", text)));
        }

        if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
            return Ok(Expiry::At(instant.with_timezone(&Utc)));
        }
        if let Ok(instant) = NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S") {
            return Ok(Expiry::At(instant.and_utc()));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
                return Ok(Expiry::At(midnight.and_utc()));
            }
        }

        parse_relative(&lower).map(Expiry::Relative)
    }
}

/// Parses one or more `<signed amount> <unit>` terms, e.g. `"+1 day -2 hours"`.
fn parse_relative(text: &str) -> Result<TimeDelta> {
    let invalid = || Error::InvalidExpiry(format!("unrecognized expression: {}", text));

    let mut tokens = text.split_whitespace();
    let mut total = TimeDelta::zero();
    let mut terms = 0;

    while let Some(amount) = tokens.next() {
        let amount = amount
            .strip_prefix('+')
            .unwrap_or(amount)
            .parse::<i64>()
            .map_err(|_| invalid())?;
        let unit = tokens.next().and_then(unit_seconds).ok_or_else(invalid)?;
        let term = amount
            .checked_mul(unit)
            .and_then(TimeDelta::try_seconds)
            .ok_or_else(invalid)?;
        total = total.checked_add(&term).ok_or_else(invalid)?;
        terms += 1;
    }

    if terms == 0 { Err(invalid()) } else { Ok(total) }
}

fn unit_seconds(unit: &str) -> Option<i64> {
    match unit {
        "sec" | "secs" | "second" | "seconds" => Some(1),
        "min" | "mins" | "minute" | "minutes" => Some(60),
        "hour" | "hours" => Some(3_600),
        "day" | "days" => Some(86_400),
        "week" | "weeks" => Some(604_800),
        "fortnight" | "fortnights" => Some(1_209_600),
        _ => None,
    }
}

impl From<u64> for Expiry {
    fn from(secs: u64) -> Self {
        Expiry::Ttl(secs)
    }
}

impl From<DateTime<Utc>> for Expiry {
    fn from(instant: DateTime<Utc>) -> Self {
        Expiry::At(instant)
    }
}

impl fmt::Display for Expiry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expiry::Default => write!(f, "default"),
            Expiry::Never => write!(f, "never"),
            Expiry::Ttl(secs) => write!(f, "{}", secs),
            Expiry::Relative(delta) => write!(f, "{:+} seconds", delta.num_seconds()),
            Expiry::At(instant) => write!(f, "{}", instant.to_rfc3339()),
        }
    }
}

/// Wire shape: integers are TTLs, strings go through [`Expiry::from_str`].
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ExpiryRepr {
    Seconds(u64),
    Text(String),
}

impl TryFrom<ExpiryRepr> for Expiry {
    type Error = Error;

    fn try_from(repr: ExpiryRepr) -> Result<Self> {
        match repr {
            ExpiryRepr::Seconds(secs) => Ok(Expiry::Ttl(secs)),
            ExpiryRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Expiry> for ExpiryRepr {
    fn from(expiry: Expiry) -> Self {
        match expiry {
            Expiry::Ttl(secs) => ExpiryRepr::Seconds(secs),
            other => ExpiryRepr::Text(other.to_string()),
        }
    }
}
