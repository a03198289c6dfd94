//! Absolute and relative time expressions.
//!
//! This module provides:
//! - [`TemporalAmount`]: A calendar [`Period`] or an exact duration
//! - [`parse_temporal_amount`]: Relative grammar such as `"3 days 20 mins"`
//! - [`Zone`]: A fixed UTC offset or a named IANA zone
//! - [`parse_instant`]: Absolute timestamps read in a [`Zone`]
//! - [`TimeResolver`]: Resolves either form to an instant relative to "now"

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Days, FixedOffset, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime, Offset,
    TimeDelta, TimeZone, Utc,
};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{LogbookError, Result};

/// Text of the zero amount.
pub const NOW: &str = "now";

// Units are listed longest first so that "days" is not consumed as "d".
static QUANTITY_UNIT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\s*([0-9]*\.?[0-9]*)\s*(millis|ms|seconds|second|secs|sec|s|minutes|minute|mins|min|hours|hour|h|days|day|d|weeks|week|w|months|month|mon|mo|years|year|y)\s*",
    )
    .unwrap_or_else(|_| unreachable!())
});

const NAIVE_DATE_TIME_FORMATS: [&str; 3] =
    ["%Y-%m-%d %H:%M:%S%.3f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

const NAIVE_TIME_FORMATS: [&str; 2] = ["%H:%M:%S", "%H:%M"];

/// A calendar amount of years, months and days.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Period {
    /// Whole years.
    pub years: u32,
    /// Whole months.
    pub months: u32,
    /// Whole days.
    pub days: u32,
}

impl Period {
    /// Creates a period.
    #[must_use]
    pub const fn new(years: u32, months: u32, days: u32) -> Self {
        Self {
            years,
            months,
            days,
        }
    }

    /// Returns true if every component is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.years == 0 && self.months == 0 && self.days == 0
    }
}

/// A relative amount of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalAmount {
    /// Exact elapsed time.
    Duration(TimeDelta),
    /// Calendar amount, produced when weeks or coarser units are involved.
    Period(Period),
}

impl TemporalAmount {
    /// The zero amount, spelled `"now"`.
    pub const ZERO: Self = Self::Duration(TimeDelta::zero());

    /// Exact duration of this amount, if it has one.
    ///
    /// A period made only of days is treated as that many 24 hour days.
    #[must_use]
    pub fn as_duration(&self) -> Option<TimeDelta> {
        match self {
            Self::Duration(delta) => Some(*delta),
            Self::Period(p) if p.years == 0 && p.months == 0 => {
                TimeDelta::try_days(i64::from(p.days))
            }
            Self::Period(_) => None,
        }
    }

    /// Returns true if both amounts describe the same span of time.
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        match (self.as_duration(), other.as_duration()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Subtracts this amount from `reference`.
    ///
    /// Periods use calendar arithmetic in `zone`: months first, then days.
    /// Returns `None` if the result is out of range.
    #[must_use]
    pub fn before(&self, reference: DateTime<Utc>, zone: Zone) -> Option<DateTime<Utc>> {
        match self {
            Self::Duration(delta) => reference.checked_sub_signed(*delta),
            Self::Period(p) => {
                let months = p.years.checked_mul(12)?.checked_add(p.months)?;
                match zone {
                    Zone::Fixed(offset) => sub_calendar(reference, &offset, months, p.days),
                    Zone::Named(tz) => sub_calendar(reference, &tz, months, p.days),
                }
            }
        }
    }
}

fn sub_calendar<Z: TimeZone>(
    reference: DateTime<Utc>,
    zone: &Z,
    months: u32,
    days: u32,
) -> Option<DateTime<Utc>> {
    reference
        .with_timezone(zone)
        .checked_sub_months(Months::new(months))?
        .checked_sub_days(Days::new(u64::from(days)))
        .map(|local| local.with_timezone(&Utc))
}

impl fmt::Display for TemporalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts = match self {
            Self::Period(p) => vec![
                plural(i64::from(p.years), "year"),
                plural(i64::from(p.months), "month"),
                plural(i64::from(p.days), "day"),
            ],
            Self::Duration(delta) => {
                let mut secs = delta.num_seconds();
                let days = secs / 86_400;
                secs -= days * 86_400;
                let hours = secs / 3_600;
                secs -= hours * 3_600;
                let minutes = secs / 60;
                secs -= minutes * 60;
                let millis = i64::from(delta.subsec_nanos() / 1_000_000);
                vec![
                    plural(days, "day"),
                    plural(hours, "hour"),
                    plural(minutes, "minute"),
                    plural(secs, "second"),
                    (millis > 0).then(|| format!("{millis} ms")),
                ]
            }
        };
        let text = parts.into_iter().flatten().collect::<Vec<_>>().join(" ");
        if text.is_empty() {
            f.write_str(NOW)
        } else {
            f.write_str(&text)
        }
    }
}

fn plural(count: i64, unit: &str) -> Option<String> {
    match count {
        c if c <= 0 => None,
        1 => Some(format!("1 {unit}")),
        c => Some(format!("{c} {unit}s")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Millis,
}

impl Unit {
    fn from_keyword(keyword: &str) -> Self {
        match keyword.to_ascii_lowercase().as_str() {
            "millis" | "ms" => Self::Millis,
            "seconds" | "second" | "secs" | "sec" | "s" => Self::Seconds,
            "minutes" | "minute" | "mins" | "min" => Self::Minutes,
            "hours" | "hour" | "h" => Self::Hours,
            "days" | "day" | "d" => Self::Days,
            "weeks" | "week" | "w" => Self::Weeks,
            "months" | "month" | "mon" | "mo" => Self::Months,
            _ => Self::Years,
        }
    }

    const fn is_calendar(self) -> bool {
        matches!(self, Self::Years | Self::Months | Self::Weeks)
    }
}

#[derive(Debug, Default)]
struct Quantities {
    years: i64,
    months: i64,
    weeks: i64,
    days: i64,
    hours: i64,
    minutes: i64,
    seconds: i64,
    millis: i64,
    micros: i64,
}

impl Quantities {
    fn add(&mut self, unit: Unit, quantity: f64) {
        let full = quantity.trunc();
        let fraction = quantity - full;
        let full = full as i64;
        let carry = |scale: f64| {
            if fraction > 0.0 {
                (fraction * scale + 0.5) as i64
            } else {
                0
            }
        };
        match unit {
            Unit::Years => {
                self.years = self.years.saturating_add(full);
                self.months = self.months.saturating_add(carry(12.0));
            }
            Unit::Months => {
                self.months = self.months.saturating_add(full);
                self.days = self.days.saturating_add(carry(28.0));
            }
            Unit::Weeks => {
                self.weeks = self.weeks.saturating_add(full);
                self.days = self.days.saturating_add(carry(7.0));
            }
            Unit::Days => {
                self.days = self.days.saturating_add(full);
                self.hours = self.hours.saturating_add(carry(24.0));
            }
            Unit::Hours => {
                self.hours = self.hours.saturating_add(full);
                self.minutes = self.minutes.saturating_add(carry(60.0));
            }
            Unit::Minutes => {
                self.minutes = self.minutes.saturating_add(full);
                self.seconds = self.seconds.saturating_add(carry(60.0));
            }
            Unit::Seconds => {
                self.seconds = self.seconds.saturating_add(full);
                self.millis = self.millis.saturating_add(carry(1000.0));
            }
            Unit::Millis => {
                self.millis = self.millis.saturating_add(full);
                self.micros = self.micros.saturating_add(carry(1000.0));
            }
        }
    }

    fn into_period(self) -> Option<Period> {
        let days = self.weeks.checked_mul(7)?.checked_add(self.days)?;
        Some(Period::new(
            u32::try_from(self.years).ok()?,
            u32::try_from(self.months).ok()?,
            u32::try_from(days).ok()?,
        ))
    }

    fn into_duration(self) -> Option<TimeDelta> {
        TimeDelta::try_days(self.days)?
            .checked_add(&TimeDelta::try_hours(self.hours)?)?
            .checked_add(&TimeDelta::try_minutes(self.minutes)?)?
            .checked_add(&TimeDelta::try_seconds(self.seconds)?)?
            .checked_add(&TimeDelta::try_milliseconds(self.millis)?)?
            .checked_add(&TimeDelta::microseconds(self.micros))
    }
}

/// Parses a relative amount such as `"1 month 2 days"` or `"1.5 h"`.
///
/// The whole input must be a sequence of `NUMBER? UNIT` pairs; a missing
/// number means 1. Fractions carry into the next finer unit. If any unit of
/// weeks or coarser appears the result is a [`Period`] and units finer than a
/// day are dropped; otherwise it is an exact duration.
///
/// # Errors
///
/// Returns [`LogbookError::InvalidTime`] if the text is not a relative
/// expression or the amount is out of range.
pub fn parse_temporal_amount(text: &str) -> Result<TemporalAmount> {
    let invalid = || LogbookError::InvalidTime(text.to_string());

    if text.trim().eq_ignore_ascii_case(NOW) {
        return Ok(TemporalAmount::ZERO);
    }
    let mut quantities = Quantities::default();
    let mut calendar = false;
    let mut consumed = 0;
    for captures in QUANTITY_UNIT.captures_iter(text) {
        let (Some(whole), Some(number), Some(unit)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            return Err(invalid());
        };
        if whole.start() != consumed {
            return Err(invalid());
        }
        consumed = whole.end();

        let quantity = if number.as_str().is_empty() {
            1.0
        } else {
            number.as_str().parse::<f64>().map_err(|_| invalid())?
        };
        let unit = Unit::from_keyword(unit.as_str());
        calendar |= unit.is_calendar();
        quantities.add(unit, quantity);
    }
    if consumed == 0 || consumed != text.len() {
        return Err(invalid());
    }

    if calendar {
        quantities
            .into_period()
            .map(TemporalAmount::Period)
            .ok_or_else(invalid)
    } else {
        quantities
            .into_duration()
            .map(TemporalAmount::Duration)
            .ok_or_else(invalid)
    }
}

/// Zone in which timestamps without an explicit offset are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    /// A constant offset from UTC.
    Fixed(FixedOffset),
    /// A named IANA zone, following its daylight saving rules.
    Named(Tz),
}

impl Default for Zone {
    fn default() -> Self {
        Self::UTC
    }
}

impl Zone {
    /// Coordinated Universal Time.
    pub const UTC: Self = Self::Named(Tz::UTC);

    /// Parses an IANA name (`Europe/Stockholm`, `CET`), an offset (`+02:00`)
    /// or a `UTC`/`GMT` prefixed offset (`UTC+2`, `GMT-05:30`).
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::MalformedQuery`] for anything else.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if let Ok(tz) = text.parse::<Tz>() {
            return Ok(Self::Named(tz));
        }
        if let Ok(offset) = text.parse::<FixedOffset>() {
            return Ok(Self::Fixed(offset));
        }
        ["UTC", "GMT"]
            .iter()
            .find_map(|prefix| text.strip_prefix(prefix))
            .and_then(parse_signed_offset)
            .map(Self::Fixed)
            .ok_or_else(|| LogbookError::MalformedQuery(format!("unknown time zone {text:?}")))
    }

    /// Calendar date of `now` in this zone.
    #[must_use]
    pub fn today(self, now: DateTime<Utc>) -> NaiveDate {
        match self {
            Self::Fixed(offset) => now.with_timezone(&offset).date_naive(),
            Self::Named(tz) => now.with_timezone(&tz).date_naive(),
        }
    }

    /// Converts a wall-clock time in this zone to UTC.
    ///
    /// An ambiguous time (clocks turned back) takes the earlier instant. A
    /// time inside a gap (clocks turned forward) is read with the offset in
    /// force before the gap.
    #[must_use]
    pub fn to_utc(self, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            Self::Fixed(offset) => local_to_utc(&offset, local),
            Self::Named(tz) => local_to_utc(&tz, local),
        }
    }
}

impl FromStr for Zone {
    type Err = LogbookError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(offset) => write!(f, "{offset}"),
            Self::Named(tz) => f.write_str(tz.name()),
        }
    }
}

impl From<FixedOffset> for Zone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

impl From<Tz> for Zone {
    fn from(tz: Tz) -> Self {
        Self::Named(tz)
    }
}

fn local_to_utc<Z: TimeZone>(zone: &Z, local: &NaiveDateTime) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(local) {
        LocalResult::Single(t) | LocalResult::Ambiguous(t, _) => Some(t.with_timezone(&Utc)),
        LocalResult::None => {
            let earlier = local.checked_sub_signed(TimeDelta::days(1))?;
            let offset = zone.offset_from_local_datetime(&earlier).earliest()?.fix();
            let utc = local.checked_sub_signed(TimeDelta::seconds(i64::from(offset.local_minus_utc())))?;
            Some(Utc.from_utc_datetime(&utc))
        }
    }
}

/// `+H`, `+HH`, `+HHMM` or `+HH:MM`, with either sign.
fn parse_signed_offset(text: &str) -> Option<FixedOffset> {
    let (sign, digits) = match text.split_at_checked(1)? {
        ("+", digits) => (1, digits),
        ("-", digits) => (-1, digits),
        _ => return None,
    };
    if !digits.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return None;
    }
    let (hours, minutes) = match digits.split_once(':') {
        Some((hours, minutes)) if minutes.len() == 2 => (hours, minutes),
        Some(_) => return None,
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "00"),
    };
    if hours.is_empty() || hours.len() > 2 {
        return None;
    }
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 18 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Parses an absolute timestamp.
///
/// RFC 3339 (or `yyyy-MM-ddTHH:mm:ss.SSS+hhmm`) carries its own offset. The
/// remaining forms are read in `zone`: `yyyy-MM-dd HH:mm:ss.SSS`,
/// `yyyy-MM-dd HH:mm:ss`, `yyyy-MM-dd HH:mm`, `yyyy-MM-dd` (midnight), and
/// `HH:mm:ss` / `HH:mm` on the current day of `now`. First match wins.
#[must_use]
pub fn parse_instant(text: &str, zone: Zone, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    if let Ok(instant) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.3f%z") {
        return Some(instant.with_timezone(&Utc));
    }

    let naive = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
        .or_else(|| {
            let today = zone.today(now);
            NAIVE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
                .map(|time| today.and_time(time))
        })?;

    zone.to_utc(&naive)
}

/// Either an absolute instant or a relative amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeValue {
    /// An absolute point in time.
    Instant(DateTime<Utc>),
    /// An amount relative to a reference instant.
    Amount(TemporalAmount),
}

/// Parses `text` as an absolute timestamp first, then as a relative amount.
///
/// # Errors
///
/// Returns [`LogbookError::InvalidTime`] if neither form applies.
pub fn parse_instant_or_amount(
    text: &str,
    zone: Zone,
    now: DateTime<Utc>,
) -> Result<TimeValue> {
    if let Some(instant) = parse_instant(text, zone, now) {
        return Ok(TimeValue::Instant(instant));
    }
    parse_temporal_amount(text).map(TimeValue::Amount)
}

/// Resolves time expressions to instants in a time zone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeResolver {
    zone: Zone,
}

impl TimeResolver {
    /// Creates a resolver for the given zone.
    #[must_use]
    pub const fn new(zone: Zone) -> Self {
        Self { zone }
    }

    /// The zone used for timestamps without an explicit offset.
    #[must_use]
    pub const fn zone(&self) -> Zone {
        self.zone
    }

    /// Resolves `text` to an instant; relative amounts count back from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`LogbookError::InvalidTime`] if the text cannot be parsed or
    /// the resolved instant is out of range.
    pub fn resolve(&self, text: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        match parse_instant_or_amount(text, self.zone, now)? {
            TimeValue::Instant(instant) => Ok(instant),
            TimeValue::Amount(amount) => amount
                .before(now, self.zone)
                .ok_or_else(|| LogbookError::InvalidTime(text.to_string())),
        }
    }
}
