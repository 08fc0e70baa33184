//! Parsing of user-supplied time ranges

use super::TimeRange;
use crate::error::{HumanDuration, RangeError};
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// Default relative range when none is given
pub const DEFAULT_RELATIVE_RANGE: &str = "1h";

/// A requested range before it is pinned to "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRangeSpec {
    /// The last `duration` up to now
    Relative(Duration),
    /// Explicit bounds; a missing end means now
    Absolute {
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    },
}

impl Default for TimeRangeSpec {
    fn default() -> Self {
        TimeRangeSpec::Relative(Duration::hours(1))
    }
}

impl TimeRangeSpec {
    /// Build a range request from command-line style inputs
    ///
    /// `start` takes precedence over `since`. Absolute values are interpreted in
    /// the timezone of `now`.
    pub fn from_inputs<Tz: TimeZone>(
        since: Option<&str>,
        start: Option<&str>,
        end: Option<&str>,
        now: &DateTime<Tz>,
    ) -> Result<Self, RangeError> {
        match start {
            Some(start) => {
                let start = parse_datetime(start, now)?;
                let end = end.map(|e| parse_datetime(e, now)).transpose()?;
                Ok(TimeRangeSpec::Absolute { start, end })
            }
            None => {
                let since = since.unwrap_or(DEFAULT_RELATIVE_RANGE);
                Ok(TimeRangeSpec::Relative(parse_relative(since)?))
            }
        }
    }

    /// Pin the range to `now`
    pub fn resolve(&self, now: DateTime<Utc>) -> Result<TimeRange, RangeError> {
        match *self {
            TimeRangeSpec::Relative(duration) => {
                let start = now
                    .checked_sub_signed(duration)
                    .ok_or_else(|| RangeError::OutOfBounds(HumanDuration(duration).to_string()))?;
                Ok(TimeRange::new(start, now))
            }
            TimeRangeSpec::Absolute { start, end } => Ok(TimeRange::new(start, end.unwrap_or(now))),
        }
    }
}

/// Parse a relative duration such as `30m`, `12h`, `2d` or `1w`
pub fn parse_relative(input: &str) -> Result<Duration, RangeError> {
    let trimmed = input.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| RangeError::Unparseable(input.to_string()))?;
    let (number, unit) = trimmed.split_at(split);

    let amount: i64 = number
        .parse()
        .map_err(|_| RangeError::Unparseable(input.to_string()))?;

    let duration = match unit.trim().to_ascii_lowercase().as_str() {
        "s" | "sec" | "secs" => Duration::try_seconds(amount),
        "m" | "min" | "mins" => Duration::try_minutes(amount),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::try_hours(amount),
        "d" | "day" | "days" => Duration::try_days(amount),
        "w" | "week" | "weeks" => Duration::try_weeks(amount),
        _ => return Err(RangeError::Unparseable(input.to_string())),
    };
    duration.ok_or_else(|| RangeError::OutOfBounds(input.trim().to_string()))
}

/// Parse an absolute time in the timezone of `now`
///
/// Accepted forms: `YYYY-MM-DD HH:MM`, `YYYY-MM-DD` (midnight),
/// `HH:MM` (today) and `MM-DD` (midnight, current year).
pub fn parse_datetime<Tz: TimeZone>(input: &str, now: &DateTime<Tz>) -> Result<DateTime<Utc>, RangeError> {
    let trimmed = input.trim();
    let local_now = now.naive_local();
    let unparseable = || RangeError::Unparseable(input.to_string());

    let naive = if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M") {
        dt
    } else if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN)
    } else if let Ok(time) = NaiveTime::parse_from_str(trimmed, "%H:%M") {
        local_now.date().and_time(time)
    } else if let Ok(date) =
        NaiveDate::parse_from_str(&format!("{}-{}", local_now.year(), trimmed), "%Y-%m-%d")
    {
        date.and_time(NaiveTime::MIN)
    } else {
        return Err(unparseable());
    };

    now.timezone()
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(unparseable)
}
