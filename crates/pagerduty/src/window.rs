//! Time window used to scope incident and log entry queries.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::Serialize;

use crate::error::{PagerDutyError, Result};

/// Default offset the window is anchored to (UTC+12:00).
pub const DEFAULT_OFFSET_SECS: i32 = 12 * 3600;

/// Default hour of day at which the window opens and closes.
pub const DEFAULT_WINDOW_HOUR: u32 = 8;

/// A `[since, until)` window spanning yesterday through tomorrow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub since: DateTime<FixedOffset>,
    pub until: DateTime<FixedOffset>,
}

impl TimeWindow {
    /// Build the window around `day`: the day before at `hour` through the
    /// day after at `hour`, both in `offset`.
    pub fn around(day: NaiveDate, offset: FixedOffset, hour: u32) -> Result<Self> {
        let at = NaiveTime::from_hms_opt(hour, 0, 0)
            .ok_or_else(|| PagerDutyError::Config(format!("invalid window hour {hour}")))?;

        let since = (day - Duration::days(1)).and_time(at);
        let until = (day + Duration::days(1)).and_time(at);

        // Fixed offsets have no gaps, so this is always a single instant.
        let since = offset
            .from_local_datetime(&since)
            .single()
            .ok_or_else(|| PagerDutyError::Config(format!("invalid window start {since}")))?;
        let until = offset
            .from_local_datetime(&until)
            .single()
            .ok_or_else(|| PagerDutyError::Config(format!("invalid window end {until}")))?;

        Ok(Self { since, until })
    }

    /// Window around today's date as seen from `offset`.
    pub fn today(offset: FixedOffset, hour: u32) -> Result<Self> {
        let today = Utc::now().with_timezone(&offset).date_naive();
        Self::around(today, offset, hour)
    }

    /// `since` in the format the API expects, e.g. `2026-10-18T08:00:00+12:00`.
    #[must_use]
    pub fn since_param(&self) -> String {
        self.since.to_rfc3339()
    }

    /// `until` in the format the API expects.
    #[must_use]
    pub fn until_param(&self) -> String {
        self.until.to_rfc3339()
    }
}

/// The default window offset, UTC+12:00.
#[must_use]
pub fn default_offset() -> FixedOffset {
    FixedOffset::east_opt(DEFAULT_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse an offset such as `+12:00`, `-05:30` or `Z`.
pub fn parse_offset(raw: &str) -> Result<FixedOffset> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("z") || raw.eq_ignore_ascii_case("utc") {
        return Ok(Utc.fix());
    }

    let invalid = || PagerDutyError::Config(format!("invalid UTC offset '{raw}' (expected +HH:MM)"));

    let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = raw.strip_prefix('-') {
        (-1, rest)
    } else {
        return Err(invalid());
    };
    let (hours, minutes) = rest.split_once(':').unwrap_or((rest, "0"));
    let hours: i32 = hours.parse().map_err(|_| invalid())?;
    let minutes: i32 = minutes.parse().map_err(|_| invalid())?;
    if !(0..60).contains(&minutes) {
        return Err(invalid());
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(invalid)
}
