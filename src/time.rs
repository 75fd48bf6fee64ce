//! Time and Timezone Utilities Module
//!
//! Provides the validated time series index every stage is aligned with,
//! plus timestamp parsing and timezone resolution.

use chrono::{
    DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike, Utc,
};
use chrono_english::{Dialect, parse_date_string};
use chrono_tz::Tz;
use iana_time_zone::get_timezone;
use std::sync::OnceLock;
use tzf_rs::DefaultFinder;

use crate::error::ValidationError;

// tzf-rs DefaultFinder is pre-compiled and very fast
static TZF_FINDER: OnceLock<DefaultFinder> = OnceLock::new();

// ===================== TIME SERIES INDEX =====================

/// Ordered timestamps sharing one timezone.
///
/// Timestamps are stored in UTC. The timezone only matters for the local
/// clock reading and its offset, which the true solar time chain needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesIndex {
    timestamps: Vec<DateTime<Utc>>,
    timezone: Tz,
}

impl TimeSeriesIndex {
    /// Build an index, rejecting empty or non-chronological input.
    pub fn new(timestamps: Vec<DateTime<Utc>>, timezone: Tz) -> Result<Self, ValidationError> {
        if timestamps.is_empty() {
            return Err(ValidationError::EmptyIndex);
        }
        for (i, pair) in timestamps.windows(2).enumerate() {
            if pair[1] < pair[0] {
                return Err(ValidationError::NonChronological {
                    index: i + 1,
                    previous: pair[0].to_rfc3339(),
                    current: pair[1].to_rfc3339(),
                });
            }
        }
        Ok(Self { timestamps, timezone })
    }

    /// A one-element index, used by the scalar entry points.
    pub fn single(timestamp: DateTime<Utc>, timezone: Tz) -> Self {
        Self { timestamps: vec![timestamp], timezone }
    }

    /// Build an index from zone-aware timestamps.
    pub fn from_local(timestamps: &[DateTime<Tz>]) -> Result<Self, ValidationError> {
        let timezone = timestamps.first().map(|t| t.timezone()).unwrap_or(Tz::UTC);
        Self::new(timestamps.iter().map(|t| t.with_timezone(&Utc)).collect(), timezone)
    }

    /// Regular index from `start` to `end` inclusive.
    pub fn from_range(
        start: DateTime<Tz>,
        end: DateTime<Tz>,
        step_minutes: i64,
    ) -> Result<Self, ValidationError> {
        if step_minutes <= 0 {
            return Err(ValidationError::NonPositiveStep(step_minutes));
        }
        let step = Duration::minutes(step_minutes);
        let end = end.with_timezone(&Utc);
        let mut t = start.with_timezone(&Utc);
        let mut timestamps = Vec::new();
        while t <= end {
            timestamps.push(t);
            t += step;
        }
        Self::new(timestamps, start.timezone())
    }

    /// Parse timestamps given either as RFC 3339 or as local wall-clock
    /// readings in `timezone`.
    pub fn parse<S: AsRef<str>>(values: &[S], timezone: Tz) -> Result<Self, ValidationError> {
        let timestamps = values
            .iter()
            .map(|s| parse_timestamp(s.as_ref(), timezone))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(timestamps, timezone)
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn local(&self) -> impl Iterator<Item = DateTime<Tz>> + '_ {
        self.timestamps.iter().map(|t| t.with_timezone(&self.timezone))
    }

    /// Day of the year (1-based) of each UTC timestamp.
    pub fn day_of_year(&self) -> Vec<u32> {
        self.timestamps.iter().map(|t| t.ordinal()).collect()
    }

    /// Number of days in the UTC year of each timestamp.
    pub fn days_in_year(&self) -> Vec<u32> {
        self.timestamps.iter().map(|t| days_in_year(t.year())).collect()
    }

    /// UTC clock hour as a decimal (e.g. 12:30 -> 12.5).
    pub fn decimal_hours(&self) -> Vec<f64> {
        self.timestamps.iter().map(decimal_hour).collect()
    }

    /// Local wall-clock minutes since local midnight.
    pub fn local_minutes(&self) -> Vec<f64> {
        self.local().map(|t| decimal_hour(&t) * 60.0).collect()
    }

    /// Offset of the local clock from UTC, in minutes, per timestamp.
    pub fn utc_offset_minutes(&self) -> Vec<f64> {
        self.local().map(|t| t.offset().fix().local_minus_utc() as f64 / 60.0).collect()
    }
}

// ===================== HELPERS =====================

pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366 } else { 365 }
}

/// Decimal hour of the clock reading of `t` in its own zone.
pub fn decimal_hour<T: Timelike>(t: &T) -> f64 {
    t.hour() as f64
        + t.minute() as f64 / 60.0
        + (t.second() as f64 + t.nanosecond() as f64 * 1e-9) / 3600.0
}

/// First valid instant of a local calendar day.
///
/// Midnight may fall in a DST gap; 01:00 is tried next. Ambiguous readings
/// resolve to the earlier instant.
pub fn start_of_day(date: NaiveDate, timezone: Tz) -> Option<DateTime<Tz>> {
    [0, 1]
        .into_iter()
        .filter_map(|hour| date.and_hms_opt(hour, 0, 0))
        .find_map(|naive| timezone.from_local_datetime(&naive).earliest())
}

// ===================== PARSING =====================

/// Parse one timestamp. Strings without an offset are read as local time in
/// `timezone`; times that fall in a DST gap are rejected.
pub fn parse_timestamp(s: &str, timezone: Tz) -> Result<DateTime<Utc>, ValidationError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }

    // Try several layouts to be user-friendly
    let formats = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M"];
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return timezone
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .ok_or_else(|| ValidationError::InvalidTimestamp(s.to_string()));
        }
    }
    Err(ValidationError::InvalidTimestamp(s.to_string()))
}

/// Parse a natural-language date ("today", "next monday", "2024-06-21 12:00")
/// anchored at `anchor`.
pub fn parse_natural(s: &str, anchor: DateTime<Tz>) -> Result<DateTime<Tz>, ValidationError> {
    let tz = anchor.timezone();
    parse_date_string(s, anchor, Dialect::Us)
        .map(|t| t.with_timezone(&tz))
        .map_err(|_| ValidationError::InvalidTimestamp(s.to_string()))
}

// ===================== TIMEZONE UTILITIES =====================

/// Get the system's configured timezone.
///
/// Falls back to UTC if the system timezone cannot be determined.
pub fn system_timezone() -> Tz {
    get_timezone().ok().and_then(|s| s.parse().ok()).unwrap_or(Tz::UTC)
}

/// Resolve the IANA timezone covering a coordinate, or UTC if none does.
pub fn resolve_timezone(lon: f64, lat: f64) -> Tz {
    let finder = TZF_FINDER.get_or_init(DefaultFinder::new);
    finder.get_tz_name(lon, lat).parse::<Tz>().unwrap_or(Tz::UTC)
}

/// Resolve a `--timezone` style selector: "system", "location" or an IANA name.
pub fn select_timezone(selector: &str, lon: f64, lat: f64) -> Result<Tz, ValidationError> {
    match selector {
        "system" => Ok(system_timezone()),
        "location" => Ok(resolve_timezone(lon, lat)),
        other => other.parse().map_err(|_| ValidationError::InvalidTimestamp(other.to_string())),
    }
}

// ===================== TESTS =====================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::{Almaty, Kolkata};
    use chrono_tz::Pacific::Apia;

    #[test]
    fn test_empty_index_rejected() {
        let err = TimeSeriesIndex::new(vec![], Tz::UTC).unwrap_err();
        assert_eq!(err, ValidationError::EmptyIndex);
    }

    #[test]
    fn test_non_chronological_rejected() {
        let err = TimeSeriesIndex::parse(&["2024-06-21 12:00", "2024-06-21 11:00"], Tz::UTC)
            .unwrap_err();
        assert!(
            matches!(err, ValidationError::NonChronological { index: 1, .. }),
            "Unexpected error: {:?}",
            err
        );
    }

    #[test]
    fn test_repeated_timestamps_allowed() {
        let idx = TimeSeriesIndex::parse(&["2024-06-21 12:00", "2024-06-21 12:00"], Tz::UTC);
        assert!(idx.is_ok());
    }

    #[test]
    fn test_malformed_timestamp_rejected() {
        assert!(matches!(
            parse_timestamp("21st of never", Tz::UTC),
            Err(ValidationError::InvalidTimestamp(_))
        ));
        assert!(parse_timestamp("2024-13-01 00:00", Tz::UTC).is_err());
    }

    #[test]
    fn test_range_is_inclusive() {
        let start = Tz::UTC.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();
        let end = Tz::UTC.with_ymd_and_hms(2024, 6, 21, 23, 0, 0).unwrap();
        let idx = TimeSeriesIndex::from_range(start, end, 60).unwrap();
        assert_eq!(idx.len(), 24);
        assert!(TimeSeriesIndex::from_range(start, end, 0).is_err());
    }

    #[test]
    fn test_day_of_year_and_leap_years() {
        let idx = TimeSeriesIndex::parse(&["2024-12-31T23:00:00Z", "2023-03-01T00:00:00Z"], Tz::UTC);
        // out of order on purpose
        assert!(idx.is_err());

        let idx = TimeSeriesIndex::parse(&["2023-03-01T00:00:00Z", "2024-12-31T23:00:00Z"], Tz::UTC)
            .unwrap();
        assert_eq!(idx.day_of_year(), vec![60, 366]);
        assert_eq!(idx.days_in_year(), vec![365, 366]);
    }

    #[test]
    fn test_local_minutes_follow_timezone() {
        // 12:00 local in Kolkata is 06:30 UTC
        let idx = TimeSeriesIndex::parse(&["2025-12-25 12:00"], Kolkata).unwrap();
        assert_eq!(idx.local_minutes(), vec![720.0]);
        assert_eq!(idx.utc_offset_minutes(), vec![330.0]);
        assert_eq!(idx.decimal_hours(), vec![6.5]);
    }

    #[test]
    fn test_kazakhstan_2024_shift() {
        let idx =
            TimeSeriesIndex::parse(&["2024-02-01 12:00", "2024-06-01 12:00"], Almaty).unwrap();
        assert_eq!(
            idx.utc_offset_minutes(),
            vec![360.0, 300.0],
            "If this fails, run: cargo update -p chrono-tz"
        );
    }

    /// Samoa skipped Dec 30, 2011 when it crossed the date line.
    #[test]
    fn test_samoa_skipped_day_is_invalid() {
        let res = parse_timestamp("2011-12-30 12:00", Apia);
        assert!(res.is_err(), "Dec 30, 2011 should not exist in Samoa");
    }

    #[test]
    fn test_natural_date_parsing() {
        let anchor = Tz::UTC.with_ymd_and_hms(2024, 6, 21, 8, 0, 0).unwrap();
        let parsed = parse_natural("2024-06-22", anchor).unwrap();
        assert_eq!(parsed.day(), 22);
        assert!(parse_natural("not a date at all", anchor).is_err());
    }

    #[test]
    fn test_start_of_day_skips_dst_gap() {
        use chrono_tz::America::Sao_Paulo;
        // Brazil started DST at midnight on 2018-11-04
        let date = NaiveDate::from_ymd_opt(2018, 11, 4).unwrap();
        let t = start_of_day(date, Sao_Paulo).unwrap();
        assert_eq!(t.hour(), 1);

        let t = start_of_day(NaiveDate::from_ymd_opt(2018, 11, 5).unwrap(), Sao_Paulo).unwrap();
        assert_eq!(t.hour(), 0);
    }

    #[test]
    fn test_resolve_timezone_new_york() {
        use chrono_tz::America::New_York;
        assert_eq!(resolve_timezone(-77.0365, 38.8977), New_York);
    }

    #[test]
    fn test_resolve_timezone_sydney() {
        use chrono_tz::Australia::Sydney;
        assert_eq!(resolve_timezone(149.1165, -35.3108), Sydney);
    }

    #[test]
    fn test_select_timezone() {
        assert_eq!(select_timezone("Asia/Kolkata", 0.0, 0.0).unwrap(), Kolkata);
        assert!(select_timezone("Mars/Olympus_Mons", 0.0, 0.0).is_err());
    }
}
