//! Conversion between schedule offsets and absolute timestamps.
//!
//! Flight times are stored as integer offsets from a fixed base date, in
//! minutes or seconds depending on the data set. The timeline works in
//! absolute [`NaiveDateTime`]s. A codec is built once per data set and never
//! mixes units.

use chrono::{Duration, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Unit of the integer offsets in the source data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minutes,
    Seconds,
}

impl TimeUnit {
    /// Milliseconds per unit.
    pub fn millis(self) -> i64 {
        match self {
            TimeUnit::Minutes => 60_000,
            TimeUnit::Seconds => 1_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeUnit::Minutes => "min",
            TimeUnit::Seconds => "s",
        }
    }
}

/// Largest offset magnitude accepted from schedule data, in either unit.
///
/// In minutes this is about 19 000 years either side of the base, well inside
/// the range [`NaiveDateTime`] can represent.
pub const MAX_OFFSET: i64 = 10_000_000_000;

/// Whether an offset lies within [`MAX_OFFSET`].
pub fn offset_in_range(offset: i64) -> bool {
    offset.checked_abs().is_some_and(|v| v <= MAX_OFFSET)
}

/// Default base instant of the schedule data: 2023-01-01 00:00.
pub fn default_base() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Maps offsets to absolute times and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeCodec {
    base: NaiveDateTime,
    unit: TimeUnit,
}

impl Default for TimeCodec {
    fn default() -> Self {
        Self::new(default_base(), TimeUnit::Minutes)
    }
}

impl TimeCodec {
    pub fn new(base: NaiveDateTime, unit: TimeUnit) -> Self {
        Self { base, unit }
    }

    pub fn base(&self) -> NaiveDateTime {
        self.base
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Absolute time of an offset, or `None` past the representable range.
    pub fn checked_absolute(&self, offset: i64) -> Option<NaiveDateTime> {
        let delta = TimeDelta::try_milliseconds(offset.checked_mul(self.unit.millis())?)?;
        self.base.checked_add_signed(delta)
    }

    /// Absolute time of an offset. Offsets past the representable range
    /// clamp to its ends.
    pub fn to_absolute(&self, offset: i64) -> NaiveDateTime {
        self.checked_absolute(offset).unwrap_or_else(|| {
            tracing::warn!(offset, "offset outside the representable time range");
            if offset < 0 {
                NaiveDateTime::MIN
            } else {
                NaiveDateTime::MAX
            }
        })
    }

    /// Offset of an absolute time, rounded to the nearest unit.
    pub fn to_offset(&self, at: NaiveDateTime) -> i64 {
        let millis = (at - self.base).num_milliseconds();
        let unit = self.unit.millis();
        let whole = millis.div_euclid(unit);
        let rest = millis.rem_euclid(unit);
        if rest * 2 >= unit {
            whole + 1
        } else {
            whole
        }
    }

    /// Length of `units` offsets as a duration.
    pub fn span(&self, units: i64) -> Duration {
        Duration::milliseconds(units.saturating_mul(self.unit.millis()))
    }

    /// Wall-clock `HHMM` label of an offset. Hours wrap at midnight.
    pub fn clock_label(&self, offset: i64) -> String {
        let at = self.to_absolute(offset);
        format!("{:02}{:02}", at.hour(), at.minute())
    }
}

/// `HHMM` label of a minute count, wrapping at 24h.
pub fn minutes_to_hhmm(minutes: i64) -> String {
    let m = minutes.rem_euclid(24 * 60);
    format!("{:02}{:02}", m / 60, m % 60)
}

/// Parse a four digit `HHMM` token into minutes after midnight.
pub fn parse_hhmm(token: &str) -> Option<u32> {
    let token = token.trim();
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: u32 = token[..2].parse().ok()?;
    let minutes: u32 = token[2..].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    Some(hours * 60 + minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_minutes_to_absolute() {
        let codec = TimeCodec::default();
        let at = codec.to_absolute(90);
        assert_eq!(at, default_base() + Duration::minutes(90));
        assert_eq!(codec.to_offset(at), 90);
    }

    #[test]
    fn test_seconds_unit() {
        let codec = TimeCodec::new(default_base(), TimeUnit::Seconds);
        assert_eq!(codec.to_absolute(3600), default_base() + Duration::hours(1));
        assert_eq!(codec.span(30), Duration::seconds(30));
    }

    #[test]
    fn test_to_offset_rounds_to_nearest() {
        let codec = TimeCodec::default();
        let base = default_base();
        assert_eq!(codec.to_offset(base + Duration::seconds(29)), 0);
        assert_eq!(codec.to_offset(base + Duration::seconds(30)), 1);
        assert_eq!(codec.to_offset(base + Duration::seconds(-29)), 0);
        assert_eq!(codec.to_offset(base + Duration::seconds(-31)), -1);
    }

    #[test]
    fn test_clock_label() {
        let codec = TimeCodec::default();
        assert_eq!(codec.clock_label(0), "0000");
        assert_eq!(codec.clock_label(605), "1005");
        assert_eq!(codec.clock_label(24 * 60 + 75), "0115");
    }

    #[test]
    fn test_checked_absolute_rejects_overflow() {
        let codec = TimeCodec::default();
        assert_eq!(codec.checked_absolute(90), Some(codec.to_absolute(90)));
        assert_eq!(codec.checked_absolute(999_999_999_999), None);
        assert_eq!(codec.checked_absolute(i64::MIN), None);
        assert_eq!(codec.to_absolute(999_999_999_999), NaiveDateTime::MAX);
        assert_eq!(codec.to_absolute(-999_999_999_999), NaiveDateTime::MIN);
    }

    #[test]
    fn test_offset_bound_is_representable() {
        assert!(offset_in_range(MAX_OFFSET));
        assert!(offset_in_range(-MAX_OFFSET));
        assert!(!offset_in_range(MAX_OFFSET + 1));
        assert!(!offset_in_range(i64::MIN));
        let codec = TimeCodec::default();
        assert!(codec.checked_absolute(MAX_OFFSET).is_some());
        assert!(codec.checked_absolute(-MAX_OFFSET).is_some());
    }

    #[test]
    fn test_minutes_to_hhmm_wraps() {
        assert_eq!(minutes_to_hhmm(59), "0059");
        assert_eq!(minutes_to_hhmm(1440), "0000");
        assert_eq!(minutes_to_hhmm(-30), "2330");
    }

    #[test]
    fn test_parse_hhmm() {
        assert_eq!(parse_hhmm("0930"), Some(570));
        assert_eq!(parse_hhmm("2359"), Some(1439));
        assert_eq!(parse_hhmm("2400"), None);
        assert_eq!(parse_hhmm("930"), None);
        assert_eq!(parse_hhmm("09:3"), None);
    }

    proptest! {
        #[test]
        fn prop_minutes_round_trip(x in -10_000_000i64..10_000_000i64) {
            let codec = TimeCodec::default();
            prop_assert_eq!(codec.to_offset(codec.to_absolute(x)), x);
        }

        #[test]
        fn prop_seconds_round_trip(x in -1_000_000_000i64..1_000_000_000i64) {
            let codec = TimeCodec::new(default_base(), TimeUnit::Seconds);
            prop_assert_eq!(codec.to_offset(codec.to_absolute(x)), x);
        }
    }
}
