//! CIM datetime codec
//!
//! Binary form: microseconds since 1970-01-01T00:00:00 UTC for points in
//! time, or a microsecond duration for intervals.
//!
//! String form (25 characters):
//! - timestamp: `yyyymmddhhmmss.mmmmmmsutc`, local time at the given UTC
//!   offset in minutes, `s` being `+` or `-`
//! - interval: `ddddddddhhmmss.mmmmmm:000`

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::status::{CmpiError, CmpiResult};

const MICROS_PER_SECOND: u64 = 1_000_000;
const MICROS_PER_MINUTE: u64 = 60 * MICROS_PER_SECOND;
const MICROS_PER_HOUR: u64 = 60 * MICROS_PER_MINUTE;
const MICROS_PER_DAY: u64 = 24 * MICROS_PER_HOUR;
const MAX_INTERVAL_DAYS: u64 = 99_999_999;
const MAX_INTERVAL: u64 = (MAX_INTERVAL_DAYS + 1) * MICROS_PER_DAY - 1;
/// 9999-12-31T23:59:59.999999
const MAX_TIMESTAMP: u64 = 2_932_897 * MICROS_PER_DAY - 1;
const MAX_OFFSET_MINUTES: u16 = 999;

/// Length of every CIM datetime string
pub const CIM_DATETIME_LEN: usize = 25;

/// A CIM point in time or interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CimDateTime {
    micros: u64,
    interval: bool,
    /// Offset of the local time from UTC in minutes (timestamps only)
    utc_offset: i16,
}

impl CimDateTime {
    /// Point in time, microseconds since the epoch in UTC
    ///
    /// Fails with `CMPI_RC_ERR_INVALID_PARAMETER` past 9999-12-31.
    pub fn from_timestamp(micros: u64) -> CmpiResult<Self> {
        if micros > MAX_TIMESTAMP {
            return Err(CmpiError::invalid_parameter(format!(
                "timestamp {micros} is past 9999-12-31"
            )));
        }
        Ok(Self {
            micros,
            interval: false,
            utc_offset: 0,
        })
    }

    /// Duration in microseconds, at most 99999999 days
    pub fn from_interval(micros: u64) -> CmpiResult<Self> {
        if micros > MAX_INTERVAL {
            return Err(CmpiError::invalid_parameter(format!(
                "interval {micros} exceeds {MAX_INTERVAL_DAYS} days"
            )));
        }
        Ok(Self {
            micros,
            interval: true,
            utc_offset: 0,
        })
    }

    /// Binary constructor as used by `newDateTimeFromBinary`
    pub fn from_binary(micros: u64, interval: bool) -> CmpiResult<Self> {
        if interval {
            Self::from_interval(micros)
        } else {
            Self::from_timestamp(micros)
        }
    }

    /// Current time in UTC
    pub fn now() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        Self {
            micros: micros.min(MAX_TIMESTAMP),
            interval: false,
            utc_offset: 0,
        }
    }

    /// Present the timestamp at another UTC offset (minutes)
    ///
    /// The offset must fit in three digits and keep the local time between
    /// the epoch and 9999-12-31. Intervals ignore the offset.
    pub fn with_utc_offset(mut self, minutes: i16) -> CmpiResult<Self> {
        if self.interval {
            return Ok(self);
        }
        if minutes.unsigned_abs() > MAX_OFFSET_MINUTES {
            return Err(CmpiError::invalid_parameter(format!("UTC offset {minutes} out of range")));
        }
        let local = self.micros as i128 + minutes as i128 * MICROS_PER_MINUTE as i128;
        if local < 0 || local > MAX_TIMESTAMP as i128 {
            return Err(CmpiError::invalid_parameter(format!(
                "UTC offset {minutes} moves {} outside the representable range",
                self.micros
            )));
        }
        self.utc_offset = minutes;
        Ok(self)
    }

    pub const fn binary(&self) -> u64 {
        self.micros
    }

    pub const fn is_interval(&self) -> bool {
        self.interval
    }

    pub const fn utc_offset(&self) -> i16 {
        self.utc_offset
    }

    /// Parse a 25-character CIM datetime string
    pub fn parse(s: &str) -> CmpiResult<Self> {
        let b = s.as_bytes();
        if b.len() != CIM_DATETIME_LEN || !s.is_ascii() {
            return Err(invalid(s, "expected 25 characters"));
        }
        if b[14] != b'.' {
            return Err(invalid(s, "missing '.' separator"));
        }

        match b[21] {
            b':' => Self::parse_interval(s),
            b'+' | b'-' => Self::parse_timestamp(s),
            _ => Err(invalid(s, "sign must be '+', '-' or ':'")),
        }
    }

    fn parse_interval(s: &str) -> CmpiResult<Self> {
        let days = digits(s, 0, 8)?;
        let hours = digits(s, 8, 2)?;
        let minutes = digits(s, 10, 2)?;
        let seconds = digits(s, 12, 2)?;
        let micros = digits(s, 15, 6)?;
        if &s[22..] != "000" {
            return Err(invalid(s, "interval must end in ':000'"));
        }
        if hours > 23 || minutes > 59 || seconds > 59 {
            return Err(invalid(s, "field out of range"));
        }
        Self::from_interval(
            days * MICROS_PER_DAY
                + hours * MICROS_PER_HOUR
                + minutes * MICROS_PER_MINUTE
                + seconds * MICROS_PER_SECOND
                + micros,
        )
    }

    fn parse_timestamp(s: &str) -> CmpiResult<Self> {
        let year = digits(s, 0, 4)? as i64;
        let month = digits(s, 4, 2)? as u32;
        let day = digits(s, 6, 2)? as u32;
        let hours = digits(s, 8, 2)?;
        let minutes = digits(s, 10, 2)?;
        let seconds = digits(s, 12, 2)?;
        let micros = digits(s, 15, 6)?;
        let offset = digits(s, 22, 3)? as i64;
        let offset = if s.as_bytes()[21] == b'-' { -offset } else { offset };

        if !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hours > 23
            || minutes > 59
            || seconds > 59
        {
            return Err(invalid(s, "field out of range"));
        }

        let days = days_from_civil(year, month, day);
        let local = days as i128 * MICROS_PER_DAY as i128
            + (hours * MICROS_PER_HOUR + minutes * MICROS_PER_MINUTE + seconds * MICROS_PER_SECOND
                + micros) as i128;
        let utc = local - offset as i128 * MICROS_PER_MINUTE as i128;
        if utc < 0 {
            return Err(invalid(s, "before the epoch"));
        }

        Ok(Self {
            micros: utc as u64,
            interval: false,
            utc_offset: offset as i16,
        })
    }

    /// The 25-character CIM string
    pub fn to_cim_string(&self) -> String {
        if self.interval {
            let days = self.micros / MICROS_PER_DAY;
            let rem = self.micros % MICROS_PER_DAY;
            format!(
                "{:08}{:02}{:02}{:02}.{:06}:000",
                days,
                rem / MICROS_PER_HOUR,
                rem % MICROS_PER_HOUR / MICROS_PER_MINUTE,
                rem % MICROS_PER_MINUTE / MICROS_PER_SECOND,
                rem % MICROS_PER_SECOND,
            )
        } else {
            // constructors keep the local time within 0..=MAX_TIMESTAMP
            let local = (self.micros as i64 + self.utc_offset as i64 * MICROS_PER_MINUTE as i64) as u64;
            let (year, month, day) = civil_from_days((local / MICROS_PER_DAY) as i64);
            let rem = local % MICROS_PER_DAY;
            format!(
                "{:04}{:02}{:02}{:02}{:02}{:02}.{:06}{}{:03}",
                year,
                month,
                day,
                rem / MICROS_PER_HOUR,
                rem % MICROS_PER_HOUR / MICROS_PER_MINUTE,
                rem % MICROS_PER_MINUTE / MICROS_PER_SECOND,
                rem % MICROS_PER_SECOND,
                if self.utc_offset < 0 { '-' } else { '+' },
                self.utc_offset.unsigned_abs(),
            )
        }
    }
}

impl fmt::Display for CimDateTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_cim_string())
    }
}

impl FromStr for CimDateTime {
    type Err = CmpiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for CimDateTime {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_cim_string())
    }
}

fn invalid(s: &str, why: &str) -> CmpiError {
    CmpiError::invalid_parameter(format!("invalid CIM datetime '{s}': {why}"))
}

fn digits(s: &str, start: usize, len: usize) -> CmpiResult<u64> {
    let field = &s[start..start + len];
    if !field.bytes().all(|c| c.is_ascii_digit()) {
        return Err(invalid(s, "non-digit in numeric field"));
    }
    field
        .parse::<u64>()
        .map_err(|_| invalid(s, "non-digit in numeric field"))
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap(year) => 29,
        _ => 28,
    }
}

/// Days since 1970-01-01 for a proleptic Gregorian date
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::ReturnCode;

    #[test]
    fn test_epoch_string() {
        let dt = CimDateTime::from_timestamp(0).unwrap();
        assert_eq!(dt.to_cim_string(), "19700101000000.000000+000");
    }

    #[test]
    fn test_timestamp_parse_and_format() {
        let dt = CimDateTime::parse("20240229123456.789012+000").unwrap();
        assert!(!dt.is_interval());
        assert_eq!(dt.to_cim_string(), "20240229123456.789012+000");
        // 2024-02-29T12:34:56.789012Z
        assert_eq!(dt.binary(), 1_709_210_096_789_012);
    }

    #[test]
    fn test_timestamp_with_offset() {
        let dt = CimDateTime::parse("20000101010000.000000+060").unwrap();
        assert_eq!(dt.utc_offset(), 60);
        assert_eq!(dt.binary(), CimDateTime::parse("20000101000000.000000+000").unwrap().binary());
        assert_eq!(dt.to_cim_string(), "20000101010000.000000+060");

        let west = CimDateTime::from_timestamp(dt.binary())
            .and_then(|t| t.with_utc_offset(-300))
            .unwrap();
        assert_eq!(west.to_cim_string(), "19991231190000.000000-300");
    }

    #[test]
    fn test_interval() {
        let dt = CimDateTime::parse("00000001020304.000005:000").unwrap();
        assert!(dt.is_interval());
        assert_eq!(
            dt.binary(),
            MICROS_PER_DAY + 2 * MICROS_PER_HOUR + 3 * MICROS_PER_MINUTE + 4 * MICROS_PER_SECOND + 5
        );
        assert_eq!(dt.to_cim_string(), "00000001020304.000005:000");
        assert_eq!(
            CimDateTime::from_interval(0).unwrap().to_cim_string(),
            "00000000000000.000000:000"
        );
    }

    #[test]
    fn test_rejects_malformed() {
        for bad in [
            "",
            "2024",
            "20241301000000.000000+000",
            "20240230000000.000000+000",
            "20240101250000.000000+000",
            "2024010100000a.000000+000",
            "20240101000000-000000+000",
            "20240101000000.000000*000",
            "00000001020304.000005:001",
        ] {
            let err = CimDateTime::parse(bad).unwrap_err();
            assert_eq!(err.code(), Some(ReturnCode::ErrInvalidParameter), "{bad}");
        }
    }

    #[test]
    fn test_binary_range() {
        let last = CimDateTime::from_binary(MAX_TIMESTAMP, false).unwrap();
        assert_eq!(last.to_cim_string(), "99991231235959.999999+000");
        assert_eq!(CimDateTime::parse(&last.to_cim_string()).unwrap().binary(), MAX_TIMESTAMP);

        for micros in [MAX_TIMESTAMP + 1, u64::MAX / 2, u64::MAX] {
            let err = CimDateTime::from_binary(micros, false).unwrap_err();
            assert_eq!(err.code(), Some(ReturnCode::ErrInvalidParameter));
        }
    }

    #[test]
    fn test_interval_range() {
        let longest = CimDateTime::from_interval(MAX_INTERVAL).unwrap();
        let s = longest.to_cim_string();
        assert_eq!(s, "99999999235959.999999:000");
        assert_eq!(CimDateTime::parse(&s).unwrap().binary(), MAX_INTERVAL);

        for micros in [MAX_INTERVAL + 1, u64::MAX] {
            let err = CimDateTime::from_binary(micros, true).unwrap_err();
            assert_eq!(err.code(), Some(ReturnCode::ErrInvalidParameter));
        }
    }

    #[test]
    fn test_offset_keeps_instant() {
        let epoch = CimDateTime::from_timestamp(0).unwrap();
        let err = epoch.with_utc_offset(-60).unwrap_err();
        assert_eq!(err.code(), Some(ReturnCode::ErrInvalidParameter));

        let east = epoch.with_utc_offset(60).unwrap();
        let s = east.to_cim_string();
        assert_eq!(s, "19700101010000.000000+060");
        assert_eq!(CimDateTime::parse(&s).unwrap().binary(), 0);

        let last = CimDateTime::from_timestamp(MAX_TIMESTAMP).unwrap();
        assert!(last.with_utc_offset(1).is_err());
        assert!(epoch.with_utc_offset(1000).is_err());

        let hour = CimDateTime::from_timestamp(MICROS_PER_HOUR).unwrap();
        let west = hour.with_utc_offset(-60).unwrap();
        assert_eq!(west.to_cim_string(), "19700101000000.000000-060");
        assert_eq!(CimDateTime::parse(&west.to_cim_string()).unwrap().binary(), MICROS_PER_HOUR);
    }

    #[test]
    fn test_civil_round_trip() {
        for days in [-1, 0, 59, 365, 11_016, 19_782, 2_932_896] {
            let (y, m, d) = civil_from_days(days);
            assert_eq!(days_from_civil(y, m, d), days);
        }
    }

    #[test]
    fn test_now_is_after_2020() {
        let now = CimDateTime::now();
        assert!(now.binary() > 1_577_836_800_000_000);
        assert!(now.to_cim_string().starts_with("20"));
    }
}
