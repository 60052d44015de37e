//! Civil (proleptic Gregorian) date arithmetic
//!
//! Day counts are relative to the Unix epoch, years are signed so deep-past
//! timestamps still map to a year number. Everything here works on whole days
//! and integer seconds; sub-second parts stay in `Number`.

use crate::Number;
use thiserror::Error;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Days in each month (non-leap year)
const DAYS_IN_MONTH: [u32; 12] = [31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// Days from 0000-03-01 to 1970-01-01
const UNIX_EPOCH_DAYS: i64 = 719_468;

/// Errors from civil-date construction and ISO parsing
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CivilError {
    #[error("Invalid month: {0} (must be 1-12)")]
    InvalidMonth(u32),

    #[error("Invalid day: {day} for {month}/{year}")]
    InvalidDay { day: u32, month: u32, year: i64 },

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Gregorian leap-year rule: divisible by 4 and (not by 100 or by 400)
pub fn is_leap_year(year: i64) -> bool {
    year.rem_euclid(4) == 0 && (year.rem_euclid(100) != 0 || year.rem_euclid(400) == 0)
}

/// Get days in a month, 0 for an out-of-range month
pub fn days_in_month(year: i64, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        m if (1..=12).contains(&m) => DAYS_IN_MONTH[(m - 1) as usize],
        _ => 0,
    }
}

pub fn days_in_year(year: i64) -> i64 {
    if is_leap_year(year) { 366 } else { 365 }
}

/// 0-based day of the year
pub fn day_of_year(year: i64, month: u32, day: u32) -> i64 {
    days_from_civil(year, month, day) - days_from_civil(year, 1, 1)
}

/// Convert civil date to days since Unix epoch
/// Algorithm from Howard Hinnant: http://howardhinnant.github.io/date_algorithms.html
pub fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = y.div_euclid(400);
    let yoe = y - era * 400; // [0, 399]
    let m = month as i64;
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + day as i64 - 1; // [0, 365]
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy; // [0, 146096]
    era * 146_097 + doe - UNIX_EPOCH_DAYS
}

/// Convert days since Unix epoch to civil date
pub fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + UNIX_EPOCH_DAYS;
    let era = z.div_euclid(146_097);
    let doe = z - era * 146_097; // [0, 146096]
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365; // [0, 399]
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100); // [0, 365]
    let mp = (5 * doy + 2) / 153; // [0, 11]
    let d = doy - (153 * mp + 2) / 5 + 1; // [1, 31]
    let m = if mp < 10 { mp + 3 } else { mp - 9 }; // [1, 12]
    let year = if m <= 2 { y + 1 } else { y };
    (year, m as u32, d as u32)
}

/// Whole days since the epoch for a (possibly fractional) epoch-seconds value
pub fn epoch_day(ts: &Number) -> Option<i64> {
    ts.div_floor(&Number::from_i64(SECONDS_PER_DAY)).ok()?.to_i64()
}

/// Epoch seconds of midnight UTC on the given date
pub fn seconds_from_civil(year: i64, month: u32, day: u32) -> Result<Number, CivilError> {
    if !(1..=12).contains(&month) {
        return Err(CivilError::InvalidMonth(month));
    }
    if day < 1 || day > days_in_month(year, month) {
        return Err(CivilError::InvalidDay { day, month, year });
    }
    let days = days_from_civil(year, month, day);
    Ok(Number::from_i64(days).mul(&Number::from_i64(SECONDS_PER_DAY)))
}

/// Parse an ISO 8601 date or datetime into epoch seconds (UTC)
///
/// Supported formats:
/// - 2025-06-15
/// - 2025-06-15T14:30
/// - 2025-06-15T14:30:00Z
/// - 2025-06-15T14:30:00+05:30
/// - 2025-06-15 14:30:00.123456789
///
/// A timezone suffix is subtracted so the result is always UTC. Fractional
/// seconds keep every digit given.
pub fn parse_iso(s: &str) -> Result<Number, CivilError> {
    let s = s.trim();

    if s.len() == 10 && s.chars().nth(4) == Some('-') && s.chars().nth(7) == Some('-') {
        let (year, month, day) = parse_date_part(s)?;
        return seconds_from_civil(year, month, day);
    }

    let split = s.find('T').or_else(|| s.find(' '));
    match split {
        Some(pos) => parse_datetime(&s[..pos], &s[pos + 1..]),
        None => Err(CivilError::ParseError(format!("Unrecognized format: {}", s))),
    }
}

fn parse_date_part(s: &str) -> Result<(i64, u32, u32), CivilError> {
    // A leading minus belongs to the year
    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let parts: Vec<&str> = body.split('-').collect();
    if parts.len() != 3 {
        return Err(CivilError::ParseError("Expected YYYY-MM-DD".to_string()));
    }

    let year: i64 = parts[0].parse()
        .map_err(|_| CivilError::ParseError("Invalid year".to_string()))?;
    let month: u32 = parts[1].parse()
        .map_err(|_| CivilError::ParseError("Invalid month".to_string()))?;
    let day: u32 = parts[2].parse()
        .map_err(|_| CivilError::ParseError("Invalid day".to_string()))?;

    Ok((if negative { -year } else { year }, month, day))
}

fn parse_datetime(date_part: &str, time_part: &str) -> Result<Number, CivilError> {
    let (year, month, day) = parse_date_part(date_part)?;
    let (time_str, tz_offset) = extract_timezone(time_part)?;

    let (time_no_frac, fraction) = match time_str.find('.') {
        Some(dot_pos) => (&time_str[..dot_pos], parse_fractional_seconds(&time_str[dot_pos + 1..])?),
        None => (time_str, Number::zero()),
    };

    let time_parts: Vec<&str> = time_no_frac.split(':').collect();
    if time_parts.len() < 2 || time_parts.len() > 3 {
        return Err(CivilError::ParseError("Expected HH:MM[:SS]".to_string()));
    }

    let hour: i64 = time_parts[0].parse()
        .map_err(|_| CivilError::ParseError("Invalid hour".to_string()))?;
    let minute: i64 = time_parts[1].parse()
        .map_err(|_| CivilError::ParseError("Invalid minute".to_string()))?;
    let second: i64 = match time_parts.get(2) {
        Some(sec) => sec.parse()
            .map_err(|_| CivilError::ParseError("Invalid second".to_string()))?,
        None => 0,
    };

    if !(0..=23).contains(&hour) || !(0..=59).contains(&minute) || !(0..=59).contains(&second) {
        return Err(CivilError::InvalidTime(time_no_frac.to_string()));
    }

    let midnight = seconds_from_civil(year, month, day)?;
    let clock = hour * 3600 + minute * 60 + second - tz_offset.unwrap_or(0);
    Ok(midnight.add(&Number::from_i64(clock)).add(&fraction))
}

fn extract_timezone(time_part: &str) -> Result<(&str, Option<i64>), CivilError> {
    if let Some(stripped) = time_part.strip_suffix('Z') {
        return Ok((stripped, Some(0)));
    }

    if let Some(plus_pos) = time_part.rfind('+') {
        let offset = parse_tz_offset(&time_part[plus_pos + 1..])?;
        return Ok((&time_part[..plus_pos], Some(offset)));
    }

    // Only a timezone if it follows at least HH:MM
    if let Some(minus_pos) = time_part.rfind('-') {
        if minus_pos >= 5 {
            let offset = -parse_tz_offset(&time_part[minus_pos + 1..])?;
            return Ok((&time_part[..minus_pos], Some(offset)));
        }
    }

    Ok((time_part, None))
}

fn parse_tz_offset(s: &str) -> Result<i64, CivilError> {
    let (hours, minutes) = match s.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None if s.len() == 4 => (&s[..2], Some(&s[2..])),
        None => (s, None),
    };
    let hours: i64 = hours.parse()
        .map_err(|_| CivilError::ParseError("Invalid timezone hours".to_string()))?;
    let minutes: i64 = match minutes {
        Some(m) => m.parse()
            .map_err(|_| CivilError::ParseError("Invalid timezone minutes".to_string()))?,
        None => 0,
    };
    Ok(hours * 3600 + minutes * 60)
}

fn parse_fractional_seconds(s: &str) -> Result<Number, CivilError> {
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(CivilError::ParseError("Invalid fractional seconds".to_string()));
    }
    Number::from_str(&format!("0.{}", s))
        .map_err(|_| CivilError::ParseError("Invalid fractional seconds".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leap_year() {
        assert!(is_leap_year(2000));
        assert!(!is_leap_year(1900));
        assert!(is_leap_year(2024));
        assert!(!is_leap_year(2023));
        assert!(is_leap_year(-4));
        assert!(!is_leap_year(-100));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2023, 12), 31);
        assert_eq!(days_in_month(2023, 13), 0);
    }

    #[test]
    fn test_civil_roundtrip() {
        assert_eq!(days_from_civil(1970, 1, 1), 0);
        assert_eq!(civil_from_days(0), (1970, 1, 1));
        assert_eq!(civil_from_days(-1), (1969, 12, 31));
        assert_eq!(days_from_civil(2000, 3, 1), 11_017);
        let far = days_from_civil(-12_000, 7, 4);
        assert_eq!(civil_from_days(far), (-12_000, 7, 4));
    }

    #[test]
    fn test_day_of_year() {
        assert_eq!(day_of_year(2024, 1, 1), 0);
        assert_eq!(day_of_year(2024, 12, 31), 365);
        assert_eq!(day_of_year(2023, 12, 31), 364);
    }

    #[test]
    fn test_epoch_day_pre_epoch() {
        assert_eq!(epoch_day(&Number::from_i64(-1)), Some(-1));
        assert_eq!(epoch_day(&Number::from_i64(86_400)), Some(1));
    }

    #[test]
    fn test_parse_date_only() {
        let ts = parse_iso("2024-01-01").unwrap();
        assert_eq!(ts.to_i64(), Some(1_704_067_200));
    }

    #[test]
    fn test_parse_datetime_with_zone() {
        let utc = parse_iso("2025-06-15T14:30:00Z").unwrap();
        let shifted = parse_iso("2025-06-15T20:00:00+05:30").unwrap();
        assert_eq!(utc, shifted);

        let west = parse_iso("2025-06-15T09:30:00-05:00").unwrap();
        assert_eq!(utc, west);
    }

    #[test]
    fn test_parse_fraction_exact() {
        let ts = parse_iso("1970-01-01T00:00:01.123456789123Z").unwrap();
        assert_eq!(ts, Number::from_str("1.123456789123").unwrap());
    }

    #[test]
    fn test_invalid_dates() {
        assert!(matches!(parse_iso("2023-02-29"), Err(CivilError::InvalidDay { .. })));
        assert!(matches!(parse_iso("2023-13-01"), Err(CivilError::InvalidMonth(13))));
        assert!(matches!(parse_iso("2023-01-01T25:00"), Err(CivilError::InvalidTime(_))));
        assert!(parse_iso("yesterday").is_err());
    }
}
