//! Calendar strategies for the continuous (Gregorian) calendar
//!
//! Every strategy here reads the civil date through its `day` role, so a day
//! unit with a timezone shifts weeks, months and years with it.

use utms_core::civil;
use utms_core::{DomainError, Number};
use utms_units::{ArgMeta, StrategyMeta, UnitRef, UnitStrategy};

/// Civil dates are only computed within this many days of the epoch
const MAX_CIVIL_DAYS: i64 = 100_000_000_000_000;

/// Local civil date of the day containing a timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct LocalDate {
    pub year: i64,
    pub month: u32,
    pub day: u32,
    /// 0-based
    pub day_of_year: i64,
    pub day_start: Number,
    pub day_length: Number,
}

impl LocalDate {
    /// `ts` of the day `days` before the containing day's start
    pub fn days_before(&self, days: i64) -> Number {
        self.day_start.sub(&self.day_length.mul(&Number::from_i64(days)))
    }

    pub fn is_leap_year(&self) -> bool {
        civil::is_leap_year(self.year)
    }
}

/// Read the civil date of `ts` through a day unit
pub fn local_date(day: &UnitRef<'_>, ts: &Number) -> Result<LocalDate, DomainError> {
    let day_length = day.length(ts)?;
    let local = ts.add(&day.timezone_offset());
    let days = local.div_floor(&day_length)
        .map_err(|_| day.division_by_zero(ts, "civil date"))?
        .to_i64()
        .filter(|d| d.abs() <= MAX_CIVIL_DAYS)
        .ok_or_else(|| DomainError::OutOfRange {
            unit: day.id().to_string(),
            timestamp: ts.clone(),
            reason: "outside the civil calendar range".to_string(),
        })?;

    let (year, month, dom) = civil::civil_from_days(days);
    Ok(LocalDate {
        year,
        month,
        day: dom,
        day_of_year: civil::day_of_year(year, month, dom),
        day_start: day.start(ts)?,
        day_length,
    })
}

/// Position of `ts` within a continuous week
///
/// `reference = offset * day_length - tz`, then
/// `floor((ts - reference) / day_length) mod days_per_week`.
pub fn weekday_index(week: &UnitRef<'_>, ts: &Number) -> Result<i64, DomainError> {
    let day = week.dep("day")?;
    let day_length = day.length(ts)?;
    let days_per_week = week.param_or("days", Number::from_i64(7));
    let offset = Number::from_i64(week.offset().unwrap_or(0));

    let reference = offset.mul(&day_length).sub(&day.timezone_offset());
    let elapsed = ts.sub(&reference).div_floor(&day_length)
        .map_err(|_| week.division_by_zero(ts, "day_of_week"))?;
    let index = elapsed.rem_floor(&days_per_week)
        .map_err(|_| week.division_by_zero(ts, "day_of_week"))?;
    index.to_i64().ok_or_else(|| DomainError::OutOfRange {
        unit: week.id().to_string(),
        timestamp: ts.clone(),
        reason: "weekday index is not an integer".to_string(),
    })
}

static DAY_ROLE: [ArgMeta; 1] = [
    ArgMeta::required("day", "unit", "Local day the calendar is counted in"),
];

// ============ local-day ============

/// Day aligned to local midnight via the unit's timezone
pub struct LocalDay;

static LOCAL_DAY_PARAMS: [ArgMeta; 1] = [
    ArgMeta::optional("length", "Number", "Day length in seconds", "86400"),
];

impl UnitStrategy for LocalDay {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "local-day",
            description: "Day starting at local midnight",
            roles: &[],
            params: &LOCAL_DAY_PARAMS,
            category: "calendar",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, _ts: &Number) -> Result<Number, DomainError> {
        Ok(unit.param_or("length", Number::from_i64(civil::SECONDS_PER_DAY)))
    }
}

// ============ week ============

/// Continuous week; `offset` is the weekday index of the epoch's day
pub struct Week;

static WEEK_PARAMS: [ArgMeta; 1] = [
    ArgMeta::optional("days", "Number", "Days per week", "7"),
];

impl UnitStrategy for Week {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "week",
            description: "Continuous week of whole days",
            roles: &DAY_ROLE,
            params: &WEEK_PARAMS,
            category: "calendar",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let day = unit.dep("day")?.length(ts)?;
        Ok(day.mul(&unit.param_or("days", Number::from_i64(7))))
    }

    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let day = unit.dep("day")?;
        let day_start = day.start(ts)?;
        let index = weekday_index(unit, ts)?;
        Ok(day_start.sub(&day.length(ts)?.mul(&Number::from_i64(index))))
    }

    fn index(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Option<i64>, DomainError> {
        weekday_index(unit, ts).map(Some)
    }
}

// ============ gregorian-month ============

pub struct GregorianMonth;

impl UnitStrategy for GregorianMonth {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "gregorian-month",
            description: "Gregorian month of 28 to 31 days",
            roles: &DAY_ROLE,
            params: &[],
            category: "calendar",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let date = local_date(&unit.dep("day")?, ts)?;
        let days = civil::days_in_month(date.year, date.month);
        Ok(date.day_length.mul(&Number::from_i64(days as i64)))
    }

    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let date = local_date(&unit.dep("day")?, ts)?;
        Ok(date.days_before(date.day as i64 - 1))
    }

    fn index(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Option<i64>, DomainError> {
        let date = local_date(&unit.dep("day")?, ts)?;
        Ok(Some(date.month as i64 - 1))
    }
}

// ============ gregorian-year ============

pub struct GregorianYear;

impl UnitStrategy for GregorianYear {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "gregorian-year",
            description: "Gregorian year of 365 or 366 days",
            roles: &DAY_ROLE,
            params: &[],
            category: "calendar",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        year_length(unit, ts)
    }

    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        year_start(unit, ts)
    }

    fn index(&self, _unit: &UnitRef<'_>, _ts: &Number) -> Result<Option<i64>, DomainError> {
        Ok(None)
    }
}

pub(crate) fn year_length(unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
    let date = local_date(&unit.dep("day")?, ts)?;
    Ok(date.day_length.mul(&Number::from_i64(civil::days_in_year(date.year))))
}

pub(crate) fn year_start(unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
    let date = local_date(&unit.dep("day")?, ts)?;
    Ok(date.days_before(date.day_of_year))
}
