//! International Fixed Calendar
//!
//! 13 months of 28 days. Leap Day follows the 6th month in leap years and
//! Year Day closes every year; both sit outside the weekly rotation, so every
//! month starts on a Sunday.

use utms_core::{DomainError, Number};
use utms_units::{ArgMeta, StrategyMeta, UnitRef, UnitSpec, UnitStrategy};
use crate::strategies::{local_date, year_length, year_start, LocalDate};
use crate::{CalendarSpec, WeekdayRule};

pub const DAYS_PER_MONTH: i64 = 28;
pub const DAYS_PER_WEEK: i64 = 7;
/// Day of year (0-based) of Leap Day
pub const LEAP_DAY: i64 = 168;

/// Month index reported for Leap Day
pub const LEAP_DAY_INDEX: i64 = 13;
/// Month index reported for Year Day
pub const YEAR_DAY_INDEX: i64 = 14;

pub const MONTH_NAMES: [&str; 15] = [
    "January", "February", "March", "April", "May", "June", "Sol",
    "July", "August", "September", "October", "November", "December",
    "Leap Day", "Year Day",
];

/// Sunday-first
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// Where a day of the year falls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfcDay {
    /// 0-based month and day within it
    Month { month: i64, day: i64 },
    LeapDay,
    YearDay,
}

impl IfcDay {
    /// Resolve a 0-based day of year
    pub fn from_day_of_year(day_of_year: i64, leap: bool) -> Self {
        let last = if leap { 365 } else { 364 };
        if day_of_year >= last {
            return Self::YearDay;
        }
        if leap && day_of_year == LEAP_DAY {
            return Self::LeapDay;
        }
        let ordinal = if leap && day_of_year > LEAP_DAY { day_of_year - 1 } else { day_of_year };
        Self::Month {
            month: ordinal / DAYS_PER_MONTH,
            day: ordinal % DAYS_PER_MONTH,
        }
    }

    pub fn is_intercalary(&self) -> bool {
        !matches!(self, Self::Month { .. })
    }

    /// Month index, with 13 and 14 for the intercalary days
    pub fn month_index(&self) -> i64 {
        match self {
            Self::Month { month, .. } => *month,
            Self::LeapDay => LEAP_DAY_INDEX,
            Self::YearDay => YEAR_DAY_INDEX,
        }
    }
}

fn ifc_day(unit: &UnitRef<'_>, ts: &Number) -> Result<(IfcDay, LocalDate), DomainError> {
    let date = local_date(&unit.dep("day")?, ts)?;
    let day = IfcDay::from_day_of_year(date.day_of_year, date.is_leap_year());
    Ok((day, date))
}

static DAY_ROLE: [ArgMeta; 1] = [
    ArgMeta::required("day", "unit", "Local day the calendar is counted in"),
];

// ============ ifc-month ============

/// 28-day month; each intercalary day is a one-day slot of its own
pub struct IfcMonth;

impl UnitStrategy for IfcMonth {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "ifc-month",
            description: "International Fixed Calendar month, intercalary days as one-day slots",
            roles: &DAY_ROLE,
            params: &[],
            category: "ifc",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let (day, date) = ifc_day(unit, ts)?;
        let days = if day.is_intercalary() { 1 } else { DAYS_PER_MONTH };
        Ok(date.day_length.mul(&Number::from_i64(days)))
    }

    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let (day, date) = ifc_day(unit, ts)?;
        Ok(match day {
            IfcDay::Month { day, .. } => date.days_before(day),
            _ => date.day_start,
        })
    }

    fn index(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Option<i64>, DomainError> {
        let (day, _) = ifc_day(unit, ts)?;
        Ok(Some(day.month_index()))
    }
}

// ============ ifc-week ============

/// 7-day week restarting every month; intercalary days are one-day slots
/// with no weekday
pub struct IfcWeek;

impl UnitStrategy for IfcWeek {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "ifc-week",
            description: "International Fixed Calendar week, paused on intercalary days",
            roles: &DAY_ROLE,
            params: &[],
            category: "ifc",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let (day, date) = ifc_day(unit, ts)?;
        let days = if day.is_intercalary() { 1 } else { DAYS_PER_WEEK };
        Ok(date.day_length.mul(&Number::from_i64(days)))
    }

    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let (day, date) = ifc_day(unit, ts)?;
        Ok(match day {
            IfcDay::Month { day, .. } => date.days_before(day % DAYS_PER_WEEK),
            _ => date.day_start,
        })
    }

    fn index(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Option<i64>, DomainError> {
        let (day, _) = ifc_day(unit, ts)?;
        Ok(match day {
            IfcDay::Month { day, .. } => Some(day % DAYS_PER_WEEK),
            _ => None,
        })
    }
}

// ============ ifc-year ============

/// Same span as the Gregorian year; only its subdivision differs
pub struct IfcYear;

impl UnitStrategy for IfcYear {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "ifc-year",
            description: "International Fixed Calendar year (365 or 366 days)",
            roles: &DAY_ROLE,
            params: &[],
            category: "ifc",
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

/// IFC week, month and year units reading the shared "day" unit
pub fn unit_specs() -> Vec<UnitSpec> {
    vec![
        UnitSpec::dynamic("ifc-week", "IFC Week", "ifc-week")
            .depends_on("day", "day")
            .with_names(&WEEKDAY_NAMES)
            .in_group("ifc"),
        UnitSpec::dynamic("ifc-month", "IFC Month", "ifc-month")
            .depends_on("day", "day")
            .with_names(&MONTH_NAMES)
            .in_group("ifc"),
        UnitSpec::dynamic("ifc-year", "IFC Year", "ifc-year")
            .depends_on("day", "day")
            .in_group("ifc"),
    ]
}

pub fn calendar_spec() -> CalendarSpec {
    CalendarSpec {
        name: "ifc".to_string(),
        day: "day".to_string(),
        week: "ifc-week".to_string(),
        month: "ifc-month".to_string(),
        year: "ifc-year".to_string(),
        weekday_rule: WeekdayRule::Intercalary,
    }
}
