//! Standard Gregorian calendar: local day, 7-day week, 12-month year

use utms_core::Number;
use utms_units::UnitSpec;
use crate::{CalendarSpec, WeekdayRule};

/// Monday-first
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
];

pub const MONDAY: i64 = 0;
pub const THURSDAY: i64 = 3;
pub const SUNDAY: i64 = 6;

/// Weekday index of 1970-01-01
pub const EPOCH_WEEKDAY: i64 = THURSDAY;

pub const MONTH_NAMES: [&str; 12] = [
    "January", "February", "March", "April", "May", "June",
    "July", "August", "September", "October", "November", "December",
];

/// Units "day", "week", "month" and "year" in UTC
pub fn unit_specs() -> Vec<UnitSpec> {
    unit_specs_with_timezone(None)
}

/// Same units with the day shifted by a UTC offset in seconds
pub fn unit_specs_with_timezone(offset: Option<Number>) -> Vec<UnitSpec> {
    let mut day = UnitSpec::dynamic("day", "Day", "local-day").in_group("calendar");
    if let Some(offset) = offset {
        day = day.with_timezone(offset);
    }

    vec![
        day,
        UnitSpec::dynamic("week", "Week", "week")
            .depends_on("day", "day")
            .with_names(&WEEKDAY_NAMES)
            .with_offset(EPOCH_WEEKDAY)
            .in_group("calendar"),
        UnitSpec::dynamic("month", "Month", "gregorian-month")
            .depends_on("day", "day")
            .with_names(&MONTH_NAMES)
            .in_group("calendar"),
        UnitSpec::dynamic("year", "Year", "gregorian-year")
            .depends_on("day", "day")
            .in_group("calendar"),
    ]
}

pub fn calendar_spec() -> CalendarSpec {
    CalendarSpec {
        name: "gregorian".to_string(),
        day: "day".to_string(),
        week: "week".to_string(),
        month: "month".to_string(),
        year: "year".to_string(),
        weekday_rule: WeekdayRule::Continuous,
    }
}
