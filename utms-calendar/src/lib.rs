//! UTMS Calendar - Calendar strategies and calendars
//!
//! Strategies (selected by tag in a dynamic `UnitSpec`):
//! - local-day, week, gregorian-month, gregorian-year
//! - ifc-week, ifc-month, ifc-year (International Fixed Calendar)
//!
//! `Calendar` binds a day, week, month and year unit and answers weekday,
//! position and month-layout queries.

mod strategies;
mod calendar;
pub mod gregorian;
pub mod ifc;

pub use strategies::{
    local_date, weekday_index, GregorianMonth, GregorianYear, LocalDate, LocalDay, Week,
};
pub use calendar::{Calendar, CalendarPosition, CalendarSpec, MonthLayout, WeekPosition, WeekdayRule};
pub use ifc::{IfcDay, IfcMonth, IfcWeek, IfcYear};

use utms_units::StrategyCatalog;

/// Load calendar strategies into a catalog
pub fn load_calendar_strategies(catalog: StrategyCatalog) -> StrategyCatalog {
    catalog
        // Continuous calendar (4 strategies)
        .with_strategy(LocalDay)
        .with_strategy(Week)
        .with_strategy(GregorianMonth)
        .with_strategy(GregorianYear)

        // Fixed calendar (3 strategies)
        .with_strategy(IfcWeek)
        .with_strategy(IfcMonth)
        .with_strategy(IfcYear)
}
