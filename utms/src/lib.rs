//! UTMS - Universal Time Measurement System
//!
//! Time as a graph of composable units, from Planck time to the Galaxial
//! Era. The `Engine` ties the workspace together:
//! - units and conversion (`utms-units`)
//! - Gregorian and International Fixed calendars (`utms-calendar`)
//! - anchors and breakdowns (`utms-anchors`)
//! - rendering (`utms-format`)

mod clock;
mod engine;

pub use clock::{Clock, ClockResolver, FixedClock, SystemClock, NOW_EXPRESSIONS};
pub use engine::{AnchorBreakdown, Definitions, Engine, EngineBuilder};

pub use utms_anchors::{
    Anchor, AnchorResolver, AnchorSpec, AnchorStore, AnchorValue, Breakdown, BreakdownComponent,
    BreakdownOutcome, FormatKind, FormatSpec, StaticResolver, Uncertainty,
};
pub use utms_calendar::{gregorian, ifc, Calendar, CalendarPosition, CalendarSpec, MonthLayout, WeekPosition};
pub use utms_core::{
    codes, is_leap_year, DefinitionError, DomainError, EngineConfig, LookupError, Number,
    PrecisionError, Severity, UtmsError,
};
pub use utms_format::{seconds_to_hplt, seconds_to_pplt, Formatter, Rendered};
pub use utms_units::{ConversionTable, Converted, UnitSpec, UnitSummary};
