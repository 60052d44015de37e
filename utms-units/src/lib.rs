//! UTMS Units - Time units and conversion
//!
//! Units are either fixed (a constant number of seconds) or dynamic (length
//! and start computed by a catalog strategy from the timestamp and sibling
//! units). The registry validates definitions, rejects dependency cycles and
//! freezes into an immutable, thread-safe lookup table.
//!
//! Standard catalog:
//! - SI ladder (qs .. QS) plus Planck time
//! - Human scales (minute .. millennium, lunar cycle)
//! - Cosmic scales (megaannum .. Galaxial Era)

mod spec;
mod strategy;
mod unit;
mod registry;
mod units;
mod convert;

pub use spec::{DynamicSpec, UnitSpec, UnitSpecKind};
pub use strategy::{
    load_generic_strategies, names_index, periodic_start, ArgMeta, Periodic, Scaled,
    StrategyCatalog, StrategyMeta, UnitStrategy,
};
pub use unit::{DynamicUnit, Unit, UnitKind, UnitRef, UnitSummary};
pub use registry::{RegistryBuilder, UnitRegistry};
pub use units::{planck_time, seconds_in_lunar_cycle, seconds_in_year, standard_unit_specs};
pub use convert::{ConversionEngine, ConversionTable, Converted};
