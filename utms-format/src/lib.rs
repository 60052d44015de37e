//! UTMS Format - Text rendering of engine results
//!
//! `Formatter` renders values in fixed or scientific notation according to
//! `EngineConfig`, flags values it had to truncate or that exceed the
//! exponent budget, and renders breakdowns and conversion tables.

mod render;
mod plt;

pub use render::{Formatter, Notation, Rendered};
pub use plt::{seconds_to_hplt, seconds_to_pplt};
