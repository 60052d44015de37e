//! UTMS Anchors - Labelled reference instants
//!
//! - `AnchorSpec` / `Anchor`: label, value, groups, precision, uncertainty,
//!   breakdown and format directives
//! - `AnchorStore`: concurrent store handing out `Arc<Anchor>` snapshots
//! - `AnchorResolver`: external evaluation of dynamic anchor values
//! - `BreakdownEngine`: mixed-radix decomposition relative to an anchor

mod anchor;
mod store;
mod resolver;
mod breakdown;

pub use anchor::{Anchor, AnchorSource, AnchorSpec, AnchorValue, FormatKind, FormatSpec, Uncertainty};
pub use store::{AnchorStore, UpdateError};
pub use resolver::{resolve_value, AnchorResolver, StaticResolver};
pub use breakdown::{Breakdown, BreakdownComponent, BreakdownEngine, BreakdownOutcome};
