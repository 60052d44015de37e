//! Time sources
//!
//! The engine never reads the system clock directly. A `Clock` supplies the
//! default breakdown target and backs `ClockResolver`.

use std::time::{SystemTime, UNIX_EPOCH};
use utms_anchors::{Anchor, AnchorResolver};
use utms_core::{DomainError, Number};

/// Supplies "now" as seconds since the Unix epoch
pub trait Clock: Send + Sync {
    fn now(&self) -> Number;
}

/// Wall clock with nanosecond resolution
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Number {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => from_parts(elapsed.as_secs(), elapsed.subsec_nanos()).unwrap_or_else(Number::zero),
            Err(before) => {
                let d = before.duration();
                from_parts(d.as_secs(), d.subsec_nanos()).map(|n| n.neg()).unwrap_or_else(Number::zero)
            }
        }
    }
}

fn from_parts(secs: u64, nanos: u32) -> Option<Number> {
    let secs = i64::try_from(secs).ok()?;
    Some(Number::from_i64(secs).add(&Number::from_ratio(nanos as i64, 1_000_000_000)))
}

/// Always returns the same instant
#[derive(Debug, Clone, PartialEq)]
pub struct FixedClock(pub Number);

impl Clock for FixedClock {
    fn now(&self) -> Number {
        self.0.clone()
    }
}

/// Expressions `ClockResolver` understands
pub const NOW_EXPRESSIONS: [&str; 3] = ["now", "current-time", "(current-time)"];

/// Resolves "now"-style dynamic anchors from a clock
pub struct ClockResolver<C: Clock> {
    clock: C,
}

impl<C: Clock> ClockResolver<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> AnchorResolver for ClockResolver<C> {
    fn resolve(&self, anchor: &Anchor) -> Result<Number, DomainError> {
        let expression = anchor.expression().unwrap_or_default().trim();
        if NOW_EXPRESSIONS.contains(&expression) {
            Ok(self.clock.now())
        } else {
            Err(DomainError::UnresolvedAnchor {
                label: anchor.label().to_string(),
                reason: format!("cannot evaluate '{}'", expression),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utms_anchors::AnchorSpec;

    #[test]
    fn test_system_clock_after_2020() {
        let now = SystemClock.now();
        assert!(now > Number::from_i64(1_577_836_800));
    }

    #[test]
    fn test_clock_resolver() {
        let resolver = ClockResolver::new(FixedClock(Number::from_i64(1_000)));
        let now = Anchor::from_spec(AnchorSpec::dynamic("now", "Now", "(current-time)")).unwrap();
        assert_eq!(resolver.resolve(&now).unwrap(), Number::from_i64(1_000));

        let other = Anchor::from_spec(AnchorSpec::dynamic("eclipse", "Eclipse", "(next-eclipse)")).unwrap();
        assert!(resolver.resolve(&other).is_err());
    }
}
