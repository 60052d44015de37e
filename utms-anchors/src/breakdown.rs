//! Mixed-radix decomposition of the time between an anchor and a target
//!
//! Units are taken largest first, measured where the walk currently stands,
//! so a month counted across February is 28 or 29 days long and the next
//! unit picks up exactly where the previous one stopped.

use std::sync::Arc;
use serde::Serialize;
use tracing::debug;
use utms_core::{DomainError, Number, UtmsError};
use utms_units::UnitRegistry;

/// One unit of a breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakdownComponent {
    pub unit: String,
    /// Whole units; always integer-valued
    pub count: Number,
    /// Length of one unit where it was counted
    pub length: Number,
    /// Walk position before this unit was counted
    pub walked_from: Number,
}

impl BreakdownComponent {
    pub fn count_i64(&self) -> Option<i64> {
        self.count.to_i64()
    }

    /// Seconds covered by this component
    pub fn span(&self) -> Number {
        self.count.mul(&self.length)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    /// Target lies before the anchor
    pub negative: bool,
    pub anchor: Number,
    pub target: Number,
    /// `|target - anchor|`
    pub total: Number,
    /// Largest unit first
    pub components: Vec<BreakdownComponent>,
    /// Seconds left after the smallest unit
    pub remainder: Number,
    /// `remainder` as a fraction of the smallest unit
    pub remainder_in_smallest: Option<Number>,
}

impl Breakdown {
    pub fn sign(&self) -> char {
        if self.negative { '-' } else { '+' }
    }

    /// Sum of every component span plus the remainder
    pub fn covered(&self) -> Number {
        self.components
            .iter()
            .fold(self.remainder.clone(), |acc, c| acc.add(&c.span()))
    }

    /// Count of the smallest unit including the leftover fraction
    pub fn last_fractional(&self) -> Option<Number> {
        let last = self.components.last()?;
        let fraction = self.remainder_in_smallest.clone().unwrap_or_else(Number::zero);
        Some(last.count.add(&fraction))
    }

    pub fn component(&self, unit: &str) -> Option<&BreakdownComponent> {
        self.components.iter().find(|c| c.unit == unit)
    }
}

/// Result for one of an anchor's breakdown specs
#[derive(Debug, Clone, PartialEq)]
pub struct BreakdownOutcome {
    pub units: Vec<String>,
    pub result: Result<Breakdown, UtmsError>,
}

#[derive(Debug, Clone)]
pub struct BreakdownEngine {
    units: Arc<UnitRegistry>,
}

impl BreakdownEngine {
    pub fn new(units: Arc<UnitRegistry>) -> Self {
        Self { units }
    }

    /// Decompose `target - anchor` into `unit_ids`
    pub fn breakdown<S: AsRef<str>>(&self, anchor: &Number, target: &Number, unit_ids: &[S]) -> Result<Breakdown, UtmsError> {
        let delta = target.sub(anchor);
        let negative = delta.is_negative();
        let total = delta.abs();
        let mut walking_ts = if anchor < target { anchor.clone() } else { target.clone() };

        let mut ordered = Vec::with_capacity(unit_ids.len());
        for id in unit_ids {
            let unit = self.units.resolve(id.as_ref())?;
            let length = unit.length(&walking_ts)?;
            ordered.push((unit, length));
        }
        ordered.sort_by(|a, b| b.1.cmp(&a.1));

        let mut remaining = total.clone();
        let mut components = Vec::with_capacity(ordered.len());
        let mut smallest = None;
        for (unit, _) in &ordered {
            let length = unit.length(&walking_ts)?;
            let count = remaining.div_floor(&length)
                .map_err(|_| unit.division_by_zero(&walking_ts, "breakdown"))?;
            let span = count.mul(&length);
            debug!(unit = %unit.id(), %count, %length, at = %walking_ts, "breakdown step");

            remaining = remaining.sub(&span);
            let walked_from = walking_ts.clone();
            walking_ts = walking_ts.add(&span);
            smallest = Some(*unit);
            components.push(BreakdownComponent {
                unit: unit.id().to_string(),
                count,
                length,
                walked_from,
            });
        }

        let remainder_in_smallest = match smallest {
            Some(unit) => {
                let length = unit.length(&walking_ts)?;
                Some(remaining.checked_div(&length).map_err(|_| DomainError::DivisionByZero {
                    unit: unit.id().to_string(),
                    timestamp: Some(walking_ts.clone()),
                    operation: "breakdown".to_string(),
                })?)
            }
            None => None,
        };

        Ok(Breakdown {
            negative,
            anchor: anchor.clone(),
            target: target.clone(),
            total,
            components,
            remainder: remaining,
            remainder_in_smallest,
        })
    }

    /// Every spec computed independently; one failing spec does not stop
    /// the others
    pub fn breakdown_all(&self, anchor: &Number, target: &Number, specs: &[Vec<String>]) -> Vec<BreakdownOutcome> {
        specs
            .iter()
            .map(|units| BreakdownOutcome {
                units: units.clone(),
                result: self.breakdown(anchor, target, units.as_slice()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use utms_calendar::{gregorian, load_calendar_strategies};
    use utms_core::civil::parse_iso;
    use utms_core::codes;
    use utms_units::{load_generic_strategies, standard_unit_specs, StrategyCatalog};

    fn engine() -> BreakdownEngine {
        let catalog = load_calendar_strategies(load_generic_strategies(StrategyCatalog::new()));
        let mut specs = standard_unit_specs();
        specs.extend(gregorian::unit_specs());
        let registry = UnitRegistry::from_specs(specs, &catalog).unwrap();
        BreakdownEngine::new(Arc::new(registry))
    }

    fn ts(iso: &str) -> Number {
        parse_iso(iso).unwrap()
    }

    fn counts(b: &Breakdown) -> Vec<(&str, i64)> {
        b.components.iter().map(|c| (c.unit.as_str(), c.count_i64().unwrap())).collect()
    }

    #[test]
    fn test_fixed_units() {
        let b = engine().breakdown(&Number::zero(), &Number::from_i64(90_061), &["s", "h", "d", "m"]).unwrap();
        assert_eq!(counts(&b), vec![("d", 1), ("h", 1), ("m", 1), ("s", 1)]);
        assert!(b.remainder.is_zero());
        assert_eq!(b.sign(), '+');
    }

    #[test]
    fn test_negative_delta() {
        let b = engine().breakdown(&Number::from_i64(7_200), &Number::from_i64(0), &["h"]).unwrap();
        assert!(b.negative);
        assert_eq!(b.sign(), '-');
        assert_eq!(counts(&b), vec![("h", 2)]);
        assert_eq!(b.components[0].walked_from, Number::zero());
    }

    #[test]
    fn test_remainder_fraction() {
        let b = engine().breakdown(&Number::zero(), &Number::from_i64(5_400), &["h"]).unwrap();
        assert_eq!(counts(&b), vec![("h", 1)]);
        assert_eq!(b.remainder, Number::from_i64(1_800));
        assert_eq!(b.remainder_in_smallest, Some(Number::from_str("0.5").unwrap()));
        assert_eq!(b.last_fractional(), Some(Number::from_str("1.5").unwrap()));
    }

    #[test]
    fn test_calendar_months_walk() {
        // February 2024 has 29 days
        let b = engine().breakdown(&ts("2024-02-01"), &ts("2024-03-05T06:00:00Z"), &["h", "month", "day"]).unwrap();
        assert_eq!(counts(&b), vec![("month", 1), ("day", 4), ("h", 6)]);
        assert_eq!(b.components[0].length, Number::from_i64(29 * 86_400));
        assert_eq!(b.components[1].walked_from, ts("2024-03-01"));
        assert!(b.remainder.is_zero());
    }

    #[test]
    fn test_decomposition_is_exact() {
        let engine = engine();
        let cases = [
            ("1969-07-20T20:17:40Z", "2024-02-29T12:34:56.789Z"),
            ("2024-02-29T12:34:56.789Z", "1969-07-20T20:17:40Z"),
            ("1900-01-01", "2100-12-31T23:59:59Z"),
        ];
        for (from, to) in cases {
            let b = engine.breakdown(&ts(from), &ts(to), &["Y", "month", "week", "day", "h", "m", "s"]).unwrap();
            assert_eq!(b.covered(), b.total, "{} -> {}", from, to);
            assert!(b.components.iter().all(|c| c.count.is_integer()));
        }
    }

    #[test]
    fn test_empty_sequence() {
        let b = engine().breakdown::<&str>(&Number::zero(), &Number::from_i64(10), &[]).unwrap();
        assert!(b.components.is_empty());
        assert_eq!(b.remainder, Number::from_i64(10));
        assert_eq!(b.remainder_in_smallest, None);
    }

    #[test]
    fn test_unknown_unit() {
        let err = engine().breakdown(&Number::zero(), &Number::one(), &["s", "fortnight"]).unwrap_err();
        assert_eq!(err.code(), codes::NOT_FOUND);
    }

    #[test]
    fn test_specs_are_independent() {
        let specs = vec![
            vec!["d".to_string(), "h".to_string()],
            vec!["parsec".to_string()],
            vec!["m".to_string()],
        ];
        let outcomes = engine().breakdown_all(&Number::zero(), &Number::from_i64(86_460), &specs);
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].result.is_ok());
        assert!(outcomes[1].result.is_err());
        let minutes = outcomes[2].result.as_ref().unwrap();
        assert_eq!(minutes.components[0].count, Number::from_i64(1_441));
    }
}
