//! Strategy catalog
//!
//! A dynamic unit names a strategy by tag. Each strategy publishes the roles
//! (sibling units) and params it reads, so the registry can reject malformed
//! definitions before anything is evaluated.

use std::collections::HashMap;
use std::sync::Arc;
use serde::Serialize;
use utms_core::{DefinitionError, DomainError, Number};
use crate::{DynamicSpec, UnitRef};

/// Metadata about a strategy role or parameter
#[derive(Debug, Clone, Serialize)]
pub struct ArgMeta {
    pub name: &'static str,
    pub typ: &'static str,
    pub description: &'static str,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

impl ArgMeta {
    pub const fn required(name: &'static str, typ: &'static str, description: &'static str) -> Self {
        Self { name, typ, description, optional: false, default: None }
    }

    pub const fn optional(name: &'static str, typ: &'static str, description: &'static str, default: &'static str) -> Self {
        Self { name, typ, description, optional: true, default: Some(default) }
    }
}

/// Metadata for a unit strategy
#[derive(Debug, Clone, Serialize)]
pub struct StrategyMeta {
    pub name: &'static str,
    pub description: &'static str,
    /// Sibling units, looked up by role name
    pub roles: &'static [ArgMeta],
    pub params: &'static [ArgMeta],
    pub category: &'static str,
}

/// Position-dependent behaviour of a dynamic unit
///
/// Implementations read sibling units only through `unit.dep(role)`, which
/// the registry has already resolved and checked for cycles.
pub trait UnitStrategy: Send + Sync {
    fn meta(&self) -> StrategyMeta;

    /// Reject parameter values the strategy cannot evaluate, at registration
    fn validate(&self, _unit: &str, _spec: &DynamicSpec) -> Result<(), DefinitionError> {
        Ok(())
    }

    /// Length in seconds of the instance containing `ts`
    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError>;

    /// Start of the instance containing `ts`
    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        periodic_start(unit, ts)
    }

    /// 0-based position within the parent cycle
    fn index(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Option<i64>, DomainError> {
        names_index(unit, ts)
    }
}

/// `ts - ((ts + tz) mod length)`, floored so pre-epoch instants work
pub fn periodic_start(unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
    let length = unit.length(ts)?;
    let shifted = ts.add(&unit.timezone_offset());
    let into = shifted.rem_floor(&length)
        .map_err(|_| unit.division_by_zero(ts, "start"))?;
    Ok(ts.sub(&into))
}

/// `floor((ts - start) / length * len(names))` for units carrying names
pub fn names_index(unit: &UnitRef<'_>, ts: &Number) -> Result<Option<i64>, DomainError> {
    let count = match unit.names() {
        Some(names) if !names.is_empty() => names.len() as i64,
        _ => return Ok(None),
    };
    let start = unit.start(ts)?;
    let length = unit.length(ts)?;
    let fraction = ts.sub(&start).checked_div(&length)
        .map_err(|_| unit.division_by_zero(ts, "index"))?;
    let position = fraction.mul(&Number::from_i64(count)).floor();
    Ok(position.to_i64().map(|i| i.clamp(0, count - 1)))
}

// ============ periodic ============

/// Constant period with a timezone-aware start (local hours, shifts, ...)
pub struct Periodic;

static PERIODIC_PARAMS: [ArgMeta; 1] = [
    ArgMeta::required("length", "Number", "Period in seconds"),
];

impl UnitStrategy for Periodic {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "periodic",
            description: "Constant period aligned to the epoch in the unit's timezone",
            roles: &[],
            params: &PERIODIC_PARAMS,
            category: "generic",
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        unit.param("length", ts)
    }
}

// ============ scaled ============

/// A whole multiple of another unit, evaluated at the same instant
pub struct Scaled;

static SCALED_ROLES: [ArgMeta; 1] = [
    ArgMeta::required("base", "unit", "Unit being multiplied"),
];

static SCALED_PARAMS: [ArgMeta; 1] = [
    ArgMeta::required("factor", "Number", "Multiplier applied to the base length"),
];

impl UnitStrategy for Scaled {
    fn meta(&self) -> StrategyMeta {
        StrategyMeta {
            name: "scaled",
            description: "Multiple of a base unit's length at the same timestamp",
            roles: &SCALED_ROLES,
            params: &SCALED_PARAMS,
            category: "generic",
        }
    }

    /// The factor must be a positive whole number so starts stay on the base grid
    fn validate(&self, unit: &str, spec: &DynamicSpec) -> Result<(), DefinitionError> {
        match spec.params.get("factor") {
            Some(factor) if factor.is_positive() && factor.is_integer() => Ok(()),
            Some(factor) => Err(DefinitionError::MalformedStrategy {
                unit: unit.to_string(),
                strategy: "scaled".to_string(),
                reason: format!("factor {} is not a positive whole number", factor),
            }),
            None => Ok(()),
        }
    }

    fn length(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let base = unit.dep("base")?.length(ts)?;
        Ok(base.mul(&unit.param("factor", ts)?))
    }

    /// Steps back whole base instances, so the start always lands on the
    /// base unit's grid
    fn start(&self, unit: &UnitRef<'_>, ts: &Number) -> Result<Number, DomainError> {
        let base = unit.dep("base")?;
        let base_start = base.start(ts)?;
        let base_length = base.length(ts)?;
        let shifted = base_start.add(&unit.timezone_offset());
        let elapsed = shifted.div_floor(&base_length)
            .map_err(|_| unit.division_by_zero(ts, "start"))?;
        let into = elapsed.rem_floor(&unit.param("factor", ts)?)
            .map_err(|_| unit.division_by_zero(ts, "start"))?;
        Ok(base_start.sub(&into.mul(&base_length)))
    }
}

/// Closed set of strategies a registry can resolve tags against
#[derive(Clone, Default)]
pub struct StrategyCatalog {
    strategies: HashMap<String, Arc<dyn UnitStrategy>>,
}

impl StrategyCatalog {
    pub fn new() -> Self {
        Self { strategies: HashMap::new() }
    }

    pub fn with_strategy<S: UnitStrategy + 'static>(mut self, s: S) -> Self {
        let name = s.meta().name.to_lowercase();
        self.strategies.insert(name, Arc::new(s));
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn UnitStrategy>> {
        self.strategies.get(&name.to_lowercase()).cloned()
    }

    /// Metadata of every strategy, sorted by name
    pub fn list(&self) -> Vec<StrategyMeta> {
        let mut metas: Vec<StrategyMeta> = self.strategies.values().map(|s| s.meta()).collect();
        metas.sort_by(|a, b| a.name.cmp(b.name));
        metas
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }
}

impl std::fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.strategies.keys().collect();
        names.sort();
        f.debug_struct("StrategyCatalog").field("strategies", &names).finish()
    }
}

/// Load the generic strategies into a catalog
pub fn load_generic_strategies(catalog: StrategyCatalog) -> StrategyCatalog {
    catalog
        .with_strategy(Periodic)
        .with_strategy(Scaled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{UnitRegistry, UnitSpec};

    fn catalog() -> StrategyCatalog {
        load_generic_strategies(StrategyCatalog::new())
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.get("PERIODIC").is_some());
        assert!(catalog.get("lunar").is_none());
        let names: Vec<&str> = catalog.list().iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["periodic", "scaled"]);
    }

    #[test]
    fn test_periodic_timezone_start() {
        let specs = vec![
            UnitSpec::dynamic("local-hour", "Local Hour", "periodic")
                .with_param("length", Number::from_i64(3600))
                .with_timezone(Number::from_i64(1800)),
        ];
        let registry = UnitRegistry::from_specs(specs, &catalog()).unwrap();
        let hour = registry.resolve("local-hour").unwrap();
        // 00:40 UTC is 01:10 at +00:30, so the local hour began at 00:30 UTC
        let start = hour.start(&Number::from_i64(2400)).unwrap();
        assert_eq!(start, Number::from_i64(1800));
        // Pre-epoch
        let start = hour.start(&Number::from_i64(-100)).unwrap();
        assert_eq!(start, Number::from_i64(-1800));
    }

    #[test]
    fn test_scaled_follows_base() {
        let specs = vec![
            UnitSpec::fixed("d", "Day", Number::from_i64(86_400)),
            UnitSpec::dynamic("fortnight", "Fortnight", "scaled")
                .depends_on("base", "d")
                .with_param("factor", Number::from_i64(14)),
        ];
        let registry = UnitRegistry::from_specs(specs, &catalog()).unwrap();
        let fortnight = registry.resolve("fortnight").unwrap();
        assert_eq!(fortnight.length(&Number::zero()).unwrap(), Number::from_i64(1_209_600));
        assert_eq!(fortnight.start(&Number::from_i64(1_209_700)).unwrap(), Number::from_i64(1_209_600));
    }

    #[test]
    fn test_scaled_rejects_fractional_factor() {
        let day = UnitSpec::fixed("d", "Day", Number::from_i64(86_400));
        for factor in ["1.5", "0", "-2"] {
            let specs = vec![
                day.clone(),
                UnitSpec::dynamic("sesqui", "Sesqui", "scaled")
                    .depends_on("base", "d")
                    .with_param("factor", Number::from_str(factor).unwrap()),
            ];
            let err = UnitRegistry::from_specs(specs, &catalog()).unwrap_err();
            assert!(matches!(err, DefinitionError::MalformedStrategy { ref unit, .. } if unit == "sesqui"), "{}", factor);
        }
    }

    #[test]
    fn test_scaled_start_is_stable() {
        let specs = vec![
            UnitSpec::fixed("d", "Day", Number::from_i64(86_400)),
            UnitSpec::dynamic("bi", "Two Days", "scaled")
                .depends_on("base", "d")
                .with_param("factor", Number::from_i64(2)),
        ];
        let registry = UnitRegistry::from_specs(specs, &catalog()).unwrap();
        let bi = registry.resolve("bi").unwrap();
        for ts in [172_810, 129_600, -1, 0] {
            let ts = Number::from_i64(ts);
            let start = bi.start(&ts).unwrap();
            assert!(start <= ts);
            assert_eq!(bi.start(&start).unwrap(), start);
        }
        assert_eq!(bi.start(&Number::from_i64(172_810)).unwrap(), Number::from_i64(172_800));
    }

    #[test]
    fn test_names_index() {
        let specs = vec![
            UnitSpec::dynamic("shift", "Shift", "periodic")
                .with_param("length", Number::from_i64(86_400))
                .with_names(&["night", "morning", "afternoon"]),
        ];
        let registry = UnitRegistry::from_specs(specs, &catalog()).unwrap();
        let shift = registry.resolve("shift").unwrap();
        assert_eq!(shift.index(&Number::from_i64(30_000)).unwrap(), Some(1));
        assert_eq!(shift.name_at(&Number::from_i64(80_000)).unwrap(), Some("afternoon"));
        assert_eq!(shift.index(&Number::from_i64(-1)).unwrap(), Some(2));
    }
}
