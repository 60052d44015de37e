//! Unit registry
//!
//! Units are registered once, validated against the strategy catalog and
//! checked for dependency cycles, then frozen into an immutable
//! `UnitRegistry` that can be shared across threads.

use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::{debug, info};
use utms_core::{DefinitionError, DomainError, LookupError, Number};
use crate::{
    DynamicSpec, StrategyCatalog, StrategyMeta, Unit, UnitKind, UnitRef, UnitSpec, UnitSpecKind,
    UnitSummary,
};
use crate::unit::DynamicUnit;

/// Collects unit specs and validates each one as it arrives
#[derive(Debug)]
pub struct RegistryBuilder {
    catalog: StrategyCatalog,
    specs: Vec<UnitSpec>,
    ids: HashMap<String, usize>,
}

impl RegistryBuilder {
    pub fn new(catalog: StrategyCatalog) -> Self {
        Self {
            catalog,
            specs: Vec::new(),
            ids: HashMap::new(),
        }
    }

    /// Validate and add one unit
    ///
    /// Dependencies on ids that are not registered yet are allowed here and
    /// checked in `build`. Cycles among registered units are rejected as soon
    /// as the unit closing them arrives.
    pub fn register(&mut self, spec: UnitSpec) -> Result<(), DefinitionError> {
        if self.ids.contains_key(&spec.id) {
            return Err(DefinitionError::DuplicateUnit { unit: spec.id });
        }

        match &spec.kind {
            UnitSpecKind::Fixed { value } => {
                if !value.is_positive() {
                    return Err(DefinitionError::InvalidValue {
                        unit: spec.id.clone(),
                        value: value.to_string(),
                        reason: "fixed length must be positive".to_string(),
                    });
                }
            }
            UnitSpecKind::Dynamic(dynamic) => {
                let strategy = self.catalog.get(&dynamic.strategy).ok_or_else(|| {
                    DefinitionError::UnknownStrategy {
                        unit: spec.id.clone(),
                        strategy: dynamic.strategy.clone(),
                    }
                })?;
                validate_arity(&spec.id, dynamic, &strategy.meta())?;
                strategy.validate(&spec.id, dynamic)?;
            }
        }

        let mut graph = self.dependency_graph();
        graph.insert(spec.id.clone(), spec.dependency_ids().into_iter().map(String::from).collect());
        if let Err(mut cycle) = topological_sort(&graph) {
            cycle.sort();
            return Err(DefinitionError::CyclicDependency { unit: spec.id, units: cycle });
        }

        debug!(unit = %spec.id, fixed = matches!(spec.kind, UnitSpecKind::Fixed { .. }), "registered unit");
        self.ids.insert(spec.id.clone(), self.specs.len());
        self.specs.push(spec);
        Ok(())
    }

    /// Builder-style `register`
    pub fn with_unit(mut self, spec: UnitSpec) -> Result<Self, DefinitionError> {
        self.register(spec)?;
        Ok(self)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains_key(id)
    }

    fn dependency_graph(&self) -> HashMap<String, Vec<String>> {
        self.specs.iter()
            .map(|s| (s.id.clone(), s.dependency_ids().into_iter().map(String::from).collect()))
            .collect()
    }

    /// Resolve dependencies to handles and freeze the registry
    pub fn build(self) -> Result<UnitRegistry, DefinitionError> {
        for spec in &self.specs {
            for dep in spec.dependency_ids() {
                if !self.ids.contains_key(dep) {
                    return Err(DefinitionError::UnknownDependency {
                        unit: spec.id.clone(),
                        dependency: dep.to_string(),
                    });
                }
            }
        }

        let order = match topological_sort(&self.dependency_graph()) {
            Ok(order) => order.iter().filter_map(|id| self.ids.get(id).copied()).collect(),
            Err(mut cycle) => {
                cycle.sort();
                let unit = cycle.first().cloned().unwrap_or_default();
                return Err(DefinitionError::CyclicDependency { unit, units: cycle });
            }
        };

        let mut units = Vec::with_capacity(self.specs.len());
        for spec in self.specs {
            let kind = match spec.kind {
                UnitSpecKind::Fixed { value } => UnitKind::Fixed(value),
                UnitSpecKind::Dynamic(dynamic) => {
                    let strategy = self.catalog.get(&dynamic.strategy).ok_or_else(|| {
                        DefinitionError::UnknownStrategy {
                            unit: spec.id.clone(),
                            strategy: dynamic.strategy.clone(),
                        }
                    })?;
                    let dependencies = dynamic.dependencies.iter()
                        .filter_map(|(role, id)| self.ids.get(id).map(|h| (role.clone(), *h)))
                        .collect();
                    UnitKind::Dynamic(DynamicUnit {
                        strategy_name: dynamic.strategy,
                        strategy,
                        dependencies,
                        params: dynamic.params,
                        timezone: dynamic.timezone,
                        names: dynamic.names,
                        offset: dynamic.offset,
                    })
                }
            };
            units.push(Unit {
                id: spec.id,
                name: spec.name,
                groups: spec.groups,
                kind,
            });
        }

        info!(units = units.len(), "unit registry built");
        Ok(UnitRegistry { units, index: self.ids, order })
    }
}

/// Roles and params must match what the strategy declares
fn validate_arity(unit: &str, dynamic: &DynamicSpec, meta: &StrategyMeta) -> Result<(), DefinitionError> {
    let malformed = |reason: String| DefinitionError::MalformedStrategy {
        unit: unit.to_string(),
        strategy: meta.name.to_string(),
        reason,
    };

    for role in meta.roles.iter().filter(|r| !r.optional) {
        if !dynamic.dependencies.contains_key(role.name) {
            return Err(malformed(format!("requires role '{}'", role.name)));
        }
    }
    for role in dynamic.dependencies.keys() {
        if !meta.roles.iter().any(|r| r.name == role.as_str()) {
            return Err(malformed(format!("has no role '{}'", role)));
        }
    }
    for param in meta.params.iter().filter(|p| !p.optional) {
        if !dynamic.params.contains_key(param.name) {
            return Err(malformed(format!("requires parameter '{}'", param.name)));
        }
    }
    for param in dynamic.params.keys() {
        if !meta.params.iter().any(|p| p.name == param.as_str()) {
            return Err(malformed(format!("has no parameter '{}'", param)));
        }
    }
    Ok(())
}

/// Kahn's algorithm. Returns dependencies-first order, or the nodes that
/// could not be ordered (members of, or downstream of, a cycle).
///
/// Edges to ids outside the graph are ignored.
fn topological_sort(dependencies: &HashMap<String, Vec<String>>) -> Result<Vec<String>, Vec<String>> {
    let mut in_degree: HashMap<&str, usize> = HashMap::new();
    let mut reverse_deps: HashMap<&str, Vec<&str>> = HashMap::new();

    for name in dependencies.keys() {
        in_degree.entry(name.as_str()).or_insert(0);
    }

    for (name, deps) in dependencies {
        for dep in deps.iter().filter(|d| dependencies.contains_key(*d)) {
            *in_degree.entry(name.as_str()).or_insert(0) += 1;
            reverse_deps.entry(dep.as_str()).or_default().push(name.as_str());
        }
    }

    // Sorted seed keeps the order deterministic
    let mut seeds: Vec<&str> = in_degree.iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(name, _)| *name)
        .collect();
    seeds.sort();
    let mut queue: VecDeque<&str> = seeds.into_iter().collect();

    let mut result = Vec::new();
    while let Some(node) = queue.pop_front() {
        result.push(node.to_string());

        if let Some(dependents) = reverse_deps.get(node) {
            for dependent in dependents {
                if let Some(deg) = in_degree.get_mut(dependent) {
                    *deg -= 1;
                    if *deg == 0 {
                        queue.push_back(*dependent);
                    }
                }
            }
        }
    }

    if result.len() < dependencies.len() {
        let cycle: Vec<String> = in_degree.iter()
            .filter(|(_, &deg)| deg > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        Err(cycle)
    } else {
        Ok(result)
    }
}

/// Immutable set of units, shareable across threads
#[derive(Debug)]
pub struct UnitRegistry {
    units: Vec<Unit>,
    index: HashMap<String, usize>,
    /// Handles in dependency order
    order: Vec<usize>,
}

impl UnitRegistry {
    /// Register every spec and build; the first definition error rejects the batch
    pub fn from_specs(specs: Vec<UnitSpec>, catalog: &StrategyCatalog) -> Result<Self, DefinitionError> {
        let mut builder = RegistryBuilder::new(catalog.clone());
        for spec in specs {
            builder.register(spec)?;
        }
        builder.build()
    }

    pub fn resolve(&self, id: &str) -> Result<UnitRef<'_>, LookupError> {
        self.get(id).ok_or_else(|| LookupError::unit(id))
    }

    pub fn get(&self, id: &str) -> Option<UnitRef<'_>> {
        self.index.get(id).and_then(|h| self.by_handle(*h))
    }

    pub(crate) fn by_handle(&self, handle: usize) -> Option<UnitRef<'_>> {
        self.units.get(handle).map(|unit| UnitRef { registry: self, unit })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units in registration order
    pub fn iter(&self) -> impl Iterator<Item = UnitRef<'_>> {
        self.units.iter().map(move |unit| UnitRef { registry: self, unit })
    }

    /// Unit ids with every dependency before its dependents
    pub fn dependency_order(&self) -> Vec<&str> {
        self.order.iter()
            .filter_map(|h| self.units.get(*h))
            .map(|u| u.id())
            .collect()
    }

    pub fn list(&self) -> Vec<UnitSummary> {
        self.iter().map(|u| u.summary()).collect()
    }

    pub fn units_by_group(&self, group: &str) -> Vec<UnitRef<'_>> {
        self.iter().filter(|u| u.unit().in_group(group)).collect()
    }

    /// Units in any (or, with `match_all`, every) of the groups
    pub fn units_by_groups(&self, groups: &[&str], match_all: bool) -> Vec<UnitRef<'_>> {
        self.iter()
            .filter(|u| {
                if match_all {
                    groups.iter().all(|g| u.unit().in_group(g))
                } else {
                    groups.iter().any(|g| u.unit().in_group(g))
                }
            })
            .collect()
    }

    /// Units ordered by length, smallest first
    ///
    /// Without a reference timestamp only fixed units take part. With one,
    /// dynamic units join using their length at that instant.
    pub fn sorted_by_magnitude(&self, ref_ts: Option<&Number>) -> Result<Vec<(UnitRef<'_>, Number)>, DomainError> {
        let mut sized = Vec::with_capacity(self.units.len());
        for unit in self.iter() {
            match (unit.unit().fixed_value(), ref_ts) {
                (Some(value), _) => sized.push((unit, value.clone())),
                (None, Some(ts)) => sized.push((unit, unit.length(ts)?)),
                (None, None) => {}
            }
        }
        sized.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(sized)
    }

    /// Role bindings of a dynamic unit, by id
    pub fn dependencies_of(&self, id: &str) -> Result<BTreeMap<String, String>, LookupError> {
        let unit = self.resolve(id)?;
        let deps = match unit.unit().kind() {
            UnitKind::Fixed(_) => BTreeMap::new(),
            UnitKind::Dynamic(dynamic) => dynamic.dependencies.iter()
                .filter_map(|(role, h)| self.units.get(*h).map(|u| (role.clone(), u.id.clone())))
                .collect(),
        };
        Ok(deps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load_generic_strategies;

    fn catalog() -> StrategyCatalog {
        load_generic_strategies(StrategyCatalog::new())
    }

    fn fixed(id: &str, secs: i64) -> UnitSpec {
        UnitSpec::fixed(id, id, Number::from_i64(secs))
    }

    fn scaled(id: &str, base: &str, factor: i64) -> UnitSpec {
        UnitSpec::dynamic(id, id, "scaled")
            .depends_on("base", base)
            .with_param("factor", Number::from_i64(factor))
    }

    #[test]
    fn test_duplicate_unit() {
        let result = UnitRegistry::from_specs(vec![fixed("s", 1), fixed("s", 2)], &catalog());
        assert_eq!(result.unwrap_err(), DefinitionError::DuplicateUnit { unit: "s".to_string() });
    }

    #[test]
    fn test_non_positive_fixed_value() {
        let err = UnitRegistry::from_specs(vec![fixed("zero", 0)], &catalog()).unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidValue { .. }));
        assert_eq!(err.subject(), "zero");
    }

    #[test]
    fn test_mutual_dependency_is_cycle() {
        let specs = vec![scaled("a", "b", 2), scaled("b", "a", 2)];
        let err = UnitRegistry::from_specs(specs, &catalog()).unwrap_err();
        match err {
            DefinitionError::CyclicDependency { unit, units } => {
                assert_eq!(unit, "b");
                assert_eq!(units, vec!["a".to_string(), "b".to_string()]);
            }
            other => panic!("expected cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_self_dependency_is_cycle() {
        let err = UnitRegistry::from_specs(vec![scaled("a", "a", 2)], &catalog()).unwrap_err();
        assert!(matches!(err, DefinitionError::CyclicDependency { .. }));
    }

    #[test]
    fn test_unknown_strategy() {
        let spec = UnitSpec::dynamic("x", "X", "lunar-phase");
        let err = UnitRegistry::from_specs(vec![spec], &catalog()).unwrap_err();
        assert_eq!(err, DefinitionError::UnknownStrategy {
            unit: "x".to_string(),
            strategy: "lunar-phase".to_string(),
        });
    }

    #[test]
    fn test_malformed_strategy() {
        // Missing role
        let spec = UnitSpec::dynamic("x", "X", "scaled").with_param("factor", Number::one());
        let err = UnitRegistry::from_specs(vec![spec], &catalog()).unwrap_err();
        assert!(matches!(err, DefinitionError::MalformedStrategy { .. }));

        // Unknown param
        let spec = UnitSpec::dynamic("y", "Y", "periodic")
            .with_param("length", Number::one())
            .with_param("phase", Number::one());
        let err = UnitRegistry::from_specs(vec![spec], &catalog()).unwrap_err();
        assert!(err.to_string().contains("no parameter 'phase'"));
    }

    #[test]
    fn test_unknown_dependency() {
        let err = UnitRegistry::from_specs(vec![scaled("a", "missing", 2)], &catalog()).unwrap_err();
        assert_eq!(err, DefinitionError::UnknownDependency {
            unit: "a".to_string(),
            dependency: "missing".to_string(),
        });
    }

    #[test]
    fn test_forward_reference_allowed() {
        let specs = vec![scaled("w", "d", 7), fixed("d", 86_400)];
        let registry = UnitRegistry::from_specs(specs, &catalog()).unwrap();
        assert_eq!(registry.dependency_order(), vec!["d", "w"]);
        let w = registry.resolve("w").unwrap();
        assert_eq!(w.length(&Number::zero()).unwrap(), Number::from_i64(604_800));
    }

    #[test]
    fn test_resolve_not_found() {
        let registry = UnitRegistry::from_specs(vec![fixed("s", 1)], &catalog()).unwrap();
        assert_eq!(registry.resolve("fortnight").unwrap_err(), LookupError::unit("fortnight"));
    }

    #[test]
    fn test_non_positive_dynamic_length() {
        let spec = UnitSpec::dynamic("neg", "Negative", "periodic")
            .with_param("length", Number::from_i64(-5));
        let registry = UnitRegistry::from_specs(vec![spec], &catalog()).unwrap();
        let err = registry.resolve("neg").unwrap().length(&Number::zero()).unwrap_err();
        assert!(matches!(err, DomainError::NonPositiveLength { .. }));
    }

    #[test]
    fn test_groups_and_magnitude() {
        let specs = vec![
            fixed("h", 3600).in_group("human"),
            fixed("s", 1).in_group("human").in_group("si"),
            fixed("ms", 1).in_group("si"),
            scaled("d2", "h", 48).in_group("human"),
        ];
        let registry = UnitRegistry::from_specs(specs, &catalog()).unwrap();

        let human: Vec<&str> = registry.units_by_group("human").iter().map(|u| u.id()).collect();
        assert_eq!(human, vec!["h", "s", "d2"]);
        let both: Vec<&str> = registry.units_by_groups(&["human", "si"], true).iter().map(|u| u.id()).collect();
        assert_eq!(both, vec!["s"]);

        let fixed_only = registry.sorted_by_magnitude(None).unwrap();
        assert_eq!(fixed_only.len(), 3);
        assert_eq!(fixed_only.last().unwrap().0.id(), "h");

        let all = registry.sorted_by_magnitude(Some(&Number::zero())).unwrap();
        assert_eq!(all.last().unwrap().0.id(), "d2");
    }

    #[test]
    fn test_list_summaries() {
        let registry = UnitRegistry::from_specs(vec![fixed("s", 1), scaled("k", "s", 1000)], &catalog()).unwrap();
        let list = registry.list();
        assert_eq!(list[0].kind, "fixed");
        assert_eq!(list[1].strategy.as_deref(), Some("scaled"));
        assert_eq!(list[1].dependencies, vec!["s".to_string()]);
        assert_eq!(registry.dependencies_of("k").unwrap().get("base").map(String::as_str), Some("s"));
    }

    #[test]
    fn test_registry_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<UnitRegistry>();
    }
}
