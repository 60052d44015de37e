//! Resolved units
//!
//! A `Unit` is a validated `UnitSpec` whose dependencies point at registry
//! handles instead of ids. `UnitRef` pairs a unit with its registry so
//! strategies can reach sibling units.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use serde::Serialize;
use utms_core::{DomainError, Number};
use crate::{UnitRegistry, UnitStrategy};

/// A registered time unit
#[derive(Debug, Clone)]
pub struct Unit {
    pub(crate) id: String,
    pub(crate) name: String,
    pub(crate) groups: Vec<String>,
    pub(crate) kind: UnitKind,
}

#[derive(Debug, Clone)]
pub enum UnitKind {
    Fixed(Number),
    Dynamic(DynamicUnit),
}

#[derive(Clone)]
pub struct DynamicUnit {
    pub(crate) strategy_name: String,
    pub(crate) strategy: Arc<dyn UnitStrategy>,
    /// Role -> registry handle
    pub(crate) dependencies: BTreeMap<String, usize>,
    pub(crate) params: BTreeMap<String, Number>,
    pub(crate) timezone: Option<Number>,
    pub(crate) names: Option<Vec<String>>,
    pub(crate) offset: Option<i64>,
}

impl fmt::Debug for DynamicUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicUnit")
            .field("strategy", &self.strategy_name)
            .field("dependencies", &self.dependencies)
            .field("params", &self.params)
            .field("timezone", &self.timezone)
            .field("names", &self.names)
            .field("offset", &self.offset)
            .finish()
    }
}

impl Unit {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn kind(&self) -> &UnitKind {
        &self.kind
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self.kind, UnitKind::Fixed(_))
    }

    pub fn in_group(&self, group: &str) -> bool {
        self.groups.iter().any(|g| g == group)
    }

    /// Constant length, for fixed units only
    pub fn fixed_value(&self) -> Option<&Number> {
        match &self.kind {
            UnitKind::Fixed(value) => Some(value),
            UnitKind::Dynamic(_) => None,
        }
    }

    fn dynamic(&self) -> Option<&DynamicUnit> {
        match &self.kind {
            UnitKind::Fixed(_) => None,
            UnitKind::Dynamic(dynamic) => Some(dynamic),
        }
    }
}

/// Listing entry for `UnitRegistry::list`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitSummary {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

/// A unit together with the registry it lives in
#[derive(Clone, Copy)]
pub struct UnitRef<'a> {
    pub(crate) registry: &'a UnitRegistry,
    pub(crate) unit: &'a Unit,
}

impl<'a> UnitRef<'a> {
    pub fn unit(&self) -> &'a Unit {
        self.unit
    }

    pub fn id(&self) -> &'a str {
        &self.unit.id
    }

    pub fn name(&self) -> &'a str {
        &self.unit.name
    }

    pub fn is_fixed(&self) -> bool {
        self.unit.is_fixed()
    }

    /// Length in seconds of the instance containing `ts`
    ///
    /// Fixed units ignore `ts`. A dynamic result that is not strictly
    /// positive is reported instead of returned.
    pub fn length(&self, ts: &Number) -> Result<Number, DomainError> {
        let length = match &self.unit.kind {
            UnitKind::Fixed(value) => return Ok(value.clone()),
            UnitKind::Dynamic(dynamic) => dynamic.strategy.length(self, ts)?,
        };
        if !length.is_positive() {
            return Err(DomainError::NonPositiveLength {
                unit: self.unit.id.clone(),
                timestamp: ts.clone(),
                length,
            });
        }
        Ok(length)
    }

    /// Start of the instance containing `ts`
    pub fn start(&self, ts: &Number) -> Result<Number, DomainError> {
        match &self.unit.kind {
            UnitKind::Fixed(_) => crate::strategy::periodic_start(self, ts),
            UnitKind::Dynamic(dynamic) => dynamic.strategy.start(self, ts),
        }
    }

    /// 0-based position within the parent cycle, if the unit has one
    pub fn index(&self, ts: &Number) -> Result<Option<i64>, DomainError> {
        match &self.unit.kind {
            UnitKind::Fixed(_) => Ok(None),
            UnitKind::Dynamic(dynamic) => dynamic.strategy.index(self, ts),
        }
    }

    /// Label of the position containing `ts`
    pub fn name_at(&self, ts: &Number) -> Result<Option<&'a str>, DomainError> {
        let names = match self.names() {
            Some(names) => names,
            None => return Ok(None),
        };
        Ok(self.index(ts)?
            .and_then(|i| usize::try_from(i).ok())
            .and_then(|i| names.get(i))
            .map(|n| n.as_str()))
    }

    /// Offset from UTC in seconds, zero when unset
    pub fn timezone_offset(&self) -> Number {
        self.unit.dynamic()
            .and_then(|d| d.timezone.clone())
            .unwrap_or_else(Number::zero)
    }

    pub fn names(&self) -> Option<&'a [String]> {
        self.unit.dynamic().and_then(|d| d.names.as_deref())
    }

    pub fn offset(&self) -> Option<i64> {
        self.unit.dynamic().and_then(|d| d.offset)
    }

    pub fn strategy_name(&self) -> Option<&'a str> {
        self.unit.dynamic().map(|d| d.strategy_name.as_str())
    }

    /// Unit bound to `role`
    pub fn dep(&self, role: &str) -> Result<UnitRef<'a>, DomainError> {
        let handle = self.unit.dynamic()
            .and_then(|d| d.dependencies.get(role))
            .copied();
        match handle.and_then(|h| self.registry.by_handle(h)) {
            Some(unit) => Ok(unit),
            None => Err(DomainError::OutOfRange {
                unit: self.unit.id.clone(),
                timestamp: Number::zero(),
                reason: format!("no unit bound to role '{}'", role),
            }),
        }
    }

    /// Required strategy parameter
    pub fn param(&self, name: &str, ts: &Number) -> Result<Number, DomainError> {
        self.unit.dynamic()
            .and_then(|d| d.params.get(name))
            .cloned()
            .ok_or_else(|| DomainError::OutOfRange {
                unit: self.unit.id.clone(),
                timestamp: ts.clone(),
                reason: format!("missing parameter '{}'", name),
            })
    }

    /// Optional strategy parameter
    pub fn param_or(&self, name: &str, default: Number) -> Number {
        self.unit.dynamic()
            .and_then(|d| d.params.get(name))
            .cloned()
            .unwrap_or(default)
    }

    pub fn division_by_zero(&self, ts: &Number, operation: &str) -> DomainError {
        DomainError::DivisionByZero {
            unit: self.unit.id.clone(),
            timestamp: Some(ts.clone()),
            operation: operation.to_string(),
        }
    }

    pub fn summary(&self) -> UnitSummary {
        let (kind, value, strategy, dependencies) = match &self.unit.kind {
            UnitKind::Fixed(value) => ("fixed", Some(value.clone()), None, Vec::new()),
            UnitKind::Dynamic(dynamic) => {
                let deps = dynamic.dependencies.values()
                    .filter_map(|h| self.registry.by_handle(*h))
                    .map(|u| u.id().to_string())
                    .collect();
                ("dynamic", None, Some(dynamic.strategy_name.clone()), deps)
            }
        };
        UnitSummary {
            id: self.unit.id.clone(),
            name: self.unit.name.clone(),
            kind,
            value,
            strategy,
            dependencies,
            groups: self.unit.groups.clone(),
        }
    }
}

impl fmt::Debug for UnitRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UnitRef").field(&self.unit.id).finish()
    }
}

impl fmt::Display for UnitRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.unit.name, self.unit.id)
    }
}
