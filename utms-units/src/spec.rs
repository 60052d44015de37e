//! Unit definitions as plain data
//!
//! A `UnitSpec` is what an external loader (or a JSON document) hands to the
//! registry. Nothing here is validated; `RegistryBuilder::register` does that.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use utms_core::Number;

/// Definition of a single time unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    /// Unique id (e.g. "s", "day", "ifc-month")
    pub id: String,
    /// Display name (e.g. "Second")
    pub name: String,
    /// Fixed length or dynamic strategy
    pub kind: UnitSpecKind,
    /// Tags used for grouped queries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSpecKind {
    /// Constant length in seconds
    Fixed { value: Number },
    /// Length and start computed by a catalog strategy
    Dynamic(DynamicSpec),
}

/// Strategy selection plus everything the strategy reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicSpec {
    /// Catalog tag, e.g. "gregorian-month"
    pub strategy: String,
    /// Role name -> id of the unit filling that role
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub params: BTreeMap<String, Number>,
    /// Offset from UTC in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<Number>,
    /// Position labels (weekday or month names)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    /// Epoch weekday index used as week-start reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
}

impl UnitSpec {
    /// Fixed-length unit
    pub fn fixed(id: &str, name: &str, value: Number) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: UnitSpecKind::Fixed { value },
            groups: Vec::new(),
        }
    }

    /// Dynamic unit using the named strategy
    pub fn dynamic(id: &str, name: &str, strategy: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            kind: UnitSpecKind::Dynamic(DynamicSpec {
                strategy: strategy.to_string(),
                dependencies: BTreeMap::new(),
                params: BTreeMap::new(),
                timezone: None,
                names: None,
                offset: None,
            }),
            groups: Vec::new(),
        }
    }

    /// Builder: bind a strategy role to another unit
    pub fn depends_on(mut self, role: &str, unit: &str) -> Self {
        if let UnitSpecKind::Dynamic(dynamic) = &mut self.kind {
            dynamic.dependencies.insert(role.to_string(), unit.to_string());
        }
        self
    }

    /// Builder: set a strategy parameter
    pub fn with_param(mut self, name: &str, value: Number) -> Self {
        if let UnitSpecKind::Dynamic(dynamic) = &mut self.kind {
            dynamic.params.insert(name.to_string(), value);
        }
        self
    }

    /// Builder: set the timezone offset in seconds
    pub fn with_timezone(mut self, offset: Number) -> Self {
        if let UnitSpecKind::Dynamic(dynamic) = &mut self.kind {
            dynamic.timezone = Some(offset);
        }
        self
    }

    /// Builder: set position labels
    pub fn with_names<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        if let UnitSpecKind::Dynamic(dynamic) = &mut self.kind {
            dynamic.names = Some(names.iter().map(|n| n.as_ref().to_string()).collect());
        }
        self
    }

    /// Builder: set the week-start offset
    pub fn with_offset(mut self, offset: i64) -> Self {
        if let UnitSpecKind::Dynamic(dynamic) = &mut self.kind {
            dynamic.offset = Some(offset);
        }
        self
    }

    /// Builder: add a group tag
    pub fn in_group(mut self, group: &str) -> Self {
        if !self.groups.iter().any(|g| g == group) {
            self.groups.push(group.to_string());
        }
        self
    }

    /// Ids this unit reads through the registry
    pub fn dependency_ids(&self) -> Vec<&str> {
        match &self.kind {
            UnitSpecKind::Fixed { .. } => Vec::new(),
            UnitSpecKind::Dynamic(dynamic) => {
                dynamic.dependencies.values().map(|id| id.as_str()).collect()
            }
        }
    }
}
