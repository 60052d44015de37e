//! Resolution of dynamic anchor values
//!
//! The engine never evaluates anchor expressions itself. A dynamic anchor is
//! handed to an `AnchorResolver` on every read; without one the last
//! recorded value is used.

use std::collections::BTreeMap;
use tracing::warn;
use utms_core::{DomainError, Number};
use crate::Anchor;

/// Evaluates the expression of a dynamic anchor
pub trait AnchorResolver: Send + Sync {
    fn resolve(&self, anchor: &Anchor) -> Result<Number, DomainError>;
}

/// Resolver backed by a fixed expression table
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    values: BTreeMap<String, Number>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, expression: &str, value: Number) -> Self {
        self.values.insert(expression.to_string(), value);
        self
    }
}

impl AnchorResolver for StaticResolver {
    fn resolve(&self, anchor: &Anchor) -> Result<Number, DomainError> {
        let expression = anchor.expression().unwrap_or_default();
        self.values.get(expression).cloned().ok_or_else(|| DomainError::UnresolvedAnchor {
            label: anchor.label().to_string(),
            reason: format!("no value for expression '{}'", expression),
        })
    }
}

/// Current value of an anchor
///
/// Literal and datetime anchors return their stored value. Dynamic anchors
/// go through `resolver`; without one the last resolution is used, and an
/// anchor that was never resolved is `UnresolvedAnchor`.
pub fn resolve_value(anchor: &Anchor, resolver: Option<&dyn AnchorResolver>) -> Result<Number, DomainError> {
    if !anchor.is_dynamic() {
        return anchor.value().cloned().ok_or_else(|| DomainError::UnresolvedAnchor {
            label: anchor.label().to_string(),
            reason: "anchor has no value".to_string(),
        });
    }

    if let Some(resolver) = resolver {
        return resolver.resolve(anchor);
    }

    match anchor.value() {
        Some(last) => {
            warn!(label = %anchor.label(), "no resolver for dynamic anchor, using last value");
            Ok(last.clone())
        }
        None => Err(DomainError::UnresolvedAnchor {
            label: anchor.label().to_string(),
            reason: "dynamic anchor needs a resolver".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnchorSpec;

    #[test]
    fn test_literal_ignores_resolver() {
        let anchor = Anchor::from_spec(AnchorSpec::literal("unix", "Unix", Number::zero())).unwrap();
        let resolver = StaticResolver::new();
        assert_eq!(resolve_value(&anchor, Some(&resolver)).unwrap(), Number::zero());
        assert_eq!(resolve_value(&anchor, None).unwrap(), Number::zero());
    }

    #[test]
    fn test_dynamic_uses_resolver() {
        let anchor = Anchor::from_spec(AnchorSpec::dynamic("now", "Now", "(current-time)")).unwrap();
        let resolver = StaticResolver::new().with("(current-time)", Number::from_i64(1_700_000_000));
        assert_eq!(resolve_value(&anchor, Some(&resolver)).unwrap(), Number::from_i64(1_700_000_000));

        let empty = StaticResolver::new();
        let err = resolve_value(&anchor, Some(&empty)).unwrap_err();
        assert!(matches!(err, DomainError::UnresolvedAnchor { .. }));
    }

    #[test]
    fn test_dynamic_without_resolver() {
        let anchor = Anchor::from_spec(AnchorSpec::dynamic("now", "Now", "(current-time)")).unwrap();
        assert!(resolve_value(&anchor, None).is_err());

        let resolved = anchor.with_value(Number::from_i64(42));
        assert_eq!(resolve_value(&resolved, None).unwrap(), Number::from_i64(42));
    }
}
