//! Anchor store
//!
//! Readers take `Arc<Anchor>` snapshots under a shared lock; writers build
//! a new anchor and swap it in, so a snapshot never changes under a reader.

use std::collections::BTreeMap;
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::debug;
use utms_core::{DefinitionError, LookupError, Number};
use crate::{Anchor, AnchorSpec};

#[derive(Debug, Default)]
pub struct AnchorStore {
    anchors: RwLock<BTreeMap<String, Arc<Anchor>>>,
}

impl AnchorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a batch; the first invalid or duplicate spec
    /// rejects the whole batch
    pub fn from_specs(specs: Vec<AnchorSpec>) -> Result<Self, DefinitionError> {
        let store = Self::new();
        for spec in specs {
            store.create(spec)?;
        }
        Ok(store)
    }

    pub fn create(&self, spec: AnchorSpec) -> Result<Arc<Anchor>, DefinitionError> {
        let anchor = Arc::new(Anchor::from_spec(spec)?);
        let mut anchors = self.anchors.write();
        if anchors.contains_key(anchor.label()) {
            return Err(DefinitionError::DuplicateAnchor {
                label: anchor.label().to_string(),
            });
        }
        debug!(label = %anchor.label(), dynamic = anchor.is_dynamic(), "created anchor");
        anchors.insert(anchor.label().to_string(), Arc::clone(&anchor));
        Ok(anchor)
    }

    /// Replace an existing anchor with a new definition of the same label
    pub fn update(&self, spec: AnchorSpec) -> Result<Arc<Anchor>, UpdateError> {
        let anchor = Arc::new(Anchor::from_spec(spec)?);
        let mut anchors = self.anchors.write();
        let slot = anchors
            .get_mut(anchor.label())
            .ok_or_else(|| LookupError::anchor(anchor.label()))?;
        *slot = Arc::clone(&anchor);
        debug!(label = %anchor.label(), "updated anchor");
        Ok(anchor)
    }

    /// Set the value of an anchor, keeping everything else
    ///
    /// For a dynamic anchor this records a resolution.
    pub fn set_value(&self, label: &str, value: Number) -> Result<Arc<Anchor>, LookupError> {
        let mut anchors = self.anchors.write();
        let slot = anchors.get_mut(label).ok_or_else(|| LookupError::anchor(label))?;
        let next = Arc::new(slot.with_value(value));
        *slot = Arc::clone(&next);
        Ok(next)
    }

    pub fn delete(&self, label: &str) -> Result<Arc<Anchor>, LookupError> {
        let removed = self.anchors.write().remove(label);
        removed.ok_or_else(|| LookupError::anchor(label))
    }

    pub fn get(&self, label: &str) -> Result<Arc<Anchor>, LookupError> {
        self.anchors.read().get(label).cloned().ok_or_else(|| LookupError::anchor(label))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.anchors.read().contains_key(label)
    }

    /// Labels in sorted order
    pub fn labels(&self) -> Vec<String> {
        self.anchors.read().keys().cloned().collect()
    }

    /// Every anchor, ordered by label
    pub fn snapshot(&self) -> Vec<Arc<Anchor>> {
        self.anchors.read().values().cloned().collect()
    }

    pub fn by_group(&self, group: &str) -> Vec<Arc<Anchor>> {
        self.anchors
            .read()
            .values()
            .filter(|a| a.in_group(group))
            .cloned()
            .collect()
    }

    /// Anchors named by a comma-separated list of labels and group names
    ///
    /// Each item contributes the anchor with that label plus every anchor in
    /// a group of that name. The result has no duplicates and is ordered by
    /// value; anchors without a value sort last.
    pub fn select(&self, query: &str) -> Vec<Arc<Anchor>> {
        let anchors = self.anchors.read();
        let mut picked: BTreeMap<&str, Arc<Anchor>> = BTreeMap::new();
        for item in query.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if let Some(anchor) = anchors.get(item) {
                picked.insert(anchor.label(), Arc::clone(anchor));
            }
            for anchor in anchors.values().filter(|a| a.in_group(item)) {
                picked.insert(anchor.label(), Arc::clone(anchor));
            }
        }

        let mut selected: Vec<Arc<Anchor>> = picked.into_values().collect();
        selected.sort_by(|a, b| match (a.value(), b.value()) {
            (Some(x), Some(y)) => x.cmp(y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        selected
    }

    pub fn len(&self) -> usize {
        self.anchors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.read().is_empty()
    }
}

/// `update` fails on an invalid definition or a missing label
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpdateError {
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    #[error(transparent)]
    Lookup(#[from] LookupError),
}

impl From<UpdateError> for utms_core::UtmsError {
    fn from(e: UpdateError) -> Self {
        match e {
            UpdateError::Definition(e) => e.into(),
            UpdateError::Lookup(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use crate::AnchorSource;

    fn store() -> AnchorStore {
        AnchorStore::from_specs(vec![
            AnchorSpec::literal("unix", "Unix Epoch", Number::zero()).in_group("default"),
            AnchorSpec::datetime("y2k", "Y2K", "2000-01-01").in_group("default").in_group("modern"),
            AnchorSpec::literal("bb", "Big Bang", Number::from_str("-4.35e17").unwrap()).in_group("cosmic"),
            AnchorSpec::dynamic("now", "Now", "(current-time)"),
        ])
        .unwrap()
    }

    fn labels(anchors: &[Arc<Anchor>]) -> Vec<&str> {
        anchors.iter().map(|a| a.label()).collect()
    }

    #[test]
    fn test_create_and_get() {
        let store = store();
        assert_eq!(store.len(), 4);
        assert_eq!(store.get("y2k").unwrap().value(), Some(&Number::from_i64(946_684_800)));
        assert_eq!(store.labels(), vec!["bb", "now", "unix", "y2k"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let store = store();
        let err = store.create(AnchorSpec::literal("unix", "Again", Number::one())).unwrap_err();
        assert_eq!(err, DefinitionError::DuplicateAnchor { label: "unix".to_string() });
        assert_eq!(store.get("unix").unwrap().name(), "Unix Epoch");
    }

    #[test]
    fn test_batch_rejected() {
        let result = AnchorStore::from_specs(vec![
            AnchorSpec::literal("a", "A", Number::zero()),
            AnchorSpec::literal("a", "A", Number::one()),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_update_and_delete() {
        let store = store();
        store.update(AnchorSpec::literal("unix", "Epoch", Number::zero())).unwrap();
        assert_eq!(store.get("unix").unwrap().name(), "Epoch");

        let missing = store.update(AnchorSpec::literal("moon", "Moon", Number::zero()));
        assert!(matches!(missing, Err(UpdateError::Lookup(_))));

        store.delete("unix").unwrap();
        assert!(!store.contains("unix"));
        assert!(store.delete("unix").is_err());
    }

    #[test]
    fn test_snapshot_is_stable() {
        let store = store();
        let before = store.get("unix").unwrap();
        store.set_value("unix", Number::from_i64(60)).unwrap();
        assert_eq!(before.value(), Some(&Number::zero()));
        assert_eq!(store.get("unix").unwrap().value(), Some(&Number::from_i64(60)));
    }

    #[test]
    fn test_set_value_survives_respec() {
        let store = store();
        store.set_value("y2k", Number::from_i64(60)).unwrap();
        let updated = store.get("y2k").unwrap();
        assert_eq!(updated.source(), &AnchorSource::Literal);

        let rebuilt = Anchor::from_spec(updated.to_spec()).unwrap();
        assert_eq!(rebuilt.value(), Some(&Number::from_i64(60)));
        assert_eq!(rebuilt.groups(), updated.groups());

        store.set_value("now", Number::from_i64(5)).unwrap();
        let now = store.get("now").unwrap();
        assert!(now.is_dynamic());
        assert_eq!(now.expression(), Some("(current-time)"));
        assert_eq!(now.value(), Some(&Number::from_i64(5)));
    }

    #[test]
    fn test_select_labels_and_groups() {
        let store = store();
        let selected = store.select("default, bb");
        assert_eq!(labels(&selected), vec!["bb", "unix", "y2k"]);

        let modern = store.select("modern,y2k");
        assert_eq!(labels(&modern), vec!["y2k"]);

        let with_dynamic = store.select("now,unix");
        assert_eq!(labels(&with_dynamic), vec!["unix", "now"]);

        assert!(store.select("nothing").is_empty());
        assert_eq!(labels(&store.by_group("cosmic")), vec!["bb"]);
    }

    #[test]
    fn test_concurrent_readers() {
        let store = Arc::new(store());
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    store.set_value("now", Number::from_i64(i)).unwrap();
                    store.get("now").unwrap().value().cloned()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap().is_some());
        }
        assert!(store.get("now").unwrap().is_dynamic());
    }
}
