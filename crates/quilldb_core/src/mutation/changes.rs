//! Modification descriptors.

use quilldb_codec::{Record, Value};
use std::collections::BTreeMap;

/// One requested field change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// Set the field to a value.
    Set(Value),
    /// Remove the field.
    Remove,
}

/// A partial field-to-change mapping requested by `update`/`modify`.
///
/// Descriptors are shallow: each entry addresses one top-level field.
/// Merging is last-writer-wins per field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modifications {
    changes: BTreeMap<String, Change>,
}

impl Modifications {
    /// Creates an empty descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: sets a field.
    #[must_use]
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(field, value);
        self
    }

    /// Builder: removes a field.
    #[must_use]
    pub fn remove(mut self, field: impl Into<String>) -> Self {
        self.remove_field(field);
        self
    }

    /// Requests that a field be set.
    pub fn set_field(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.changes.insert(field.into(), Change::Set(value.into()));
    }

    /// Requests that a field be removed.
    pub fn remove_field(&mut self, field: impl Into<String>) {
        self.changes.insert(field.into(), Change::Remove);
    }

    /// Returns the change requested for a field.
    pub fn get(&self, field: &str) -> Option<&Change> {
        self.changes.get(field)
    }

    /// Returns the value a field is set to, if it is set.
    pub fn value(&self, field: &str) -> Option<&Value> {
        match self.changes.get(field) {
            Some(Change::Set(v)) => Some(v),
            _ => None,
        }
    }

    /// Returns true if the field is changed.
    pub fn contains(&self, field: &str) -> bool {
        self.changes.contains_key(field)
    }

    /// Iterates changes in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Change)> {
        self.changes.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Returns the number of changed fields.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Returns true if nothing is changed.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Merges `other` on top of this descriptor.
    pub fn merge(&mut self, other: Modifications) {
        self.changes.extend(other.changes);
    }

    /// Computes the changes that turn `before` into `after`.
    pub fn diff(before: &Record, after: &Record) -> Self {
        let mut changes = BTreeMap::new();
        for (field, value) in after.fields() {
            if before.get(field) != Some(value) {
                changes.insert(field.to_string(), Change::Set(value.clone()));
            }
        }
        for (field, _) in before.fields() {
            if !after.contains(field) {
                changes.insert(field.to_string(), Change::Remove);
            }
        }
        Self { changes }
    }

    /// Applies the changes to a record.
    pub fn apply_to(&self, record: &mut Record) {
        for (field, change) in &self.changes {
            match change {
                Change::Set(value) => {
                    record.set(field.clone(), value.clone());
                }
                Change::Remove => {
                    record.remove(field);
                }
            }
        }
    }
}

impl From<Record> for Modifications {
    fn from(record: Record) -> Self {
        record
            .into_fields()
            .into_iter()
            .map(|(k, v)| (k, Change::Set(v)))
            .collect()
    }
}

impl<K: Into<String>> FromIterator<(K, Change)> for Modifications {
    fn from_iter<I: IntoIterator<Item = (K, Change)>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().map(|(k, c)| (k.into(), c)).collect(),
        }
    }
}
