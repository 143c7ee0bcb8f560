//! Snapshots of the values known at one step.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::identifier::Identifier;
use crate::domain::value::Value;

/// Immutable mapping from identifier to captured value.
///
/// The map sits behind an `Arc` so that steps and events can share it, and no
/// API hands out mutable access once it is built.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    values: Arc<BTreeMap<Identifier, Value>>,
}

impl Snapshot {
    /// Deep-copies every value out of the live state.
    pub fn capture<'a, I>(live: I) -> Self
    where
        I: IntoIterator<Item = (&'a Identifier, &'a Value)>,
    {
        let values = live
            .into_iter()
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect();
        Self {
            values: Arc::new(values),
        }
    }

    pub fn get(&self, id: &Identifier) -> Option<&Value> {
        self.values.get(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.values.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Identifier, &Value)> {
        self.values.iter()
    }
}

impl FromIterator<(Identifier, Value)> for Snapshot {
    fn from_iter<T: IntoIterator<Item = (Identifier, Value)>>(iter: T) -> Self {
        Self {
            values: Arc::new(iter.into_iter().collect()),
        }
    }
}
