use crate::value::RecordId;
use derive_more::Deref;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

///
/// RecordSet
///
/// Ordered, duplicate-free ids of one model. Unions keep first-seen order.
///

#[derive(Clone, Debug, Deref, Deserialize, Eq, PartialEq, Serialize)]
pub struct RecordSet {
    model: String,
    #[deref]
    ids: Vec<RecordId>,
}

impl RecordSet {
    pub fn new(model: impl Into<String>, ids: impl IntoIterator<Item = RecordId>) -> Self {
        let mut set = Self::empty(model);
        set.extend(ids);

        set
    }

    pub fn empty(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ids: Vec::new(),
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn ids(&self) -> &[RecordId] {
        &self.ids
    }

    /// Append ids not already present.
    pub fn extend(&mut self, ids: impl IntoIterator<Item = RecordId>) {
        for id in ids {
            if !self.ids.contains(&id) {
                self.ids.push(id);
            }
        }
    }

    /// Union with another set of the same model.
    /// Returns `false` (and leaves `self` untouched) on a model mismatch.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if self.model != other.model {
            return false;
        }
        self.extend(other.ids.iter().copied());

        true
    }

    /// Set equality on ids, ignoring order.
    #[must_use]
    pub fn same_records(&self, other: &Self) -> bool {
        self.model == other.model
            && self.ids.iter().collect::<BTreeSet<_>>() == other.ids.iter().collect::<BTreeSet<_>>()
    }

    #[must_use]
    pub fn contains_all(&self, other: &Self) -> bool {
        self.model == other.model && other.ids.iter().all(|id| self.ids.contains(id))
    }
}
