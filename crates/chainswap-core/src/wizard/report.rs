use crate::{
    swapper::SwapperId,
    value::{RecordId, Value},
};
use serde::Serialize;

///
/// SwapChange
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwapChange {
    pub model: String,
    pub id: RecordId,
    pub field: String,
    pub previous: Value,
    pub new: Value,
}

///
/// SwapReport
///
/// What one applied swap wrote. Returned to the caller and logged, never
/// stored.
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SwapReport {
    pub swapper: SwapperId,
    pub value: Value,
    pub changes: Vec<SwapChange>,
}

impl SwapReport {
    #[must_use]
    pub fn written(&self) -> usize {
        self.changes.len()
    }

    /// Ids written for one model and field, in write order.
    #[must_use]
    pub fn written_ids(&self, model: &str, field: &str) -> Vec<RecordId> {
        self.changes
            .iter()
            .filter(|c| c.model == model && c.field == field)
            .map(|c| c.id)
            .collect()
    }

    pub(crate) fn contains(&self, model: &str, field: &str, id: RecordId) -> bool {
        self.changes
            .iter()
            .any(|c| c.id == id && c.model == model && c.field == field)
    }
}
