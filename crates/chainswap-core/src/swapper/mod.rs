//! Module: swapper
//! Responsibility: swap configurations (source model and field, chains,
//! constraints) and their save-time validation.
//! Does not own: running a swap (see `wizard`) or the UI entry point
//! (see `action`).
//! Boundary: every create and write goes through `validate::check_draft`.

mod validate;


use crate::{
    action::ActionId,
    chain::FieldChain,
    constraint::Constraint,
    env::Env,
    error::{Error, ErrorOrigin},
    obs::{SwapEvent, sink},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use validate::SwapperError;

///
/// SwapperId
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct SwapperId(pub u64);

///
/// ConstraintDraft
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ConstraintDraft {
    pub name: String,
    pub expression: String,
}

impl ConstraintDraft {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
        }
    }
}

///
/// SwapperDraft
///
/// Unvalidated configuration input, as typed by an administrator or read
/// from a manifest.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SwapperDraft {
    pub name: String,
    pub model: String,
    pub field: String,
    pub chains: Vec<String>,
    pub constraints: Vec<ConstraintDraft>,
    pub groups: Vec<String>,
}

impl SwapperDraft {
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            field: field.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn chain(mut self, path: impl Into<String>) -> Self {
        self.chains.push(path.into());
        self
    }

    #[must_use]
    pub fn constraint(mut self, name: impl Into<String>, expression: impl Into<String>) -> Self {
        self.constraints.push(ConstraintDraft::new(name, expression));
        self
    }

    #[must_use]
    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }
}

///
/// SwapperPatch
///
/// Partial update; `None` keeps the current value.
///

#[derive(Clone, Debug, Default)]
pub struct SwapperPatch {
    pub name: Option<String>,
    pub model: Option<String>,
    pub field: Option<String>,
    pub chains: Option<Vec<String>>,
    pub constraints: Option<Vec<ConstraintDraft>>,
    pub groups: Option<Vec<String>>,
    pub action: Option<Option<ActionId>>,
}

impl SwapperPatch {
    fn apply_to(self, mut draft: SwapperDraft, action: Option<ActionId>) -> (SwapperDraft, Option<ActionId>) {
        if let Some(name) = self.name {
            draft.name = name;
        }
        if let Some(model) = self.model {
            draft.model = model;
        }
        if let Some(field) = self.field {
            draft.field = field;
        }
        if let Some(chains) = self.chains {
            draft.chains = chains;
        }
        if let Some(constraints) = self.constraints {
            draft.constraints = constraints;
        }
        if let Some(groups) = self.groups {
            draft.groups = groups;
        }

        (draft, self.action.unwrap_or(action))
    }
}

///
/// ConstraintSpec
///

#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintSpec {
    pub name: String,
    constraint: Constraint,
}

impl ConstraintSpec {
    #[must_use]
    pub fn expression(&self) -> &str {
        self.constraint.source()
    }

    #[must_use]
    pub const fn constraint(&self) -> &Constraint {
        &self.constraint
    }
}

///
/// Swapper
///
/// A validated swap configuration. Fields are read-only outside the crate;
/// changes go through `Env::write_swapper`.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Swapper {
    id: SwapperId,
    name: String,
    model: String,
    field: String,
    chains: Vec<FieldChain>,
    constraints: Vec<ConstraintSpec>,
    groups: Vec<String>,
    action: Option<ActionId>,
}

impl Swapper {
    #[must_use]
    pub const fn id(&self) -> SwapperId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    #[must_use]
    pub fn chains(&self) -> &[FieldChain] {
        &self.chains
    }

    #[must_use]
    pub fn constraints(&self) -> &[ConstraintSpec] {
        &self.constraints
    }

    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// The bound UI action, if any.
    #[must_use]
    pub const fn action(&self) -> Option<ActionId> {
        self.action
    }

    pub(crate) const fn set_action(&mut self, action: Option<ActionId>) {
        self.action = action;
    }

    /// Round-trip back to editable input.
    #[must_use]
    pub fn to_draft(&self) -> SwapperDraft {
        SwapperDraft {
            name: self.name.clone(),
            model: self.model.clone(),
            field: self.field.clone(),
            chains: self.chains.iter().map(|c| c.as_str().to_string()).collect(),
            constraints: self
                .constraints
                .iter()
                .map(|c| ConstraintDraft::new(&c.name, c.expression()))
                .collect(),
            groups: self.groups.clone(),
        }
    }
}

///
/// SwapperStore
///

#[derive(Clone, Debug, Default)]
pub struct SwapperStore {
    swappers: BTreeMap<SwapperId, Swapper>,
    next_id: u64,
}

impl SwapperStore {
    #[must_use]
    pub fn get(&self, id: SwapperId) -> Option<&Swapper> {
        self.swappers.get(&id)
    }

    pub fn try_get(&self, id: SwapperId) -> Result<&Swapper, SwapperError> {
        self.get(id).ok_or(SwapperError::NotFound(id))
    }

    pub(crate) fn get_mut(&mut self, id: SwapperId) -> Option<&mut Swapper> {
        self.swappers.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Swapper> {
        self.swappers.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.swappers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.swappers.is_empty()
    }

    /// First swapper with the given name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&Swapper> {
        self.iter().find(|s| s.name == name)
    }

    const fn allocate(&mut self) -> SwapperId {
        self.next_id += 1;
        SwapperId(self.next_id)
    }
}

impl Env {
    /// Look up a swapper.
    pub fn swapper(&self, id: SwapperId) -> Result<&Swapper, Error> {
        Ok(self.swappers.try_get(id)?)
    }

    /// Fields a swapper on `model` may target, by name.
    pub fn allowed_fields(&self, model: &str) -> Result<Vec<String>, Error> {
        let fields = self.db.registry().allowed_fields(model)?;

        Ok(fields.iter().map(|f| f.field.name.clone()).collect())
    }

    /// Validate and store a new swapper.
    pub fn create_swapper(&mut self, draft: SwapperDraft) -> Result<SwapperId, Error> {
        // Phase 1: validate
        let checked = validate::check_draft(self, None, &draft, None).inspect_err(|err| {
            tracing::warn!(name = %draft.name, error = %err, "swapper rejected");
            sink::record(SwapEvent::SwapperRejected);
        })?;

        // Phase 2: store
        let id = self.swappers.allocate();
        let swapper = checked.into_swapper(id, draft, None);
        self.swappers.swappers.insert(id, swapper);

        tracing::info!(swapper = %id, "swapper created");
        sink::record(SwapEvent::SwapperSaved { swapper: id });

        Ok(id)
    }

    /// Apply a partial update. The whole configuration is validated again,
    /// so changing the field re-checks every chain against it.
    pub fn write_swapper(&mut self, id: SwapperId, patch: SwapperPatch) -> Result<(), Error> {
        let current = self.swappers.try_get(id)?;
        let (draft, action) = patch.apply_to(current.to_draft(), current.action);

        let checked = validate::check_draft(self, Some(id), &draft, action).inspect_err(|err| {
            tracing::warn!(swapper = %id, error = %err, "swapper update rejected");
            sink::record(SwapEvent::SwapperRejected);
        })?;

        let swapper = checked.into_swapper(id, draft, action);
        self.swappers.swappers.insert(id, swapper);
        if action.is_some() {
            self.refresh_action(id)?;
        }

        tracing::info!(swapper = %id, "swapper updated");
        sink::record(SwapEvent::SwapperSaved { swapper: id });

        Ok(())
    }

    /// Delete a swapper, removing its bound action first.
    pub fn unlink_swapper(&mut self, id: SwapperId) -> Result<(), Error> {
        self.swappers.try_get(id)?;
        self.unlink_action(id)?;
        self.swappers.swappers.remove(&id);

        tracing::info!(swapper = %id, "swapper deleted");
        sink::record(SwapEvent::SwapperDeleted { swapper: id });

        Ok(())
    }
}

impl From<SwapperError> for Error {
    fn from(err: SwapperError) -> Self {
        Self::new(err.class(), err.origin(), err.to_string())
    }
}

impl SwapperError {
    const fn origin(&self) -> ErrorOrigin {
        match self {
            Self::Chain { .. } => ErrorOrigin::Chain,
            Self::Constraint { .. } => ErrorOrigin::Constraint,
            _ => ErrorOrigin::Swapper,
        }
    }
}
