//! Module: action
//! Responsibility: the UI entry point bound to a swapper's model that opens
//! the propagation wizard.
//! Does not own: the wizard itself.
//! Boundary: a swapper holds at most one action; the action carries the
//! swapper id in its context.


use crate::{
    env::Env,
    error::{Error, ErrorOrigin},
    obs::{SwapEvent, sink},
    swapper::SwapperId,
    value::RecordId,
    wizard::WizardContext,
};
use derive_more::Display;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Model every bound action opens.
pub const WIZARD_MODEL: &str = "chained.swapper.wizard";

///
/// ActionId
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct ActionId(pub u64);

///
/// ViewMode
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Form,
}

///
/// WindowTarget
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowTarget {
    /// Opens in a dialog.
    New,
}

///
/// WindowAction
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WindowAction {
    pub id: ActionId,
    pub name: String,
    pub res_model: String,
    pub binding_model: String,
    pub view_mode: ViewMode,
    pub target: WindowTarget,
    pub swapper_id: SwapperId,
    pub groups: Vec<String>,
}

impl WindowAction {
    /// Visible to a user holding `user_groups`. An action without groups is
    /// visible to everyone.
    #[must_use]
    pub fn is_visible_to(&self, user_groups: &[&str]) -> bool {
        self.groups.is_empty()
            || self
                .groups
                .iter()
                .any(|group| user_groups.contains(&group.as_str()))
    }

    /// Context the action passes to the wizard when clicked on a selection.
    #[must_use]
    pub fn open_context(
        &self,
        active_id: Option<RecordId>,
        active_ids: impl IntoIterator<Item = RecordId>,
    ) -> WizardContext {
        WizardContext {
            active_model: self.binding_model.clone(),
            active_id,
            active_ids: active_ids.into_iter().collect(),
            swapper_id: self.swapper_id,
        }
    }
}

///
/// ActionStore
///

#[derive(Clone, Debug, Default)]
pub struct ActionStore {
    actions: BTreeMap<ActionId, WindowAction>,
    next_id: u64,
}

impl ActionStore {
    #[must_use]
    pub fn get(&self, id: ActionId) -> Option<&WindowAction> {
        self.actions.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WindowAction> {
        self.actions.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Actions created for `swapper_id`.
    pub fn owned_by(&self, swapper_id: SwapperId) -> impl Iterator<Item = &WindowAction> {
        self.actions
            .values()
            .filter(move |action| action.swapper_id == swapper_id)
    }
}

impl Env {
    /// Bind a UI action for the swapper. Returns the existing action when
    /// one is already bound, re-attaching it if the reference was cleared.
    pub fn add_action(&mut self, swapper_id: SwapperId) -> Result<ActionId, Error> {
        let swapper = self.swappers.try_get(swapper_id)?;
        if let Some(existing) = swapper.action()
            && self.actions.get(existing).is_some()
        {
            return Ok(existing);
        }
        let owned = self.actions.owned_by(swapper_id).next().map(|action| action.id);
        if let Some(owned) = owned {
            self.set_swapper_action(swapper_id, Some(owned))?;
            self.refresh_action(swapper_id)?;

            return Ok(owned);
        }

        self.actions.next_id += 1;
        let id = ActionId(self.actions.next_id);
        let action = WindowAction {
            id,
            name: self.action_name(swapper.name()),
            res_model: WIZARD_MODEL.to_string(),
            binding_model: swapper.model().to_string(),
            view_mode: ViewMode::Form,
            target: WindowTarget::New,
            swapper_id,
            groups: swapper.groups().to_vec(),
        };
        self.actions.actions.insert(id, action);
        self.set_swapper_action(swapper_id, Some(id))?;

        tracing::info!(swapper = %swapper_id, action = %id, "action bound");
        sink::record(SwapEvent::ActionBound {
            swapper: swapper_id,
        });

        Ok(id)
    }

    /// Remove the swapper's bound action, along with any action it created
    /// whose reference was cleared. Returns whether one was removed.
    pub fn unlink_action(&mut self, swapper_id: SwapperId) -> Result<bool, Error> {
        self.swappers.try_get(swapper_id)?;

        let before = self.actions.len();
        self.actions
            .actions
            .retain(|_, action| action.swapper_id != swapper_id);
        let removed = before != self.actions.len();
        self.set_swapper_action(swapper_id, None)?;

        if removed {
            tracing::info!(swapper = %swapper_id, "action unbound");
            sink::record(SwapEvent::ActionUnbound {
                swapper: swapper_id,
            });
        }

        Ok(removed)
    }

    /// Actions bound to `model` that a user with `user_groups` may see.
    #[must_use]
    pub fn bound_actions(&self, model: &str, user_groups: &[&str]) -> Vec<&WindowAction> {
        self.actions
            .iter()
            .filter(|action| action.binding_model == model && action.is_visible_to(user_groups))
            .collect()
    }

    /// Remove every action that opens the wizard and clear the swappers'
    /// references to them. Returns the number of actions removed.
    pub fn remove_all_bound_actions(&mut self) -> usize {
        let before = self.actions.len();
        self.actions
            .actions
            .retain(|_, action| action.res_model != WIZARD_MODEL);
        let removed = before - self.actions.len();

        let bound: Vec<SwapperId> = self
            .swappers
            .iter()
            .filter(|s| s.action().is_some_and(|id| self.actions.get(id).is_none()))
            .map(|s| s.id())
            .collect();
        for swapper_id in bound {
            if let Some(swapper) = self.swappers.get_mut(swapper_id) {
                swapper.set_action(None);
            }
            sink::record(SwapEvent::ActionUnbound {
                swapper: swapper_id,
            });
        }

        tracing::info!(removed, "removed all bound actions");

        removed
    }

    // Re-derive name, binding model and groups after a swapper edit.
    pub(crate) fn refresh_action(&mut self, swapper_id: SwapperId) -> Result<(), Error> {
        let swapper = self.swappers.try_get(swapper_id)?;
        let Some(id) = swapper.action() else {
            return Ok(());
        };

        let name = self.action_name(swapper.name());
        let binding_model = swapper.model().to_string();
        let groups = swapper.groups().to_vec();

        let action = self.actions.actions.get_mut(&id).ok_or_else(|| {
            Error::not_found(ErrorOrigin::Action, format!("action {id} not found"))
        })?;
        action.name = name;
        action.binding_model = binding_model;
        action.groups = groups;

        Ok(())
    }

    fn action_name(&self, swapper_name: &str) -> String {
        format!("{}: {swapper_name}", self.settings.action_prefix)
    }

    fn set_swapper_action(
        &mut self,
        swapper_id: SwapperId,
        action: Option<ActionId>,
    ) -> Result<(), Error> {
        let swapper = self.swappers.get_mut(swapper_id).ok_or_else(|| {
            Error::not_found(ErrorOrigin::Action, format!("swapper {swapper_id} not found"))
        })?;
        swapper.set_action(action);

        Ok(())
    }
}
