//! Module: env
//! Responsibility: the request environment that owns the record store, the
//! swapper configurations and the bound actions.
//! Does not own: any behaviour; operations live in the modules that define
//! them (`swapper`, `action`, `wizard`, `manifest`).

use crate::{
    action::ActionStore,
    db::Db,
    error::Error,
    manifest::Settings,
    model::ModelRegistry,
    swapper::SwapperStore,
};

///
/// Env
///

#[derive(Clone, Debug)]
pub struct Env {
    pub(crate) db: Db,
    pub(crate) swappers: SwapperStore,
    pub(crate) actions: ActionStore,
    pub(crate) settings: Settings,
}

impl Env {
    /// Build an environment with default settings.
    pub fn new(registry: ModelRegistry) -> Result<Self, Error> {
        Self::with_settings(registry, Settings::default())
    }

    pub fn with_settings(registry: ModelRegistry, settings: Settings) -> Result<Self, Error> {
        Ok(Self {
            db: Db::new(registry)?,
            swappers: SwapperStore::default(),
            actions: ActionStore::default(),
            settings,
        })
    }

    #[must_use]
    pub const fn db(&self) -> &Db {
        &self.db
    }

    /// Direct store access for seeding and inspecting records.
    pub const fn db_mut(&mut self) -> &mut Db {
        &mut self.db
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub const fn swappers(&self) -> &SwapperStore {
        &self.swappers
    }

    #[must_use]
    pub const fn actions(&self) -> &ActionStore {
        &self.actions
    }
}
