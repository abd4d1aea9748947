//! Core engine for chainswap: swap configurations, relational chains, the
//! constraint language and the propagation wizard, over small in-process
//! stand-ins for the host ORM (model registry, record store, actions).
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod action;
pub mod chain;
pub mod constraint;
pub mod db;
pub mod demo;
pub mod env;
pub mod error;
pub mod manifest;
pub mod model;
pub mod obs;
pub mod swapper;
pub mod value;
pub mod wizard;

pub use error::Error;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, stores, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        action::{ActionId, WindowAction},
        db::RecordSet,
        env::Env,
        model::{EntityModel, FieldKind, ModelRegistry},
        swapper::{SwapperDraft, SwapperId, SwapperPatch},
        value::{RecordId, Value},
        wizard::{FieldInput, PropagationWizard, WizardContext, WizardState},
    };
}
