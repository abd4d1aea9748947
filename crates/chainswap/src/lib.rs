//! ## Crate layout
//! - `core`: swap configurations, chains, constraints, the wizard and the
//!   in-process host stand-ins they run against.
//! - `hooks`: lifecycle hooks run by the host when the module is removed.
//!
//! The `prelude` module mirrors the surface used by integrating code.

pub use chainswap_core as core;

pub mod hooks;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::{Error, demo};

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        core::{
            error::{ErrorClass, ErrorOrigin},
            manifest::{Manifest, Settings},
            prelude::*,
            wizard::{FormView, InputKind, SwapReport},
        },
        hooks::uninstall_hook,
    };
}
