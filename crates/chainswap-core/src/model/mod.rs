//! Runtime model metadata.
//!
//! The registry answers the questions the propagation engine asks the host:
//! does a field exist, what kind is it, which model does a relation point at,
//! and through which delegation link is an inherited field stored.
pub mod entity;
pub mod field;
pub mod registry;


pub use entity::{Delegation, EntityModel};
pub use field::{FieldKind, FieldModel};
pub use registry::{ModelError, ModelRegistry, ResolvedField};
