use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    model::{
        entity::EntityModel,
        field::{FieldKind, FieldModel},
    },
};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error as ThisError;

///
/// ModelError
///

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("model '{0}' already registered")]
    DuplicateModel(String),

    #[error("model '{0}' not found")]
    UnknownModel(String),

    #[error("field '{field}' not found on model '{model}'")]
    UnknownField { model: String, field: String },

    #[error("field '{model}.{field}' targets unknown model '{target}'")]
    UnknownTarget {
        model: String,
        field: String,
        target: String,
    },

    #[error("one2many '{model}.{field}' needs a many2one inverse '{inverse}' on '{target}'")]
    BadInverse {
        model: String,
        field: String,
        target: String,
        inverse: String,
    },

    #[error("model '{model}' delegates to '{parent}' through '{link}', which is not a many2one to it")]
    BadDelegation {
        model: String,
        parent: String,
        link: String,
    },
}

impl ModelError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownModel(_) | Self::UnknownField { .. } => ErrorClass::NotFound,
            Self::DuplicateModel(_) => ErrorClass::Conflict,
            Self::UnknownTarget { .. } | Self::BadInverse { .. } | Self::BadDelegation { .. } => {
                ErrorClass::InvariantViolation
            }
        }
    }
}

impl From<ModelError> for Error {
    fn from(err: ModelError) -> Self {
        Self::new(err.class(), ErrorOrigin::Model, err.to_string())
    }
}

///
/// ResolvedField
///
/// A field looked up on a model, possibly through delegated inheritance.
/// `links` lists the many2one fields followed from the requested model to
/// the model that stores the value (`owner`); it is empty for own fields.
///

#[derive(Clone, Debug)]
pub struct ResolvedField<'a> {
    pub owner: &'a str,
    pub field: &'a FieldModel,
    pub links: Vec<&'a str>,
}

impl ResolvedField<'_> {
    #[must_use]
    pub const fn is_delegated(&self) -> bool {
        !self.links.is_empty()
    }
}

///
/// ModelRegistry
///

#[derive(Clone, Debug, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, EntityModel>,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, model: EntityModel) -> Result<(), ModelError> {
        if self.models.contains_key(&model.name) {
            return Err(ModelError::DuplicateModel(model.name));
        }
        self.models.insert(model.name.clone(), model);

        Ok(())
    }

    /// Builder-style registration for fixtures.
    pub fn with(mut self, model: EntityModel) -> Result<Self, ModelError> {
        self.register(model)?;

        Ok(self)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&EntityModel> {
        self.models.get(name)
    }

    pub fn try_get(&self, name: &str) -> Result<&EntityModel, ModelError> {
        self.get(name)
            .ok_or_else(|| ModelError::UnknownModel(name.to_string()))
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.models.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.models.keys().map(String::as_str)
    }

    pub fn models(&self) -> impl Iterator<Item = &EntityModel> {
        self.models.values()
    }

    /// Resolve a field by name, following delegated inheritance when the
    /// model does not declare it itself.
    pub fn resolve_field<'a>(
        &'a self,
        model: &str,
        field: &str,
    ) -> Result<ResolvedField<'a>, ModelError> {
        let mut visiting = BTreeSet::new();

        self.resolve_field_inner(model, field, &mut visiting)?
            .ok_or_else(|| ModelError::UnknownField {
                model: model.to_string(),
                field: field.to_string(),
            })
    }

    fn resolve_field_inner<'a>(
        &'a self,
        model: &str,
        field: &str,
        visiting: &mut BTreeSet<String>,
    ) -> Result<Option<ResolvedField<'a>>, ModelError> {
        let entity = self.try_get(model)?;
        if !visiting.insert(entity.name.clone()) {
            return Ok(None);
        }

        if let Some(own) = entity.own_field(field) {
            return Ok(Some(ResolvedField {
                owner: &entity.name,
                field: own,
                links: Vec::new(),
            }));
        }

        for delegation in &entity.inherits {
            if let Some(mut resolved) =
                self.resolve_field_inner(&delegation.parent, field, visiting)?
            {
                resolved.links.insert(0, &delegation.link_field);
                return Ok(Some(resolved));
            }
        }

        Ok(None)
    }

    /// Fields a swapper may target on `model`: own fields first, then fields
    /// reached through delegated parents. One2many and reference fields are
    /// excluded.
    pub fn allowed_fields<'a>(&'a self, model: &str) -> Result<Vec<ResolvedField<'a>>, ModelError> {
        let mut names = Vec::new();
        self.collect_field_names(model, &mut names, &mut BTreeSet::new())?;

        let mut allowed = Vec::new();
        let mut seen = BTreeSet::new();
        for name in names {
            if !seen.insert(name) {
                continue;
            }
            let resolved = self.resolve_field(model, name)?;
            if resolved.field.kind.is_swappable() {
                allowed.push(resolved);
            }
        }

        Ok(allowed)
    }

    fn collect_field_names<'a>(
        &'a self,
        model: &str,
        names: &mut Vec<&'a str>,
        visiting: &mut BTreeSet<&'a str>,
    ) -> Result<(), ModelError> {
        let entity = self.try_get(model)?;
        if !visiting.insert(&entity.name) {
            return Ok(());
        }

        names.extend(entity.fields.iter().map(|field| field.name.as_str()));
        for delegation in &entity.inherits {
            self.collect_field_names(&delegation.parent, names, visiting)?;
        }

        Ok(())
    }

    /// Validate cross-model references: relation targets, one2many inverses
    /// and delegation links.
    pub fn check(&self) -> Result<(), ModelError> {
        for entity in self.models.values() {
            for field in &entity.fields {
                self.check_field(entity, field)?;
            }

            for delegation in &entity.inherits {
                let links_parent = entity.own_field(&delegation.link_field).is_some_and(|link| {
                    matches!(&link.kind, FieldKind::Many2one { target } if *target == delegation.parent)
                });
                if !links_parent || !self.contains(&delegation.parent) {
                    return Err(ModelError::BadDelegation {
                        model: entity.name.clone(),
                        parent: delegation.parent.clone(),
                        link: delegation.link_field.clone(),
                    });
                }
            }
        }

        Ok(())
    }

    fn check_field(&self, entity: &EntityModel, field: &FieldModel) -> Result<(), ModelError> {
        let Some(target) = field.kind.relation() else {
            return Ok(());
        };
        let Some(target_model) = self.get(target) else {
            return Err(ModelError::UnknownTarget {
                model: entity.name.clone(),
                field: field.name.clone(),
                target: target.to_string(),
            });
        };

        if let FieldKind::One2many { inverse, .. } = &field.kind {
            let inverse_ok = target_model.own_field(inverse).is_some_and(|inv| {
                matches!(&inv.kind, FieldKind::Many2one { target } if *target == entity.name)
            });
            if !inverse_ok {
                return Err(ModelError::BadInverse {
                    model: entity.name.clone(),
                    field: field.name.clone(),
                    target: target.to_string(),
                    inverse: inverse.clone(),
                });
            }
        }

        Ok(())
    }
}
