use crate::{
    action::ActionId,
    chain::{ChainError, FieldChain},
    constraint::{ConstraintError, check_expression},
    env::Env,
    error::ErrorClass,
    swapper::{ConstraintSpec, Swapper, SwapperDraft, SwapperId},
};
use thiserror::Error as ThisError;

///
/// SwapperError
///

#[derive(Debug, ThisError)]
pub enum SwapperError {
    #[error("swapper {0} not found")]
    NotFound(SwapperId),

    #[error("swapper name is required")]
    EmptyName,

    #[error("model '{0}' not found")]
    UnknownModel(String),

    #[error("field '{field}' cannot be swapped on model '{model}'")]
    FieldNotAllowed { model: String, field: String },

    #[error("{source}")]
    Chain {
        chain: String,
        #[source]
        source: ChainError,
    },

    #[error("constraint name is required")]
    EmptyConstraintName,

    #[error("incorrect constraint '{name}': {source}")]
    Constraint {
        name: String,
        #[source]
        source: ConstraintError,
    },

    #[error("action {0} not found")]
    UnknownAction(ActionId),

    #[error("action {action} belongs to swapper {owner}")]
    ForeignAction { action: ActionId, owner: SwapperId },
}

impl SwapperError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound(_) => ErrorClass::NotFound,
            _ => ErrorClass::Validation,
        }
    }
}

///
/// Checked
/// Compiled parts of a draft that passed validation.
///

pub(crate) struct Checked {
    chains: Vec<FieldChain>,
    constraints: Vec<ConstraintSpec>,
}

impl Checked {
    pub(crate) fn into_swapper(
        self,
        id: SwapperId,
        draft: SwapperDraft,
        action: Option<ActionId>,
    ) -> Swapper {
        Swapper {
            id,
            name: draft.name.trim().to_string(),
            model: draft.model,
            field: draft.field,
            chains: self.chains,
            constraints: self.constraints,
            groups: draft.groups,
            action,
        }
    }
}

/// Run every save-time check on a draft. `id` is the swapper being written,
/// `None` on create.
pub(crate) fn check_draft(
    env: &Env,
    id: Option<SwapperId>,
    draft: &SwapperDraft,
    action: Option<ActionId>,
) -> Result<Checked, SwapperError> {
    let registry = env.db.registry();

    // Phase 1: identity
    if draft.name.trim().is_empty() {
        return Err(SwapperError::EmptyName);
    }
    if !registry.contains(&draft.model) {
        return Err(SwapperError::UnknownModel(draft.model.clone()));
    }

    // Phase 2: the swapped field
    let allowed = registry
        .allowed_fields(&draft.model)
        .map_err(|_| SwapperError::UnknownModel(draft.model.clone()))?;
    let Some(main) = allowed.iter().find(|f| f.field.name == draft.field) else {
        return Err(SwapperError::FieldNotAllowed {
            model: draft.model.clone(),
            field: draft.field.clone(),
        });
    };

    // Phase 3: chains must reach a field that can hold the same value
    let mut chains = Vec::with_capacity(draft.chains.len());
    for raw in &draft.chains {
        let chain_err = |source| SwapperError::Chain {
            chain: raw.clone(),
            source,
        };
        let chain = FieldChain::parse(raw).map_err(chain_err)?;
        chain
            .check_compatible(
                registry,
                &draft.model,
                main.field,
                env.settings.max_chain_depth,
            )
            .map_err(chain_err)?;
        chains.push(chain);
    }

    // Phase 4: constraints are evaluated once against an empty set
    let mut constraints = Vec::with_capacity(draft.constraints.len());
    for spec in &draft.constraints {
        if spec.name.trim().is_empty() {
            return Err(SwapperError::EmptyConstraintName);
        }
        let constraint = check_expression(&env.db, &draft.model, &spec.expression).map_err(
            |source| SwapperError::Constraint {
                name: spec.name.clone(),
                source,
            },
        )?;
        constraints.push(ConstraintSpec {
            name: spec.name.clone(),
            constraint,
        });
    }

    // Phase 5: action reference, which must be the swapper's own
    if let Some(action) = action {
        let Some(bound) = env.actions.get(action) else {
            return Err(SwapperError::UnknownAction(action));
        };
        if Some(bound.swapper_id) != id {
            return Err(SwapperError::ForeignAction {
                action,
                owner: bound.swapper_id,
            });
        }
    }

    Ok(Checked {
        chains,
        constraints,
    })
}
