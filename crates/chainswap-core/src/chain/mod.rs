//! Module: chain
//! Responsibility: dotted relational chains (`child_ids.lang`), their
//! write-time checks and their traversal over record sets.
//! Does not own: writing the swapped value (see `wizard`).

mod resolve;


use crate::{
    error::{Error, ErrorOrigin},
    model::{FieldModel, ModelRegistry},
};
use thiserror::Error as ThisError;

pub use resolve::{resolve_targets, traverse};

///
/// CONSTANTS
///

/// Default upper bound on the number of segments in one chain.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 8;

///
/// ChainError
///

#[derive(Debug, ThisError)]
pub enum ChainError {
    #[error("chain is empty")]
    Empty,

    #[error("incorrect sub-field expression '{chain}': segment {index} is empty")]
    EmptySegment { chain: String, index: usize },

    #[error("incorrect sub-field expression '{chain}': '{segment}' is not a field name")]
    InvalidSegment { chain: String, segment: String },

    #[error("chain '{chain}' has {depth} segments, more than the allowed {max}")]
    TooDeep {
        chain: String,
        depth: usize,
        max: usize,
    },

    #[error("incorrect sub-field expression '{chain}': field '{field}' not found on model '{model}'")]
    UnknownField {
        chain: String,
        model: String,
        field: String,
    },

    #[error("incorrect sub-field expression '{chain}': '{model}.{field}' ({ttype}) is not relational")]
    NotRelational {
        chain: String,
        model: String,
        field: String,
        ttype: &'static str,
    },

    #[error("the sub-field '{chain}' ({found}) is not compatible with the main field ({expected})")]
    Incompatible {
        chain: String,
        expected: String,
        found: String,
    },
}

impl From<ChainError> for Error {
    fn from(err: ChainError) -> Self {
        Self::validation(ErrorOrigin::Chain, err.to_string())
    }
}

///
/// FieldChain
///
/// A parsed dotted path. Every segment but the last is a hop across a
/// relational field; the last names the field written on the records the
/// hops reach.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldChain {
    raw: String,
    segments: Vec<String>,
}

impl FieldChain {
    /// Split and lexically check a dotted path.
    pub fn parse(raw: &str) -> Result<Self, ChainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut segments = Vec::new();
        for (index, segment) in trimmed.split('.').enumerate() {
            if segment.is_empty() {
                return Err(ChainError::EmptySegment {
                    chain: trimmed.to_string(),
                    index,
                });
            }
            if !is_field_name(segment) {
                return Err(ChainError::InvalidSegment {
                    chain: trimmed.to_string(),
                    segment: segment.to_string(),
                });
            }
            segments.push(segment.to_string());
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Relational hops (every segment but the last).
    #[must_use]
    pub fn hops(&self) -> &[String] {
        &self.segments[..self.segments.len() - 1]
    }

    /// Field written on the resolved records.
    #[must_use]
    pub fn terminal(&self) -> &str {
        &self.segments[self.segments.len() - 1]
    }

    /// Check the chain against model metadata starting at `root_model`.
    /// Returns the model reached by the hops and the terminal field.
    pub fn check<'a>(
        &self,
        registry: &'a ModelRegistry,
        root_model: &str,
        max_depth: usize,
    ) -> Result<ChainTarget<'a>, ChainError> {
        if self.segments.len() > max_depth {
            return Err(ChainError::TooDeep {
                chain: self.raw.clone(),
                depth: self.segments.len(),
                max: max_depth,
            });
        }

        let mut model = root_model.to_string();
        for hop in self.hops() {
            let field = self.lookup(registry, &model, hop)?;
            let Some(target) = field.kind.relation() else {
                return Err(ChainError::NotRelational {
                    chain: self.raw.clone(),
                    model,
                    field: hop.clone(),
                    ttype: field.kind.ttype(),
                });
            };
            model = target.to_string();
        }

        let field = self.lookup(registry, &model, self.terminal())?;

        Ok(ChainTarget { model, field })
    }

    /// Check the chain and require its terminal field to be able to receive
    /// values of `main` (the swapper's own field).
    pub fn check_compatible<'a>(
        &self,
        registry: &'a ModelRegistry,
        root_model: &str,
        main: &FieldModel,
        max_depth: usize,
    ) -> Result<ChainTarget<'a>, ChainError> {
        let target = self.check(registry, root_model, max_depth)?;

        if !target.field.kind.is_compatible_with(&main.kind) {
            return Err(ChainError::Incompatible {
                chain: self.raw.clone(),
                expected: describe(main),
                found: describe(target.field),
            });
        }

        Ok(target)
    }

    fn lookup<'a>(
        &self,
        registry: &'a ModelRegistry,
        model: &str,
        field: &str,
    ) -> Result<&'a FieldModel, ChainError> {
        registry
            .resolve_field(model, field)
            .map(|resolved| resolved.field)
            .map_err(|_| ChainError::UnknownField {
                chain: self.raw.clone(),
                model: model.to_string(),
                field: field.to_string(),
            })
    }
}

///
/// ChainTarget
///

#[derive(Clone, Debug)]
pub struct ChainTarget<'a> {
    pub model: String,
    pub field: &'a FieldModel,
}

// Field names are ASCII identifiers.
fn is_field_name(segment: &str) -> bool {
    let mut chars = segment.chars();

    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn describe(field: &FieldModel) -> String {
    match field.kind.relation() {
        Some(target) => format!("{} -> {target}", field.kind.ttype()),
        None => field.kind.ttype().to_string(),
    }
}
