//! Module: constraint
//! Responsibility: the boolean guard language evaluated over an acting
//! record set before a swap is allowed.
//! Does not own: deciding what happens when a guard fails (see `wizard`).
//! Boundary: only `records` and the built-ins in `ast::Builtin` are
//! reachable from an expression; everything else is refused by the parser.

pub mod ast;
mod eval;
mod lex;
mod parse;

#[cfg(test)]
mod tests;

use crate::{
    db::{Db, RecordSet},
    error::{Error, ErrorOrigin},
};
use thiserror::Error as ThisError;

pub use parse::{MAX_NESTING, RECORDS};

///
/// ConstraintError
///

#[derive(Debug, ThisError)]
pub enum ConstraintError {
    #[error("syntax error at offset {pos}: {message}")]
    Syntax { pos: usize, message: String },

    #[error("name '{name}' is not defined (offset {pos}); only 'records' is available")]
    UnknownSymbol { name: String, pos: usize },

    #[error("function '{name}' is not allowed (offset {pos})")]
    UnknownFunction { name: String, pos: usize },

    #[error("record sets have no method '{name}' (offset {pos})")]
    UnknownMethod { name: String, pos: usize },

    #[error("{func}() takes exactly {expected} argument(s), {found} given")]
    Arity {
        func: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("type error: {0}")]
    Type(String),

    #[error("invalid field path '{path}' on '{model}': {reason}")]
    InvalidPath {
        path: String,
        model: String,
        reason: String,
    },

    #[error("expected a single {model} record, got {count}")]
    Singleton { model: String, count: usize },

    #[error("{0}")]
    Store(String),
}

impl ConstraintError {
    pub(crate) fn syntax(pos: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    /// True when the expression was refused before evaluation.
    #[must_use]
    pub const fn is_parse_error(&self) -> bool {
        matches!(
            self,
            Self::Syntax { .. }
                | Self::UnknownSymbol { .. }
                | Self::UnknownFunction { .. }
                | Self::UnknownMethod { .. }
        )
    }
}

impl From<Error> for ConstraintError {
    fn from(err: Error) -> Self {
        Self::Store(err.message)
    }
}

impl From<ConstraintError> for Error {
    fn from(err: ConstraintError) -> Self {
        Self::validation(ErrorOrigin::Constraint, err.to_string())
    }
}

///
/// Constraint
///
/// A compiled guard expression. Compilation only parses; evaluation reads
/// the record store.
///

#[derive(Clone, Debug, PartialEq)]
pub struct Constraint {
    source: String,
    expr: ast::Expr,
}

impl Constraint {
    pub fn compile(source: &str) -> Result<Self, ConstraintError> {
        let expr = parse::parse(source)?;

        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    #[must_use]
    pub const fn expr(&self) -> &ast::Expr {
        &self.expr
    }

    /// Evaluate against `records`, reducing the result by truthiness.
    pub fn evaluate(&self, db: &Db, records: &RecordSet) -> Result<bool, ConstraintError> {
        let value = eval::Evaluator::new(db, records).eval(&self.expr)?;

        Ok(value.truthy())
    }
}

/// Compile `source` and run it once against the empty record set of `model`,
/// so that bad field paths surface when the expression is saved.
pub fn check_expression(db: &Db, model: &str, source: &str) -> Result<Constraint, ConstraintError> {
    let constraint = Constraint::compile(source)?;
    db.registry()
        .try_get(model)
        .map_err(|err| ConstraintError::Store(err.to_string()))?;

    constraint.evaluate(db, &RecordSet::empty(model))?;

    Ok(constraint)
}
