use crate::{
    chain::{FieldChain, traverse},
    constraint::{
        ConstraintError,
        ast::{Builtin, CompareOp, Expr, Literal, Member},
    },
    db::{Db, RecordSet},
    model::FieldKind,
    value::Value,
};
use std::cmp::Ordering;

///
/// Operand
///
/// Runtime value of a sub-expression.
///

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Operand {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Self>),
    Records(RecordSet),
}

impl Operand {
    pub(crate) fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(n) => *n != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Records(records) => !records.is_empty(),
        }
    }

    const fn label(&self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Records(_) => "recordset",
        }
    }

    // Relational values become record sets of the field's target model.
    fn from_value(value: Value, kind: &FieldKind) -> Self {
        if let Some(target) = kind.relation() {
            return Self::Records(RecordSet::new(target, value.record_ids()));
        }

        match value {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(n) => Self::Int(n),
            Value::Float(n) => Self::Float(n),
            Value::Text(s) => Self::Str(s),
            Value::Id(id) => Self::Int(id_int(id.get())),
            Value::Ids(ids) => Self::List(
                ids.into_iter()
                    .map(|id| Self::Int(id_int(id.get())))
                    .collect(),
            ),
        }
    }

    // Elements when used as an iterable.
    fn items(&self) -> Result<Vec<Self>, ConstraintError> {
        match self {
            Self::List(items) => Ok(items.clone()),
            Self::Records(records) => Ok(records
                .iter()
                .map(|id| Self::Records(RecordSet::new(records.model(), [*id])))
                .collect()),
            Self::Str(s) => Ok(s.chars().map(|c| Self::Str(c.to_string())).collect()),
            other => Err(ConstraintError::type_error(format!(
                "'{}' object is not iterable",
                other.label()
            ))),
        }
    }
}

fn id_int(id: u64) -> i64 {
    i64::try_from(id).unwrap_or(i64::MAX)
}

///
/// Evaluator
///

pub(crate) struct Evaluator<'a> {
    db: &'a Db,
    records: &'a RecordSet,
}

impl<'a> Evaluator<'a> {
    pub(crate) const fn new(db: &'a Db, records: &'a RecordSet) -> Self {
        Self { db, records }
    }

    pub(crate) fn eval(&self, expr: &Expr) -> Result<Operand, ConstraintError> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                Literal::None => Operand::None,
                Literal::Bool(b) => Operand::Bool(*b),
                Literal::Int(n) => Operand::Int(*n),
                Literal::Float(n) => Operand::Float(*n),
                Literal::Str(s) => Operand::Str(s.clone()),
            }),
            Expr::List(items) => items
                .iter()
                .map(|item| self.eval(item))
                .collect::<Result<_, _>>()
                .map(Operand::List),
            Expr::Records => Ok(Operand::Records(self.records.clone())),
            Expr::Call { func, args } => self.call(*func, args),
            Expr::Member { target, member } => {
                let target = self.eval(target)?;
                let Operand::Records(records) = &target else {
                    return Err(ConstraintError::type_error(format!(
                        "'{}' object has no attribute '{}'",
                        target.label(),
                        member_name(member)
                    )));
                };
                self.member(records, member)
            }
            Expr::Not(inner) => Ok(Operand::Bool(!self.eval(inner)?.truthy())),
            Expr::And(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() { self.eval(right) } else { Ok(left) }
            }
            Expr::Or(left, right) => {
                let left = self.eval(left)?;
                if left.truthy() { Ok(left) } else { self.eval(right) }
            }
            Expr::Compare { op, left, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                compare(*op, &left, &right).map(Operand::Bool)
            }
        }
    }

    fn call(&self, func: Builtin, args: &[Expr]) -> Result<Operand, ConstraintError> {
        let [arg] = args else {
            return Err(ConstraintError::Arity {
                func: func.name(),
                expected: 1,
                found: args.len(),
            });
        };
        let value = self.eval(arg)?;

        let result = match func {
            Builtin::Bool => Operand::Bool(value.truthy()),
            Builtin::Len => {
                let len = match &value {
                    Operand::Str(s) => s.chars().count(),
                    Operand::List(items) => items.len(),
                    Operand::Records(records) => records.len(),
                    other => {
                        return Err(ConstraintError::type_error(format!(
                            "object of type '{}' has no len()",
                            other.label()
                        )));
                    }
                };
                Operand::Int(i64::try_from(len).unwrap_or(i64::MAX))
            }
            Builtin::Any => Operand::Bool(value.items()?.iter().any(Operand::truthy)),
            Builtin::All => Operand::Bool(value.items()?.iter().all(Operand::truthy)),
        };

        Ok(result)
    }

    fn member(&self, records: &RecordSet, member: &Member) -> Result<Operand, ConstraintError> {
        match member {
            Member::Ids => Ok(Operand::List(
                records.iter().map(|id| Operand::Int(id_int(id.get()))).collect(),
            )),
            Member::Field(field) => self.field(records, field),
            Member::Mapped(path) => self.mapped(records, path),
            Member::Filtered(path) => {
                // check the path once so empty sets still report bad paths
                self.path(records.model(), path)?;

                let mut kept = RecordSet::empty(records.model());
                for id in records.iter() {
                    let single = RecordSet::new(records.model(), [*id]);
                    if self.mapped(&single, path)?.items()?.iter().any(Operand::truthy) {
                        kept.extend([*id]);
                    }
                }

                Ok(Operand::Records(kept))
            }
        }
    }

    // `records.field`: relational fields union across the set; scalar fields
    // need at most one record.
    fn field(&self, records: &RecordSet, field: &str) -> Result<Operand, ConstraintError> {
        let kind = self
            .db
            .registry()
            .resolve_field(records.model(), field)
            .map_err(|err| ConstraintError::InvalidPath {
                path: field.to_string(),
                model: records.model().to_string(),
                reason: err.to_string(),
            })?
            .field
            .kind
            .clone();

        if kind.is_relational() {
            return Ok(Operand::Records(self.db.mapped(records, field)?));
        }

        match records.ids() {
            [] => Ok(Operand::from_value(kind.empty_value(), &kind)),
            [id] => Ok(Operand::from_value(
                self.db.read(records.model(), *id, field)?,
                &kind,
            )),
            many => Err(ConstraintError::Singleton {
                model: records.model().to_string(),
                count: many.len(),
            }),
        }
    }

    fn mapped(&self, records: &RecordSet, path: &str) -> Result<Operand, ConstraintError> {
        let (chain, terminal) = self.path(records.model(), path)?;
        let reached = traverse(self.db, records, chain.hops())?;

        if terminal.is_relational() {
            return Ok(Operand::Records(self.db.mapped(&reached, chain.terminal())?));
        }

        let values = self.db.values(&reached, chain.terminal())?;

        Ok(Operand::List(
            values
                .into_iter()
                .map(|value| Operand::from_value(value, &terminal))
                .collect(),
        ))
    }

    // Validate a dotted path against model metadata.
    fn path(&self, model: &str, path: &str) -> Result<(FieldChain, FieldKind), ConstraintError> {
        let invalid = |reason: String| ConstraintError::InvalidPath {
            path: path.to_string(),
            model: model.to_string(),
            reason,
        };

        let chain = FieldChain::parse(path).map_err(|err| invalid(err.to_string()))?;
        let target = chain
            .check(self.db.registry(), model, usize::MAX)
            .map_err(|err| invalid(err.to_string()))?;
        let kind = target.field.kind.clone();

        Ok((chain, kind))
    }
}

fn member_name(member: &Member) -> &str {
    match member {
        Member::Field(name) => name,
        Member::Ids => "ids",
        Member::Mapped(_) => "mapped",
        Member::Filtered(_) => "filtered",
    }
}

fn compare(op: CompareOp, left: &Operand, right: &Operand) -> Result<bool, ConstraintError> {
    match op {
        CompareOp::Eq => Ok(equals(left, right)),
        CompareOp::Ne => Ok(!equals(left, right)),
        CompareOp::Lt | CompareOp::Lte | CompareOp::Gt | CompareOp::Gte => {
            let ordering = order(left, right).ok_or_else(|| {
                ConstraintError::type_error(format!(
                    "'{}' not supported between '{}' and '{}'",
                    op.symbol(),
                    left.label(),
                    right.label()
                ))
            })?;

            Ok(match op {
                CompareOp::Lt => ordering == Ordering::Less,
                CompareOp::Lte => ordering != Ordering::Greater,
                CompareOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            })
        }
        CompareOp::In => contains(right, left),
        CompareOp::NotIn => contains(right, left).map(|found| !found),
    }
}

#[expect(clippy::cast_precision_loss)]
fn as_number(operand: &Operand) -> Option<f64> {
    match operand {
        Operand::Int(n) => Some(*n as f64),
        Operand::Float(n) => Some(*n),
        Operand::Bool(b) => Some(f64::from(u8::from(*b))),
        _ => None,
    }
}

// Mixed numbers compare exactly, so `1 == 1.0` but `1e-17 != 0`.
#[expect(clippy::float_cmp)]
fn equals(left: &Operand, right: &Operand) -> bool {
    match (left, right) {
        (Operand::Int(a), Operand::Int(b)) => a == b,
        (Operand::Records(a), Operand::Records(b)) => a.same_records(b),
        (Operand::List(a), Operand::List(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| equals(x, y))
        }
        _ => match (as_number(left), as_number(right)) {
            (Some(a), Some(b)) => a == b,
            _ => left == right,
        },
    }
}

fn order(left: &Operand, right: &Operand) -> Option<Ordering> {
    match (left, right) {
        (Operand::Int(a), Operand::Int(b)) => Some(a.cmp(b)),
        (Operand::Str(a), Operand::Str(b)) => Some(a.cmp(b)),
        (Operand::None | Operand::Str(_) | Operand::List(_) | Operand::Records(_), _)
        | (_, Operand::None | Operand::Str(_) | Operand::List(_) | Operand::Records(_)) => None,
        _ => as_number(left)?.partial_cmp(&as_number(right)?),
    }
}

fn contains(haystack: &Operand, needle: &Operand) -> Result<bool, ConstraintError> {
    match (haystack, needle) {
        (Operand::List(items), _) => Ok(items.iter().any(|item| equals(item, needle))),
        (Operand::Str(hay), Operand::Str(sub)) => Ok(hay.contains(sub.as_str())),
        (Operand::Records(all), Operand::Records(some)) if all.model() == some.model() => {
            Ok(all.contains_all(some))
        }
        _ => Err(ConstraintError::type_error(format!(
            "'in <{}>' requires a compatible left operand, got '{}'",
            haystack.label(),
            needle.label()
        ))),
    }
}
