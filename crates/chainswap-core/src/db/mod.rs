//! Module: db
//! Responsibility: in-process record store standing in for the host ORM.
//! Does not own: field metadata (see `model`) or swap semantics.
//! Boundary: every read and write the engine performs goes through `Db`.

mod record_set;


use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    model::{FieldKind, ModelRegistry},
    value::{RecordId, Value},
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

pub use record_set::RecordSet;

type Row = BTreeMap<String, Value>;
type Table = BTreeMap<RecordId, Row>;

///
/// StoreError
///

#[derive(Debug, ThisError)]
pub enum StoreError {
    #[error("field '{field}' not found on model '{model}'")]
    UnknownField { model: String, field: String },

    #[error("record {model}({id}) does not exist")]
    MissingRecord { model: String, id: RecordId },

    #[error("field '{model}.{field}' is computed and cannot be written")]
    ReadOnly { model: String, field: String },

    #[error("field '{model}.{field}' is not relational")]
    NotRelational { model: String, field: String },

    #[error("field '{model}.{field}' ({ttype}) cannot store a {found} value")]
    TypeMismatch {
        model: String,
        field: String,
        ttype: &'static str,
        found: &'static str,
    },

    #[error("'{value}' is not a valid option for '{model}.{field}'")]
    InvalidOption {
        model: String,
        field: String,
        value: String,
    },

    #[error("field '{model}.{field}' references missing record {target}({id})")]
    DanglingReference {
        model: String,
        field: String,
        target: String,
        id: RecordId,
    },

    #[error("record {model}({id}) has no parent through delegation link '{link}'")]
    BrokenDelegation {
        model: String,
        id: RecordId,
        link: String,
    },
}

impl StoreError {
    pub(crate) const fn class(&self) -> ErrorClass {
        match self {
            Self::UnknownField { .. } | Self::MissingRecord { .. } => ErrorClass::NotFound,
            Self::ReadOnly { .. }
            | Self::NotRelational { .. }
            | Self::TypeMismatch { .. }
            | Self::InvalidOption { .. }
            | Self::DanglingReference { .. } => ErrorClass::Validation,
            Self::BrokenDelegation { .. } => ErrorClass::InvariantViolation,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Self::new(err.class(), ErrorOrigin::Store, err.to_string())
    }
}

///
/// FieldTarget
///
/// Owned result of resolving a field for a read or write: where the value
/// lives and how to get there.
///

struct FieldTarget {
    owner: String,
    links: Vec<String>,
    kind: FieldKind,
}

///
/// Db
///
/// Tables keyed by model name. Record ids are allocated from one counter
/// shared by every model.
///

#[derive(Clone, Debug)]
pub struct Db {
    registry: ModelRegistry,
    tables: BTreeMap<String, Table>,
    next_id: u64,
}

impl Db {
    /// Build a store over a checked model registry.
    pub fn new(registry: ModelRegistry) -> Result<Self, Error> {
        registry.check()?;
        let tables = registry
            .names()
            .map(|name| (name.to_string(), Table::new()))
            .collect();

        Ok(Self {
            registry,
            tables,
            next_id: 1,
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Run `f` as one atomic unit: every row change made inside is discarded
    /// when it returns an error.
    pub fn transaction<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let tables = self.tables.clone();
        let next_id = self.next_id;

        match f(self) {
            Ok(result) => Ok(result),
            Err(err) => {
                self.tables = tables;
                self.next_id = next_id;
                tracing::debug!(error = %err.display_with_class(), "transaction rolled back");

                Err(err)
            }
        }
    }

    //
    // READ
    //

    #[must_use]
    pub fn exists(&self, model: &str, id: RecordId) -> bool {
        self.tables
            .get(model)
            .is_some_and(|table| table.contains_key(&id))
    }

    /// Build a record set, checking that every id exists.
    pub fn browse(
        &self,
        model: &str,
        ids: impl IntoIterator<Item = RecordId>,
    ) -> Result<RecordSet, Error> {
        self.registry.try_get(model)?;
        let records = RecordSet::new(model, ids);
        self.ensure_exists(&records)?;

        Ok(records)
    }

    /// Every record of a model, in id order.
    pub fn search_all(&self, model: &str) -> Result<RecordSet, Error> {
        let table = self.table(model)?;

        Ok(RecordSet::new(model, table.keys().copied()))
    }

    /// Read one field of one record.
    pub fn read(&self, model: &str, id: RecordId, field: &str) -> Result<Value, Error> {
        let target = self.field_target(model, field)?;
        self.ensure_record(model, id)?;

        if let FieldKind::One2many {
            target: child_model,
            inverse,
        } = &target.kind
        {
            return Ok(Value::Ids(self.inverse_ids(child_model, inverse, model, id)?));
        }

        let owner_id = self.follow_links(model, id, &target.links)?;
        let value = self
            .table(&target.owner)?
            .get(&owner_id)
            .and_then(|row| row.get(field))
            .cloned()
            .unwrap_or_else(|| target.kind.empty_value());

        Ok(value)
    }

    /// Read one field across a record set, in record order.
    pub fn values(&self, records: &RecordSet, field: &str) -> Result<Vec<Value>, Error> {
        records
            .iter()
            .map(|id| self.read(records.model(), *id, field))
            .collect()
    }

    /// Follow a relational field on every record and union the results.
    pub fn mapped(&self, records: &RecordSet, field: &str) -> Result<RecordSet, Error> {
        let target = self.field_target(records.model(), field)?;
        let Some(target_model) = target.kind.relation() else {
            return Err(StoreError::NotRelational {
                model: records.model().to_string(),
                field: field.to_string(),
            }
            .into());
        };

        let mut related = RecordSet::empty(target_model);
        for id in records.iter() {
            let value = self.read(records.model(), *id, field)?;
            related.extend(value.record_ids());
        }

        Ok(related)
    }

    //
    // WRITE
    //

    /// Create a record. Delegated parents are created on the fly unless the
    /// link field is supplied.
    pub fn create<'f>(
        &mut self,
        model: &str,
        values: impl IntoIterator<Item = (&'f str, Value)>,
    ) -> Result<RecordId, Error> {
        let values: Vec<(&str, Value)> = values.into_iter().collect();

        self.transaction(|db| {
            let entity = db.registry.try_get(model)?.clone();
            let id = RecordId(db.next_id);
            db.next_id += 1;
            db.tables
                .entry(entity.name.clone())
                .or_default()
                .insert(id, Row::new());

            let own: Vec<&(&str, Value)> = values
                .iter()
                .filter(|(field, _)| entity.own_field(field).is_some())
                .collect();
            let record = RecordSet::new(model, [id]);
            for (field, value) in own {
                db.write(&record, field, value.clone())?;
            }

            for delegation in &entity.inherits {
                let linked = db.read(model, id, &delegation.link_field)?;
                if linked.is_null() {
                    let parent_id = db.create(&delegation.parent, [])?;
                    db.write(&record, &delegation.link_field, Value::Id(parent_id))?;
                }
            }

            for (field, value) in values.iter().filter(|(field, _)| entity.own_field(field).is_none()) {
                db.write(&record, field, value.clone())?;
            }

            Ok(id)
        })
    }

    /// Write the same value to one field of every record in the set.
    /// Returns the number of records written.
    pub fn write(&mut self, records: &RecordSet, field: &str, value: Value) -> Result<usize, Error> {
        let model = records.model();
        let target = self.field_target(model, field)?;
        self.check_writable(model, field, &target.kind, &value)?;

        let mut owner_ids = Vec::with_capacity(records.len());
        for id in records.iter() {
            self.ensure_record(model, *id)?;
            owner_ids.push(self.follow_links(model, *id, &target.links)?);
        }

        let table = self.table_mut(&target.owner)?;
        for owner_id in owner_ids {
            if let Some(row) = table.get_mut(&owner_id) {
                row.insert(field.to_string(), value.clone());
            }
        }

        Ok(records.len())
    }

    /// Delete records; references to them are cleared.
    pub fn unlink(&mut self, records: &RecordSet) -> Result<usize, Error> {
        self.ensure_exists(records)?;
        let model = records.model().to_string();

        let table = self.table_mut(&model)?;
        for id in records.iter() {
            table.remove(id);
        }

        // Phase 2: clear dangling references from every relational field.
        let mut referencing = Vec::new();
        for entity in self.registry.models() {
            for field in &entity.fields {
                match &field.kind {
                    FieldKind::Many2one { target } if *target == model => {
                        referencing.push((entity.name.clone(), field.name.clone(), false));
                    }
                    FieldKind::Many2many { target } if *target == model => {
                        referencing.push((entity.name.clone(), field.name.clone(), true));
                    }
                    _ => {}
                }
            }
        }

        for (owner, field, many) in referencing {
            for row in self.table_mut(&owner)?.values_mut() {
                let Some(value) = row.get_mut(&field) else {
                    continue;
                };
                let cleared = match value {
                    Value::Id(id) => !many && records.contains(id),
                    Value::Ids(ids) => {
                        if many {
                            ids.retain(|id| !records.contains(id));
                        }
                        false
                    }
                    _ => false,
                };
                if cleared {
                    *value = Value::Null;
                }
            }
        }

        Ok(records.len())
    }

    //
    // INTERNAL
    //

    fn table(&self, model: &str) -> Result<&Table, Error> {
        self.registry.try_get(model)?;

        self.tables.get(model).ok_or_else(|| {
            Error::invariant(ErrorOrigin::Store, format!("table for '{model}' missing"))
        })
    }

    fn table_mut(&mut self, model: &str) -> Result<&mut Table, Error> {
        self.registry.try_get(model)?;

        self.tables.get_mut(model).ok_or_else(|| {
            Error::invariant(ErrorOrigin::Store, format!("table for '{model}' missing"))
        })
    }

    fn field_target(&self, model: &str, field: &str) -> Result<FieldTarget, Error> {
        let resolved = self.registry.resolve_field(model, field).map_err(|_| {
            StoreError::UnknownField {
                model: model.to_string(),
                field: field.to_string(),
            }
        })?;

        Ok(FieldTarget {
            owner: resolved.owner.to_string(),
            links: resolved.links.iter().map(ToString::to_string).collect(),
            kind: resolved.field.kind.clone(),
        })
    }

    fn ensure_record(&self, model: &str, id: RecordId) -> Result<(), Error> {
        if self.table(model)?.contains_key(&id) {
            Ok(())
        } else {
            Err(StoreError::MissingRecord {
                model: model.to_string(),
                id,
            }
            .into())
        }
    }

    fn ensure_exists(&self, records: &RecordSet) -> Result<(), Error> {
        for id in records.iter() {
            self.ensure_record(records.model(), *id)?;
        }

        Ok(())
    }

    // Walk delegation links from (model, id) to the record that owns the value.
    fn follow_links(&self, model: &str, id: RecordId, links: &[String]) -> Result<RecordId, Error> {
        let mut current_model = model.to_string();
        let mut current_id = id;

        for link in links {
            let parent = match self.read(&current_model, current_id, link)? {
                Value::Id(parent) => parent,
                _ => {
                    return Err(StoreError::BrokenDelegation {
                        model: current_model,
                        id: current_id,
                        link: link.clone(),
                    }
                    .into());
                }
            };
            let next_model = self
                .registry
                .resolve_field(&current_model, link)?
                .field
                .kind
                .relation()
                .map(ToString::to_string)
                .ok_or_else(|| {
                    Error::invariant(ErrorOrigin::Store, format!("link '{link}' is not relational"))
                })?;

            current_model = next_model;
            current_id = parent;
        }

        Ok(current_id)
    }

    // One2many values are computed from the inverse many2one.
    fn inverse_ids(
        &self,
        target: &str,
        inverse: &str,
        model: &str,
        id: RecordId,
    ) -> Result<Vec<RecordId>, Error> {
        let ids = self
            .table(target)?
            .iter()
            .filter(|(_, row)| row.get(inverse) == Some(&Value::Id(id)))
            .map(|(child, _)| *child)
            .collect();
        tracing::trace!(model, %id, target, inverse, "computed one2many");

        Ok(ids)
    }

    fn check_writable(
        &self,
        model: &str,
        field: &str,
        kind: &FieldKind,
        value: &Value,
    ) -> Result<(), Error> {
        if matches!(kind, FieldKind::One2many { .. }) {
            return Err(StoreError::ReadOnly {
                model: model.to_string(),
                field: field.to_string(),
            }
            .into());
        }

        if !kind.accepts(value) {
            let err = match (kind, value) {
                (FieldKind::Selection { .. }, Value::Text(text)) => StoreError::InvalidOption {
                    model: model.to_string(),
                    field: field.to_string(),
                    value: text.clone(),
                },
                _ => StoreError::TypeMismatch {
                    model: model.to_string(),
                    field: field.to_string(),
                    ttype: kind.ttype(),
                    found: value.label(),
                },
            };
            return Err(err.into());
        }

        if let Some(target) = kind.relation() {
            for id in value.record_ids() {
                if !self.exists(target, id) {
                    return Err(StoreError::DanglingReference {
                        model: model.to_string(),
                        field: field.to_string(),
                        target: target.to_string(),
                        id,
                    }
                    .into());
                }
            }
        }

        Ok(())
    }
}
