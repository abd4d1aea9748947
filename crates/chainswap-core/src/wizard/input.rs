use crate::{model::FieldKind, value::{RecordId, Value}};
use serde::{Deserialize, Serialize};

///
/// InputKind
///
/// Editor shown for the swapped field, chosen from the field kind.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InputKind {
    Scalar,
    Reference,
    ReferenceList,
    Text,
}

impl InputKind {
    #[must_use]
    pub const fn for_field(kind: &FieldKind) -> Self {
        match kind {
            FieldKind::Char | FieldKind::Text => Self::Text,
            FieldKind::Many2one { .. } => Self::Reference,
            FieldKind::Many2many { .. } | FieldKind::One2many { .. } => Self::ReferenceList,
            _ => Self::Scalar,
        }
    }
}

///
/// FieldInput
///
/// Value typed into the wizard.
///

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldInput {
    Scalar(Value),
    Reference(Option<RecordId>),
    ReferenceList(Vec<RecordId>),
    Text(String),
}

impl FieldInput {
    #[must_use]
    pub const fn kind(&self) -> InputKind {
        match self {
            Self::Scalar(_) => InputKind::Scalar,
            Self::Reference(_) => InputKind::Reference,
            Self::ReferenceList(_) => InputKind::ReferenceList,
            Self::Text(_) => InputKind::Text,
        }
    }

    /// Empty input of the given kind.
    #[must_use]
    pub const fn blank(kind: InputKind) -> Self {
        match kind {
            InputKind::Scalar => Self::Scalar(Value::Null),
            InputKind::Reference => Self::Reference(None),
            InputKind::ReferenceList => Self::ReferenceList(Vec::new()),
            InputKind::Text => Self::Text(String::new()),
        }
    }

    /// Stored form. Empty text clears the field.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Scalar(value) => value,
            Self::Reference(Some(id)) => Value::Id(id),
            Self::Reference(None) => Value::Null,
            Self::ReferenceList(ids) => Value::Ids(ids),
            Self::Text(text) if text.is_empty() => Value::Null,
            Self::Text(text) => Value::Text(text),
        }
    }
}

///
/// FormView
///
/// The wizard's single-field form.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FormView {
    pub title: String,
    pub model: String,
    pub field: FormField,
}

///
/// FormField
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub ttype: String,
    pub input: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub required: bool,
}
