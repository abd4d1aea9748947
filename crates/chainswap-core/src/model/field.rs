use crate::value::Value;

///
/// FieldModel
/// Runtime field metadata used by chain checks, constraint paths and writes.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FieldModel {
    /// Technical name used in chains and expressions.
    pub name: String,
    /// Human label shown on the wizard form.
    pub label: String,
    pub kind: FieldKind,
}

impl FieldModel {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();

        Self {
            label: name.clone(),
            name,
            kind,
        }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

///
/// FieldKind
///
/// Host field types. Relational kinds carry their target model name.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Boolean,
    Integer,
    Float,
    Char,
    Text,
    Date,
    Selection { options: Vec<String> },
    Many2one { target: String },
    One2many { target: String, inverse: String },
    Many2many { target: String },
    Reference,
}

impl FieldKind {
    pub fn selection<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Selection {
            options: options.into_iter().map(Into::into).collect(),
        }
    }

    pub fn many2one(target: impl Into<String>) -> Self {
        Self::Many2one {
            target: target.into(),
        }
    }

    pub fn one2many(target: impl Into<String>, inverse: impl Into<String>) -> Self {
        Self::One2many {
            target: target.into(),
            inverse: inverse.into(),
        }
    }

    pub fn many2many(target: impl Into<String>) -> Self {
        Self::Many2many {
            target: target.into(),
        }
    }

    /// Host type tag (`ttype`).
    #[must_use]
    pub const fn ttype(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Char => "char",
            Self::Text => "text",
            Self::Date => "date",
            Self::Selection { .. } => "selection",
            Self::Many2one { .. } => "many2one",
            Self::One2many { .. } => "one2many",
            Self::Many2many { .. } => "many2many",
            Self::Reference => "reference",
        }
    }

    #[must_use]
    pub const fn is_relational(&self) -> bool {
        matches!(
            self,
            Self::Many2one { .. } | Self::One2many { .. } | Self::Many2many { .. }
        )
    }

    /// Target model of a relational field.
    #[must_use]
    pub fn relation(&self) -> Option<&str> {
        match self {
            Self::Many2one { target }
            | Self::One2many { target, .. }
            | Self::Many2many { target } => Some(target),
            _ => None,
        }
    }

    /// Whether a swapper may target this field.
    /// One2many values are computed from their inverse and references are untyped.
    #[must_use]
    pub const fn is_swappable(&self) -> bool {
        !matches!(self, Self::One2many { .. } | Self::Reference)
    }

    /// Two fields can receive the same swapped value when they share a type
    /// tag and, for relational kinds, the same target model.
    #[must_use]
    pub fn is_compatible_with(&self, other: &Self) -> bool {
        self.ttype() == other.ttype() && self.relation() == other.relation()
    }

    /// Check a value against this field's storage shape.
    #[must_use]
    pub fn accepts(&self, value: &Value) -> bool {
        if value.is_null() {
            return !matches!(self, Self::One2many { .. } | Self::Many2many { .. });
        }

        match (self, value) {
            (Self::Boolean, Value::Bool(_))
            | (Self::Integer, Value::Int(_))
            | (Self::Float, Value::Float(_) | Value::Int(_))
            | (Self::Char | Self::Text | Self::Date | Self::Reference, Value::Text(_))
            | (Self::Many2one { .. }, Value::Id(_))
            | (Self::Many2many { .. }, Value::Ids(_)) => true,
            (Self::Selection { options }, Value::Text(text)) => options.contains(text),
            _ => false,
        }
    }

    /// Value an unset field reads back as.
    #[must_use]
    pub const fn empty_value(&self) -> Value {
        match self {
            Self::One2many { .. } | Self::Many2many { .. } => Value::Ids(Vec::new()),
            _ => Value::Null,
        }
    }
}
