use crate::model::field::{FieldKind, FieldModel};

///
/// EntityModel
/// Runtime model for one host entity (`res.partner`, `product.product`, ...).
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EntityModel {
    /// Stable external name used in configurations and action bindings.
    pub name: String,
    /// Ordered own fields.
    pub fields: Vec<FieldModel>,
    /// Delegated parents; their fields are readable and writable through the link.
    pub inherits: Vec<Delegation>,
}

///
/// Delegation
///
/// Delegated inheritance edge: this model embeds `parent` through the
/// many2one `link_field`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Delegation {
    pub parent: String,
    pub link_field: String,
}

impl EntityModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            inherits: Vec::new(),
        }
    }

    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldModel::new(name, kind));
        self
    }

    #[must_use]
    pub fn labeled_field(
        mut self,
        name: impl Into<String>,
        label: impl Into<String>,
        kind: FieldKind,
    ) -> Self {
        self.fields.push(FieldModel::new(name, kind).with_label(label));
        self
    }

    /// Declare delegated inheritance; the link field is added as a many2one.
    #[must_use]
    pub fn inherits(mut self, parent: impl Into<String>, link_field: impl Into<String>) -> Self {
        let parent = parent.into();
        let link_field = link_field.into();

        if self.own_field(&link_field).is_none() {
            self.fields.push(FieldModel::new(
                link_field.clone(),
                FieldKind::many2one(parent.clone()),
            ));
        }
        self.inherits.push(Delegation { parent, link_field });

        self
    }

    /// Look up a field declared directly on this model.
    #[must_use]
    pub fn own_field(&self, name: &str) -> Option<&FieldModel> {
        self.fields.iter().find(|field| field.name == name)
    }
}
