//! Demo data: a small partner/product model set and the stock "Language"
//! swapper that cascades a partner's language onto its contacts.

use crate::{
    env::Env,
    error::Error,
    manifest::Manifest,
    model::{EntityModel, FieldKind, ModelError, ModelRegistry},
};

pub const PARTNER: &str = "res.partner";
pub const PARTNER_CATEGORY: &str = "res.partner.category";
pub const COMPANY: &str = "res.company";
pub const PRODUCT_TEMPLATE: &str = "product.template";
pub const PRODUCT: &str = "product.product";

/// Languages a partner may use.
pub const PARTNER_LANGS: [&str; 3] = ["en_US", "es_ES", "fr_FR"];

pub const MANIFEST: &str = r#"
[settings]
action_prefix = "Chained swap"

[[swapper]]
name = "Language"
model = "res.partner"
field = "lang"
chains = ["child_ids.lang"]
bind_action = true

[[swapper.constraint]]
name = "Only parent company"
expression = "not records.mapped('parent_id')"
"#;

/// Partner, company and product models.
pub fn registry() -> Result<ModelRegistry, ModelError> {
    ModelRegistry::new()
        .with(
            EntityModel::new(PARTNER)
                .field("name", FieldKind::Char)
                .labeled_field("lang", "Language", FieldKind::selection(PARTNER_LANGS))
                .labeled_field("parent_id", "Related Company", FieldKind::many2one(PARTNER))
                .labeled_field(
                    "child_ids",
                    "Contacts",
                    FieldKind::one2many(PARTNER, "parent_id"),
                )
                .labeled_field("company_id", "Company", FieldKind::many2one(COMPANY))
                .labeled_field(
                    "category_id",
                    "Tags",
                    FieldKind::many2many(PARTNER_CATEGORY),
                )
                .labeled_field("comment", "Notes", FieldKind::Text)
                .field("color", FieldKind::Integer)
                .field("active", FieldKind::Boolean),
        )?
        .with(EntityModel::new(PARTNER_CATEGORY).field("name", FieldKind::Char))?
        .with(
            EntityModel::new(COMPANY)
                .field("name", FieldKind::Char)
                // companies only ship with the default language
                .labeled_field("lang", "Language", FieldKind::selection(["en_US"]))
                .field("partner_id", FieldKind::many2one(PARTNER)),
        )?
        .with(
            EntityModel::new(PRODUCT_TEMPLATE)
                .field("name", FieldKind::Char)
                .labeled_field("description", "Description", FieldKind::Text)
                .labeled_field("list_price", "Sales Price", FieldKind::Float),
        )?
        .with(
            EntityModel::new(PRODUCT)
                .field("default_code", FieldKind::Char)
                .inherits(PRODUCT_TEMPLATE, "product_tmpl_id"),
        )
}

/// Environment over the demo models with the demo manifest loaded.
pub fn env() -> Result<Env, Error> {
    let mut env = Env::new(registry()?)?;
    let manifest = Manifest::from_toml(MANIFEST)?;
    env.load_manifest(manifest)?;

    Ok(env)
}
