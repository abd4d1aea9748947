use crate::{
    demo::{self, COMPANY, PARTNER, PRODUCT, PRODUCT_TEMPLATE},
    env::Env,
    error::ErrorClass,
    obs::{metrics_report, metrics_reset_all},
    swapper::{SwapperDraft, SwapperId},
    value::{RecordId, Value},
    wizard::{FieldInput, InputKind, PropagationWizard, WizardContext, WizardState},
};

struct Family {
    env: Env,
    company: RecordId,
    parent: RecordId,
    children: [RecordId; 2],
}

fn family() -> Family {
    let mut env = Env::new(demo::registry().unwrap()).unwrap();
    let db = env.db_mut();
    let company = db.create(COMPANY, [("name", "acme".into())]).unwrap();
    let parent = db
        .create(
            PARTNER,
            [
                ("name", "parent".into()),
                ("lang", "en_US".into()),
                ("company_id", Value::Id(company)),
            ],
        )
        .unwrap();
    let c1 = db
        .create(
            PARTNER,
            [
                ("name", "c1".into()),
                ("lang", "en_US".into()),
                ("parent_id", Value::Id(parent)),
            ],
        )
        .unwrap();
    let c2 = db
        .create(PARTNER, [("name", "c2".into()), ("parent_id", Value::Id(parent))])
        .unwrap();

    Family {
        env,
        company,
        parent,
        children: [c1, c2],
    }
}

fn language_swapper(env: &mut Env) -> SwapperId {
    env.create_swapper(
        SwapperDraft::new("Language", PARTNER, "lang")
            .chain("child_ids.lang")
            .constraint("Only parent company", "not records.mapped('parent_id')"),
    )
    .unwrap()
}

fn ctx(swapper_id: SwapperId, model: &str, ids: &[RecordId]) -> WizardContext {
    WizardContext {
        active_model: model.to_string(),
        active_id: ids.first().copied(),
        active_ids: ids.to_vec(),
        swapper_id,
    }
}

fn lang(env: &Env, id: RecordId) -> Value {
    env.db().read(PARTNER, id, "lang").unwrap()
}

#[test]
fn language_cascades_to_children() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    wizard.validate(&fx.env).unwrap();
    let report = wizard
        .apply(&mut fx.env, FieldInput::Scalar("es_ES".into()))
        .unwrap();

    assert_eq!(wizard.state(), WizardState::Applied);
    for id in [fx.parent, fx.children[0], fx.children[1]] {
        assert_eq!(lang(&fx.env, id), Value::from("es_ES"));
    }
    assert_eq!(report.written(), 3);
    assert_eq!(
        report.written_ids(PARTNER, "lang"),
        vec![fx.parent, fx.children[0], fx.children[1]]
    );
    assert_eq!(report.changes[0].previous, Value::from("en_US"));
    assert_eq!(report.changes[2].previous, Value::Null);
}

#[test]
fn failing_constraint_aborts_without_writes() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);
    let child = fx.children[0];

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[child])).unwrap();
    let err = wizard.validate(&fx.env).unwrap_err();

    assert_eq!(err.class, ErrorClass::User);
    assert!(err.message.contains("Only parent company"));
    assert_eq!(wizard.state(), WizardState::Aborted);
    assert_eq!(lang(&fx.env, child), Value::from("en_US"));

    // an aborted wizard stays aborted
    assert!(wizard.validate(&fx.env).is_err());
    let again = wizard
        .apply(&mut fx.env, FieldInput::Scalar("es_ES".into()))
        .unwrap_err();
    assert_eq!(again.class, ErrorClass::InvariantViolation);
    assert_eq!(lang(&fx.env, child), Value::from("en_US"));
}

#[test]
fn apply_requires_validation_first() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    let err = wizard
        .apply(&mut fx.env, FieldInput::Scalar("es_ES".into()))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::InvariantViolation);
    assert_eq!(wizard.state(), WizardState::Opened);
}

#[test]
fn confirm_validates_then_applies() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    wizard
        .confirm(&mut fx.env, FieldInput::Scalar("fr_FR".into()))
        .unwrap();

    assert_eq!(lang(&fx.env, fx.children[1]), Value::from("fr_FR"));
}

#[test]
fn mismatched_input_is_rejected() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    wizard.validate(&fx.env).unwrap();
    let err = wizard
        .apply(&mut fx.env, FieldInput::Text("es_ES".into()))
        .unwrap_err();

    assert_eq!(err.class, ErrorClass::User);
    assert_eq!(wizard.state(), WizardState::Validated);
}

#[test]
fn storage_failure_rolls_back_the_source_write() {
    let mut fx = family();
    // companies only accept en_US
    let swapper = fx
        .env
        .create_swapper(SwapperDraft::new("Language", PARTNER, "lang").chain("company_id.lang"))
        .unwrap();
    metrics_reset_all();

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    wizard.validate(&fx.env).unwrap();
    let err = wizard
        .apply(&mut fx.env, FieldInput::Scalar("es_ES".into()))
        .unwrap_err();

    assert!(err.is_validation());
    assert_eq!(wizard.state(), WizardState::Aborted);
    assert_eq!(lang(&fx.env, fx.parent), Value::from("en_US"));
    assert_eq!(
        fx.env.db().read(COMPANY, fx.company, "lang").unwrap(),
        Value::Null
    );
    assert_eq!(metrics_report().ops.swaps_failed, 1);
}

#[test]
fn chains_sharing_a_terminal_are_written_once() {
    let mut fx = family();
    let swapper = fx
        .env
        .create_swapper(
            SwapperDraft::new("Language", PARTNER, "lang")
                .chain("child_ids.lang")
                .chain("child_ids.parent_id.lang"),
        )
        .unwrap();

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    let report = wizard
        .confirm(&mut fx.env, FieldInput::Scalar("es_ES".into()))
        .unwrap();

    assert_eq!(report.written(), 3);
}

#[test]
fn open_falls_back_to_active_id() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);
    let context = WizardContext {
        active_model: PARTNER.to_string(),
        active_id: Some(fx.parent),
        active_ids: Vec::new(),
        swapper_id: swapper,
    };

    let wizard = PropagationWizard::open(&fx.env, &context).unwrap();
    assert_eq!(wizard.records().ids(), &[fx.parent]);
}

#[test]
fn empty_selection_applies_nothing() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);
    let context = WizardContext {
        active_model: PARTNER.to_string(),
        active_id: None,
        active_ids: Vec::new(),
        swapper_id: swapper,
    };

    let mut wizard = PropagationWizard::open(&fx.env, &context).unwrap();
    assert!(wizard.records().is_empty());

    let report = wizard
        .confirm(&mut fx.env, FieldInput::Scalar("es_ES".into()))
        .unwrap();

    assert_eq!(report.written(), 0);
    assert_eq!(wizard.state(), WizardState::Applied);
    assert_eq!(lang(&fx.env, fx.parent), Value::from("en_US"));
    assert_eq!(lang(&fx.env, fx.children[0]), Value::from("en_US"));
}

#[test]
fn open_checks_the_context() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);

    let wrong_model = PropagationWizard::open(&fx.env, &ctx(swapper, COMPANY, &[fx.company]));
    assert!(wrong_model.unwrap_err().is_user());

    let missing = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[RecordId(999)]));
    assert!(missing.unwrap_err().is_not_found());

    let unknown = PropagationWizard::open(&fx.env, &ctx(SwapperId(42), PARTNER, &[fx.parent]));
    assert!(unknown.unwrap_err().is_not_found());
}

#[test]
fn input_follows_field_kind() {
    let mut fx = family();
    let cases = [
        ("lang", InputKind::Scalar),
        ("company_id", InputKind::Reference),
        ("category_id", InputKind::ReferenceList),
        ("comment", InputKind::Text),
        ("color", InputKind::Scalar),
    ];

    for (field, expected) in cases {
        let swapper = fx
            .env
            .create_swapper(SwapperDraft::new(field, PARTNER, field))
            .unwrap();
        let wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();

        assert_eq!(wizard.input_kind(), expected, "field {field}");
        assert_eq!(wizard.blank_input().kind(), expected);
    }
}

#[test]
fn form_view_describes_the_field() {
    let mut fx = family();
    let swapper = language_swapper(&mut fx.env);

    let wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    let view = wizard.form_view(&fx.env).unwrap();

    assert_eq!(view.title, "Chained swap: Language");
    assert_eq!(view.field.label, "Language");
    assert_eq!(view.field.input, InputKind::Scalar);
    assert_eq!(view.field.options, demo::PARTNER_LANGS.map(String::from).to_vec());

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["field"]["input"], "scalar");
    assert!(json["field"].get("relation").is_none());
}

#[test]
fn many2one_swap_reaches_children() {
    let mut fx = family();
    let other = fx
        .env
        .db_mut()
        .create(COMPANY, [("name", "globex".into())])
        .unwrap();
    let swapper = fx
        .env
        .create_swapper(SwapperDraft::new("Company", PARTNER, "company_id").chain("child_ids.company_id"))
        .unwrap();

    let mut wizard = PropagationWizard::open(&fx.env, &ctx(swapper, PARTNER, &[fx.parent])).unwrap();
    wizard
        .confirm(&mut fx.env, FieldInput::Reference(Some(other)))
        .unwrap();

    for id in [fx.parent, fx.children[0], fx.children[1]] {
        assert_eq!(
            fx.env.db().read(PARTNER, id, "company_id").unwrap(),
            Value::Id(other)
        );
    }
}

#[test]
fn text_swap_writes_delegated_field() {
    let mut env = Env::new(demo::registry().unwrap()).unwrap();
    let product = env
        .db_mut()
        .create(PRODUCT, [("default_code", "P-1".into())])
        .unwrap();
    let swapper = env
        .create_swapper(SwapperDraft::new("Description", PRODUCT, "description"))
        .unwrap();

    let mut wizard = PropagationWizard::open(&env, &ctx(swapper, PRODUCT, &[product])).unwrap();
    assert_eq!(wizard.input_kind(), InputKind::Text);
    let report = wizard
        .confirm(&mut env, FieldInput::Text("Shiny".into()))
        .unwrap();

    assert_eq!(
        env.db().read(PRODUCT, product, "description").unwrap(),
        Value::from("Shiny")
    );
    let template = env.db().read(PRODUCT, product, "product_tmpl_id").unwrap();
    let Value::Id(template) = template else {
        panic!("product without template");
    };
    assert_eq!(
        env.db().read(PRODUCT_TEMPLATE, template, "description").unwrap(),
        Value::from("Shiny")
    );
    assert_eq!(report.written_ids(PRODUCT, "description"), vec![product]);
}
