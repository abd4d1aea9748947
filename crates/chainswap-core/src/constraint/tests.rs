use crate::{
    constraint::{
        Constraint, ConstraintError, MAX_NESTING,
        ast::{CompareOp, Expr, Member},
        check_expression,
    },
    db::{Db, RecordSet},
    demo::{self, COMPANY, PARTNER, PARTNER_CATEGORY},
    value::Value,
};

struct Fixture {
    db: Db,
    parent: RecordSet,
    children: RecordSet,
}

fn fixture() -> Fixture {
    let mut db = Db::new(demo::registry().unwrap()).unwrap();
    let vip = db.create(PARTNER_CATEGORY, [("name", "vip".into())]).unwrap();
    let company = db.create(COMPANY, [("name", "acme".into())]).unwrap();
    let parent = db
        .create(
            PARTNER,
            [
                ("name", "parent".into()),
                ("lang", "en_US".into()),
                ("company_id", Value::Id(company)),
                ("category_id", Value::Ids(vec![vip])),
            ],
        )
        .unwrap();
    let c1 = db
        .create(
            PARTNER,
            [
                ("name", "c1".into()),
                ("parent_id", Value::Id(parent)),
                ("color", Value::Int(3)),
            ],
        )
        .unwrap();
    let c2 = db
        .create(PARTNER, [("name", "c2".into()), ("parent_id", Value::Id(parent))])
        .unwrap();

    Fixture {
        db,
        parent: RecordSet::new(PARTNER, [parent]),
        children: RecordSet::new(PARTNER, [c1, c2]),
    }
}

fn eval(fx: &Fixture, records: &RecordSet, source: &str) -> bool {
    Constraint::compile(source)
        .unwrap()
        .evaluate(&fx.db, records)
        .unwrap()
}

//
// parsing
//

#[test]
fn parse_builds_member_chain() {
    let constraint = Constraint::compile("not records.mapped('parent_id')").unwrap();

    let Expr::Not(inner) = constraint.expr() else {
        panic!("expected a negation");
    };
    assert!(matches!(
        inner.as_ref(),
        Expr::Member { member: Member::Mapped(path), .. } if path == "parent_id"
    ));
}

#[test]
fn parse_binds_comparison_tighter_than_boolean_operators() {
    let constraint = Constraint::compile("len(records) == 1 and True").unwrap();

    let Expr::And(left, _) = constraint.expr() else {
        panic!("expected a conjunction");
    };
    assert!(matches!(
        left.as_ref(),
        Expr::Compare { op: CompareOp::Eq, .. }
    ));
}

#[test]
fn parse_reads_not_in_as_one_operator() {
    let constraint = Constraint::compile("'x' not in ['a', 'b']").unwrap();

    assert!(matches!(
        constraint.expr(),
        Expr::Compare { op: CompareOp::NotIn, .. }
    ));
}

#[test]
fn parse_rejects_free_text() {
    let err = Constraint::compile("Something incorrect").unwrap_err();

    assert!(err.is_parse_error());
}

#[test]
fn parse_rejects_names_outside_the_allowed_set() {
    assert!(matches!(
        Constraint::compile("env['res.users']"),
        Err(ConstraintError::UnknownSymbol { ref name, .. }) if name == "env"
    ));
    assert!(matches!(
        Constraint::compile("__import__('os')"),
        Err(ConstraintError::UnknownFunction { .. })
    ));
    assert!(matches!(
        Constraint::compile("records.unlink('x')"),
        Err(ConstraintError::UnknownMethod { ref name, .. }) if name == "unlink"
    ));
}

#[test]
fn parse_reports_syntax_errors_with_offsets() {
    assert!(matches!(
        Constraint::compile("records.mapped('a'"),
        Err(ConstraintError::Syntax { pos: 18, .. })
    ));
    assert!(matches!(
        Constraint::compile("1 < 2 < 3"),
        Err(ConstraintError::Syntax { pos: 6, .. })
    ));
    assert!(matches!(
        Constraint::compile("'open"),
        Err(ConstraintError::Syntax { pos: 0, .. })
    ));
    assert!(matches!(
        Constraint::compile(""),
        Err(ConstraintError::Syntax { .. })
    ));
    assert!(Constraint::compile("records.mapped(parent_id)").is_err());
}

//
// evaluation
//

#[test]
fn mapped_parent_is_empty_only_for_top_level_partners() {
    let fx = fixture();
    let source = "not records.mapped('parent_id')";

    assert!(eval(&fx, &fx.parent, source));
    assert!(!eval(&fx, &fx.children, source));
}

#[test]
fn mapped_follows_dotted_paths() {
    let fx = fixture();

    assert!(eval(
        &fx,
        &fx.children,
        "records.mapped('parent_id.company_id.name') == ['acme']"
    ));
    assert!(eval(&fx, &fx.children, "len(records.mapped('parent_id')) == 1"));
}

#[test]
fn scalar_mapped_yields_one_value_per_record() {
    let fx = fixture();

    assert!(eval(&fx, &fx.children, "records.mapped('name') == ['c1', 'c2']"));
    assert!(eval(&fx, &fx.children, "'c2' in records.mapped('name')"));
    assert!(eval(&fx, &fx.children, "not all(records.mapped('color'))"));
    assert!(eval(&fx, &fx.children, "any(records.mapped('color'))"));
}

#[test]
fn filtered_keeps_records_with_truthy_paths() {
    let fx = fixture();

    assert!(eval(&fx, &fx.children, "len(records.filtered('color')) == 1"));
    assert!(eval(
        &fx,
        &fx.children,
        "records.filtered('parent_id.category_id') == records"
    ));
}

#[test]
fn field_access_on_singletons_and_relations() {
    let fx = fixture();

    assert!(eval(&fx, &fx.parent, "records.lang == 'en_US'"));
    assert!(eval(&fx, &fx.parent, "len(records.child_ids) == 2"));
    assert!(eval(&fx, &fx.children, "records.parent_id.name == 'parent'"));
}

#[test]
fn field_access_on_many_records_needs_a_singleton() {
    let fx = fixture();
    let err = Constraint::compile("records.name == 'c1'")
        .unwrap()
        .evaluate(&fx.db, &fx.children)
        .unwrap_err();

    assert!(matches!(err, ConstraintError::Singleton { count: 2, .. }));
}

#[test]
fn ids_and_membership() {
    let fx = fixture();
    let first = fx.children.ids()[0].get();

    assert!(eval(&fx, &fx.children, &format!("{first} in records.ids")));
    assert!(eval(&fx, &fx.children, "records.mapped('parent_id') not in records"));
    assert!(eval(&fx, &fx.children, "'c' in 'abc' and 3 >= 2.5"));
}

#[test]
fn boolean_operators_short_circuit() {
    let fx = fixture();

    // the right side would fail with a type error if evaluated
    assert!(eval(&fx, &fx.parent, "True or 'a' < 1"));
    assert!(!eval(&fx, &fx.parent, "False and 'a' < 1"));
}

#[test]
fn numbers_compare_exactly() {
    let fx = fixture();

    assert!(eval(&fx, &fx.parent, "1 == 1.0"));
    assert!(eval(&fx, &fx.parent, "True == 1"));
    assert!(!eval(&fx, &fx.parent, "0.00000000000000001 == 0"));
    assert!(eval(&fx, &fx.parent, "0.00000000000000001 != 0"));
}

#[test]
fn ordering_mixed_types_is_an_error() {
    let fx = fixture();
    let err = Constraint::compile("'a' < 1")
        .unwrap()
        .evaluate(&fx.db, &fx.parent)
        .unwrap_err();

    assert!(matches!(err, ConstraintError::Type(_)));
}

#[test]
fn builtins_check_arity() {
    let fx = fixture();
    let err = Constraint::compile("len(records, records)")
        .unwrap()
        .evaluate(&fx.db, &fx.parent)
        .unwrap_err();

    assert!(matches!(
        err,
        ConstraintError::Arity { func: "len", expected: 1, found: 2 }
    ));
}

//
// write-time check
//

#[test]
fn check_expression_evaluates_against_empty_set() {
    let fx = fixture();

    assert!(check_expression(&fx.db, PARTNER, "not records.mapped('parent_id')").is_ok());
    assert!(check_expression(&fx.db, PARTNER, "bool(records) or True").is_ok());
}

#[test]
fn check_expression_catches_bad_paths_on_empty_set() {
    let fx = fixture();

    let unknown = check_expression(&fx.db, PARTNER, "records.mapped('nope')").unwrap_err();
    assert!(matches!(unknown, ConstraintError::InvalidPath { .. }));

    let scalar_hop = check_expression(&fx.db, PARTNER, "records.mapped('name.lang')").unwrap_err();
    assert!(matches!(scalar_hop, ConstraintError::InvalidPath { .. }));

    let field = check_expression(&fx.db, PARTNER, "records.nope").unwrap_err();
    assert!(matches!(field, ConstraintError::InvalidPath { .. }));
}

#[test]
fn constraint_errors_become_validation_errors() {
    let err: crate::error::Error = Constraint::compile("Something incorrect")
        .unwrap_err()
        .into();

    assert!(err.is_validation());
    assert_eq!(err.origin, crate::error::ErrorOrigin::Constraint);
}

//
// nesting limits
//

fn assert_too_deep(fx: &Fixture, source: &str) {
    let err = check_expression(&fx.db, PARTNER, source).unwrap_err();

    assert!(err.is_parse_error(), "{err}");
    assert!(err.to_string().contains("nests deeper"), "{err}");
}

#[test]
fn deeply_nested_expressions_are_rejected_at_save() {
    let fx = fixture();
    let n = 5_000;

    assert_too_deep(&fx, &format!("{}records{}", "(".repeat(n), ")".repeat(n)));
    assert_too_deep(&fx, &format!("{}records{}", "[".repeat(n), "]".repeat(n)));
    assert_too_deep(&fx, &format!("{}records{}", "bool(".repeat(n), ")".repeat(n)));
    assert_too_deep(&fx, &format!("{}records", "not ".repeat(n)));
}

#[test]
fn long_operator_chains_are_rejected_at_save() {
    let fx = fixture();

    assert_too_deep(&fx, &vec!["records"; 5_000].join(" and "));
    assert_too_deep(&fx, &vec!["True"; 5_000].join(" or "));
    assert_too_deep(&fx, &format!("records{}", ".ids".repeat(5_000)));
}

#[test]
fn nesting_up_to_the_limit_is_accepted() {
    let fx = fixture();
    let depth = MAX_NESTING - 1;

    let parens = format!("{}records{}", "(".repeat(depth), ")".repeat(depth));
    assert!(check_expression(&fx.db, PARTNER, &parens).is_ok());

    let nots = format!("{}records", "not ".repeat(depth));
    assert!(check_expression(&fx.db, PARTNER, &nots).is_ok());

    let chain = vec!["True"; MAX_NESTING].join(" and ");
    assert!(eval(&fx, &fx.parent, &chain));
}
