//! Module: wizard
//! Responsibility: one swap invocation, from the user's selection through the
//! constraint gate to the atomic write of source and chained targets.
//! Does not own: configuration checks (see `swapper`).
//! Boundary: all writes of one invocation run inside a single
//! `Db::transaction`.

mod input;
mod report;

#[cfg(test)]
mod tests;

use crate::{
    action::WIZARD_MODEL,
    chain::resolve_targets,
    db::{Db, RecordSet},
    env::Env,
    error::{Error, ErrorOrigin},
    model::{FieldKind, FieldModel},
    obs::{SwapEvent, sink},
    swapper::{Swapper, SwapperId},
    value::{RecordId, Value},
};
use derive_more::Display;
use serde::{Deserialize, Serialize};

pub use input::{FieldInput, FormField, FormView, InputKind};
pub use report::{SwapChange, SwapReport};

///
/// WizardContext
///
/// What the UI passes when the bound action is clicked.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct WizardContext {
    pub active_model: String,
    pub active_id: Option<RecordId>,
    #[serde(default)]
    pub active_ids: Vec<RecordId>,
    pub swapper_id: SwapperId,
}

impl WizardContext {
    /// Selected ids; falls back to `active_id` when `active_ids` is empty.
    #[must_use]
    pub fn selection(&self) -> Vec<RecordId> {
        if self.active_ids.is_empty() {
            self.active_id.into_iter().collect()
        } else {
            self.active_ids.clone()
        }
    }
}

///
/// WizardState
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum WizardState {
    Opened,
    Validated,
    Applied,
    Aborted,
}

///
/// PropagationWizard
///

#[derive(Clone, Debug)]
pub struct PropagationWizard {
    swapper_id: SwapperId,
    records: RecordSet,
    field: FieldModel,
    state: WizardState,
}

impl PropagationWizard {
    /// Open the wizard on the context's selection. An empty selection is
    /// accepted; applying it writes nothing.
    pub fn open(env: &Env, ctx: &WizardContext) -> Result<Self, Error> {
        let swapper = env.swapper(ctx.swapper_id)?;
        if ctx.active_model != swapper.model() {
            return Err(Error::user(
                ErrorOrigin::Wizard,
                format!(
                    "swapper '{}' applies to '{}', not '{}'",
                    swapper.name(),
                    swapper.model(),
                    ctx.active_model
                ),
            ));
        }

        let records = env.db().browse(swapper.model(), ctx.selection())?;
        let field = env
            .db()
            .registry()
            .resolve_field(swapper.model(), swapper.field())?
            .field
            .clone();

        tracing::debug!(
            swapper = %ctx.swapper_id,
            model = swapper.model(),
            records = records.len(),
            "wizard opened"
        );

        Ok(Self {
            swapper_id: ctx.swapper_id,
            records,
            field,
            state: WizardState::Opened,
        })
    }

    #[must_use]
    pub const fn state(&self) -> WizardState {
        self.state
    }

    #[must_use]
    pub const fn swapper_id(&self) -> SwapperId {
        self.swapper_id
    }

    #[must_use]
    pub const fn records(&self) -> &RecordSet {
        &self.records
    }

    #[must_use]
    pub const fn field(&self) -> &FieldModel {
        &self.field
    }

    #[must_use]
    pub const fn input_kind(&self) -> InputKind {
        InputKind::for_field(&self.field.kind)
    }

    #[must_use]
    pub const fn blank_input(&self) -> FieldInput {
        FieldInput::blank(self.input_kind())
    }

    /// Describe the single-field form shown to the user.
    pub fn form_view(&self, env: &Env) -> Result<FormView, Error> {
        let swapper = env.swapper(self.swapper_id)?;
        let options = match &self.field.kind {
            FieldKind::Selection { options } => options.clone(),
            _ => Vec::new(),
        };

        Ok(FormView {
            title: format!("{}: {}", env.settings().action_prefix, swapper.name()),
            model: WIZARD_MODEL.to_string(),
            field: FormField {
                name: self.field.name.clone(),
                label: self.field.label.clone(),
                ttype: self.field.kind.ttype().to_string(),
                input: self.input_kind(),
                relation: self.field.kind.relation().map(ToString::to_string),
                options,
                required: false,
            },
        })
    }

    /// Run every constraint on the selection. The first one that does not
    /// hold aborts the wizard with a user error naming it.
    pub fn validate(&mut self, env: &Env) -> Result<(), Error> {
        match self.state {
            WizardState::Validated => return Ok(()),
            WizardState::Opened => {}
            state => return Err(self.bad_state(state)),
        }

        let swapper = env.swapper(self.swapper_id)?;
        for spec in swapper.constraints() {
            let message = match spec.constraint().evaluate(env.db(), &self.records) {
                Ok(true) => continue,
                Ok(false) => format!(
                    "Not possible to swap the field due to the constraint '{}'",
                    spec.name
                ),
                Err(err) => format!("constraint '{}' could not be evaluated: {err}", spec.name),
            };

            self.state = WizardState::Aborted;
            tracing::warn!(
                swapper = %self.swapper_id,
                constraint = %spec.name,
                "swap blocked by constraint"
            );
            sink::record(SwapEvent::SwapBlocked {
                swapper: self.swapper_id,
            });

            return Err(Error::user(ErrorOrigin::Wizard, message));
        }

        self.state = WizardState::Validated;

        Ok(())
    }

    /// Write `input` to the selection and to every chained target, as one
    /// transaction.
    pub fn apply(&mut self, env: &mut Env, input: FieldInput) -> Result<SwapReport, Error> {
        if self.state != WizardState::Validated {
            return Err(self.bad_state(self.state));
        }
        if input.kind() != self.input_kind() {
            return Err(Error::user(
                ErrorOrigin::Wizard,
                format!(
                    "field '{}' expects {:?} input, got {:?}",
                    self.field.name,
                    self.input_kind(),
                    input.kind()
                ),
            ));
        }

        let swapper = env.swapper(self.swapper_id)?.clone();
        let value = input.into_value();
        let records = &self.records;

        match env
            .db
            .transaction(|db| propagate(db, &swapper, records, &value))
        {
            Ok(report) => {
                self.state = WizardState::Applied;
                let written = report.written();
                tracing::info!(
                    swapper = %self.swapper_id,
                    field = %self.field.name,
                    written,
                    "swap applied"
                );
                sink::record(SwapEvent::SwapApplied {
                    swapper: self.swapper_id,
                    records_written: u64::try_from(written).unwrap_or(u64::MAX),
                });

                Ok(report)
            }
            Err(err) => {
                self.state = WizardState::Aborted;
                tracing::warn!(
                    swapper = %self.swapper_id,
                    error = %err.display_with_class(),
                    "swap failed, nothing written"
                );
                sink::record(SwapEvent::SwapFailed {
                    swapper: self.swapper_id,
                });

                Err(err)
            }
        }
    }

    /// Validate then apply.
    pub fn confirm(&mut self, env: &mut Env, input: FieldInput) -> Result<SwapReport, Error> {
        self.validate(env)?;
        self.apply(env, input)
    }

    fn bad_state(&self, state: WizardState) -> Error {
        Error::invariant(
            ErrorOrigin::Wizard,
            format!("wizard for swapper {} is {state}", self.swapper_id),
        )
    }
}

// Write the source, then each chain's targets. Chains ending on the same
// field of the same model are unioned and written once.
fn propagate(
    db: &mut Db,
    swapper: &Swapper,
    records: &RecordSet,
    value: &Value,
) -> Result<SwapReport, Error> {
    let mut report = SwapReport {
        swapper: swapper.id(),
        value: value.clone(),
        changes: Vec::new(),
    };

    // Phase 1: source
    write_recorded(db, &mut report, records, swapper.field(), value)?;

    // Phase 2: resolve chains against the written source
    let mut groups: Vec<(&str, RecordSet)> = Vec::new();
    for chain in swapper.chains() {
        let targets = resolve_targets(db, records, chain)?;
        let existing = groups
            .iter_mut()
            .find(|(terminal, set)| *terminal == chain.terminal() && set.model() == targets.model());

        match existing {
            Some((_, set)) => {
                set.union_with(&targets);
            }
            None => groups.push((chain.terminal(), targets)),
        }
    }

    // Phase 3: targets
    for (terminal, targets) in groups {
        if !targets.is_empty() {
            write_recorded(db, &mut report, &targets, terminal, value)?;
        }
    }

    Ok(report)
}

fn write_recorded(
    db: &mut Db,
    report: &mut SwapReport,
    records: &RecordSet,
    field: &str,
    value: &Value,
) -> Result<(), Error> {
    for id in records.iter() {
        if report.contains(records.model(), field, *id) {
            continue;
        }
        let previous = db.read(records.model(), *id, field)?;
        report.changes.push(SwapChange {
            model: records.model().to_string(),
            id: *id,
            field: field.to_string(),
            previous,
            new: value.clone(),
        });
    }

    db.write(records, field, value.clone())?;

    Ok(())
}
