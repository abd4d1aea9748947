use crate::swapper::SwapperId;
use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory counters for swap operations.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub(crate) struct EventState {
    pub ops: EventOps,
    pub swappers: BTreeMap<SwapperId, SwapperCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // configuration
    pub swappers_saved: u64,
    pub swappers_rejected: u64,
    pub swappers_deleted: u64,

    // binder
    pub actions_bound: u64,
    pub actions_unbound: u64,

    // wizard
    pub swaps_applied: u64,
    pub swaps_blocked: u64,
    pub swaps_failed: u64,
    pub records_written: u64,
}

///
/// SwapperCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SwapperCounters {
    pub applied: u64,
    pub blocked: u64,
    pub failed: u64,
    pub records_written: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub swappers: BTreeMap<SwapperId, SwapperCounters>,
}

impl EventReport {
    #[must_use]
    pub fn swapper(&self, id: SwapperId) -> Option<&SwapperCounters> {
        self.swappers.get(&id)
    }
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

pub(crate) fn report() -> EventReport {
    with_state(|m| EventReport {
        ops: m.ops.clone(),
        swappers: m.swappers.clone(),
    })
}
