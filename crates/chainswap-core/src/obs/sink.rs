//! Event sink boundary.
//!
//! All instrumentation flows through `SwapEvent` and `EventSink`; this is the
//! only bridge between engine code and the counter state.

use crate::{obs::metrics, swapper::SwapperId};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn EventSink>>> = RefCell::new(None);
}

///
/// SwapEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SwapEvent {
    SwapperSaved { swapper: SwapperId },
    SwapperRejected,
    SwapperDeleted { swapper: SwapperId },
    ActionBound { swapper: SwapperId },
    ActionUnbound { swapper: SwapperId },
    SwapApplied { swapper: SwapperId, records_written: u64 },
    SwapBlocked { swapper: SwapperId },
    SwapFailed { swapper: SwapperId },
}

///
/// EventSink
///

pub trait EventSink {
    fn record(&self, event: SwapEvent);
}

///
/// GlobalEventSink
/// Default sink writing into the thread's counter state.
///

pub(crate) struct GlobalEventSink;

impl EventSink for GlobalEventSink {
    fn record(&self, event: SwapEvent) {
        metrics::with_state_mut(|m| match event {
            SwapEvent::SwapperSaved { .. } => {
                m.ops.swappers_saved = m.ops.swappers_saved.saturating_add(1);
            }
            SwapEvent::SwapperRejected => {
                m.ops.swappers_rejected = m.ops.swappers_rejected.saturating_add(1);
            }
            SwapEvent::SwapperDeleted { swapper } => {
                m.ops.swappers_deleted = m.ops.swappers_deleted.saturating_add(1);
                m.swappers.remove(&swapper);
            }
            SwapEvent::ActionBound { .. } => {
                m.ops.actions_bound = m.ops.actions_bound.saturating_add(1);
            }
            SwapEvent::ActionUnbound { .. } => {
                m.ops.actions_unbound = m.ops.actions_unbound.saturating_add(1);
            }
            SwapEvent::SwapApplied {
                swapper,
                records_written,
            } => {
                m.ops.swaps_applied = m.ops.swaps_applied.saturating_add(1);
                m.ops.records_written = m.ops.records_written.saturating_add(records_written);

                let entry = m.swappers.entry(swapper).or_default();
                entry.applied = entry.applied.saturating_add(1);
                entry.records_written = entry.records_written.saturating_add(records_written);
            }
            SwapEvent::SwapBlocked { swapper } => {
                m.ops.swaps_blocked = m.ops.swaps_blocked.saturating_add(1);
                let entry = m.swappers.entry(swapper).or_default();
                entry.blocked = entry.blocked.saturating_add(1);
            }
            SwapEvent::SwapFailed { swapper } => {
                m.ops.swaps_failed = m.ops.swaps_failed.saturating_add(1);
                let entry = m.swappers.entry(swapper).or_default();
                entry.failed = entry.failed.saturating_add(1);
            }
        });
    }
}

pub(crate) fn record(event: SwapEvent) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match sink {
        Some(sink) => sink.record(event),
        None => GlobalEventSink.record(event),
    }
}

/// Snapshot the current counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary sink override. The previous sink is
/// restored on every exit, unwinding included.
pub fn with_event_sink<T>(sink: Rc<dyn EventSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn EventSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

#[cfg(test)]
pub(crate) fn override_installed() -> bool {
    SINK_OVERRIDE.with(|cell| cell.borrow().is_some())
}
