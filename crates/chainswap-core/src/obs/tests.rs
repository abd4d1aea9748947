use crate::{
    obs::{
        EventSink, SwapEvent, metrics_report, metrics_reset_all,
        sink::{override_installed, record},
        with_event_sink,
    },
    swapper::SwapperId,
};
use std::{
    cell::Cell,
    panic::{AssertUnwindSafe, catch_unwind},
    rc::Rc,
};

#[derive(Default)]
struct CountingSink {
    calls: Cell<usize>,
}

impl EventSink for CountingSink {
    fn record(&self, _: SwapEvent) {
        self.calls.set(self.calls.get() + 1);
    }
}

const SWAPPER: SwapperId = SwapperId(7);

#[test]
fn with_event_sink_routes_and_restores_nested_overrides() {
    metrics_reset_all();
    let outer = Rc::new(CountingSink::default());
    let inner = Rc::new(CountingSink::default());

    with_event_sink(outer.clone(), || {
        record(SwapEvent::SwapBlocked { swapper: SWAPPER });

        with_event_sink(inner.clone(), || {
            record(SwapEvent::SwapBlocked { swapper: SWAPPER });
        });

        // back on the outer sink
        record(SwapEvent::SwapBlocked { swapper: SWAPPER });
    });

    assert_eq!(outer.calls.get(), 2);
    assert_eq!(inner.calls.get(), 1);
    assert!(!override_installed());

    // nothing reached the global counters
    assert_eq!(metrics_report().ops.swaps_blocked, 0);
}

#[test]
fn with_event_sink_restores_override_on_panic() {
    let sink = Rc::new(CountingSink::default());

    let panicked = catch_unwind(AssertUnwindSafe(|| {
        with_event_sink(sink.clone(), || {
            record(SwapEvent::SwapperRejected);
            panic!("intentional panic for guard test");
        });
    }))
    .is_err();

    assert!(panicked);
    assert_eq!(sink.calls.get(), 1);
    assert!(!override_installed());
}

#[test]
fn global_sink_accumulates_per_swapper() {
    metrics_reset_all();

    record(SwapEvent::SwapApplied {
        swapper: SWAPPER,
        records_written: 3,
    });
    record(SwapEvent::SwapApplied {
        swapper: SWAPPER,
        records_written: 2,
    });
    record(SwapEvent::SwapBlocked { swapper: SWAPPER });
    record(SwapEvent::ActionBound { swapper: SWAPPER });

    let report = metrics_report();
    assert_eq!(report.ops.swaps_applied, 2);
    assert_eq!(report.ops.records_written, 5);
    assert_eq!(report.ops.actions_bound, 1);

    let counters = report.swapper(SWAPPER).unwrap();
    assert_eq!(counters.applied, 2);
    assert_eq!(counters.blocked, 1);
    assert_eq!(counters.records_written, 5);
}

#[test]
fn deleting_a_swapper_drops_its_counters() {
    metrics_reset_all();

    record(SwapEvent::SwapFailed { swapper: SWAPPER });
    record(SwapEvent::SwapperDeleted { swapper: SWAPPER });

    let report = metrics_report();
    assert_eq!(report.ops.swaps_failed, 1);
    assert!(report.swapper(SWAPPER).is_none());
}

#[test]
fn report_serializes_to_json() {
    metrics_reset_all();
    record(SwapEvent::SwapApplied {
        swapper: SWAPPER,
        records_written: 1,
    });

    let json = serde_json::to_value(metrics_report()).unwrap();
    assert_eq!(json["ops"]["swaps_applied"], 1);
    assert_eq!(json["swappers"]["7"]["records_written"], 1);
}
