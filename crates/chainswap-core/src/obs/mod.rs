//! Observability: swap counters and the event sink they flow through.
//!
//! Engine code records `SwapEvent`s through `sink::record` only; it never
//! touches the counter state directly.

pub(crate) mod metrics;
pub(crate) mod sink;

#[cfg(test)]
mod tests;

// re-exports
pub use metrics::{EventOps, EventReport, SwapperCounters};
pub use sink::{EventSink, SwapEvent, metrics_report, metrics_reset_all, with_event_sink};
