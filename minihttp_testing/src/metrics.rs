//! Helpers for reading metrics captured by a debugging recorder.
//!
//! Taking a snapshot resets the recorder's counters, so each test takes one
//! [`samples`] vector and runs every assertion against it.

use metrics_util::{
    CompositeKey,
    debugging::{DebugValue, DebuggingRecorder, Snapshotter},
};

/// Creates a debugging recorder and its snapshotter.
#[must_use]
pub fn debugging_recorder() -> (Snapshotter, DebuggingRecorder) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    (snapshotter, recorder)
}

/// Take one snapshot of everything recorded so far.
#[must_use]
pub fn samples(snapshotter: &Snapshotter) -> Vec<(CompositeKey, DebugValue)> {
    snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| (key, value))
        .collect()
}

/// Sum of the counter `name` across series whose labels include every pair
/// in `labels`.
#[must_use]
pub fn counter_total(
    samples: &[(CompositeKey, DebugValue)],
    name: &str,
    labels: &[(&str, &str)],
) -> u64 {
    samples
        .iter()
        .filter(|(key, _)| {
            key.key().name() == name
                && labels.iter().all(|(label, value)| {
                    key.key()
                        .labels()
                        .any(|l| l.key() == *label && l.value() == *value)
                })
        })
        .map(|(_, value)| match value {
            DebugValue::Counter(count) => *count,
            _ => 0,
        })
        .sum()
}

/// Latest value of the gauge `name`, if recorded.
#[must_use]
pub fn gauge_value(samples: &[(CompositeKey, DebugValue)], name: &str) -> Option<f64> {
    samples.iter().find_map(|(key, value)| match value {
        DebugValue::Gauge(gauge) if key.key().name() == name => Some(gauge.into_inner()),
        _ => None,
    })
}
