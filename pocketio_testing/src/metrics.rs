//! Metric capture through `metrics-util`'s debugging recorder.

use metrics_util::debugging::{DebugValue, DebuggingRecorder};

/// Run `f` with a thread-local debugging recorder and return every metric
/// it recorded as `(name, labels, value)`.
pub fn capture_metrics<T>(f: impl FnOnce() -> T) -> (T, Vec<(String, Vec<(String, String)>, DebugValue)>) {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let out = ::metrics::with_local_recorder(&recorder, f);
    let metrics = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(key, _, _, value)| {
            let labels = key
                .key()
                .labels()
                .map(|l| (l.key().to_owned(), l.value().to_owned()))
                .collect();
            (key.key().name().to_owned(), labels, value)
        })
        .collect();
    (out, metrics)
}

/// Sum of counter values named `name` whose labels include every pair in
/// `labels`.
#[must_use]
pub fn counter_total(
    metrics: &[(String, Vec<(String, String)>, DebugValue)],
    name: &str,
    labels: &[(&str, &str)],
) -> u64 {
    metrics
        .iter()
        .filter(|(n, l, _)| {
            n == name
                && labels
                    .iter()
                    .all(|(k, v)| l.iter().any(|(lk, lv)| lk == k && lv == v))
        })
        .map(|(_, _, value)| match value {
            DebugValue::Counter(c) => *c,
            _ => 0,
        })
        .sum()
}
