//! Locked diff aggregation.
//!
//! # Responsibilities
//! - Count every compared request
//! - On mismatch: count the diff, bump the code matrix cell, queue a record
//! - Hand out consistent snapshots for the admin API
//!
//! # Design Decisions
//! - A single mutex guards counters, matrix and the record queue together,
//!   so records reach the sink in the order their counts were taken
//! - Sink I/O happens on a dedicated writer thread, never under the lock
//! - Sink failures are logged and dropped; recording never fails
//! - A poisoned lock is recovered rather than propagated

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::compare::Observation;
use crate::stats::sink::DiffSink;

/// Running comparison statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffStats {
    /// Every request that reached the aggregator.
    pub total_requests: u64,
    /// Requests whose responses differed.
    pub total_diffs: u64,
    /// experiment code → control code → mismatch count. Cells appear on first use.
    pub codes: BTreeMap<i32, BTreeMap<i32, u64>>,
}

impl DiffStats {
    /// Mismatches recorded for an (experiment, control) code pair.
    pub fn code_count(&self, experiment: i32, control: i32) -> u64 {
        self.codes
            .get(&experiment)
            .and_then(|row| row.get(&control))
            .copied()
            .unwrap_or(0)
    }
}

enum WriterMessage {
    Record(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

struct Inner {
    stats: DiffStats,
    records: mpsc::UnboundedSender<WriterMessage>,
}

/// Shared, injected aggregator. The only mutable state shared between requests.
pub struct DiffAggregator {
    inner: Mutex<Inner>,
}

impl DiffAggregator {
    /// Start the writer thread that owns `sink`.
    pub fn new(sink: DiffSink) -> io::Result<Self> {
        let (records, rx) = mpsc::unbounded_channel();
        std::thread::Builder::new()
            .name("diff-writer".to_string())
            .spawn(move || run_writer(sink, rx))?;

        Ok(Self {
            inner: Mutex::new(Inner {
                stats: DiffStats::default(),
                records,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one compared request. Never waits on the sink.
    pub fn record(
        &self,
        request_dump: &[u8],
        control: &Observation,
        experiment: &Observation,
        is_mismatch: bool,
    ) {
        let record = is_mismatch
            .then(|| format_diff_record(request_dump, control.dump(), experiment.dump()));

        let mut inner = self.lock();
        inner.stats.total_requests += 1;

        let Some(record) = record else {
            return;
        };

        inner.stats.total_diffs += 1;
        *inner
            .stats
            .codes
            .entry(experiment.code())
            .or_default()
            .entry(control.code())
            .or_insert(0) += 1;

        if inner.records.send(WriterMessage::Record(record)).is_err() {
            tracing::warn!("Diff writer stopped; dropping diff record");
        }
    }

    pub fn snapshot(&self) -> DiffStats {
        self.lock().stats.clone()
    }

    /// Wait until every record queued so far has been written to the sink.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        let queued = self.lock().records.send(WriterMessage::Flush(done)).is_ok();
        if queued {
            let _ = wait.await;
        }
    }
}

fn run_writer(mut sink: DiffSink, mut rx: mpsc::UnboundedReceiver<WriterMessage>) {
    while let Some(message) = rx.blocking_recv() {
        match message {
            WriterMessage::Record(record) => {
                if let Err(e) = sink.write_all(&record).and_then(|_| sink.flush()) {
                    tracing::warn!(error = %e, "Failed to write diff record");
                }
            }
            WriterMessage::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

/// `=== diff ===`, request, `---`, control, `---`, experiment, `============`.
pub fn format_diff_record(request: &[u8], control: &[u8], experiment: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(request.len() + control.len() + experiment.len() + 40);
    out.extend_from_slice(b"=== diff ===\n");
    out.extend_from_slice(request);
    out.extend_from_slice(b"\n---\n");
    out.extend_from_slice(control);
    out.extend_from_slice(b"\n---\n");
    out.extend_from_slice(experiment);
    out.extend_from_slice(b"\n============\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::{ForwardError, ForwardedResponse, HeaderMultimap, NormalizedResponse};
    use crate::stats::sink::MemorySink;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn observe(status: u16, body: &str) -> Observation {
        Observation::from_response(ForwardedResponse::new(NormalizedResponse::new(
            status,
            HeaderMultimap::new(),
            body.to_string(),
        )))
    }

    fn memory_aggregator() -> (DiffAggregator, MemorySink) {
        let sink = MemorySink::new();
        (DiffAggregator::new(Box::new(sink.clone())).unwrap(), sink)
    }

    /// Sink that stalls on every write, like a blocked stdout pipe.
    struct SlowSink(MemorySink);

    impl Write for SlowSink {
        fn write(&mut self, data: &[u8]) -> io::Result<usize> {
            std::thread::sleep(Duration::from_millis(200));
            self.0.write(data)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn matches_only_count_requests() {
        let (agg, sink) = memory_aggregator();
        agg.record(b"GET / HTTP/1.1", &observe(200, "a"), &observe(200, "a"), false);
        agg.flush().await;

        let stats = agg.snapshot();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_diffs, 0);
        assert!(stats.codes.is_empty());
        assert!(sink.contents().is_empty());
    }

    #[tokio::test]
    async fn mismatch_updates_matrix_and_log() {
        let (agg, sink) = memory_aggregator();
        agg.record(b"GET /a HTTP/1.1", &observe(200, "x"), &observe(200, "y"), true);

        let stats = agg.snapshot();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.total_diffs, 1);
        assert_eq!(stats.code_count(200, 200), 1);

        agg.flush().await;
        let log = sink.contents();
        assert!(log.starts_with("=== diff ===\nGET /a HTTP/1.1\n---\nHTTP/1.1 200 OK"));
        assert!(log.ends_with("y\n============\n"));
    }

    #[test]
    fn matrix_is_keyed_experiment_first() {
        let (agg, _) = memory_aggregator();
        let failed = Observation::failed(
            "experiment",
            &ForwardError::Connection {
                backend: "b".into(),
                reason: "refused".into(),
            },
        );
        agg.record(b"", &observe(200, "ok"), &failed, true);
        agg.record(b"", &observe(500, "boom"), &observe(200, "ok"), true);

        let stats = agg.snapshot();
        assert_eq!(stats.code_count(-1, 200), 1);
        assert_eq!(stats.code_count(200, 500), 1);
        assert_eq!(stats.code_count(500, 200), 0);
    }

    #[test]
    fn record_format_is_fixed() {
        assert_eq!(
            format_diff_record(b"REQ", b"CTRL", b"EXP"),
            b"=== diff ===\nREQ\n---\nCTRL\n---\nEXP\n============\n".to_vec()
        );
    }

    #[tokio::test]
    async fn slow_sink_does_not_block_record() {
        let sink = MemorySink::new();
        let agg = DiffAggregator::new(Box::new(SlowSink(sink.clone()))).unwrap();

        let start = Instant::now();
        for i in 0..4 {
            agg.record(format!("REQ {}", i).as_bytes(), &observe(200, "a"), &observe(200, "b"), true);
        }
        assert!(start.elapsed() < Duration::from_millis(150));
        assert_eq!(agg.snapshot().total_diffs, 4);

        agg.flush().await;
        let log = sink.contents();
        assert_eq!(log.matches("=== diff ===").count(), 4);
        let positions: Vec<usize> = (0..4)
            .map(|i| log.find(&format!("REQ {}", i)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn concurrent_records_lose_nothing() {
        let (agg, sink) = memory_aggregator();
        let agg = Arc::new(agg);
        let threads = 16;
        let per_thread = 250;

        std::thread::scope(|s| {
            for _ in 0..threads {
                let agg = Arc::clone(&agg);
                s.spawn(move || {
                    for i in 0..per_thread {
                        agg.record(b"REQ", &observe(200, "a"), &observe(200, "b"), i % 2 == 0);
                    }
                });
            }
        });
        agg.flush().await;

        let stats = agg.snapshot();
        assert_eq!(stats.total_requests, (threads * per_thread) as u64);
        assert_eq!(stats.total_diffs, (threads * per_thread / 2) as u64);
        assert_eq!(stats.code_count(200, 200), stats.total_diffs);
        assert_eq!(sink.contents().matches("=== diff ===").count() as u64, stats.total_diffs);
    }
}
