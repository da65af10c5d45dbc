//! Diff aggregation subsystem.
//!
//! # Data Flow
//! ```text
//! dispatcher (per request, after comparison)
//!     → aggregator.rs (lock; counters, code matrix, diff record)
//!     → sink.rs (stdout | append-only file | memory)
//!
//! admin API
//!     → aggregator.rs snapshot (lock; clone counters and matrix)
//! ```

pub mod aggregator;
pub mod sink;

pub use aggregator::{format_diff_record, DiffAggregator, DiffStats};
pub use sink::{open_sink, DiffSink, MemorySink};
