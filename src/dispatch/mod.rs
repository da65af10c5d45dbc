//! Shadow dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! inbound request (from http::server)
//!     → capture (buffer once)
//!     → forward to control ─┐   sequential by default,
//!     → forward to experiment ┘ tokio::join! when parallel_forward
//!     → policy.rs (forward error: stop, or substitute a sentinel)
//!     → compare::Comparator
//!     → stats::DiffAggregator
//! ```
//!
//! # Design Decisions
//! - The caller is acknowledged by the HTTP layer regardless of the outcome
//! - The aggregator is injected, never global

pub mod dispatcher;
pub mod policy;

pub use dispatcher::Dispatcher;
pub use policy::{DispatchOutcome, ForwardErrorPolicy, Side};
