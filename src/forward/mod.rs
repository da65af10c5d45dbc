//! Backend forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! inbound axum request
//!     → capture.rs (buffer body once, immutable snapshot)
//!     → client.rs (fresh TCP dial + HTTP/1.1 exchange per backend)
//!     → normalize.rs (strip headers, re-serialize to a comparable dump)
//!     → ForwardedResponse handed to the comparator
//! ```
//!
//! # Design Decisions
//! - No connection pooling: every forward owns its connection
//! - Forwarding never mutates shared state
//! - Errors are request-scoped and never reach the caller

pub mod capture;
pub mod client;
pub mod error;
pub mod normalize;
pub mod target;

pub use capture::CapturedRequest;
pub use client::{ForwardedResponse, Forwarder};
pub use error::{CaptureError, ForwardError, TargetError};
pub use normalize::{HeaderMultimap, NormalizedResponse};
pub use target::BackendTarget;
