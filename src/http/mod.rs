//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, catch-all route)
//!     → dispatch::Dispatcher (capture, forward, compare, record)
//!     → fixed "OK" acknowledgement to the caller
//! ```

pub mod server;

pub use server::{AppState, ScienceServer, ACKNOWLEDGEMENT};
