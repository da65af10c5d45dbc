//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl+C (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → shadow server and admin API stop accepting and drain in-flight comparisons
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::trigger_on_ctrl_c;
