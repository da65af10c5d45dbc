//! Shadow-traffic comparison proxy.
//!
//! Every inbound request is forwarded to a control and an experiment backend;
//! their responses are normalized and compared, mismatches are aggregated, and
//! the caller always receives a fixed `200 OK`.

pub mod admin;
pub mod compare;
pub mod config;
pub mod dispatch;
pub mod forward;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod stats;

pub use compare::{CompareMode, Comparator};
pub use config::ScienceConfig;
pub use dispatch::Dispatcher;
pub use http::ScienceServer;
pub use lifecycle::Shutdown;
pub use stats::DiffAggregator;
