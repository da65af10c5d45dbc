//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command-line / environment overlay (main.rs)
//!     → validation.rs (semantic checks)
//!     → ScienceConfig (validated, immutable)
//!     → handed to the dispatcher and servers at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the comparison mode never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, read_config, ConfigError};
pub use schema::{
    AdminConfig, BackendsConfig, ComparisonConfig, DiffLogConfig, DispatchConfig, LimitsConfig,
    ListenerConfig, ObservabilityConfig, ScienceConfig,
};
pub use validation::{validate_config, ValidationError};
