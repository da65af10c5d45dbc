//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the science
//! proxy. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::compare::CompareMode;
use crate::dispatch::ForwardErrorPolicy;

/// Root configuration for the science proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ScienceConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Control and experiment backend addresses.
    pub backends: BackendsConfig,

    /// How responses are compared.
    pub comparison: ComparisonConfig,

    /// Per-request pipeline behaviour.
    pub dispatch: DispatchConfig,

    /// Where diff records are written.
    pub diff_log: DiffLogConfig,

    /// Buffering limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// The two services under comparison.
///
/// Each address is either `host:port` or an `http://` URL.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BackendsConfig {
    /// The trusted, currently-authoritative backend.
    pub control: String,

    /// The candidate backend being validated.
    pub experiment: String,
}

/// Comparison configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ComparisonConfig {
    /// `strict` or `weak` (order-insensitive JSON arrays).
    pub mode: CompareMode,

    /// Response headers removed before comparison.
    pub strip_headers: Vec<String>,
}

impl Default for ComparisonConfig {
    fn default() -> Self {
        Self {
            mode: CompareMode::Strict,
            strip_headers: default_strip_headers(),
        }
    }
}

/// Headers that vary between backends for inconsequential reasons.
pub fn default_strip_headers() -> Vec<String> {
    vec![
        "Date".to_string(),
        "Content-Length".to_string(),
        "Transfer-Encoding".to_string(),
    ]
}

/// Dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DispatchConfig {
    /// What to do when a backend cannot be reached.
    pub on_forward_error: ForwardErrorPolicy,

    /// Forward to both backends concurrently instead of control first.
    pub parallel_forward: bool,
}

/// Diff log configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DiffLogConfig {
    /// File to append diff records to. Stdout when unset.
    pub path: Option<String>,
}

/// Buffering limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size in bytes, applied to inbound requests and backend responses.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key rejected by validation when the admin API is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
