//! Request-scoped forwarding errors.
//!
//! None of these are fatal to the process; the dispatcher either swallows
//! them or turns them into a sentinel comparison input.

use thiserror::Error;

/// A backend call that did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    /// Backend unreachable, or the request could not be written.
    #[error("error establishing connection to {backend}: {reason}")]
    Connection { backend: String, reason: String },

    /// Backend answered with something that is not a complete HTTP response.
    #[error("error reading response from {backend}: {reason}")]
    ResponseParse { backend: String, reason: String },
}

impl ForwardError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Connection { .. } => "connection",
            ForwardError::ResponseParse { .. } => "response_parse",
        }
    }
}

/// The inbound request could not be snapshotted.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("error buffering request body: {0}")]
    BodyRead(String),
}

/// A configured backend address that cannot be dialed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    #[error("invalid backend url {0}: {1}")]
    Url(String, String),

    #[error("unsupported scheme {0}; only http backends are supported")]
    UnsupportedScheme(String),

    #[error("backend address {0} is missing a host")]
    MissingHost(String),

    #[error("backend address {0} must be host:port")]
    MissingPort(String),
}
