//! Semantic comparison subsystem.
//!
//! # Data Flow
//! ```text
//! control Observation ─┐
//!                      ├→ status codes equal?
//! experiment ──────────┘     → dumps byte-identical?  (yes: equal)
//!                            → both sides produced a response?
//!                            → headers.rs (multimap equality)
//!                            → body bytes identical?
//!                            → json.rs (strict or weak structural equality)
//! ```
//!
//! # Design Decisions
//! - Always returns a definite boolean; malformed JSON degrades to "not equal"
//! - No state between calls, so repeated comparisons always agree
//! - The mode is fixed when the comparator is built

pub mod headers;
pub mod json;

use serde::{Deserialize, Serialize};

use crate::forward::{ForwardError, ForwardedResponse, NormalizedResponse};

pub use headers::headers_equal;

/// Status code recorded for a side whose forward failed.
///
/// Never a real HTTP status, so it cannot spuriously match a backend.
pub const SENTINEL_CODE: i32 = -1;

/// How JSON arrays are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareMode {
    /// Arrays must match position by position.
    #[default]
    Strict,
    /// Arrays are compared as order-insensitive collections.
    Weak,
}

impl CompareMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompareMode::Strict => "strict",
            CompareMode::Weak => "weak",
        }
    }
}

impl std::fmt::Display for CompareMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One side's result, as seen by the comparator and the aggregator.
#[derive(Debug, Clone)]
pub struct Observation {
    code: i32,
    dump: Vec<u8>,
    response: Option<NormalizedResponse>,
}

impl Observation {
    pub fn from_response(forwarded: ForwardedResponse) -> Self {
        Self {
            code: i32::from(forwarded.status()),
            dump: forwarded.dump,
            response: Some(forwarded.response),
        }
    }

    /// Sentinel for a failed forward. `side` keeps the two sentinels distinct.
    pub fn failed(side: &str, error: &ForwardError) -> Self {
        Self {
            code: SENTINEL_CODE,
            dump: format!("Error forwarding request to {}: {}", side, error).into_bytes(),
            response: None,
        }
    }

    pub fn code(&self) -> i32 {
        self.code
    }

    pub fn dump(&self) -> &[u8] {
        &self.dump
    }

    pub fn response(&self) -> Option<&NormalizedResponse> {
        self.response.as_ref()
    }

    pub fn is_sentinel(&self) -> bool {
        self.response.is_none()
    }
}

/// Decides whether two backend results are semantically equal.
#[derive(Debug, Clone, Copy, Default)]
pub struct Comparator {
    mode: CompareMode,
}

impl Comparator {
    pub fn new(mode: CompareMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> CompareMode {
        self.mode
    }

    pub fn equal(&self, control: &Observation, experiment: &Observation) -> bool {
        if control.code != experiment.code {
            return false;
        }
        if control.dump == experiment.dump {
            return true;
        }
        let (Some(c), Some(e)) = (&control.response, &experiment.response) else {
            return false;
        };

        headers_equal(&c.headers, &e.headers) && self.bodies_equal(&c.body, &e.body)
    }

    /// Byte-exact first, then structural JSON.
    pub fn bodies_equal(&self, control: &[u8], experiment: &[u8]) -> bool {
        control == experiment || json::bodies_equal(control, experiment, self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::HeaderMultimap;

    fn observe(status: u16, headers: &[(&str, &str)], body: &str) -> Observation {
        let response = NormalizedResponse::new(
            status,
            HeaderMultimap::from_pairs(headers.iter().copied()),
            body.to_string(),
        );
        Observation::from_response(ForwardedResponse::new(response))
    }

    fn connection_refused() -> ForwardError {
        ForwardError::Connection {
            backend: "127.0.0.1:1".into(),
            reason: "connection refused".into(),
        }
    }

    #[test]
    fn identical_dumps_are_equal_in_every_mode() {
        for body in ["plain text", "{\"a\":[1,2]}", "<html></html>", ""] {
            let a = observe(200, &[("x-a", "1")], body);
            let b = observe(200, &[("x-a", "1")], body);
            assert!(Comparator::new(CompareMode::Strict).equal(&a, &b));
            assert!(Comparator::new(CompareMode::Weak).equal(&a, &b));
        }
    }

    #[test]
    fn status_codes_must_match() {
        let a = observe(200, &[], "{}");
        let b = observe(201, &[], "{}");
        assert!(!Comparator::new(CompareMode::Weak).equal(&a, &b));
    }

    #[test]
    fn array_order_follows_mode() {
        let a = observe(200, &[], r#"{"a":[1,2]}"#);
        let b = observe(200, &[], r#"{"a":[2,1]}"#);
        assert!(!Comparator::new(CompareMode::Strict).equal(&a, &b));
        assert!(Comparator::new(CompareMode::Weak).equal(&a, &b));
    }

    #[test]
    fn differing_non_json_bodies_are_unequal() {
        let a = observe(200, &[], "hello");
        let b = observe(200, &[], "hello!");
        assert!(!Comparator::new(CompareMode::Strict).equal(&a, &b));
        assert!(!Comparator::new(CompareMode::Weak).equal(&a, &b));
    }

    #[test]
    fn headers_are_compared_before_bodies() {
        let a = observe(200, &[("x-a", "1")], r#"{"a":1}"#);
        let b = observe(200, &[("x-a", "2")], r#"{"a":1}"#);
        assert!(!Comparator::new(CompareMode::Weak).equal(&a, &b));
    }

    #[test]
    fn sentinel_never_matches_real_response() {
        let ok = observe(200, &[], "{}");
        let failed = Observation::failed("experiment", &connection_refused());
        assert_eq!(failed.code(), SENTINEL_CODE);
        assert!(failed.is_sentinel());
        assert!(!Comparator::default().equal(&ok, &failed));
    }

    #[test]
    fn two_failures_are_still_a_mismatch() {
        let control = Observation::failed("control", &connection_refused());
        let experiment = Observation::failed("experiment", &connection_refused());
        assert!(!Comparator::new(CompareMode::Weak).equal(&control, &experiment));
    }

    #[test]
    fn comparison_is_idempotent() {
        let a = observe(200, &[], r#"{"id":1,"tags":["a","b"]}"#);
        let b = observe(200, &[], r#"{"id":1,"tags":["b","a"]}"#);
        let comparator = Comparator::new(CompareMode::Weak);
        let first = comparator.equal(&a, &b);
        for _ in 0..100 {
            assert_eq!(comparator.equal(&a, &b), first);
        }
        assert!(first);
    }
}
