//! Response normalization.
//!
//! # Responsibilities
//! - Hold a backend response as (status, header multimap, body)
//! - Strip headers that differ for inconsequential reasons
//! - Re-serialize into a dump that is byte-comparable across backends
//!
//! # Design Decisions
//! - Header names are stored lowercase; values keep their wire order
//! - Dumps render headers sorted by canonical name, so header order on the
//!   wire never produces a spurious diff
//! - Framing is never re-derived: with `Content-Length` and
//!   `Transfer-Encoding` stripped, a chunked body and a sized body dump
//!   identically

use std::collections::BTreeMap;

use axum::body::Bytes;
use axum::http::{HeaderMap, StatusCode};

/// Response headers as name → ordered raw values.
///
/// Values are kept as wire bytes; two values that differ only in non-UTF-8
/// bytes stay distinct.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMultimap(BTreeMap<String, Vec<Vec<u8>>>);

impl HeaderMultimap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect a wire header map.
    pub fn from_header_map(headers: &HeaderMap) -> Self {
        let mut map = Self::new();
        for (name, value) in headers {
            map.append(name.as_str(), value.as_bytes());
        }
        map
    }

    /// Build from literal pairs.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut map = Self::new();
        for (name, value) in pairs {
            map.append(name, value);
        }
        map
    }

    /// Add a value after any existing values for `name`.
    pub fn append(&mut self, name: &str, value: impl AsRef<[u8]>) {
        self.0
            .entry(name.to_ascii_lowercase())
            .or_default()
            .push(value.as_ref().to_vec());
    }

    /// Remove every value for `name` (case-insensitive).
    pub fn remove(&mut self, name: &str) -> Option<Vec<Vec<u8>>> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.0.get(&name.to_ascii_lowercase()).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate lowercase names and their values, ordered by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Vec<u8>])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Write `Name: value\r\n` lines sorted by canonical name, skipping `exclude`.
    pub fn write_sorted(&self, out: &mut Vec<u8>, exclude: &[&str]) {
        let mut lines: Vec<(String, &[Vec<u8>])> = self
            .iter()
            .filter(|(name, _)| !exclude.iter().any(|ex| ex.eq_ignore_ascii_case(name)))
            .map(|(name, values)| (canonical_header_name(name), values))
            .collect();
        lines.sort_by(|a, b| a.0.cmp(&b.0));

        for (name, values) in lines {
            for value in values {
                out.extend_from_slice(name.as_bytes());
                out.extend_from_slice(b": ");
                out.extend_from_slice(value);
                out.extend_from_slice(b"\r\n");
            }
        }
    }
}

/// `content-type` → `Content-Type`.
pub fn canonical_header_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = true;
    for c in name.chars() {
        if upper {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c.to_ascii_lowercase());
        }
        upper = c == '-';
    }
    out
}

/// A backend response ready for comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedResponse {
    pub status: u16,
    pub headers: HeaderMultimap,
    pub body: Bytes,
}

impl NormalizedResponse {
    pub fn new(status: u16, headers: HeaderMultimap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Drop the configured headers.
    pub fn strip_headers<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.headers.remove(name.as_ref());
        }
    }

    /// Status line, sorted headers, blank line, body.
    pub fn dump(&self) -> Vec<u8> {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("status code");

        let mut out = Vec::with_capacity(64 + self.body.len());
        out.extend_from_slice(format!("HTTP/1.1 {} {}\r\n", self.status, reason).as_bytes());
        self.headers.write_sorted(&mut out, &[]);
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}
