//! Inbound request capture.
//!
//! The body is buffered once into `Bytes`; each backend forward gets its own
//! cheap clone, so neither forward can exhaust the other's copy.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Uri, Version};

use crate::forward::error::CaptureError;
use crate::forward::normalize::HeaderMultimap;
use crate::forward::target::BackendTarget;

/// Immutable snapshot of an inbound request.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl CapturedRequest {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            method,
            uri,
            headers,
            body: body.into(),
        }
    }

    /// Buffer the full body of an inbound request, up to `limit` bytes.
    pub async fn capture(request: Request<Body>, limit: usize) -> Result<Self, CaptureError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| CaptureError::BodyRead(e.to_string()))?;

        Ok(Self::new(parts.method, parts.uri, parts.headers, body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The outbound copy sent to one backend.
    ///
    /// The URI goes out exactly as received. The original `Host` header is
    /// kept; one is synthesized from the target only when absent.
    pub fn to_backend_request(&self, target: &BackendTarget) -> Request<Body> {
        let mut request = Request::new(Body::from(self.body.clone()));
        *request.method_mut() = self.method.clone();
        *request.uri_mut() = self.uri.clone();
        *request.version_mut() = Version::HTTP_11;
        *request.headers_mut() = self.headers.clone();

        if !request.headers().contains_key(header::HOST) {
            if let Ok(host) = HeaderValue::from_str(target.authority()) {
                request.headers_mut().insert(header::HOST, host);
            }
        }
        request
    }

    /// Request line, `Host`, remaining headers sorted, blank line, body.
    pub fn dump(&self) -> Vec<u8> {
        let request_uri = if self.uri.authority().is_some() {
            self.uri.to_string()
        } else {
            self.uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| "/".to_string())
        };

        let host = self
            .headers
            .get(header::HOST)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .or_else(|| self.uri.authority().map(|a| a.to_string()));

        let mut out = Vec::with_capacity(128 + self.body.len());
        out.extend_from_slice(format!("{} {} HTTP/1.1\r\n", self.method, request_uri).as_bytes());
        if let Some(host) = host {
            out.extend_from_slice(format!("Host: {}\r\n", host).as_bytes());
        }
        HeaderMultimap::from_header_map(&self.headers).write_sorted(
            &mut out,
            &["host", "transfer-encoding", "trailer"],
        );
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}
