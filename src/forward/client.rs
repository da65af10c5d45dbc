//! Backend forwarding.
//!
//! # Responsibilities
//! - Dial a fresh TCP connection per call (no pooling)
//! - Send the captured request over an HTTP/1.1 client connection
//! - Read the complete response, body included
//! - Strip configured headers and produce the normalized dump
//!
//! # Design Decisions
//! - No timeouts here; a hung backend holds the request task
//! - Dial and write failures are `Connection`, malformed responses are `ResponseParse`

use axum::body::Body;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;

use crate::forward::capture::CapturedRequest;
use crate::forward::error::ForwardError;
use crate::forward::normalize::{HeaderMultimap, NormalizedResponse};
use crate::forward::target::BackendTarget;

/// A backend response after normalization.
#[derive(Debug, Clone)]
pub struct ForwardedResponse {
    pub response: NormalizedResponse,
    /// `response.dump()`, the unit compared byte-for-byte.
    pub dump: Vec<u8>,
}

impl ForwardedResponse {
    pub fn new(response: NormalizedResponse) -> Self {
        let dump = response.dump();
        Self { response, dump }
    }

    pub fn status(&self) -> u16 {
        self.response.status
    }
}

/// Sends captured requests to one backend at a time.
///
/// Stateless apart from its settings; safe to share across request tasks.
#[derive(Debug, Clone)]
pub struct Forwarder {
    strip_headers: Vec<String>,
    max_body_bytes: usize,
}

impl Forwarder {
    pub fn new(strip_headers: Vec<String>, max_body_bytes: usize) -> Self {
        Self {
            strip_headers,
            max_body_bytes,
        }
    }

    /// Forward `request` to `target` and normalize the reply.
    pub async fn forward(
        &self,
        request: &CapturedRequest,
        target: &BackendTarget,
    ) -> Result<ForwardedResponse, ForwardError> {
        let backend = target.authority();
        let connection_error = |reason: String| ForwardError::Connection {
            backend: backend.to_string(),
            reason,
        };
        let parse_error = |reason: String| ForwardError::ResponseParse {
            backend: backend.to_string(),
            reason,
        };

        let stream = TcpStream::connect(backend)
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let (mut sender, conn) = hyper::client::conn::http1::handshake::<_, Body>(TokioIo::new(stream))
            .await
            .map_err(|e| connection_error(e.to_string()))?;

        let conn_backend = backend.to_string();
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(backend = %conn_backend, error = %e, "Backend connection closed with error");
            }
        });

        let response = sender
            .send_request(request.to_backend_request(target))
            .await
            .map_err(|e| {
                if e.is_parse() || e.is_parse_status() || e.is_incomplete_message() {
                    parse_error(e.to_string())
                } else {
                    connection_error(e.to_string())
                }
            })?;

        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(Body::new(body), self.max_body_bytes)
            .await
            .map_err(|e| parse_error(e.to_string()))?;

        let mut normalized = NormalizedResponse::new(
            parts.status.as_u16(),
            HeaderMultimap::from_header_map(&parts.headers),
            body,
        );
        normalized.strip_headers(self.strip_headers.as_slice());

        Ok(ForwardedResponse::new(normalized))
    }
}
