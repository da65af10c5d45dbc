//! Backend address parsing.

use url::Url;

use crate::forward::error::TargetError;

/// A dialable backend.
///
/// Built once at startup from either `host:port` or an `http://` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendTarget {
    /// `host:port` passed to the TCP dialer. Also used as the `Host` header
    /// when the captured request carries none.
    authority: String,
}

impl BackendTarget {
    /// Parse a configured backend address.
    pub fn parse(addr: &str) -> Result<Self, TargetError> {
        let addr = addr.trim();

        if addr.contains("://") {
            let url = Url::parse(addr).map_err(|e| TargetError::Url(addr.to_string(), e.to_string()))?;
            if url.scheme() != "http" {
                return Err(TargetError::UnsupportedScheme(url.scheme().to_string()));
            }
            let host = url
                .host_str()
                .ok_or_else(|| TargetError::MissingHost(addr.to_string()))?;
            let port = url.port_or_known_default().unwrap_or(80);
            return Ok(Self {
                authority: format!("{}:{}", host, port),
            });
        }

        let (host, port) = addr
            .rsplit_once(':')
            .ok_or_else(|| TargetError::MissingPort(addr.to_string()))?;
        if host.is_empty() {
            return Err(TargetError::MissingHost(addr.to_string()));
        }
        if port.parse::<u16>().is_err() {
            return Err(TargetError::MissingPort(addr.to_string()));
        }

        Ok(Self {
            authority: addr.to_string(),
        })
    }

    /// The `host:port` this target dials.
    pub fn authority(&self) -> &str {
        &self.authority
    }
}

impl std::fmt::Display for BackendTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.authority)
    }
}
