//! HTTP(S) transport seam for the control plane.
//!
//! The client only needs "GET this URL, optionally bounded by a timeout".
//! [`ReqwestTransport`] is the production implementation; tests swap in
//! scripted transports.

use std::time::Duration;

use bytes::Bytes;
use reqwest::Url;
use reqwest::blocking::{Client, ClientBuilder};
use tracing::debug;

use crate::error::TransportError;

/// A raw HTTP reply: status line code and body.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: Bytes,
}

impl HttpReply {
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues a single GET. Implementations must not retry.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url, timeout: Option<Duration>) -> Result<HttpReply, TransportError>;
}

// ── ReqwestTransport ─────────────────────────────────────────────

/// Blocking `reqwest` client configured for GameStream hosts.
///
/// Hosts present self-signed certificates, so certificate validation is
/// off. Proxies are bypassed and idle connections are never pooled: every
/// request opens a fresh connection.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        Self::from_builder(Self::builder())
    }

    /// Present a client certificate (PEM with certificate and private key)
    /// on the secure endpoint.
    pub fn with_identity(pem: &[u8]) -> Result<Self, TransportError> {
        let identity = reqwest::Identity::from_pem(pem).map_err(|e| TransportError::Connection {
            command: "identity".into(),
            reason: e.to_string(),
        })?;
        Self::from_builder(Self::builder().identity(identity))
    }

    fn builder() -> ClientBuilder {
        Client::builder()
            .danger_accept_invalid_certs(true)
            .no_proxy()
            .pool_max_idle_per_host(0)
            .timeout(None::<Duration>)
    }

    fn from_builder(builder: ClientBuilder) -> Result<Self, TransportError> {
        let client = builder.build().map_err(|e| TransportError::Connection {
            command: "client".into(),
            reason: e.to_string(),
        })?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &Url, timeout: Option<Duration>) -> Result<HttpReply, TransportError> {
        let command = command_name(url);
        let mut request = self.client.get(url.clone());
        if let Some(t) = timeout {
            request = request.timeout(t);
        }

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                TransportError::Timeout {
                    command: command.clone(),
                    after: timeout.unwrap_or_default(),
                }
            } else {
                TransportError::Connection {
                    command: command.clone(),
                    reason: e.to_string(),
                }
            }
        };

        let response = request.send().map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(map_err)?;
        debug!(command = %command, status, bytes = body.len(), "control-plane reply");
        Ok(HttpReply { status, body })
    }
}

/// The request path without the leading slash, e.g. `serverinfo`.
pub fn command_name(url: &Url) -> String {
    url.path().trim_start_matches('/').to_string()
}
