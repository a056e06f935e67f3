//! TCP dialer using `tokio::net`.

use std::time::Duration;

use tokio::net::TcpStream;

use crate::{Dialer, TransportError};

/// Dials plain TCP connections.
///
/// Resolves the host, tries each address in turn, and gives up when the
/// whole attempt exceeds `connect_timeout`.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    nodelay: bool,
    connect_timeout: Duration,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            nodelay: true,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl TcpDialer {
    pub fn new(nodelay: bool, connect_timeout: Duration) -> Self {
        Self {
            nodelay,
            connect_timeout,
        }
    }

    pub fn nodelay(&self) -> bool {
        self.nodelay
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    async fn dial_any(&self, host: &str, port: u16) -> Result<TcpStream, TransportError> {
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|source| TransportError::Resolve {
                host: host.to_owned(),
                port,
                source,
            })?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    tracing::debug!(%addr, "tcp connected");
                    return Ok(stream);
                }
                Err(source) => {
                    tracing::debug!(%addr, error = %source, "tcp connect attempt failed");
                    last_err = Some(TransportError::ConnectFailed {
                        addr: addr.to_string(),
                        source,
                    });
                }
            }
        }

        Err(last_err.unwrap_or_else(|| TransportError::Resolve {
            host: host.to_owned(),
            port,
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "host resolved to no addresses",
            ),
        }))
    }
}

impl Dialer for TcpDialer {
    type Stream = TcpStream;

    async fn dial(&self, host: &str, port: u16) -> Result<Self::Stream, TransportError> {
        let stream = tokio::time::timeout(self.connect_timeout, self.dial_any(host, port))
            .await
            .map_err(|_| TransportError::Timeout {
                host: host.to_owned(),
                port,
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })??;

        if self.nodelay {
            // Small frames (heartbeats, acks) should not wait on Nagle.
            if let Err(e) = stream.set_nodelay(true) {
                tracing::warn!(error = %e, "failed to set TCP_NODELAY");
            }
        }
        Ok(stream)
    }
}
