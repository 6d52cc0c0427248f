//! TCP listener.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Skip per-connection accept errors, surface listener failures

use std::io;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    /// Failed to bind to address.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    /// The listening socket itself failed.
    #[error("failed to accept: {0}")]
    Accept(#[source] io::Error),
}

/// Accepting side of the HTTP server.
#[derive(Debug)]
pub struct Listener {
    inner: TcpListener,
}

impl Listener {
    /// Bind `address` (`host:port`).
    pub async fn bind(address: &str) -> Result<Self, ListenerError> {
        let inner = TcpListener::bind(address)
            .await
            .map_err(|source| ListenerError::Bind {
                address: address.to_string(),
                source,
            })?;
        Ok(Self { inner })
    }

    /// Wrap an already-bound listener.
    pub fn from_tokio(inner: TcpListener) -> Self {
        Self { inner }
    }

    /// Accept the next connection.
    ///
    /// Errors that concern only the connection being accepted (reset or
    /// aborted by the peer) are logged and skipped.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), ListenerError> {
        loop {
            match self.inner.accept().await {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::trace!(peer_addr = %peer, error = %e, "set_nodelay failed");
                    }
                    tracing::trace!(peer_addr = %peer, "Connection accepted");
                    return Ok((stream, peer));
                }
                Err(e) if is_connection_error(&e) => {
                    tracing::debug!(error = %e, "Dropped connection during accept");
                }
                Err(e) => return Err(ListenerError::Accept(e)),
            }
        }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.inner.local_addr()
    }
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}
