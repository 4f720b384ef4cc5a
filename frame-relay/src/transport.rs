//! TCP plumbing for both relay legs.
//!
//! Every socket the relay touches has `TCP_NODELAY` set: request lines and
//! frame headers are tiny and latency-bound.

use crate::errors::RelayError;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

/// Connect to `host:port`, giving up after `timeout`.
///
/// # Errors
///
/// Returns [`RelayError::ConnectionFailed`] if resolution or connection
/// fails, and [`RelayError::Timeout`] if it takes too long.
pub async fn connect(host: &str, port: u16, timeout: Duration) -> Result<TcpStream, RelayError> {
    let addr = format!("{}:{}", host, port);
    let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
        .await
        .map_err(|_| RelayError::Timeout(timeout))?
        .map_err(|e| {
            RelayError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
        })?;

    stream.set_nodelay(true).map_err(|e| {
        RelayError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
    })?;

    if let (Ok(local), Ok(peer)) = (stream.local_addr(), stream.peer_addr()) {
        tracing::info!("Connected via TCP: local={} -> remote={}", local, peer);
    } else {
        tracing::info!("Connected to {}", addr);
    }
    Ok(stream)
}

/// Bind the client-facing listener.
///
/// # Errors
///
/// Returns [`RelayError::ConnectionFailed`] if the address cannot be bound.
pub async fn bind(addr: &str) -> Result<TcpListener, RelayError> {
    TcpListener::bind(addr)
        .await
        .map_err(|e| RelayError::ConnectionFailed(format!("Failed to bind {}: {}", addr, e)))
}

/// Prepare an accepted client socket.
pub fn prepare_accepted(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        tracing::warn!("Failed to set TCP_NODELAY on client socket: {}", e);
    }
}
