//! Origin frame server: answers `"<video> <index>"` lines with frames.
//!
//! Requests that cannot be served get no reply at all. The relay relies on
//! this and treats silence as "no such frame".

use crate::store::FrameStore;
use frame_protocol::{FrameInStream, FrameOutStream, FrameResponse, Leg, ProtocolError, Request};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// A bound origin server.
pub struct OriginServer {
    listener: TcpListener,
    store: Arc<dyn FrameStore>,
}

impl OriginServer {
    /// Bind `addr` and serve frames from `store`.
    pub async fn bind(addr: &str, store: Arc<dyn FrameStore>) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!(
            "Origin listening on {} with {} videos",
            listener.local_addr()?,
            store.videos().len()
        );
        Ok(Self { listener, store })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept relay connections forever, one task each.
    pub async fn run(self) -> io::Result<()> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
            };
            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
            }
            info!("Relay connected from {}", peer);

            let store = Arc::clone(&self.store);
            tokio::spawn(async move {
                let (reader, writer) = stream.into_split();
                match serve_connection(reader, writer, store).await {
                    Ok(served) => info!("Relay {} disconnected after {} frames", peer, served),
                    Err(e) => info!("Relay {} connection ended: {}", peer, e),
                }
            });
        }
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self) -> JoinHandle<io::Result<()>> {
        tokio::spawn(self.run())
    }
}

/// Serve one relay connection until it closes. Returns frames sent.
pub async fn serve_connection<R, W>(
    reader: R,
    writer: W,
    store: Arc<dyn FrameStore>,
) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut input = FrameInStream::new(reader);
    let mut output = FrameOutStream::new(writer);
    let mut served = 0u64;

    loop {
        let request = match Request::read_from(&mut input).await {
            Ok(Some(request)) => request,
            Ok(None) => return Ok(served),
            Err(ProtocolError::Io(e)) => return Err(e),
            Err(e) => {
                warn!("Invalid request format: {}", e);
                continue;
            }
        };
        debug!("Received request {}", request);

        let (video, index) = match request {
            Request::Frame { video, index } => (video, index),
            other => {
                warn!("Ignoring request {}", other);
                continue;
            }
        };

        if let Err(e) = store.check(&video, index) {
            warn!("{}", e);
            continue;
        }

        let loader = Arc::clone(&store);
        let name = video.clone();
        let loaded = tokio::task::spawn_blocking(move || loader.load(&name, index))
            .await
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let payload = match loaded {
            Ok(payload) => payload,
            Err(e) => {
                error!("{}", e);
                continue;
            }
        };

        debug!("Sending {} frame {} ({} bytes)", video, index, payload.len());
        FrameResponse::new(payload).write_to(&mut output, Leg::Origin);
        output.flush().await?;
        served += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryFrameStore;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use tokio::io::duplex;

    #[tokio::test]
    async fn test_serves_frames_and_ignores_bad_requests() {
        let store: Arc<dyn FrameStore> = Arc::new(
            MemoryFrameStore::new().with_video("marc", vec![&b"f0"[..], &b"f1"[..]]),
        );
        let (server_reads, client_writes) = duplex(4096);
        let (client_reads, server_writes) = duplex(4096);
        let server = tokio::spawn(serve_connection(server_reads, server_writes, store));

        let mut output = FrameOutStream::new(client_writes);
        for line in ["garbage", "PING", "nope 0", "marc 2", "marc 1"] {
            output.write_line(line);
        }
        output.flush().await.unwrap();

        let mut input = FrameInStream::new(client_reads);
        let frame = FrameResponse::read_from(&mut input, Leg::Origin).await.unwrap();
        assert_eq!(frame.payload, Bytes::from_static(b"f1"));
        assert!(frame.verify());
        assert_eq!(frame.from_cache, None);

        drop(output);
        assert_eq!(server.await.unwrap().unwrap(), 1);
        assert_eq!(input.available(), 0);
    }
}
