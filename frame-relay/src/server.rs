//! Client-facing accept loop.

use crate::config::Config;
use crate::errors::RelayError;
use crate::origin::OriginLink;
use crate::session::{ClientSession, SessionContext};
use crate::transport;
use frame_cache::CacheRegistry;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// A bound relay, ready to accept clients.
pub struct RelayServer {
    listener: TcpListener,
    ctx: SessionContext,
}

impl RelayServer {
    /// Validate `config`, connect to the origin and bind the listener.
    pub async fn start(config: Config) -> Result<Self, RelayError> {
        config.validate()?;
        let origin = OriginLink::connect(&config).await?;
        Self::bind(&config, origin).await
    }

    /// Bind the listener around an existing origin link.
    pub async fn bind(config: &Config, origin: OriginLink) -> Result<Self, RelayError> {
        let listener = transport::bind(&config.listen_addr()).await?;
        let ctx = SessionContext {
            cache: Arc::new(CacheRegistry::new(config.cache.capacity)),
            origin: Arc::new(origin),
            idle_timeout: config.idle_timeout(),
            stats_interval: config.session.stats_interval,
        };
        let server = Self { listener, ctx };
        info!("Relay listening on {}", server.local_addr()?);
        Ok(server)
    }

    /// Address clients should connect to.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        Ok(self.listener.local_addr()?)
    }

    /// Shared frame cache.
    pub fn cache(&self) -> Arc<CacheRegistry> {
        Arc::clone(&self.ctx.cache)
    }

    /// Shared origin link.
    pub fn origin(&self) -> Arc<OriginLink> {
        Arc::clone(&self.ctx.origin)
    }

    /// Accept clients forever, one task per connection.
    pub async fn run(self) -> Result<(), RelayError> {
        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept failed: {}", e);
                    continue;
                }
            };
            transport::prepare_accepted(&stream);

            let ctx = self.ctx.clone();
            tokio::spawn(async move {
                let (reader, writer) = stream.into_split();
                let summary = ClientSession::new(peer.to_string(), reader, writer, ctx)
                    .run()
                    .await;
                info!(
                    "Session {} finished: {} hits, {} misses",
                    summary.peer,
                    summary.stats.hits(),
                    summary.stats.misses()
                );
            });
        }
    }

    /// Run the accept loop on a background task.
    pub fn spawn(self) -> JoinHandle<Result<(), RelayError>> {
        tokio::spawn(self.run())
    }
}
