//! Per-client request handling.
//!
//! Each accepted client gets one [`ClientSession`] running on its own task.
//! A session reads one request line at a time, serves frame requests from the
//! shared cache or the origin link, and replies before reading the next line,
//! so replies leave in request order.

use crate::errors::RelayError;
use crate::origin::OriginLink;
use crate::stats::SessionStats;
use crate::trace;
use frame_cache::CacheRegistry;
use frame_common::FrameKey;
use frame_protocol::{FrameInStream, FrameOutStream, FrameResponse, Leg, Request};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, warn};

/// Where a session is in its request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingRequest,
    Dispatching,
    CacheLookup,
    OriginRoundTrip,
    Replying,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::AwaitingRequest => write!(f, "Awaiting request"),
            SessionState::Dispatching => write!(f, "Dispatching"),
            SessionState::CacheLookup => write!(f, "Cache lookup"),
            SessionState::OriginRoundTrip => write!(f, "Origin round trip"),
            SessionState::Replying => write!(f, "Replying"),
            SessionState::Closed => write!(f, "Closed"),
        }
    }
}

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// The client sent `DISCONNECT`.
    Disconnect,
    /// The client closed its end.
    EndOfStream,
    /// Nothing arrived within the idle timeout.
    IdleTimeout,
    /// I/O or framing failure on the client connection.
    Error(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Disconnect => write!(f, "client disconnected"),
            CloseReason::EndOfStream => write!(f, "connection closed by client"),
            CloseReason::IdleTimeout => write!(f, "idle timeout"),
            CloseReason::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// Final statistics of a finished session.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub peer: String,
    pub stats: SessionStats,
    pub reason: CloseReason,
}

/// Shared relay state handed to every session.
#[derive(Clone)]
pub struct SessionContext {
    pub cache: Arc<CacheRegistry>,
    pub origin: Arc<OriginLink>,
    pub idle_timeout: Duration,
    pub stats_interval: u64,
}

enum Flow {
    Continue,
    Close,
}

/// One client connection.
pub struct ClientSession<R, W> {
    peer: String,
    input: FrameInStream<R>,
    output: FrameOutStream<W>,
    ctx: SessionContext,
    stats: SessionStats,
    state: SessionState,
}

impl<R, W> ClientSession<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(peer: impl Into<String>, reader: R, writer: W, ctx: SessionContext) -> Self {
        Self {
            peer: peer.into(),
            input: FrameInStream::new(reader),
            output: FrameOutStream::new(writer),
            ctx,
            stats: SessionStats::new(),
            state: SessionState::AwaitingRequest,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Serve requests until the client leaves or the connection fails.
    pub async fn run(mut self) -> SessionSummary {
        info!("Client {} connected", self.peer);

        let reason = loop {
            self.state = SessionState::AwaitingRequest;
            let next = tokio::time::timeout(
                self.ctx.idle_timeout,
                Request::read_from(&mut self.input),
            )
            .await;

            let request = match next {
                Err(_) => break CloseReason::IdleTimeout,
                Ok(Ok(None)) => break CloseReason::EndOfStream,
                Ok(Ok(Some(request))) => request,
                Ok(Err(e)) if !e.is_fatal() => {
                    warn!("Invalid request format from {}: {}", self.peer, e);
                    continue;
                }
                Ok(Err(e)) => break CloseReason::Error(e.to_string()),
            };
            trace::in_msg(&self.peer, &request.to_string());

            self.state = SessionState::Dispatching;
            match self.dispatch(request).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Close) => break CloseReason::Disconnect,
                Err(e) if e.is_session_fatal() => break CloseReason::Error(e.to_string()),
                Err(e) => warn!("Request from {} failed: {}", self.peer, e),
            }
        };

        self.state = SessionState::Closed;
        if let Err(e) = self.output.shutdown().await {
            debug!("Shutdown of {} failed: {}", self.peer, e);
        }
        info!("Client {} closed ({})", self.peer, reason);
        if self.stats.total() > 0 {
            info!("{}", self.stats.format_report(&self.peer, &self.ctx.cache));
        }

        SessionSummary {
            peer: self.peer,
            stats: self.stats,
            reason,
        }
    }

    async fn dispatch(&mut self, request: Request) -> Result<Flow, RelayError> {
        match request {
            Request::Ping => {
                debug!("PING from {}", self.peer);
                Ok(Flow::Continue)
            }
            Request::Disconnect => Ok(Flow::Close),
            Request::Nack { index } => {
                // Nothing is purged or resent; the client re-requests on its own.
                debug!("NACK {} from {}", index, self.peer);
                Ok(Flow::Continue)
            }
            Request::Frame { video, index } => {
                self.serve_frame(&video, index).await?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn serve_frame(&mut self, video: &str, index: u32) -> Result<(), RelayError> {
        let key = FrameKey::new(video, index);
        self.state = SessionState::CacheLookup;
        if let Some(payload) = self.ctx.cache.get(video, index) {
            debug!("Cache hit {} for {}", key, self.peer);
            self.stats.record_hit(video);
            self.report_if_due();
            return self.reply(FrameResponse::new(payload).from_cache(true)).await;
        }

        self.state = SessionState::OriginRoundTrip;
        let frame = match self.ctx.origin.fetch(video, index).await {
            Ok(frame) => frame,
            Err(RelayError::NoReply(_)) => {
                warn!("Origin has no frame {}; nothing sent to {}", key, self.peer);
                return Ok(());
            }
            Err(e) => {
                error!("Cannot fetch {} for {}: {}", key, self.peer, e);
                return Ok(());
            }
        };

        debug!("Cache miss {} for {} ({} bytes)", key, self.peer, frame.len());
        if !frame.verify() {
            warn!("Origin frame {} fails its checksum; forwarding unchanged", key);
        }
        self.ctx.cache.put(video, index, frame.payload.clone());
        self.stats.record_miss(video);
        self.report_if_due();
        self.reply(frame.from_cache(false)).await
    }

    async fn reply(&mut self, response: FrameResponse) -> Result<(), RelayError> {
        self.state = SessionState::Replying;
        response.write_to(&mut self.output, Leg::Viewer);
        self.output.flush().await?;
        trace::out_msg(
            &self.peer,
            &format!(
                "frame len={} checksum={} cached={}",
                response.len(),
                response.checksum,
                response.from_cache.unwrap_or(false)
            ),
        );
        Ok(())
    }

    fn report_if_due(&self) {
        if self.stats.report_due(self.ctx.stats_interval) {
            info!("{}", self.stats.format_report(&self.peer, &self.ctx.cache));
        }
    }
}
