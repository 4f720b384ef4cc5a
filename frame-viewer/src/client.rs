//! Connection to the relay and frame-by-frame playback.
//!
//! A [`Viewer`] keeps exactly one frame request outstanding. Every reply is
//! checked against its checksum; a mismatch sends `NACK <index>`, shrinks
//! the congestion window and requests the same index again. A background
//! heartbeat task sends `PING` so the relay does not time the connection
//! out between videos.

use crate::config::Config;
use crate::errors::ViewerError;
use crate::events::{RetryReason, ViewerEvent};
use bytes::Bytes;
use frame_common::Progress;
use frame_protocol::{
    checksum, FrameInStream, FrameOutStream, FrameResponse, Leg, Request, ViewerCongestion,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;
type SharedOutput = Arc<Mutex<FrameOutStream<BoxWriter>>>;

/// Totals for one call to [`Viewer::play`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackSummary {
    pub frames: u32,
    pub from_cache: u32,
    pub retries: u32,
}

/// One received, verified frame.
#[derive(Debug, Clone)]
pub struct ReceivedFrame {
    pub index: u32,
    pub payload: Bytes,
    pub from_cache: bool,
    /// Re-requests needed before this frame verified.
    pub retries: u32,
}

/// Playback client connected to a relay.
pub struct Viewer {
    input: FrameInStream<BoxReader>,
    output: SharedOutput,
    heartbeat: JoinHandle<()>,
    congestion: ViewerCongestion,
    config: Config,
    events_tx: flume::Sender<ViewerEvent>,
    events_rx: flume::Receiver<ViewerEvent>,
    last_frame_at: Option<Instant>,
}

impl Viewer {
    /// Connect to the relay named in `config`.
    pub async fn connect(config: Config) -> Result<Self, ViewerError> {
        config.validate()?;
        let addr = format!("{}:{}", config.relay.host, config.relay.port);
        let stream = tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&addr))
            .await
            .map_err(|_| ViewerError::Timeout(config.connect_timeout()))?
            .map_err(|e| {
                ViewerError::ConnectionFailed(format!("Failed to connect to {}: {}", addr, e))
            })?;
        stream.set_nodelay(true).map_err(|e| {
            ViewerError::ConnectionFailed(format!("Failed to set TCP_NODELAY: {}", e))
        })?;
        if let (Ok(local), Ok(peer)) = (stream.local_addr(), stream.peer_addr()) {
            info!("Connected to relay: local={} -> remote={}", local, peer);
        }

        let (reader, writer) = stream.into_split();
        Ok(Self::new(reader, writer, config))
    }

    /// Wrap an established stream and start the heartbeat.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, config: Config) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let output: SharedOutput = Arc::new(Mutex::new(FrameOutStream::new(
            Box::new(writer) as BoxWriter
        )));
        let heartbeat = tokio::spawn(heartbeat(Arc::clone(&output), config.heartbeat_interval()));
        let (events_tx, events_rx) = flume::bounded(config.playback.event_capacity);

        Self {
            input: FrameInStream::new(Box::new(reader) as BoxReader),
            output,
            heartbeat,
            congestion: ViewerCongestion::new(),
            config,
            events_tx,
            events_rx,
            last_frame_at: None,
        }
    }

    /// Playback events. Events are dropped while the channel is full.
    pub fn events(&self) -> flume::Receiver<ViewerEvent> {
        self.events_rx.clone()
    }

    /// Current congestion controller state.
    pub fn congestion(&self) -> &ViewerCongestion {
        &self.congestion
    }

    /// Request frames `0..count` of `video`, one at a time.
    ///
    /// Stops at the first error; frames already received stay written.
    pub async fn play(&mut self, video: &str, count: u32) -> Result<PlaybackSummary, ViewerError> {
        info!("Playing {} frames of {}", count, video);
        let mut summary = PlaybackSummary::default();

        for index in 0..count {
            let frame = self.fetch(video, index).await?;
            summary.frames += 1;
            summary.retries += frame.retries;
            if frame.from_cache {
                summary.from_cache += 1;
            }

            if let Some(dir) = &self.config.playback.output_dir {
                save_frame(dir, video, index, &frame.payload).await?;
            }

            let now = Instant::now();
            let fps = self
                .last_frame_at
                .map(|prev| now.duration_since(prev).as_secs_f64())
                .filter(|secs| *secs > 0.0)
                .map(|secs| 1.0 / secs);
            self.last_frame_at = Some(now);

            let progress = Progress::new(index + 1, count);
            debug!(
                "Frame {} {} ({}), window={} threshold={}",
                index,
                if frame.from_cache { "from cache" } else { "from origin" },
                progress,
                self.congestion.window(),
                self.congestion.threshold()
            );
            self.emit(ViewerEvent::FrameReceived {
                video: video.to_string(),
                index,
                bytes: frame.payload.len(),
                from_cache: frame.from_cache,
                progress,
                window: self.congestion.window(),
                threshold: self.congestion.threshold(),
                fps,
            });
        }

        info!(
            "Finished {}: {} frames ({} from cache, {} retries)",
            video, summary.frames, summary.from_cache, summary.retries
        );
        self.emit(ViewerEvent::Finished {
            video: video.to_string(),
            frames: summary.frames,
            from_cache: summary.from_cache,
            retries: summary.retries,
        });
        Ok(summary)
    }

    /// Request one frame until it verifies or the retry budget runs out.
    pub async fn fetch(&mut self, video: &str, index: u32) -> Result<ReceivedFrame, ViewerError> {
        let attempts = self.config.playback.max_retries.saturating_add(1);

        for attempt in 0..attempts {
            let response = self.request(video, index).await?;

            if let Err(e) = verify(&response, index) {
                warn!("{}; requesting retransmission", e);
                self.send(&Request::Nack { index }).await?;
                self.congestion.on_loss();
                self.emit_retry(video, index, attempt + 1, RetryReason::ChecksumMismatch);
                continue;
            }
            self.congestion.on_success();

            if self.config.playback.validate_images {
                if let Err(e) = image::load_from_memory(&response.payload) {
                    warn!("Frame {} of {} does not decode ({}); retrying", index, video, e);
                    self.emit_retry(video, index, attempt + 1, RetryReason::UndecodableImage);
                    continue;
                }
            }

            return Ok(ReceivedFrame {
                index,
                payload: response.payload,
                from_cache: response.from_cache.unwrap_or(false),
                retries: attempt,
            });
        }

        Err(ViewerError::RetriesExhausted {
            video: video.to_string(),
            index,
            attempts,
        })
    }

    /// Send `DISCONNECT` and close the connection.
    pub async fn disconnect(self) -> Result<(), ViewerError> {
        self.heartbeat.abort();
        {
            let mut output = self.output.lock().await;
            Request::Disconnect.write_to(&mut *output);
            output.flush().await?;
            output.shutdown().await?;
        }
        info!("Disconnected from relay");
        let _ = self.events_tx.try_send(ViewerEvent::Disconnected);
        Ok(())
    }

    async fn request(&mut self, video: &str, index: u32) -> Result<FrameResponse, ViewerError> {
        self.send(&Request::frame(video, index)).await?;
        let timeout = self.config.reply_timeout();
        let read = FrameResponse::read_from(&mut self.input, Leg::Viewer);
        let response = tokio::time::timeout(timeout, read)
            .await
            .map_err(|_| ViewerError::Timeout(timeout))??;
        Ok(response)
    }

    async fn send(&self, request: &Request) -> Result<(), ViewerError> {
        let mut output = self.output.lock().await;
        request.write_to(&mut *output);
        output.flush().await?;
        Ok(())
    }

    fn emit_retry(&self, video: &str, index: u32, attempt: u32, reason: RetryReason) {
        self.emit(ViewerEvent::Retry {
            video: video.to_string(),
            index,
            attempt,
            reason,
        });
    }

    fn emit(&self, event: ViewerEvent) {
        if self.events_tx.try_send(event).is_err() {
            debug!("Event channel full, dropping event");
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.heartbeat.abort();
    }
}

fn verify(response: &FrameResponse, index: u32) -> Result<(), ViewerError> {
    let actual = checksum(&response.payload);
    if actual == response.checksum {
        Ok(())
    } else {
        Err(ViewerError::ChecksumMismatch {
            index,
            expected: response.checksum,
            actual,
        })
    }
}

async fn heartbeat(output: SharedOutput, interval: std::time::Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        let mut output = output.lock().await;
        Request::Ping.write_to(&mut *output);
        if let Err(e) = output.flush().await {
            debug!("Heartbeat stopped: {}", e);
            return;
        }
    }
}

async fn save_frame(dir: &std::path::Path, video: &str, index: u32, payload: &[u8]) -> Result<(), ViewerError> {
    let video_dir: PathBuf = dir.join(video);
    tokio::fs::create_dir_all(&video_dir).await?;
    tokio::fs::write(video_dir.join(format!("frame_{:04}.jpg", index)), payload).await?;
    Ok(())
}
