//! The relay's single shared connection to the origin frame server.
//!
//! Sessions resolve cache misses through [`OriginLink::fetch`]. The link
//! carries one request/response exchange at a time: the async mutex is held
//! from writing the request line until the full frame has been read, so
//! replies can never be matched to the wrong request.
//!
//! The origin stays silent for requests it cannot serve (unknown video,
//! index out of range). A fetch therefore waits at most `reply_timeout` for
//! the first reply byte; silence yields [`RelayError::NoReply`] and the link
//! remains usable.
//!
//! A valid reply that arrives after `reply_timeout` (a slow origin disk, for
//! example) is stale. If it is already readable when the next fetch takes
//! the link, it is read and discarded. If it only arrives after the next
//! request was written, it is taken as that request's reply and cached under
//! the wrong key, so `reply_timeout` must stay well above the origin's worst
//! frame load time.
//!
//! Any failure after the reply has started (short frame,
//! I/O error, stall past `frame_timeout`) leaves the stream out of sync, so
//! the link is marked broken and every later fetch fails fast with
//! [`RelayError::OriginUnavailable`].

use crate::config::Config;
use crate::errors::RelayError;
use crate::trace;
use crate::transport;
use frame_protocol::congestion::CongestionSnapshot;
use frame_protocol::{
    FrameInStream, FrameOutStream, FrameResponse, Leg, OriginCongestion, OriginCongestionParams,
    Request,
};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, warn};

type BoxReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Timing and congestion settings for an [`OriginLink`].
#[derive(Debug, Clone)]
pub struct LinkSettings {
    /// Wait for the first reply byte.
    pub reply_timeout: Duration,
    /// Wait for the rest of a frame once it has started.
    pub frame_timeout: Duration,
    pub congestion: OriginCongestionParams,
}

impl Default for LinkSettings {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(2),
            frame_timeout: Duration::from_secs(10),
            congestion: OriginCongestionParams::default(),
        }
    }
}

impl LinkSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reply_timeout: config.reply_timeout(),
            frame_timeout: config.frame_timeout(),
            congestion: config.congestion.params(),
        }
    }
}

struct LinkIo {
    input: FrameInStream<BoxReader>,
    output: FrameOutStream<BoxWriter>,
}

/// Serialized request/response channel to the origin.
pub struct OriginLink {
    peer: String,
    io: tokio::sync::Mutex<LinkIo>,
    healthy: AtomicBool,
    settings: LinkSettings,
    congestion: parking_lot::Mutex<OriginCongestion>,
}

impl OriginLink {
    /// Connect to the origin named in `config`.
    pub async fn connect(config: &Config) -> Result<Self, RelayError> {
        let stream = transport::connect(
            &config.origin.host,
            config.origin.port,
            config.connect_timeout(),
        )
        .await?;
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| format!("{}:{}", config.origin.host, config.origin.port));
        let (reader, writer) = stream.into_split();
        Ok(Self::new(peer, reader, writer, LinkSettings::from_config(config)))
    }

    /// Wrap an already-established byte stream.
    pub fn new<R, W>(peer: impl Into<String>, reader: R, writer: W, settings: LinkSettings) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let congestion = OriginCongestion::new(settings.congestion.clone());
        Self {
            peer: peer.into(),
            io: tokio::sync::Mutex::new(LinkIo {
                input: FrameInStream::new(Box::new(reader) as BoxReader),
                output: FrameOutStream::new(Box::new(writer) as BoxWriter),
            }),
            healthy: AtomicBool::new(true),
            settings,
            congestion: parking_lot::Mutex::new(congestion),
        }
    }

    /// Origin address, for logging.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// False once the link has been broken by an I/O or framing failure.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Acquire)
    }

    /// Current congestion controller state.
    pub fn congestion(&self) -> CongestionSnapshot {
        self.congestion.lock().snapshot()
    }

    /// Request one frame from the origin.
    ///
    /// # Errors
    ///
    /// - [`RelayError::NoReply`] if the origin stayed silent (link still usable)
    /// - [`RelayError::OriginUnavailable`] if the link was already broken
    /// - [`RelayError::ConnectionLost`], [`RelayError::Protocol`] or
    ///   [`RelayError::Timeout`] if this exchange broke the link
    pub async fn fetch(&self, video: &str, index: u32) -> Result<FrameResponse, RelayError> {
        if !self.is_healthy() {
            return Err(RelayError::OriginUnavailable);
        }

        let mut io = self.io.lock().await;
        // Another session may have broken the link while we waited.
        if !self.is_healthy() {
            return Err(RelayError::OriginUnavailable);
        }

        self.discard_stale_reply(&mut io).await?;

        let request = Request::frame(video, index);
        request.write_to(&mut io.output);
        let started = Instant::now();
        if let Err(e) = io.output.flush().await {
            return Err(self.break_link(RelayError::ConnectionLost(e)));
        }
        trace::out_msg(&self.peer, &request.to_string());

        match tokio::time::timeout(self.settings.reply_timeout, io.input.wait_for_data()).await {
            Err(_) if io.input.available() == 0 => {
                debug!("Origin {} sent no reply to '{}'", self.peer, request);
                return Err(RelayError::NoReply(request.to_string()));
            }
            Err(_) => {}
            Ok(Ok(0)) => {
                let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "origin closed the link");
                return Err(self.break_link(RelayError::ConnectionLost(eof)));
            }
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(self.break_link(RelayError::ConnectionLost(e))),
        }

        let read = FrameResponse::read_from(&mut io.input, Leg::Origin);
        let frame = match tokio::time::timeout(self.settings.frame_timeout, read).await {
            Ok(Ok(frame)) => frame,
            Ok(Err(e)) => return Err(self.break_link(RelayError::Protocol(e))),
            Err(_) => return Err(self.break_link(RelayError::Timeout(self.settings.frame_timeout))),
        };
        let rtt = started.elapsed();
        drop(io);

        trace::in_msg(
            &self.peer,
            &format!("frame {} len={} checksum={}", request, frame.len(), frame.checksum),
        );
        self.congestion.lock().on_success(rtt);
        Ok(frame)
    }

    /// Drop a late reply to an earlier, timed-out request.
    async fn discard_stale_reply(&self, io: &mut LinkIo) -> Result<(), RelayError> {
        // A zero timeout still polls once, so this only sees bytes already readable.
        match tokio::time::timeout(Duration::ZERO, io.input.wait_for_data()).await {
            Err(_) => Ok(()),
            Ok(Ok(0)) => {
                let eof = io::Error::new(io::ErrorKind::UnexpectedEof, "origin closed the link");
                Err(self.break_link(RelayError::ConnectionLost(eof)))
            }
            Ok(Ok(_)) => {
                let read = FrameResponse::read_from(&mut io.input, Leg::Origin);
                match tokio::time::timeout(self.settings.frame_timeout, read).await {
                    Ok(Ok(stale)) => {
                        warn!(
                            "Discarded late reply from origin {} ({} bytes)",
                            self.peer,
                            stale.len()
                        );
                        Ok(())
                    }
                    Ok(Err(e)) => Err(self.break_link(RelayError::Protocol(e))),
                    Err(_) => {
                        Err(self.break_link(RelayError::Timeout(self.settings.frame_timeout)))
                    }
                }
            }
            Ok(Err(e)) => Err(self.break_link(RelayError::ConnectionLost(e))),
        }
    }

    fn break_link(&self, err: RelayError) -> RelayError {
        if self.healthy.swap(false, Ordering::AcqRel) {
            error!(
                "Origin link to {} broken: {}. Cache misses can no longer be served",
                self.peer, err
            );
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use tokio::io::{duplex, AsyncWriteExt, DuplexStream};

    fn quick_settings() -> LinkSettings {
        LinkSettings {
            reply_timeout: Duration::from_millis(100),
            frame_timeout: Duration::from_millis(200),
            ..LinkSettings::default()
        }
    }

    /// Returns the link plus the origin's ends of the two pipes.
    fn pipe_link() -> (OriginLink, FrameInStream<DuplexStream>, DuplexStream) {
        let (relay_reads, origin_writes) = duplex(1 << 16);
        let (relay_writes, origin_reads) = duplex(1 << 16);
        let link = OriginLink::new("origin", relay_reads, relay_writes, quick_settings());
        (link, FrameInStream::new(origin_reads), origin_writes)
    }

    async fn send_frame(writer: &mut DuplexStream, payload: &'static [u8]) {
        let mut out = FrameOutStream::new(&mut *writer);
        FrameResponse::new(Bytes::from_static(payload)).write_to(&mut out, Leg::Origin);
        out.flush().await.unwrap();
    }

    #[tokio::test]
    async fn test_fetch_round_trip() {
        let (link, mut origin_in, mut origin_out) = pipe_link();

        let origin = tokio::spawn(async move {
            let line = origin_in.read_line(64).await.unwrap().unwrap();
            send_frame(&mut origin_out, b"jpeg").await;
            (line, origin_in, origin_out)
        });

        let frame = link.fetch("marc", 3).await.unwrap();
        let (line, _, _) = origin.await.unwrap();
        assert_eq!(line, "marc 3");
        assert_eq!(&frame.payload[..], b"jpeg");
        assert!(frame.verify());
        assert!(link.congestion().window > 1.0);
    }

    #[tokio::test]
    async fn test_silence_is_no_reply_and_link_survives() {
        let (link, mut origin_in, mut origin_out) = pipe_link();

        let err = link.fetch("marc", 999).await.unwrap_err();
        assert!(matches!(err, RelayError::NoReply(_)));
        assert!(link.is_healthy());
        assert_eq!(link.congestion().window, 1.0);

        let origin = tokio::spawn(async move {
            assert_eq!(origin_in.read_line(64).await.unwrap().unwrap(), "marc 999");
            assert_eq!(origin_in.read_line(64).await.unwrap().unwrap(), "marc 0");
            send_frame(&mut origin_out, b"ok").await;
            (origin_in, origin_out)
        });
        let frame = link.fetch("marc", 0).await.unwrap();
        assert_eq!(&frame.payload[..], b"ok");
        let _ = origin.await.unwrap();
    }

    #[tokio::test]
    async fn test_late_reply_is_discarded() {
        let (link, mut origin_in, mut origin_out) = pipe_link();

        let err = link.fetch("marc", 5).await.unwrap_err();
        assert!(matches!(err, RelayError::NoReply(_)));
        assert_eq!(origin_in.read_line(64).await.unwrap().unwrap(), "marc 5");
        send_frame(&mut origin_out, b"late").await;

        let origin = tokio::spawn(async move {
            assert_eq!(origin_in.read_line(64).await.unwrap().unwrap(), "marc 6");
            send_frame(&mut origin_out, b"fresh").await;
            (origin_in, origin_out)
        });
        let frame = link.fetch("marc", 6).await.unwrap();
        let _pipes = origin.await.unwrap();

        assert_eq!(&frame.payload[..], b"fresh");
        assert!(link.is_healthy());
    }

    #[tokio::test]
    async fn test_truncated_reply_breaks_link() {
        let (link, _origin_in, mut origin_out) = pipe_link();

        // Declares 100 bytes, delivers 3, then closes.
        origin_out.write_all(&[0, 0, 0, 100, 1, 2, 3]).await.unwrap();
        drop(origin_out);

        let err = link.fetch("marc", 0).await.unwrap_err();
        assert!(matches!(err, RelayError::Protocol(ref e) if e.is_malformed_frame()));
        assert!(!link.is_healthy());
        assert!(matches!(
            link.fetch("marc", 1).await.unwrap_err(),
            RelayError::OriginUnavailable
        ));
    }

    #[tokio::test]
    async fn test_stalled_reply_breaks_link() {
        let (link, _origin_in, mut origin_out) = pipe_link();

        origin_out.write_all(&[0, 0, 0, 10, 1]).await.unwrap();
        let err = link.fetch("marc", 0).await.unwrap_err();
        assert!(matches!(err, RelayError::Timeout(_)));
        assert!(!link.is_healthy());
    }

    #[tokio::test]
    async fn test_closed_origin_breaks_link() {
        let (link, _origin_in, origin_out) = pipe_link();
        drop(origin_out);

        let err = link.fetch("marc", 0).await.unwrap_err();
        assert!(matches!(err, RelayError::ConnectionLost(_)));
        assert!(!link.is_healthy());
    }
}
