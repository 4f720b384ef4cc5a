//! Property tests for message framing.
//!
//! These tests verify that frame and request parsing is robust against
//! fragmentation at arbitrary byte boundaries, which is what real TCP
//! streams deliver.

use super::request::Request;
use super::response::{checksum, FrameResponse, Leg};
use crate::io::{FrameInStream, FrameOutStream};
use bytes::Bytes;
use proptest::prelude::*;

/// A reader that delivers data in two pieces, split at `boundary`.
struct FragmentingReader {
    data: Vec<u8>,
    pos: usize,
    boundary: usize,
}

impl FragmentingReader {
    fn new(data: Vec<u8>, boundary: usize) -> Self {
        let boundary = boundary.min(data.len());
        Self {
            data,
            pos: 0,
            boundary,
        }
    }
}

impl tokio::io::AsyncRead for FragmentingReader {
    fn poll_read(
        mut self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        if self.pos >= self.data.len() {
            return std::task::Poll::Ready(Ok(()));
        }

        let available = if self.pos < self.boundary {
            (self.boundary - self.pos).min(buf.remaining())
        } else {
            (self.data.len() - self.pos).min(buf.remaining())
        };

        if available == 0 {
            return std::task::Poll::Ready(Ok(()));
        }

        let data = &self.data[self.pos..self.pos + available];
        buf.put_slice(data);
        self.pos += available;

        std::task::Poll::Ready(Ok(()))
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap()
}

fn arbitrary_request() -> impl Strategy<Value = Request> {
    prop_oneof![
        ("[a-zA-Z0-9_]{1,24}", any::<u32>()).prop_map(|(video, index)| Request::frame(video, index)),
        Just(Request::Ping),
        Just(Request::Disconnect),
        any::<u32>().prop_map(|index| Request::Nack { index }),
    ]
}

proptest! {
    /// Frames survive fragmentation at every boundary on both legs.
    #[test]
    fn frame_round_trips_under_fragmentation(
        payload in prop::collection::vec(any::<u8>(), 0..2048),
        from_cache in any::<bool>(),
        boundary in 0usize..2100,
    ) {
        let rt = runtime();
        rt.block_on(async {
            for leg in [Leg::Origin, Leg::Viewer] {
                let mut response = FrameResponse::new(Bytes::from(payload.clone()));
                if leg == Leg::Viewer {
                    response = response.from_cache(from_cache);
                }

                let mut wire = Vec::new();
                let mut out = FrameOutStream::new(&mut wire);
                response.write_to(&mut out, leg);
                out.flush().await.unwrap();

                let mut input = FrameInStream::with_capacity(FragmentingReader::new(wire, boundary), 64);
                let decoded = FrameResponse::read_from(&mut input, leg).await.unwrap();
                prop_assert_eq!(&decoded, &response);
                prop_assert!(decoded.verify());
            }
            Ok(())
        })?;
    }

    /// A frame cut short anywhere after its header is always malformed.
    #[test]
    fn truncated_frame_is_malformed(
        payload in prop::collection::vec(any::<u8>(), 1..512),
        cut in 4usize..520,
    ) {
        let rt = runtime();
        rt.block_on(async {
            let mut wire = Vec::new();
            let mut out = FrameOutStream::new(&mut wire);
            FrameResponse::new(Bytes::from(payload.clone())).write_to(&mut out, Leg::Viewer);
            out.flush().await.unwrap();

            let cut = cut.min(wire.len() - 1);
            wire.truncate(cut);

            let mut input = FrameInStream::new(FragmentingReader::new(wire, cut / 2));
            let err = FrameResponse::read_from(&mut input, Leg::Viewer).await.unwrap_err();
            prop_assert!(err.is_malformed_frame());
            Ok(())
        })?;
    }

    /// Request lines parse back to the same request, however they are split.
    #[test]
    fn request_round_trips_under_fragmentation(
        requests in prop::collection::vec(arbitrary_request(), 1..8),
        boundary in 0usize..256,
    ) {
        let rt = runtime();
        rt.block_on(async {
            let mut wire = Vec::new();
            let mut out = FrameOutStream::new(&mut wire);
            for request in &requests {
                request.write_to(&mut out);
            }
            out.flush().await.unwrap();

            let mut input = FrameInStream::with_capacity(FragmentingReader::new(wire, boundary), 16);
            for request in &requests {
                let parsed = Request::read_from(&mut input).await.unwrap();
                prop_assert_eq!(parsed.as_ref(), Some(request));
            }
            prop_assert_eq!(Request::read_from(&mut input).await.unwrap(), None);
            Ok(())
        })?;
    }

    /// The checksum equals the byte sum modulo 2^32.
    #[test]
    fn checksum_is_sum_mod_2_32(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        let expected = data.iter().map(|&b| u64::from(b)).sum::<u64>() % (1u64 << 32);
        prop_assert_eq!(checksum(&data) as u32 as u64, expected);
        prop_assert_eq!(checksum(&data), checksum(&data));
    }
}
