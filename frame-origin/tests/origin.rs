use frame_origin::config::MediaConfig;
use frame_origin::{prepare_store, OriginServer};
use frame_protocol::{FrameInStream, FrameOutStream, FrameResponse, Leg};
use std::fs;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

#[tokio::test]
async fn serves_frames_from_directory_over_tcp() -> anyhow::Result<()> {
    let frames = tempfile::tempdir()?;
    let marc = frames.path().join("marc");
    fs::create_dir(&marc)?;
    for i in 1..=3u8 {
        fs::write(marc.join(format!("frame_{:04}.jpg", i)), vec![i; 16 * i as usize])?;
    }

    let media = MediaConfig {
        frames_dir: frames.path().to_path_buf(),
        extract: false,
        ..MediaConfig::default()
    };
    let store = prepare_store(&media).await?;
    let server = OriginServer::bind("127.0.0.1:0", Arc::new(store)).await?;
    let addr = server.local_addr()?;
    server.spawn();

    let (reader, writer) = TcpStream::connect(addr).await?.into_split();
    let mut input = FrameInStream::new(reader);
    let mut output = FrameOutStream::new(writer);

    output.write_line("marc 2");
    output.flush().await?;
    let frame = FrameResponse::read_from(&mut input, Leg::Origin).await?;
    assert_eq!(frame.payload.len(), 48);
    assert!(frame.payload.iter().all(|&b| b == 3));
    assert!(frame.verify());

    // Unknown video and out-of-range index: silence.
    output.write_line("other 0");
    output.write_line("marc 3");
    output.flush().await?;
    let silent = tokio::time::timeout(Duration::from_millis(200), input.wait_for_data()).await;
    assert!(silent.is_err());

    // The connection is still in sync afterwards.
    output.write_line("marc 0");
    output.flush().await?;
    let frame = FrameResponse::read_from(&mut input, Leg::Origin).await?;
    assert_eq!(&frame.payload[..], &[1u8; 16][..]);
    Ok(())
}
