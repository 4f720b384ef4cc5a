use anyhow::{Context, Result};
use frame_viewer::args::Args;
use frame_viewer::{Command, Config, Viewer, ViewerEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("frame_viewer={},frame_protocol=info", level).into()
            }),
        )
        .with_target(false)
        .init();
}

fn log_event(event: &ViewerEvent) {
    match event {
        ViewerEvent::FrameReceived {
            video,
            index,
            from_cache,
            progress,
            window,
            threshold,
            fps,
            ..
        } => {
            let source = if *from_cache { "cache" } else { "origin" };
            match fps {
                Some(fps) => info!(
                    "{} frame {} from {} [{}] {:.1} fps, window={} threshold={}",
                    video, index, source, progress, fps, window, threshold
                ),
                None => info!(
                    "{} frame {} from {} [{}] window={} threshold={}",
                    video, index, source, progress, window, threshold
                ),
            }
        }
        ViewerEvent::Retry {
            video,
            index,
            attempt,
            reason,
        } => warn!("{} frame {}: retry {} ({:?})", video, index, attempt, reason),
        ViewerEvent::Finished { .. } | ViewerEvent::Disconnected => {}
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Starting frame-viewer {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(args).context("invalid configuration")?;
    let mut viewer = Viewer::connect(config)
        .await
        .context("failed to connect to relay")?;

    let events = viewer.events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            log_event(&event);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        println!("Enter <video> <frames>, or 0 to exit:");
        let Some(line) = lines.next_line().await.context("failed to read stdin")? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        match line.parse::<Command>() {
            Ok(Command::Quit) => break,
            Ok(Command::Play { video, count }) => match viewer.play(&video, count).await {
                Ok(summary) => info!(
                    "{}: {} frames, {} from cache, {} retries",
                    video, summary.frames, summary.from_cache, summary.retries
                ),
                Err(e) if e.is_recoverable() => warn!("Playback of {} stopped: {}", video, e),
                Err(e) => {
                    error!("Connection to relay failed: {}", e);
                    return Err(e.into());
                }
            },
            Err(e) => warn!("{}", e),
        }
    }

    viewer.disconnect().await.context("failed to disconnect")?;
    Ok(())
}
