use anyhow::{Context, Result};
use frame_origin::args::Args;
use frame_origin::{prepare_store, Config, OriginServer};
use std::sync::Arc;
use tracing::info;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("frame_origin={},ffmpeg=info", level).into()),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Starting frame-origin {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(&args).context("invalid configuration")?;
    let store = prepare_store(&config.media)
        .await
        .context("failed to prepare frames")?;
    let server = OriginServer::bind(&config.listen_addr(), Arc::new(store))
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr()))?;

    tokio::select! {
        result = server.run() => result.context("origin stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }
    Ok(())
}
