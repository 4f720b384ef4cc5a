use anyhow::{Context, Result};
use frame_relay::args::Args;
use frame_relay::{Config, RelayServer};
use tracing::info;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "frame_relay={},frame_cache={},frame_protocol=info,protocol_trace=info",
                    level, level
                )
                .into()
            }),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    info!("Starting frame-relay {}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_args(args).context("invalid configuration")?;
    let server = RelayServer::start(config)
        .await
        .context("failed to start relay")?;

    tokio::select! {
        result = server.run() => result.context("relay stopped")?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted, shutting down"),
    }
    Ok(())
}
