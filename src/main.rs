use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use voxstream::{
    CaptureDevice, MicrophoneDevice, SessionHandler, StreamError, StreamSession, WavFileDevice,
    WsTransport,
};

#[derive(Parser, Debug)]
#[command(name = "voxstream", about = "Stream microphone audio to a transcription endpoint")]
struct Args {
    /// Path to the config file (without extension)
    #[arg(short, long, default_value = "config/voxstream")]
    config: String,

    /// Override the endpoint URL from the config file
    #[arg(long)]
    url: Option<String>,

    /// Replay a WAV file instead of capturing the microphone
    #[arg(long)]
    wav: Option<PathBuf>,
}

/// Prints every endpoint result as it arrives.
struct PrintHandler;

impl SessionHandler for PrintHandler {
    fn on_message(&self, text: &str) {
        println!("{}", text);
    }

    fn on_failure(&self, err: &StreamError) {
        error!("Session failure: {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let cfg = voxstream::Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;

    let mut session_config = cfg.session_config();
    if let Some(url) = args.url {
        session_config.url = url;
    }
    let format = cfg.capture_format();

    let device: Box<dyn CaptureDevice> = match &args.wav {
        Some(path) => Box::new(WavFileDevice::new(path, format)),
        None => Box::new(MicrophoneDevice::new(format)),
    };

    info!(
        "voxstream v{} streaming to {}",
        env!("CARGO_PKG_VERSION"),
        session_config.url
    );

    let mut session = StreamSession::new(
        session_config,
        format,
        Box::new(WsTransport),
        device,
        Arc::new(PrintHandler),
    );

    session.start().await?;

    info!("Streaming; press Ctrl-C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    session.stop().await?;

    let stats = session.stats();
    info!(
        "Session finished: {:.1}s, {} chunks sent, {} messages received",
        stats.duration_secs, stats.chunks_sent, stats.messages_received
    );

    Ok(())
}
