use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_transcribe::{
    create_router, AppState, AudioFile, Config, SessionConfig, SessionCoordinator,
    WebSocketTransport,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "live-transcribe", version, about = "Stream audio chunks to a live transcription server")]
struct Cli {
    /// Config file (extension optional, missing file is fine)
    #[arg(short, long, default_value = "config/live-transcribe")]
    config: String,

    /// Transcription server endpoint, overriding the config
    #[arg(short, long)]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Stream a 16-bit PCM WAV file and print the transcript
    Stream {
        /// WAV file to stream
        file: PathBuf,

        /// Pace chunks at their real duration instead of sending at once
        #[arg(long)]
        realtime: bool,

        /// Seconds to wait for the connection
        #[arg(long, default_value_t = 10)]
        connect_timeout_secs: u64,

        /// Seconds to wait for outstanding results (default: no limit)
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// Serve the HTTP session API
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    let mut session_cfg = SessionConfig::from(&cfg);
    if let Some(endpoint) = cli.endpoint {
        session_cfg.endpoint = endpoint;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Transcription endpoint: {}", session_cfg.endpoint);

    match cli.command {
        Command::Stream {
            file,
            realtime,
            connect_timeout_secs,
            deadline_secs,
        } => {
            stream_file(
                &session_cfg,
                &file,
                realtime,
                Duration::from_secs(connect_timeout_secs),
                deadline_secs.map(Duration::from_secs),
            )
            .await
        }
        Command::Serve => serve(&cfg, &session_cfg).await,
    }
}

async fn stream_file(
    session_cfg: &SessionConfig,
    file: &Path,
    realtime: bool,
    connect_timeout: Duration,
    deadline: Option<Duration>,
) -> Result<()> {
    let audio = AudioFile::open(file)?;

    if !audio.matches(session_cfg) {
        warn!(
            "{} is {}Hz/{}ch but the session expects {}Hz/{}ch; sending as-is",
            audio.path.display(),
            audio.sample_rate,
            audio.channels,
            session_cfg.sample_rate,
            session_cfg.channels
        );
    }

    info!("Streaming {} ({:?})", audio.path.display(), audio.duration());
    let chunks = audio
        .encoder(session_cfg.chunk_duration)
        .split(&audio.samples)?;

    let session = SessionCoordinator::websocket();
    session
        .connect_with_deadline(&session_cfg.endpoint, connect_timeout)
        .await
        .context("Failed to connect to transcription server")?;

    for chunk in chunks {
        let pause = chunk.duration();
        let index = chunk.chunk_index;
        session
            .send_chunk(chunk.wav)
            .with_context(|| format!("Failed to send chunk {}", index))?;
        info!("Sent chunk {} ({:.1}s)", index, pause.as_secs_f64());

        if realtime {
            tokio::time::sleep(pause).await;
        }
    }

    let finalized = match deadline {
        Some(deadline) => session.finalize_with_deadline(deadline).await,
        None => session.finalize().await,
    };

    let snapshot = session.snapshot();
    session.cleanup();
    finalized.context("Failed to finalize session")?;

    info!(
        "Received {}/{} transcriptions",
        snapshot.received_count, snapshot.sent_count
    );
    if let Some(e) = &snapshot.last_error {
        warn!("Last server error: {}", e);
    }
    println!("{}", snapshot.transcription.trim_end());

    Ok(())
}

async fn serve(cfg: &Config, session_cfg: &SessionConfig) -> Result<()> {
    let state = AppState::new(
        Arc::new(WebSocketTransport::default()),
        session_cfg.endpoint.clone(),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP session API listening on {}", addr);

    axum::serve(listener, app).await.context("HTTP server failed")?;

    Ok(())
}
