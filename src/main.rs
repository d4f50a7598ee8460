use anyhow::{Context, Result};
use clap::Parser;
use soundditect_stream::audio::{CaptureFactory, CaptureKind, CaptureSource};
use soundditect_stream::engine::{build_policy, SystemClock};
use soundditect_stream::{
    create_router, AppState, AudioPipeline, AudioWindowBuffer, Config, EngineHandle,
    EngineRuntime, FrameEncoder, Notification, Preprocessor, RuntimeOptions, WebSocketTransport,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "soundditect-stream")]
#[command(about = "Stream live audio windows to a remote anomaly classifier")]
struct Args {
    /// Configuration file (extension optional)
    #[arg(short, long, default_value = "config/soundditect")]
    config: String,

    /// Inference service WebSocket URL
    #[arg(long)]
    url: Option<String>,

    /// Replay an audio file instead of capturing live audio
    #[arg(long, conflicts_with = "microphone")]
    file: Option<PathBuf>,

    /// Capture from the default (or named) input device
    #[arg(long, num_args = 0..=1, default_missing_value = "")]
    microphone: Option<String>,

    /// Start a session automatically after every connect
    #[arg(long)]
    auto_start: bool,

    /// Disable the HTTP control API
    #[arg(long)]
    no_http: bool,

    /// HTTP control API port
    #[arg(long)]
    http_port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let mut cfg = Config::load(&args.config)?;
    if let Some(url) = args.url {
        cfg.transport.url = url;
    }
    if let Some(port) = args.http_port {
        cfg.service.http.port = port;
    }
    if args.no_http {
        cfg.service.http.enabled = false;
    }
    cfg.validate()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Inference service: {}", cfg.transport.url);
    info!(
        "Windows: {}ms at {} Hz, reconnect strategy {:?}",
        cfg.audio.window_duration_ms, cfg.audio.sample_rate, cfg.reconnect.strategy
    );

    // Capture source
    let capture_kind = match (args.file, args.microphone) {
        (Some(path), _) => Some(CaptureKind::File {
            path,
            realtime: true,
        }),
        (None, Some(device)) => Some(CaptureKind::Microphone {
            device: (!device.is_empty()).then_some(device),
        }),
        (None, None) => None,
    };

    let mut source: Option<Box<dyn CaptureSource>> = match capture_kind {
        Some(kind) => Some(
            CaptureFactory::create(kind, cfg.capture_config())
                .context("Failed to create capture source")?,
        ),
        None => None,
    };

    let chunks = match source.as_mut() {
        Some(source) => {
            let rx = source
                .start()
                .await
                .with_context(|| format!("Failed to start capture from {}", source.name()))?;
            info!("Capturing from {}", source.name());
            Some(rx)
        }
        None => {
            info!("No capture source configured; control the engine over HTTP");
            None
        }
    };

    // Engine
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let pipeline = AudioPipeline::new(
        AudioWindowBuffer::for_duration(cfg.audio.sample_rate, cfg.audio.window_duration_ms),
        Preprocessor::new(cfg.audio.quietness_floor, cfg.audio.headroom),
        FrameEncoder::default(),
    );
    let (runtime, handle) = EngineRuntime::new(
        cfg.client_config(),
        Box::new(WebSocketTransport::new(event_tx)),
        event_rx,
        Arc::new(SystemClock),
        build_policy(cfg.reconnect.strategy, cfg.backoff_settings()),
        pipeline,
        RuntimeOptions {
            auto_start: args.auto_start,
        },
    );

    tokio::spawn(log_notifications(handle.clone()));

    if cfg.service.http.enabled {
        let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind HTTP API to {}", addr))?;
        info!("HTTP API listening on {}", addr);

        let router = create_router(AppState::new(handle.clone()));
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    let mut engine = tokio::spawn(runtime.run(chunks));

    let interrupted = tokio::select! {
        result = &mut engine => {
            result.context("Engine task panicked")??;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        info!("Interrupted, shutting down");
        if let Err(e) = handle.shutdown().await {
            warn!("Shutdown request not delivered: {}", e);
        }
        engine.await.context("Engine task panicked")??;
    }

    if let Some(mut source) = source {
        if source.is_capturing() {
            source.stop().await.context("Failed to stop capture")?;
        }
    }

    info!("Stopped");
    Ok(())
}

/// Print detection results and connection changes as they happen
async fn log_notifications(handle: EngineHandle) {
    let mut notifications = handle.subscribe();
    loop {
        match notifications.recv().await {
            Ok(Notification::DetectionResult(result)) => {
                let verdict = if result.is_anomaly() { "ANOMALY" } else { "normal" };
                info!(
                    "Detection: {} (confidence {:.2}, status {})",
                    verdict, result.confidence, result.status
                );
                if let Some(warning) = &result.warning {
                    warn!("Server warning: {}", warning);
                }
            }
            Ok(Notification::ConnectionQualityChanged { tier, score }) => {
                info!("Connection quality {} (health {})", tier, score);
            }
            Ok(Notification::Error(message)) => error!("Engine error: {}", message),
            Ok(_) => {}
            Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Notification log lagged, skipped {}", skipped);
            }
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        }
    }
}
