//! sentineld - safety-gear compliance monitoring daemon
//!
//! This daemon:
//! 1. Opens the configured camera source
//! 2. Runs each frame through detection, annotation, and alerting
//! 3. Serves the raw and annotated MJPEG feeds over HTTP
//! 4. Announces the public feed URLs when a tunnel agent is running

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use ppe_sentinel::alert::{
    notifier_from_config, AlertDispatcher, AlertThrottle, AudioCue, CuePlayer, NullCuePlayer,
};
use ppe_sentinel::annotate::FrameAnnotator;
use ppe_sentinel::camera::{shared_camera, CameraConfig};
use ppe_sentinel::config::SentinelConfig;
use ppe_sentinel::detect::{DetectorAdapter, DetectorBackend, StubBackend};
use ppe_sentinel::pipeline::DetectionPipeline;
use ppe_sentinel::server::{ServerConfig, StreamServer};
use ppe_sentinel::tunnel;

#[derive(Debug, Parser)]
#[command(name = "sentineld", about = "Safety-gear compliance monitoring daemon")]
struct Args {
    /// Path to the JSON config file.
    #[arg(long, env = "SENTINEL_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address override, e.g. 0.0.0.0:5000.
    #[arg(long)]
    addr: Option<String>,

    /// Camera index override.
    #[arg(long)]
    camera: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let mut cfg = SentinelConfig::load_with_path(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        cfg.http_addr = addr;
    }
    if let Some(index) = args.camera {
        cfg.camera_index = index;
    }

    let detector = build_detector(&cfg);
    log::info!(
        "sentineld {}: detector backend '{}', input {}x{}",
        env!("CARGO_PKG_VERSION"),
        detector.backend_name(),
        cfg.detect_width,
        cfg.detect_height
    );

    let annotator = FrameAnnotator::from_font_path(cfg.font_path.as_deref());
    let notifier = notifier_from_config(cfg.bot_token.as_deref(), cfg.chat_id.as_deref())?;
    let pipeline = Arc::new(Mutex::new(DetectionPipeline::new(
        detector,
        annotator,
        AlertThrottle::new(cfg.alert_interval),
        AudioCue::new(build_cue_player(&cfg)),
        AlertDispatcher::new(notifier),
    )));

    let camera = shared_camera(CameraConfig {
        device_template: cfg.camera_device.clone(),
        width: cfg.detect_width,
        height: cfg.detect_height,
    });
    camera
        .lock()
        .map_err(|_| anyhow::anyhow!("camera lock poisoned"))?
        .select(cfg.camera_index)
        .context("open initial camera")?;

    let server = StreamServer::new(
        ServerConfig {
            addr: cfg.http_addr.clone(),
        },
        Arc::clone(&camera),
        pipeline,
    );
    let handle = server.spawn()?;
    log::info!(
        "sentineld: feeds at http://{}/raw_feed and http://{}/video_feed",
        handle.addr,
        handle.addr
    );

    // Announce public URLs if a tunnel agent is up; the announcement goes
    // through the same notifier the alerts use.
    let announce_notifier = notifier_from_config(cfg.bot_token.as_deref(), cfg.chat_id.as_deref())?;
    tunnel::announce_feeds(&cfg.tunnel_api_url, announce_notifier.as_ref());

    let running = Arc::new(AtomicBool::new(true));
    let running_handler = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("sentineld: shutdown requested");
        running_handler.store(false, Ordering::SeqCst);
    })
    .context("install signal handler")?;

    while running.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(200));
    }

    handle.stop()?;
    log::info!("sentineld: stopped");
    Ok(())
}

fn build_detector(cfg: &SentinelConfig) -> DetectorAdapter {
    let backend: Box<dyn DetectorBackend> = match &cfg.model_path {
        #[cfg(feature = "backend-tract")]
        Some(model_path) => match ppe_sentinel::detect::TractBackend::new(
            model_path,
            cfg.detect_width,
            cfg.detect_height,
        ) {
            Ok(backend) => Box::new(backend),
            Err(err) => {
                log::warn!(
                    "detector: failed to load model {}: {:#}; falling back to stub",
                    model_path.display(),
                    err
                );
                Box::new(StubBackend::new())
            }
        },
        #[cfg(not(feature = "backend-tract"))]
        Some(model_path) => {
            log::warn!(
                "detector: model {} configured but built without the backend-tract feature; using stub",
                model_path.display()
            );
            Box::new(StubBackend::new())
        }
        None => Box::new(StubBackend::new()),
    };
    DetectorAdapter::new(
        backend,
        cfg.detect_width,
        cfg.detect_height,
        cfg.confidence_gate,
    )
}

fn build_cue_player(cfg: &SentinelConfig) -> Box<dyn CuePlayer> {
    match &cfg.cue_path {
        #[cfg(feature = "audio-cpal")]
        Some(cue_path) => match ppe_sentinel::alert::WavCuePlayer::new(cue_path) {
            Ok(player) => Box::new(player),
            Err(err) => {
                log::warn!("audio: failed to load cue: {:#}; audio disabled", err);
                Box::new(NullCuePlayer)
            }
        },
        #[cfg(not(feature = "audio-cpal"))]
        Some(cue_path) => {
            log::warn!(
                "audio: cue {} configured but built without the audio-cpal feature",
                cue_path.display()
            );
            Box::new(NullCuePlayer)
        }
        None => Box::new(NullCuePlayer),
    }
}
