use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::tunnel::DEFAULT_TUNNEL_API_URL;

const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:5000";
const DEFAULT_CAMERA_DEVICE: &str = "stub://cam{index}";
const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_DETECT_WIDTH: u32 = 640;
const DEFAULT_DETECT_HEIGHT: u32 = 480;
const DEFAULT_CONFIDENCE_GATE: f32 = 0.5;
const DEFAULT_ALERT_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Deserialize, Default)]
struct SentinelConfigFile {
    http: Option<HttpConfigFile>,
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    alerts: Option<AlertConfigFile>,
    tunnel: Option<TunnelConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct HttpConfigFile {
    addr: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    device: Option<String>,
    index: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    model_path: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    confidence_gate: Option<f32>,
    font_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct AlertConfigFile {
    interval_secs: Option<u64>,
    bot_token: Option<String>,
    chat_id: Option<String>,
    cue_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct TunnelConfigFile {
    api_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SentinelConfig {
    pub http_addr: String,
    pub camera_device: String,
    pub camera_index: u32,
    pub model_path: Option<PathBuf>,
    pub detect_width: u32,
    pub detect_height: u32,
    pub confidence_gate: f32,
    pub font_path: Option<PathBuf>,
    pub alert_interval: Duration,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub cue_path: Option<PathBuf>,
    pub tunnel_api_url: String,
}

impl SentinelConfig {
    /// Load from the file named by SENTINEL_CONFIG (if set), then apply
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTINEL_CONFIG").ok().map(PathBuf::from);
        Self::load_with_path(config_path.as_deref())
    }

    pub fn load_with_path(config_path: Option<&Path>) -> Result<Self> {
        let file_cfg = match config_path {
            Some(path) => read_config_file(path)?,
            None => SentinelConfigFile::default(),
        };
        let mut cfg = Self::from_file(file_cfg);
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentinelConfigFile) -> Self {
        let http_addr = file
            .http
            .and_then(|http| http.addr)
            .unwrap_or_else(|| DEFAULT_HTTP_ADDR.to_string());
        let camera_device = file
            .camera
            .as_ref()
            .and_then(|camera| camera.device.clone())
            .unwrap_or_else(|| DEFAULT_CAMERA_DEVICE.to_string());
        let camera_index = file
            .camera
            .and_then(|camera| camera.index)
            .unwrap_or(DEFAULT_CAMERA_INDEX);
        let model_path = file.detector.as_ref().and_then(|d| d.model_path.clone());
        let detect_width = file
            .detector
            .as_ref()
            .and_then(|d| d.width)
            .unwrap_or(DEFAULT_DETECT_WIDTH);
        let detect_height = file
            .detector
            .as_ref()
            .and_then(|d| d.height)
            .unwrap_or(DEFAULT_DETECT_HEIGHT);
        let confidence_gate = file
            .detector
            .as_ref()
            .and_then(|d| d.confidence_gate)
            .unwrap_or(DEFAULT_CONFIDENCE_GATE);
        let font_path = file.detector.and_then(|d| d.font_path);
        let alert_interval = Duration::from_secs(
            file.alerts
                .as_ref()
                .and_then(|alerts| alerts.interval_secs)
                .unwrap_or(DEFAULT_ALERT_INTERVAL_SECS),
        );
        let bot_token = file.alerts.as_ref().and_then(|alerts| alerts.bot_token.clone());
        let chat_id = file.alerts.as_ref().and_then(|alerts| alerts.chat_id.clone());
        let cue_path = file.alerts.and_then(|alerts| alerts.cue_path);
        let tunnel_api_url = file
            .tunnel
            .and_then(|tunnel| tunnel.api_url)
            .unwrap_or_else(|| DEFAULT_TUNNEL_API_URL.to_string());

        Self {
            http_addr,
            camera_device,
            camera_index,
            model_path,
            detect_width,
            detect_height,
            confidence_gate,
            font_path,
            alert_interval,
            bot_token,
            chat_id,
            cue_path,
            tunnel_api_url,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(addr) = std::env::var("SENTINEL_HTTP_ADDR") {
            if !addr.trim().is_empty() {
                self.http_addr = addr;
            }
        }
        if let Ok(device) = std::env::var("SENTINEL_CAMERA_DEVICE") {
            if !device.trim().is_empty() {
                self.camera_device = device;
            }
        }
        if let Ok(index) = std::env::var("SENTINEL_CAMERA_INDEX") {
            self.camera_index = index
                .parse()
                .map_err(|_| anyhow!("SENTINEL_CAMERA_INDEX must be an integer"))?;
        }
        if let Ok(path) = std::env::var("SENTINEL_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(gate) = std::env::var("SENTINEL_CONFIDENCE_GATE") {
            self.confidence_gate = gate
                .parse()
                .map_err(|_| anyhow!("SENTINEL_CONFIDENCE_GATE must be a number"))?;
        }
        if let Ok(path) = std::env::var("SENTINEL_FONT_PATH") {
            if !path.trim().is_empty() {
                self.font_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(interval) = std::env::var("SENTINEL_ALERT_INTERVAL_SECS") {
            let seconds: u64 = interval.parse().map_err(|_| {
                anyhow!("SENTINEL_ALERT_INTERVAL_SECS must be an integer number of seconds")
            })?;
            self.alert_interval = Duration::from_secs(seconds);
        }
        if let Ok(token) = std::env::var("SENTINEL_BOT_TOKEN") {
            if !token.trim().is_empty() {
                self.bot_token = Some(token);
            }
        }
        if let Ok(chat_id) = std::env::var("SENTINEL_CHAT_ID") {
            if !chat_id.trim().is_empty() {
                self.chat_id = Some(chat_id);
            }
        }
        if let Ok(path) = std::env::var("SENTINEL_CUE_PATH") {
            if !path.trim().is_empty() {
                self.cue_path = Some(PathBuf::from(path));
            }
        }
        if let Ok(url) = std::env::var("SENTINEL_TUNNEL_API_URL") {
            if !url.trim().is_empty() {
                self.tunnel_api_url = url;
            }
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if !self.confidence_gate.is_finite()
            || self.confidence_gate < 0.0
            || self.confidence_gate >= 1.0
        {
            return Err(anyhow!("confidence gate must be in [0, 1)"));
        }
        if self.alert_interval.as_secs() == 0 {
            return Err(anyhow!("alert interval must be greater than zero"));
        }
        if self.detect_width == 0 || self.detect_height == 0 {
            return Err(anyhow!("detector input size must be non-zero"));
        }
        Ok(())
    }
}

fn read_config_file(path: &Path) -> Result<SentinelConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}
