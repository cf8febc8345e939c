//! Camera capture sources.
//!
//! `CameraSource` owns one lazily-opened capture handle, selected by device
//! index. Reselecting the index closes the previous handle before opening
//! the new one, so at most one handle per selected index exists at a time.
//!
//! Both stream encoders pull from the same source through `SharedCamera`
//! (an `Arc<Mutex<..>>`). The mutex serializes open/close/reselect *and*
//! reads: the underlying capture primitives are not documented safe for
//! unlocked concurrent reads, so two concurrently consumed streams
//! interleave at read granularity instead.
//!
//! Backends:
//! - Synthetic (`stub://` device paths): deterministic generated frames,
//!   optionally finite (`stub://cam?frames=N`) for end-of-stream tests.
//! - V4L2 device nodes (feature: camera-v4l2).

#[cfg(feature = "camera-v4l2")]
mod v4l2;

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use url::Url;

use crate::frame::Frame;

/// Configuration for camera selection.
#[derive(Clone, Debug)]
pub struct CameraConfig {
    /// Device path template; `{index}` is replaced by the selected index.
    /// `stub://` paths select the synthetic backend.
    pub device_template: String,
    /// Preferred capture width.
    pub width: u32,
    /// Preferred capture height.
    pub height: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device_template: "stub://cam{index}".to_string(),
            width: 640,
            height: 480,
        }
    }
}

/// Shared camera handle used by both stream encoders.
pub type SharedCamera = Arc<Mutex<CameraSource>>;

pub fn shared_camera(config: CameraConfig) -> SharedCamera {
    Arc::new(Mutex::new(CameraSource::new(config)))
}

/// An owned, lazily-opened capture device selected by index.
pub struct CameraSource {
    config: CameraConfig,
    index: u32,
    backend: Option<CameraBackend>,
    frames_read: u64,
}

enum CameraBackend {
    Synthetic(SyntheticCamera),
    #[cfg(feature = "camera-v4l2")]
    Device(v4l2::DeviceCamera),
}

impl CameraSource {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            index: 0,
            backend: None,
            frames_read: 0,
        }
    }

    /// Currently selected device index.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Select a device index, closing any previously open handle and
    /// opening the new device eagerly.
    pub fn select(&mut self, index: u32) -> Result<()> {
        // Drop the old handle before opening the new one: the same index
        // may resolve to the same device node.
        self.backend = None;
        self.index = index;
        self.ensure_open()?;
        log::info!("camera: selected device index {}", index);
        Ok(())
    }

    /// Read the next frame, opening the device on first use.
    ///
    /// A read failure is fatal for the consuming stream; the caller may
    /// recover by reselecting the camera.
    pub fn read_frame(&mut self) -> Result<Frame> {
        self.ensure_open()?;
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| anyhow!("camera not open"))?;
        let frame = match backend {
            CameraBackend::Synthetic(camera) => camera.read_frame(),
            #[cfg(feature = "camera-v4l2")]
            CameraBackend::Device(camera) => camera.read_frame(),
        };
        match frame {
            Ok(frame) => {
                self.frames_read += 1;
                Ok(frame)
            }
            // The handle stays as-is on failure: reads keep failing until
            // the caller recovers by reselecting the camera.
            Err(err) => Err(err),
        }
    }

    fn ensure_open(&mut self) -> Result<()> {
        if self.backend.is_some() {
            return Ok(());
        }
        let device = self
            .config
            .device_template
            .replace("{index}", &self.index.to_string());
        let backend = if device.starts_with("stub://") {
            CameraBackend::Synthetic(SyntheticCamera::new(
                &device,
                self.config.width,
                self.config.height,
            )?)
        } else {
            self.open_device(&device)?
        };
        self.backend = Some(backend);
        Ok(())
    }

    #[cfg(feature = "camera-v4l2")]
    fn open_device(&self, device: &str) -> Result<CameraBackend> {
        Ok(CameraBackend::Device(v4l2::DeviceCamera::open(
            device,
            self.config.width,
            self.config.height,
        )?))
    }

    #[cfg(not(feature = "camera-v4l2"))]
    fn open_device(&self, device: &str) -> Result<CameraBackend> {
        Err(anyhow!(
            "cannot open '{}': built without the camera-v4l2 feature",
            device
        ))
    }
}

// ----------------------------------------------------------------------------
// Synthetic camera (stub:// paths)
// ----------------------------------------------------------------------------

struct SyntheticCamera {
    width: u32,
    height: u32,
    frame_count: u64,
    /// Synthetic sources can be finite (`?frames=N`) so stream-termination
    /// paths are testable without hardware.
    frame_limit: Option<u64>,
}

impl SyntheticCamera {
    fn new(device: &str, width: u32, height: u32) -> Result<Self> {
        let url = Url::parse(device).with_context(|| format!("parse stub device '{}'", device))?;
        let mut frame_limit = None;
        for (key, value) in url.query_pairs() {
            if key == "frames" {
                let limit: u64 = value
                    .parse()
                    .map_err(|_| anyhow!("stub frames limit must be an integer"))?;
                frame_limit = Some(limit);
            }
        }
        log::info!("camera: opened {} (synthetic)", device);
        Ok(Self {
            width,
            height,
            frame_count: 0,
            frame_limit,
        })
    }

    fn read_frame(&mut self) -> Result<Frame> {
        if let Some(limit) = self.frame_limit {
            if self.frame_count >= limit {
                return Err(anyhow!("synthetic camera ended after {} frames", limit));
            }
        }
        self.frame_count += 1;

        let pixel_count = (self.width as usize) * (self.height as usize) * 3;
        let mut pixels = vec![0u8; pixel_count];
        for (i, pixel) in pixels.iter_mut().enumerate() {
            // Mix position and frame count so consecutive frames differ.
            *pixel = ((i as u64 + self.frame_count * 7) % 256) as u8;
        }
        Frame::from_rgb(pixels, self.width, self.height)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn stub_config() -> CameraConfig {
        CameraConfig {
            device_template: "stub://cam{index}".to_string(),
            width: 64,
            height: 48,
        }
    }

    #[test]
    fn lazily_opens_on_first_read() -> Result<()> {
        let mut camera = CameraSource::new(stub_config());
        assert!(!camera.is_open());

        let frame = camera.read_frame()?;
        assert!(camera.is_open());
        assert_eq!(frame.width(), 64);
        assert_eq!(frame.height(), 48);
        Ok(())
    }

    #[test]
    fn reselect_replaces_the_open_handle() -> Result<()> {
        let mut camera = CameraSource::new(stub_config());
        camera.read_frame()?;
        camera.select(2)?;
        assert_eq!(camera.index(), 2);
        assert!(camera.is_open());
        camera.read_frame()?;
        Ok(())
    }

    #[test]
    fn finite_stub_fails_after_limit() -> Result<()> {
        let config = CameraConfig {
            device_template: "stub://cam{index}?frames=2".to_string(),
            ..stub_config()
        };
        let mut camera = CameraSource::new(config);
        camera.read_frame()?;
        camera.read_frame()?;
        assert!(camera.read_frame().is_err());
        Ok(())
    }

    #[test]
    fn consecutive_frames_differ() -> Result<()> {
        let mut camera = CameraSource::new(stub_config());
        let first = camera.read_frame()?;
        let second = camera.read_frame()?;
        assert_ne!(first.pixels(), second.pixels());
        Ok(())
    }
}
