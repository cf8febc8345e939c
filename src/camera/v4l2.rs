#![cfg(feature = "camera-v4l2")]

//! V4L2 device capture backend.
//!
//! Captures packed RGB frames from a local device node (e.g. /dev/video0).
//! The device and its mmap stream are tied together with a self-referencing
//! struct because the stream borrows the device it was created from.

use anyhow::{Context, Result};
use ouroboros::self_referencing;

use crate::frame::Frame;

pub struct DeviceCamera {
    state: DeviceState,
    device_path: String,
    active_width: u32,
    active_height: u32,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCamera {
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let mut device = v4l::Device::with_path(device_path)
            .with_context(|| format!("open v4l2 device {}", device_path))?;
        let mut format = device.format().context("read v4l2 format")?;
        format.width = width;
        format.height = height;
        format.fourcc = v4l::FourCC::new(b"RGB3");

        let format = match device.set_format(&format) {
            Ok(format) => format,
            Err(err) => {
                log::warn!("camera: failed to set format on {}: {}", device_path, err);
                device
                    .format()
                    .context("read v4l2 format after set failure")?
            }
        };

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, 4)
                    .map_err(|err| anyhow::Error::new(err).context("create v4l2 buffer stream"))
            },
        }
        .try_build()?;

        log::info!(
            "camera: opened {} ({}x{})",
            device_path,
            format.width,
            format.height
        );

        Ok(Self {
            state,
            device_path: device_path.to_string(),
            active_width: format.width,
            active_height: format.height,
        })
    }

    pub fn read_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let (buf, _meta) = self
            .state
            .with_mut(|fields| fields.stream.next())
            .with_context(|| format!("capture v4l2 frame from {}", self.device_path))?;

        Frame::from_rgb(buf.to_vec(), self.active_width, self.active_height)
    }
}
