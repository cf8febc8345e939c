//! MJPEG stream encoding.
//!
//! Both HTTP feeds are `multipart/x-mixed-replace` streams where every part
//! is one JPEG frame. `RawStream` wires camera frames straight through;
//! `AnnotatedStream` routes each frame through the detection pipeline
//! first.
//!
//! Each stream holds the camera lock only for the read itself, so a raw
//! viewer and an annotated viewer can be connected at once, interleaving
//! at frame granularity. A camera read failure ends the stream; the viewer
//! reconnects after the camera is reselected.

use std::sync::{Arc, Mutex};

use crate::camera::SharedCamera;
use crate::frame::Frame;
use crate::pipeline::DetectionPipeline;

/// Content type of both feed endpoints.
pub const MULTIPART_MIME: &str = "multipart/x-mixed-replace; boundary=frame";

/// Frame one JPEG as a multipart part.
pub fn wire_frame(jpeg: &[u8]) -> Vec<u8> {
    let mut part = Vec::with_capacity(jpeg.len() + 64);
    part.extend_from_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    part.extend_from_slice(jpeg);
    part.extend_from_slice(b"\r\n");
    part
}

fn read_camera_frame(camera: &SharedCamera) -> Option<Frame> {
    let mut camera = match camera.lock() {
        Ok(camera) => camera,
        Err(_) => {
            log::warn!("stream: camera lock poisoned, ending stream");
            return None;
        }
    };
    match camera.read_frame() {
        Ok(frame) => Some(frame),
        Err(err) => {
            log::warn!("stream: camera read failed, ending stream: {:#}", err);
            None
        }
    }
}

fn encode_part(frame: &Frame) -> Option<Vec<u8>> {
    match frame.encode_jpeg() {
        Ok(jpeg) => Some(wire_frame(&jpeg)),
        Err(err) => {
            log::warn!("stream: jpeg encode failed, ending stream: {:#}", err);
            None
        }
    }
}

/// Unprocessed camera feed.
pub struct RawStream {
    camera: SharedCamera,
}

impl RawStream {
    pub fn new(camera: SharedCamera) -> Self {
        Self { camera }
    }
}

impl Iterator for RawStream {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        let frame = read_camera_frame(&self.camera)?;
        encode_part(&frame)
    }
}

/// Camera feed routed through the detection pipeline.
pub struct AnnotatedStream {
    camera: SharedCamera,
    pipeline: Arc<Mutex<DetectionPipeline>>,
}

impl AnnotatedStream {
    pub fn new(camera: SharedCamera, pipeline: Arc<Mutex<DetectionPipeline>>) -> Self {
        Self { camera, pipeline }
    }
}

impl Iterator for AnnotatedStream {
    type Item = Vec<u8>;

    fn next(&mut self) -> Option<Vec<u8>> {
        // Camera lock is released before the (slower) pipeline work.
        let frame = read_camera_frame(&self.camera)?;
        let processed = match self.pipeline.lock() {
            Ok(mut pipeline) => pipeline.process(frame),
            Err(_) => {
                log::warn!("stream: pipeline lock poisoned, ending stream");
                return None;
            }
        };
        encode_part(&processed)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::alert::{AlertDispatcher, AlertThrottle, AudioCue, NullCuePlayer, NullNotifier};
    use crate::annotate::FrameAnnotator;
    use crate::camera::{shared_camera, CameraConfig};
    use crate::detect::{DetectorAdapter, ScriptedBackend};

    fn finite_camera(frames: u32) -> SharedCamera {
        shared_camera(CameraConfig {
            device_template: format!("stub://cam{{index}}?frames={}", frames),
            width: 64,
            height: 48,
        })
    }

    fn test_pipeline() -> Arc<Mutex<DetectionPipeline>> {
        Arc::new(Mutex::new(DetectionPipeline::new(
            DetectorAdapter::new(Box::new(ScriptedBackend::new(Vec::new())), 64, 48, 0.5),
            FrameAnnotator::new(),
            AlertThrottle::new(Duration::from_secs(15)),
            AudioCue::new(Box::new(NullCuePlayer)),
            AlertDispatcher::new(Box::new(NullNotifier)),
        )))
    }

    #[test]
    fn wire_frame_uses_the_fixed_boundary_framing() {
        let part = wire_frame(b"\xff\xd8jpeg-bytes");
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(b"jpeg-bytes\r\n"));
    }

    #[test]
    fn raw_stream_ends_when_the_camera_does() {
        let stream = RawStream::new(finite_camera(3));
        let parts: Vec<_> = stream.collect();
        assert_eq!(parts.len(), 3);
        for part in &parts {
            assert!(part.starts_with(b"--frame\r\n"));
        }
    }

    #[test]
    fn annotated_stream_emits_jpeg_parts() {
        let stream = AnnotatedStream::new(finite_camera(2), test_pipeline());
        let parts: Vec<_> = stream.collect();
        assert_eq!(parts.len(), 2);
        // JPEG SOI marker right after the part header.
        let header_len = b"--frame\r\nContent-Type: image/jpeg\r\n\r\n".len();
        assert_eq!(&parts[0][header_len..header_len + 2], b"\xff\xd8");
    }
}
