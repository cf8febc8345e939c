//! PPE Sentinel
//!
//! This crate implements a safety-gear compliance monitor for a single
//! camera feed: capture, object detection, annotation, alerting, and
//! MJPEG streaming over HTTP.
//!
//! # Pipeline
//!
//! 1. **Capture**: one selectable camera source (synthetic or V4L2)
//! 2. **Detect**: resize to the model input, run the detector backend,
//!    keep only detections strictly above the confidence gate
//! 3. **Annotate**: color-coded boxes and labels per compliance category
//! 4. **Alert**: per-class throttled notifications with a snapshot photo,
//!    plus a looping audio cue while any violation is on screen
//! 5. **Stream**: raw and annotated `multipart/x-mixed-replace` feeds
//!
//! # Module Structure
//!
//! - `camera`: capture sources and device selection
//! - `detect`: detector backends, confidence gating, classification policy
//! - `annotate`: box-and-label rendering
//! - `alert`: throttle, audio cue, Telegram notification
//! - `pipeline`: per-frame orchestration
//! - `stream` / `server`: MJPEG encoding and the HTTP surface
//! - `tunnel`: public URL discovery and feed announcement

pub mod alert;
pub mod annotate;
pub mod camera;
pub mod config;
pub mod detect;
pub mod frame;
pub mod pipeline;
pub mod server;
pub mod stream;
pub mod tunnel;

pub use alert::{AlertDispatcher, AlertThrottle, AudioCue, AudioState, Notifier};
pub use annotate::FrameAnnotator;
pub use camera::{shared_camera, CameraConfig, CameraSource, SharedCamera};
pub use config::SentinelConfig;
pub use detect::{
    format_confidence, BoundingBox, Compliance, Detection, DetectorAdapter, DetectorBackend,
    PpeClass,
};
pub use frame::Frame;
pub use pipeline::DetectionPipeline;
pub use server::{ServerConfig, ServerHandle, StreamServer};
