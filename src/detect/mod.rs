//! Object detection boundary.
//!
//! The detector itself is a black-box capability behind `DetectorBackend`:
//! - `StubBackend`: model-less scene-change stub (default builds)
//! - `ScriptedBackend`: deterministic replay for tests
//! - `TractBackend`: ONNX inference (feature: backend-tract)
//!
//! `DetectorAdapter` fronts whichever backend is configured and enforces
//! the 640x480 input contract and the strict confidence gate. The
//! classification policy (`label`) maps each detected class to a
//! compliance category and display color.

mod adapter;
mod backend;
mod backends;
mod label;
mod result;

pub use adapter::DetectorAdapter;
pub use backend::DetectorBackend;
pub use backends::ScriptedBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use label::{format_confidence, Compliance, PpeClass};
pub use result::{BoundingBox, Detection};
