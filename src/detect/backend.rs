use anyhow::Result;

use crate::detect::result::Detection;

/// Detector backend trait.
///
/// A backend receives one RGB frame's pixels and returns zero or more
/// detections. Backends have no other side effects: they do not write to
/// disk, do not touch the network, and must not retain the pixel slice
/// beyond the call. Failures propagate to the adapter, which treats them
/// as fatal for the current frame only.
pub trait DetectorBackend: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// `pixels` is packed RGB, row-major, `width * height * 3` bytes.
    /// Returned confidences are raw model scores; the adapter applies the
    /// confidence gate.
    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>>;

    /// Optional warm-up hook (model load checks, first-inference cost).
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
