use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;
use crate::frame::Frame;

/// Adapter that fronts a boxed detector backend.
///
/// The adapter owns two pipeline-wide contracts:
/// - the input-size contract: callers must hand it frames already resized
///   to the model input size (mismatches are an error, not a silent resize,
///   so that all callers stay geometrically consistent);
/// - the confidence gate: detections at or below the gate are discarded
///   here, before anything downstream can see them.
pub struct DetectorAdapter {
    backend: Box<dyn DetectorBackend>,
    input_width: u32,
    input_height: u32,
    confidence_gate: f32,
}

impl DetectorAdapter {
    pub fn new(
        backend: Box<dyn DetectorBackend>,
        input_width: u32,
        input_height: u32,
        confidence_gate: f32,
    ) -> Self {
        Self {
            backend,
            input_width,
            input_height,
            confidence_gate,
        }
    }

    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn warm_up(&mut self) -> Result<()> {
        self.backend.warm_up()
    }

    /// Detect in one frame. Returns only detections strictly above the
    /// confidence gate.
    pub fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>> {
        if frame.width() != self.input_width || frame.height() != self.input_height {
            return Err(anyhow!(
                "detector input must be {}x{}, received {}x{}",
                self.input_width,
                self.input_height,
                frame.width(),
                frame.height()
            ));
        }
        let mut detections =
            self.backend
                .detect(frame.pixels(), frame.width(), frame.height())?;
        detections.retain(|d| d.confidence > self.confidence_gate);
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::backends::ScriptedBackend;
    use crate::detect::label::PpeClass;
    use crate::detect::result::BoundingBox;

    fn detection(class: PpeClass, confidence: f32) -> Detection {
        Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), class, confidence)
    }

    fn test_frame() -> Frame {
        Frame::from_rgb(vec![0u8; 640 * 480 * 3], 640, 480).unwrap()
    }

    #[test]
    fn gate_is_strict() -> Result<()> {
        let script = vec![vec![
            detection(PpeClass::NoHardhat, 0.5),
            detection(PpeClass::NoMask, 0.50001),
            detection(PpeClass::Hardhat, 0.2),
        ]];
        let mut adapter =
            DetectorAdapter::new(Box::new(ScriptedBackend::new(script)), 640, 480, 0.5);

        let surviving = adapter.detect(&test_frame())?;
        assert_eq!(surviving.len(), 1, "only confidence > 0.5 survives");
        assert_eq!(surviving[0].class, PpeClass::NoMask);
        Ok(())
    }

    #[test]
    fn rejects_unresized_frames() {
        let mut adapter =
            DetectorAdapter::new(Box::new(ScriptedBackend::new(Vec::new())), 640, 480, 0.5);
        let frame = Frame::from_rgb(vec![0u8; 320 * 240 * 3], 320, 240).unwrap();
        assert!(adapter.detect(&frame).is_err());
    }
}
