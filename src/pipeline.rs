//! Per-frame detection pipeline.
//!
//! One `process` call takes a captured frame through resize, detection,
//! annotation, alert throttling, notification and the audio cue, and
//! returns the frame that should be streamed to viewers.
//!
//! Ordering matters: the throttle record is updated before notifications
//! go out, and the audio cue is fed the raw per-frame verdict (not the
//! throttled one) so the siren tracks what is on screen, not what was
//! recently alerted.

use std::time::Instant;

use crate::alert::{AlertDispatcher, AlertThrottle, AudioCue, AudioState};
use crate::annotate::FrameAnnotator;
use crate::detect::{Compliance, DetectorAdapter, PpeClass};
use crate::frame::Frame;

pub struct DetectionPipeline {
    detector: DetectorAdapter,
    annotator: FrameAnnotator,
    throttle: AlertThrottle,
    audio: AudioCue,
    dispatcher: AlertDispatcher,
}

impl DetectionPipeline {
    pub fn new(
        detector: DetectorAdapter,
        annotator: FrameAnnotator,
        throttle: AlertThrottle,
        audio: AudioCue,
        dispatcher: AlertDispatcher,
    ) -> Self {
        Self {
            detector,
            annotator,
            throttle,
            audio,
            dispatcher,
        }
    }

    pub fn audio_state(&self) -> AudioState {
        self.audio.state()
    }

    pub fn throttle(&self) -> &AlertThrottle {
        &self.throttle
    }

    /// Process one captured frame and return the frame to stream.
    pub fn process(&mut self, frame: Frame) -> Frame {
        self.process_at(frame, Instant::now())
    }

    /// `process` with an explicit clock, so throttle windows are testable
    /// without sleeping.
    pub fn process_at(&mut self, frame: Frame, now: Instant) -> Frame {
        let (input_width, input_height) = self.detector.input_size();
        let mut frame = frame.resized(input_width, input_height);

        let detections = match self.detector.detect(&frame) {
            Ok(detections) => detections,
            Err(err) => {
                // A failed inference skips this frame's detections; the
                // stream keeps flowing with the unannotated frame.
                log::warn!(
                    "pipeline: detection failed, passing frame through unannotated: {:#}",
                    err
                );
                return frame;
            }
        };

        self.annotator.annotate(&mut frame, &detections);

        let non_compliant: Vec<PpeClass> = detections
            .iter()
            .filter(|d| d.class.compliance() == Compliance::NonCompliant)
            .map(|d| d.class)
            .collect();
        let any_non_compliant = !non_compliant.is_empty();

        let admitted = self.throttle.admit(&non_compliant, now);
        self.dispatcher.dispatch(&frame, &admitted);
        self.audio.update(any_non_compliant);

        frame
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::alert::NullCuePlayer;
    use crate::alert::NullNotifier;
    use crate::detect::{BoundingBox, Detection, ScriptedBackend};

    fn frame_640x480() -> Frame {
        Frame::from_rgb(vec![0u8; 640 * 480 * 3], 640, 480).unwrap()
    }

    fn pipeline_with(backend: ScriptedBackend) -> DetectionPipeline {
        DetectionPipeline::new(
            DetectorAdapter::new(Box::new(backend), 640, 480, 0.5),
            FrameAnnotator::new(),
            AlertThrottle::new(Duration::from_secs(15)),
            AudioCue::new(Box::new(NullCuePlayer)),
            AlertDispatcher::new(Box::new(NullNotifier)),
        )
    }

    fn violation() -> Detection {
        Detection::new(
            BoundingBox::new(100.0, 100.0, 200.0, 200.0),
            PpeClass::NoHardhat,
            0.91,
        )
    }

    #[test]
    fn violation_frame_flips_audio_to_alerting() {
        let mut pipeline = pipeline_with(ScriptedBackend::new(vec![vec![violation()]]));
        assert_eq!(pipeline.audio_state(), AudioState::Silent);
        pipeline.process(frame_640x480());
        assert_eq!(pipeline.audio_state(), AudioState::Alerting);
    }

    #[test]
    fn clear_frame_returns_audio_to_silent() {
        let mut pipeline =
            pipeline_with(ScriptedBackend::new(vec![vec![violation()], vec![]]));
        pipeline.process(frame_640x480());
        pipeline.process(frame_640x480());
        assert_eq!(pipeline.audio_state(), AudioState::Silent);
    }

    #[test]
    fn detection_failure_passes_the_frame_through() {
        let mut backend = ScriptedBackend::new(vec![]);
        backend.fail_next();
        let mut pipeline = pipeline_with(backend);
        let out = pipeline.process(frame_640x480());
        // No annotation happened: the frame is still all black.
        assert_eq!(out.image().get_pixel(150, 100).0, [0, 0, 0]);
        assert_eq!(pipeline.audio_state(), AudioState::Silent);
    }

    #[test]
    fn input_frames_are_resized_to_the_detector_contract() {
        let mut pipeline = pipeline_with(ScriptedBackend::new(vec![vec![]]));
        let big = Frame::from_rgb(vec![10u8; 1280 * 720 * 3], 1280, 720).unwrap();
        let out = pipeline.process(big);
        assert_eq!((out.width(), out.height()), (640, 480));
    }

    #[test]
    fn violation_updates_the_throttle_record() {
        let mut pipeline = pipeline_with(ScriptedBackend::new(vec![vec![violation()]]));
        let t0 = Instant::now();
        pipeline.process_at(frame_640x480(), t0);
        assert_eq!(pipeline.throttle().last_alert(PpeClass::NoHardhat), Some(t0));
    }
}
