use std::collections::VecDeque;

use anyhow::{anyhow, Result};

use crate::detect::backend::DetectorBackend;
use crate::detect::result::Detection;

/// Deterministic backend that replays a script of per-frame detections.
///
/// Each `detect` call pops the next scripted frame; once the script is
/// exhausted every frame is empty. `fail_next` arms a one-shot error so
/// detection-failure handling can be exercised without a real model.
pub struct ScriptedBackend {
    frames: VecDeque<Vec<Detection>>,
    fail_next: bool,
}

impl ScriptedBackend {
    pub fn new(frames: Vec<Vec<Detection>>) -> Self {
        Self {
            frames: frames.into(),
            fail_next: false,
        }
    }

    /// Arm a one-shot failure for the next `detect` call.
    pub fn fail_next(&mut self) {
        self.fail_next = true;
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl DetectorBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _pixels: &[u8], _width: u32, _height: u32) -> Result<Vec<Detection>> {
        if self.fail_next {
            self.fail_next = false;
            return Err(anyhow!("scripted detection failure"));
        }
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}
