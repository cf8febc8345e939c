use anyhow::Result;
use sha2::{Digest, Sha256};

use crate::detect::backend::DetectorBackend;
use crate::detect::label::PpeClass;
use crate::detect::result::{BoundingBox, Detection};

/// Stub backend for model-less builds. Hashes pixels to detect scene
/// changes and reports a centered `Person` while the scene is changing.
pub struct StubBackend {
    last_hash: Option<[u8; 32]>,
}

impl StubBackend {
    pub fn new() -> Self {
        Self { last_hash: None }
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(&mut self, pixels: &[u8], width: u32, height: u32) -> Result<Vec<Detection>> {
        let current_hash: [u8; 32] = Sha256::digest(pixels).into();

        let motion = match self.last_hash {
            Some(prev) => prev != current_hash,
            None => false,
        };

        self.last_hash = Some(current_hash);

        if !motion {
            return Ok(Vec::new());
        }

        let (w, h) = (width as f32, height as f32);
        Ok(vec![Detection::new(
            BoundingBox::new(w * 0.25, h * 0.25, w * 0.75, h * 0.75),
            PpeClass::Person,
            0.85,
        )])
    }
}
