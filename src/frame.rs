//! Owned RGB frame buffers.
//!
//! A `Frame` is the unit of work for the whole pipeline: the camera produces
//! one, the detector reads its pixels, the annotator mutates it, and the
//! stream encoders turn it into a JPEG wire frame. Frames are transient -
//! nothing in the pipeline retains one past encoding, except the single
//! alert snapshot written (and immediately deleted) by the dispatcher.

use anyhow::{anyhow, Context, Result};
use image::{imageops, RgbImage};

/// One RGB frame, backed by an `image::RgbImage`.
#[derive(Clone, Debug)]
pub struct Frame {
    image: RgbImage,
}

impl Frame {
    /// Wrap raw packed RGB bytes. Fails when the byte count does not match
    /// the stated dimensions.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))?;
        if data.len() != expected {
            return Err(anyhow!(
                "expected {} RGB bytes for {}x{}, received {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        let image = RgbImage::from_raw(width, height, data)
            .ok_or_else(|| anyhow!("failed to build {}x{} image buffer", width, height))?;
        Ok(Self { image })
    }

    pub fn from_rgb_image(image: RgbImage) -> Self {
        Self { image }
    }

    /// Decode a JPEG byte buffer into a frame.
    pub fn decode_jpeg(bytes: &[u8]) -> Result<Self> {
        let image = image::load_from_memory(bytes).context("decode jpeg")?;
        Ok(Self {
            image: image.into_rgb8(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Packed RGB pixel bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        self.image.as_raw()
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbImage {
        &mut self.image
    }

    /// Resized copy. Every caller of the detector must resize to the same
    /// input size, or detection geometry becomes inconsistent across callers.
    pub fn resized(&self, width: u32, height: u32) -> Self {
        if self.width() == width && self.height() == height {
            return self.clone();
        }
        Self {
            image: imageops::resize(&self.image, width, height, imageops::FilterType::Triangle),
        }
    }

    /// Encode to JPEG for the wire or for an alert snapshot.
    pub fn encode_jpeg(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, 80);
        self.image
            .write_with_encoder(encoder)
            .context("encode jpeg")?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rgb_rejects_wrong_length() {
        assert!(Frame::from_rgb(vec![0u8; 10], 4, 4).is_err());
    }

    #[test]
    fn resize_changes_dimensions() -> Result<()> {
        let frame = Frame::from_rgb(vec![0u8; 8 * 8 * 3], 8, 8)?;
        let resized = frame.resized(4, 2);
        assert_eq!(resized.width(), 4);
        assert_eq!(resized.height(), 2);
        Ok(())
    }

    #[test]
    fn jpeg_round_trip_preserves_dimensions() -> Result<()> {
        let frame = Frame::from_rgb(vec![128u8; 16 * 12 * 3], 16, 12)?;
        let jpeg = frame.encode_jpeg()?;
        assert_eq!(&jpeg[..2], &[0xFF, 0xD8], "missing jpeg SOI marker");
        let decoded = Frame::decode_jpeg(&jpeg)?;
        assert_eq!(decoded.width(), 16);
        assert_eq!(decoded.height(), 12);
        Ok(())
    }
}
