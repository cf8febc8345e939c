//! Frame annotation.
//!
//! Draws one colored rectangle and one label per surviving detection, in
//! the classification policy's color for that class. Annotation happens in
//! place: callers must not assume the input frame is unmodified.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detect::{format_confidence, Detection};
use crate::frame::Frame;

const BOX_BORDER_PX: i32 = 3;
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_HEIGHT: i32 = 24;
const LABEL_CHAR_WIDTH: f32 = 11.0; // rough average glyph advance
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Box-and-label renderer.
///
/// Text rendering needs a TTF font; the annotator loads one from a
/// configured path. Without a font the label background strip is still
/// drawn, only the glyphs are skipped.
pub struct FrameAnnotator {
    font: Option<FontVec>,
}

impl FrameAnnotator {
    /// Annotator without label text (boxes and label strips only).
    pub fn new() -> Self {
        Self { font: None }
    }

    /// Load the label font from a TTF file.
    pub fn with_font_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("read label font {}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .with_context(|| format!("parse label font {}", path.display()))?;
        Ok(Self { font: Some(font) })
    }

    /// Build from an optional configured font path; a missing or broken
    /// font downgrades to box-only annotation with a warning.
    pub fn from_font_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) => match Self::with_font_file(path) {
                Ok(annotator) => annotator,
                Err(err) => {
                    log::warn!("annotator: {:#}; labels will have no text", err);
                    Self::new()
                }
            },
            None => Self::new(),
        }
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draw every detection onto the frame, in place.
    pub fn annotate(&self, frame: &mut Frame, detections: &[Detection]) {
        let image = frame.image_mut();
        for detection in detections {
            self.draw_detection(image, detection);
        }
    }

    fn draw_detection(&self, image: &mut RgbImage, detection: &Detection) {
        let (w, h) = (image.width() as i32, image.height() as i32);
        let color = Rgb(detection.class.color());

        let x1 = (detection.bbox.x1.floor() as i32).clamp(0, w - 1);
        let y1 = (detection.bbox.y1.floor() as i32).clamp(0, h - 1);
        let x2 = (detection.bbox.x2.ceil() as i32).clamp(0, w - 1);
        let y2 = (detection.bbox.y2.ceil() as i32).clamp(0, h - 1);
        if x1 >= x2 || y1 >= y2 {
            return;
        }

        // Thicken the border by drawing nested 1px rectangles.
        for inset in 0..BOX_BORDER_PX {
            // +1: a Rect spans x1..=x2 inclusive of both corners.
            let bw = (x2 - x1 + 1) - 2 * inset;
            let bh = (y2 - y1 + 1) - 2 * inset;
            if bw <= 0 || bh <= 0 {
                break;
            }
            let rect = Rect::at(x1 + inset, y1 + inset).of_size(bw as u32, bh as u32);
            draw_hollow_rect_mut(image, rect, color);
        }

        let label = format!(
            "{} {}",
            detection.class.name(),
            format_confidence(detection.confidence)
        );

        // Label strip sits above the box, clamped to the image.
        let label_x = x1.max(0);
        let label_y = (y1 - LABEL_TEXT_HEIGHT).max(0);
        let est_width = (label.len() as f32 * LABEL_CHAR_WIDTH) as i32;
        let label_width = est_width.min((w - label_x).max(0));
        if label_width <= 0 {
            return;
        }

        let strip = Rect::at(label_x, label_y).of_size(label_width as u32, LABEL_TEXT_HEIGHT as u32);
        draw_filled_rect_mut(image, strip, color);

        if let Some(font) = &self.font {
            draw_text_mut(
                image,
                TEXT_COLOR,
                label_x,
                label_y + LABEL_TEXT_VERTICAL_PADDING,
                PxScale::from(LABEL_FONT_SIZE),
                font,
                &label,
            );
        }
    }
}

impl Default for FrameAnnotator {
    fn default() -> Self {
        Self::new()
    }
}
