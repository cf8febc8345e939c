use crate::detect::label::PpeClass;

/// Axis-aligned box in pixel space of the detector input frame.
/// Invariant: `x2 >= x1`, `y2 >= y1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }
}

/// One detection in one frame. Produced and consumed within a single
/// processing pass, never persisted.
#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: BoundingBox,
    pub class: PpeClass,
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class: PpeClass, confidence: f32) -> Self {
        Self {
            bbox,
            class,
            confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_normalizes_corner_order() {
        let bbox = BoundingBox::new(200.0, 180.0, 100.0, 80.0);
        assert_eq!(bbox.x1, 100.0);
        assert_eq!(bbox.y1, 80.0);
        assert_eq!(bbox.width(), 100.0);
        assert_eq!(bbox.height(), 100.0);
    }
}
