use crate::shared::bounding_box::BoundingBox;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// One labeled, scored box produced by the postprocessor.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    /// Objectness of the candidate row the box was decoded from.
    pub confidence: f32,
    pub class_name: String,
    pub bbox: BoundingBox,
    pub color: Color,
}

impl Detection {
    /// Overlay caption: class name and confidence cut to two decimals.
    ///
    /// The confidence is truncated rather than rounded, so `0.919` reads
    /// `0.91`.
    pub fn caption(&self) -> String {
        let truncated = (self.confidence * 100.0).trunc() / 100.0;
        format!("{} {:.2}", self.class_name, truncated)
    }
}
