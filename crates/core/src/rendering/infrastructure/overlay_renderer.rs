use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

use crate::detection::domain::detection::{Color, Detection};
use crate::rendering::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;

/// Outline thickness in pixels.
pub const BOX_THICKNESS: i32 = 2;

const LABEL_FONT_SIZE: f32 = 24.0;

/// Gap between the caption baseline and the top edge of the box.
const LABEL_OFFSET: i32 = 10;

/// Draws a colored outline per detection and, when a font is loaded, the
/// `"<class> <confidence>"` caption above it in black.
pub struct OverlayRenderer {
    font: Option<FontVec>,
    font_size: f32,
}

impl OverlayRenderer {
    /// Boxes only.
    pub fn new() -> Self {
        Self {
            font: None,
            font_size: LABEL_FONT_SIZE,
        }
    }

    pub fn with_font_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let bytes = std::fs::read(path)
            .map_err(|e| format!("Failed to read font {}: {e}", path.display()))?;
        let font = FontVec::try_from_vec(bytes)
            .map_err(|e| format!("Invalid font {}: {e}", path.display()))?;
        Ok(Self {
            font: Some(font),
            font_size: LABEL_FONT_SIZE,
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    fn draw_box(&self, img: &mut RgbImage, det: &Detection) {
        let color = Rgb(det.color.to_rgb());
        let b = det.bbox;
        let (img_w, img_h) = img.dimensions();
        for t in 0..BOX_THICKNESS as i64 {
            let (x0, x1) = edge_span(b.left as i64 + t, b.width as i64 - 2 * t, img_w);
            let (y0, y1) = edge_span(b.top as i64 + t, b.height as i64 - 2 * t, img_h);
            if x1 < x0 || y1 < y0 {
                break;
            }
            let rect = Rect::at(x0 as i32, y0 as i32)
                .of_size((x1 - x0 + 1) as u32, (y1 - y0 + 1) as u32);
            draw_hollow_rect_mut(img, rect, color);
        }
    }

    fn draw_caption(&self, img: &mut RgbImage, det: &Detection, font: &FontVec) {
        // Clamped so glyph offsets added by imageproc stay in i32 range
        let (img_w, img_h) = img.dimensions();
        let (img_w, img_h) = (img_w as i32, img_h as i32);
        let text_left = det.bbox.left.clamp(-img_w, img_w);
        let text_top = det
            .bbox
            .top
            .saturating_sub(LABEL_OFFSET + self.font_size as i32)
            .clamp(-img_h, img_h);
        draw_text_mut(
            img,
            Rgb(Color::BLACK.to_rgb()),
            text_left,
            text_top,
            PxScale::from(self.font_size),
            font,
            &det.caption(),
        );
    }
}

/// First and last pixel of a box side, clamped to one pixel outside the
/// image so off-image edges stay off-image and `Rect` math cannot overflow.
fn edge_span(start: i64, len: i64, limit: u32) -> (i64, i64) {
    if len <= 0 {
        return (0, -1);
    }
    let limit = limit as i64;
    let first = start.clamp(-1, limit);
    let last = (start + len - 1).clamp(-1, limit);
    (first, last)
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRenderer for OverlayRenderer {
    fn render(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>> {
        if detections.is_empty() {
            return Ok(());
        }
        let mut img = frame
            .to_rgb_image()
            .ok_or("Failed to create image from frame data")?;

        for det in detections {
            self.draw_box(&mut img, det);
            if let Some(font) = &self.font {
                self.draw_caption(&mut img, det, font);
            }
        }

        frame.data_mut().copy_from_slice(img.as_raw());
        Ok(())
    }
}
