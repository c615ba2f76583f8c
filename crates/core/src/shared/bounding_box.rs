/// Axis-aligned box in source-image pixel coordinates.
///
/// `left`/`top` may be negative and the box may extend past the frame; the
/// detector reports what the model decoded without clipping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BoundingBox {
    pub left: i32,
    pub top: i32,
    pub width: i32,
    pub height: i32,
}

impl BoundingBox {
    pub fn new(left: i32, top: i32, width: i32, height: i32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Decodes a center-form box from model input space into a corner-form
    /// box in source-image space.
    ///
    /// Each coordinate is scaled then truncated toward zero.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32, x_scale: f32, y_scale: f32) -> Self {
        Self {
            left: ((cx - 0.5 * w) * x_scale) as i32,
            top: ((cy - 0.5 * h) * y_scale) as i32,
            width: (w * x_scale) as i32,
            height: (h * y_scale) as i32,
        }
    }

    /// Center-form `(cx, cy, w, h)` of this box.
    pub fn to_center(&self) -> (f32, f32, f32, f32) {
        let w = self.width as f32;
        let h = self.height as f32;
        (self.left as f32 + w / 2.0, self.top as f32 + h / 2.0, w, h)
    }

    /// Exclusive right edge. Widened so saturated decodes cannot overflow.
    pub fn right(&self) -> i64 {
        self.left as i64 + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.top as i64 + self.height as i64
    }

    pub fn area(&self) -> i64 {
        self.width.max(0) as i64 * self.height.max(0) as i64
    }

    pub fn intersection_area(&self, other: &BoundingBox) -> i64 {
        let ix1 = self.left.max(other.left) as i64;
        let iy1 = self.top.max(other.top) as i64;
        let ix2 = self.right().min(other.right());
        let iy2 = self.bottom().min(other.bottom());
        (ix2 - ix1).max(0) * (iy2 - iy1).max(0)
    }

    pub fn iou(&self, other: &BoundingBox) -> f64 {
        let inter = self.intersection_area(other);
        if inter == 0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        inter as f64 / union as f64
    }
}
