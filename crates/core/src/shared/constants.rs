/// Minimum objectness for a candidate row to be considered at all.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// A candidate's best class score must exceed this to be kept.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.45;

/// NMS IoU threshold.
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.50;

/// Fallback model input resolution when the model doesn't specify dimensions.
pub const DEFAULT_INPUT_SIZE: u32 = 640;

/// Row layout of the detector output: `[cx, cy, w, h, objectness, class scores...]`.
pub const BOX_VALUES: usize = 4;
pub const OBJECTNESS_OFFSET: usize = 4;
pub const CLASS_SCORES_OFFSET: usize = 5;

/// Per-channel range for randomly drawn overlay colors.
pub const COLOR_CHANNEL_MIN: u8 = 100;
pub const COLOR_CHANNEL_MAX: u8 = 255;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
