use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Draws detections onto a frame in place.
pub trait FrameRenderer: Send {
    fn render(
        &self,
        frame: &mut Frame,
        detections: &[Detection],
    ) -> Result<(), Box<dyn std::error::Error>>;
}
