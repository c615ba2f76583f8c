use crate::detection::domain::detection::Detection;
use crate::shared::frame::Frame;

/// Domain interface for running a detector over one frame.
///
/// Implementations own a model session and a color picker, both of which
/// need mutable access, hence `&mut self`.
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>>;
}
