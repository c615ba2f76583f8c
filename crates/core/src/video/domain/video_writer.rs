use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Encodes annotated frames into a video file.
pub trait VideoWriter: Send {
    /// Prepares an output at `path` matching the source size and frame rate.
    fn open(&mut self, path: &Path, metadata: &VideoMetadata)
        -> Result<(), Box<dyn std::error::Error>>;

    fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Flushes buffered packets and finalizes the container. Safe to call
    /// repeatedly.
    fn close(&mut self) -> Result<(), Box<dyn std::error::Error>>;
}
