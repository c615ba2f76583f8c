use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Sequential frame source: a video file, an image, or anything ffmpeg can
/// open as an input (files, stream URLs).
///
/// Implementations handle decoding and pixel format conversion; the
/// pipeline only sees RGB [`Frame`]s in decode order.
pub trait VideoReader: Send {
    /// Opens the source and returns its metadata.
    ///
    /// Failing to open is fatal for the pipeline.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in decode order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader. Safe to call repeatedly.
    fn close(&mut self);
}
