use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Presents a still image as a one-frame source (`fps = 0`,
/// `total_frames = 1`) so images and videos share the annotation loop.
#[derive(Default)]
pub struct ImageFileReader {
    path: Option<PathBuf>,
    frame: Option<Frame>,
}

impl ImageFileReader {
    pub fn new() -> Self {
        Self::default()
    }
}

/// True when `path` carries one of the still-image extensions.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

impl VideoReader for ImageFileReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        let img = image::open(path)
            .map_err(|e| format!("Could not open image {}: {e}", path.display()))?
            .to_rgb8();
        let frame = Frame::from_rgb_image(img, 0);

        let metadata = VideoMetadata {
            width: frame.width(),
            height: frame.height(),
            fps: 0.0,
            total_frames: 1,
            codec: String::new(),
            source_path: Some(path.to_path_buf()),
        };
        log::info!(
            "Opened image {} ({}x{})",
            path.display(),
            metadata.width,
            metadata.height
        );

        self.path = Some(path.to_path_buf());
        self.frame = Some(frame);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        if self.path.is_none() {
            return Box::new(std::iter::once(Err("ImageFileReader: not opened".into())));
        }
        Box::new(self.frame.take().into_iter().map(Ok))
    }

    fn close(&mut self) {
        self.path = None;
        self.frame = None;
    }
}
