use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Images are represented as single-frame sources with `fps == 0`.
    pub fn is_still_image(&self) -> bool {
        self.total_frames == 1 && self.fps == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(fps: f64, total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 1280,
            height: 720,
            fps,
            total_frames,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/cars.mp4")),
        }
    }

    #[test]
    fn test_clone_is_equal() {
        let meta = metadata(30.0, 900);
        assert_eq!(meta.clone(), meta);
    }

    #[test]
    fn test_video_is_not_still_image() {
        assert!(!metadata(30.0, 900).is_still_image());
    }

    #[test]
    fn test_single_frame_without_fps_is_still_image() {
        assert!(metadata(0.0, 1).is_still_image());
    }

    #[test]
    fn test_unknown_frame_count_video() {
        // Live streams report zero frames but a nonzero rate
        assert!(!metadata(25.0, 0).is_still_image());
    }
}
