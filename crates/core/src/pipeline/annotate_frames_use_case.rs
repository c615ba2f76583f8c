use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::detection::domain::detection::Detection;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::rendering::domain::frame_renderer::FrameRenderer;
use crate::shared::frame::Frame;
use crate::video::domain::image_writer::ImageWriter;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

use super::pipeline_logger::PipelineLogger;

type FrameCallback = Box<dyn FnMut(&Frame, &[Detection]) + Send>;

/// Totals for one annotation run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AnnotationStats {
    pub frames: usize,
    pub detections: usize,
    pub frames_written: usize,
    pub video_frames: usize,
}

/// Path of the annotated PNG for frame `index` inside `dir`.
pub fn frame_output_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("frame_{index:06}.png"))
}

/// Single-threaded annotation loop: read → detect → render → write.
///
/// Each frame is fully processed before the next one is decoded.
pub struct AnnotateFramesUseCase {
    reader: Box<dyn VideoReader>,
    detector: Box<dyn ObjectDetector>,
    renderer: Box<dyn FrameRenderer>,
    logger: Box<dyn PipelineLogger>,
    output: Option<(Box<dyn ImageWriter>, PathBuf)>,
    video_output: Option<(Box<dyn VideoWriter>, PathBuf)>,
    max_frames: Option<usize>,
    on_frame: Option<FrameCallback>,
}

impl AnnotateFramesUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        detector: Box<dyn ObjectDetector>,
        renderer: Box<dyn FrameRenderer>,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            reader,
            detector,
            renderer,
            logger,
            output: None,
            video_output: None,
            max_frames: None,
            on_frame: None,
        }
    }

    /// Write every annotated frame as `frame_NNNNNN.png` under `dir`.
    pub fn with_output(mut self, writer: Box<dyn ImageWriter>, dir: PathBuf) -> Self {
        self.output = Some((writer, dir));
        self
    }

    /// Encode annotated frames into one video at `path`, at the source frame
    /// rate.
    pub fn with_video_output(mut self, writer: Box<dyn VideoWriter>, path: PathBuf) -> Self {
        self.video_output = Some((writer, path));
        self
    }

    pub fn with_max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    /// Called with each annotated frame and its detections.
    pub fn on_frame(mut self, callback: impl FnMut(&Frame, &[Detection]) + Send + 'static) -> Self {
        self.on_frame = Some(Box::new(callback));
        self
    }

    pub fn execute(&mut self, input: &Path) -> Result<AnnotationStats, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input)?;
        let total = match self.max_frames {
            Some(max) if metadata.total_frames > 0 => max.min(metadata.total_frames),
            Some(max) => max,
            None => metadata.total_frames,
        };
        self.logger.info(&format!(
            "Annotating {} ({}x{})",
            input.display(),
            metadata.width,
            metadata.height
        ));

        if let Some((writer, path)) = self.video_output.as_mut() {
            if let Err(e) = writer.open(path, &metadata) {
                self.reader.close();
                return Err(e);
            }
        }

        let mut stats = AnnotationStats::default();
        let result = self.run_loop(total, &mut stats);
        self.reader.close();
        let closed = match self.video_output.as_mut() {
            Some((writer, _)) => writer.close(),
            None => Ok(()),
        };
        result?;
        closed?;

        if stats.detections == 0 {
            self.logger.info("No objects detected in any frame");
        }
        self.logger.summary();
        Ok(stats)
    }

    fn run_loop(
        &mut self,
        total: usize,
        stats: &mut AnnotationStats,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let limit = self.max_frames.unwrap_or(usize::MAX);

        for frame in self.reader.frames().take(limit) {
            let mut frame = frame?;

            let t0 = Instant::now();
            let detections = self.detector.detect(&frame)?;
            self.logger.timing("detect", elapsed_ms(t0));
            self.logger.metric("detections", detections.len() as f64);

            let t0 = Instant::now();
            self.renderer.render(&mut frame, &detections)?;
            self.logger.timing("render", elapsed_ms(t0));

            if let Some((writer, dir)) = &self.output {
                let t0 = Instant::now();
                writer.write(&frame_output_path(dir, frame.index()), &frame)?;
                self.logger.timing("write", elapsed_ms(t0));
                stats.frames_written += 1;
            }

            if let Some((writer, _)) = self.video_output.as_mut() {
                let t0 = Instant::now();
                writer.write(&frame)?;
                self.logger.timing("encode", elapsed_ms(t0));
                stats.video_frames += 1;
            }

            if let Some(callback) = self.on_frame.as_mut() {
                callback(&frame, &detections);
            }

            stats.frames += 1;
            stats.detections += detections.len();
            self.logger.progress(stats.frames, total);
        }
        Ok(())
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::detection::Color;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::video_metadata::VideoMetadata;
    use std::sync::{Arc, Mutex};

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Frame>,
        fail_at: Option<usize>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        fn new(count: usize) -> Self {
            Self {
                frames: (0..count).map(|i| Frame::zeros(64, 48, i)).collect(),
                fail_at: None,
                closed: Arc::new(Mutex::new(false)),
            }
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Ok(VideoMetadata {
                width: 64,
                height: 48,
                fps: 30.0,
                total_frames: self.frames.len(),
                codec: "stub".to_string(),
                source_path: Some(path.to_path_buf()),
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            let fail_at = self.fail_at;
            Box::new(self.frames.drain(..).enumerate().map(
                move |(i, f)| -> Result<Frame, Box<dyn std::error::Error>> {
                    if Some(i) == fail_at {
                        Err("decode failed".into())
                    } else {
                        Ok(f)
                    }
                },
            ))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    struct FailingOpenReader;

    impl VideoReader for FailingOpenReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            Err("Could not open video source".into())
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::iter::empty())
        }

        fn close(&mut self) {}
    }

    /// Emits `per_frame` detections on every frame.
    struct StubDetector {
        per_frame: usize,
    }

    impl ObjectDetector for StubDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            Ok((0..self.per_frame)
                .map(|i| Detection {
                    class_id: i,
                    confidence: 0.9,
                    class_name: format!("class{i}"),
                    bbox: BoundingBox::new(1, 1, 10, 10),
                    color: Color::new(200, 150, 100),
                })
                .collect())
        }
    }

    struct RecordingRenderer {
        calls: Arc<Mutex<Vec<(usize, usize)>>>,
    }

    impl FrameRenderer for RecordingRenderer {
        fn render(
            &self,
            frame: &mut Frame,
            detections: &[Detection],
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.calls
                .lock()
                .unwrap()
                .push((frame.index(), detections.len()));
            frame.data_mut()[0] = 255;
            Ok(())
        }
    }

    struct StubWriter {
        written: Arc<Mutex<Vec<(PathBuf, u8)>>>,
    }

    impl ImageWriter for StubWriter {
        fn write(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.data()[0]));
            Ok(())
        }
    }

    #[derive(Default)]
    struct VideoLog {
        opened: Option<(PathBuf, u32, u32, f64)>,
        frames: Vec<(usize, u8)>,
        closes: usize,
    }

    struct StubVideoWriter {
        log: Arc<Mutex<VideoLog>>,
        fail_open: bool,
    }

    impl VideoWriter for StubVideoWriter {
        fn open(
            &mut self,
            path: &Path,
            metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            if self.fail_open {
                return Err("Could not create video".into());
            }
            self.log.lock().unwrap().opened = Some((
                path.to_path_buf(),
                metadata.width,
                metadata.height,
                metadata.fps,
            ));
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.log
                .lock()
                .unwrap()
                .frames
                .push((frame.index(), frame.data()[0]));
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            self.log.lock().unwrap().closes += 1;
            Ok(())
        }
    }

    fn video_writer(fail_open: bool) -> (Box<StubVideoWriter>, Arc<Mutex<VideoLog>>) {
        let log = Arc::new(Mutex::new(VideoLog::default()));
        (
            Box::new(StubVideoWriter {
                log: log.clone(),
                fail_open,
            }),
            log,
        )
    }

    // --- Helpers ---

    type Calls = Arc<Mutex<Vec<(usize, usize)>>>;

    fn use_case(reader: impl VideoReader + 'static, per_frame: usize) -> (AnnotateFramesUseCase, Calls) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let uc = AnnotateFramesUseCase::new(
            Box::new(reader),
            Box::new(StubDetector { per_frame }),
            Box::new(RecordingRenderer {
                calls: calls.clone(),
            }),
            Box::new(NullPipelineLogger),
        );
        (uc, calls)
    }

    // --- Tests ---

    #[test]
    fn test_frame_output_path_is_zero_padded() {
        assert_eq!(
            frame_output_path(Path::new("out"), 7),
            PathBuf::from("out/frame_000007.png")
        );
        assert_eq!(
            frame_output_path(Path::new("out"), 1_234_567),
            PathBuf::from("out/frame_1234567.png")
        );
    }

    #[test]
    fn test_every_frame_is_detected_and_rendered_in_order() {
        let (mut uc, calls) = use_case(StubReader::new(3), 2);
        let stats = uc.execute(Path::new("cars.mp4")).unwrap();

        assert_eq!(
            stats,
            AnnotationStats {
                frames: 3,
                detections: 6,
                frames_written: 0,
                video_frames: 0,
            }
        );
        assert_eq!(*calls.lock().unwrap(), vec![(0, 2), (1, 2), (2, 2)]);
    }

    #[test]
    fn test_writes_rendered_frames_to_output_dir() {
        let written = Arc::new(Mutex::new(Vec::new()));
        let (uc, _) = use_case(StubReader::new(2), 1);
        let mut uc = uc.with_output(
            Box::new(StubWriter {
                written: written.clone(),
            }),
            PathBuf::from("annotated"),
        );

        let stats = uc.execute(Path::new("cars.mp4")).unwrap();
        assert_eq!(stats.frames_written, 2);

        let written = written.lock().unwrap();
        assert_eq!(written[0].0, PathBuf::from("annotated/frame_000000.png"));
        assert_eq!(written[1].0, PathBuf::from("annotated/frame_000001.png"));
        // Writer sees the frame after rendering
        assert!(written.iter().all(|(_, first)| *first == 255));
    }

    #[test]
    fn test_max_frames_bounds_the_loop() {
        let (uc, calls) = use_case(StubReader::new(10), 0);
        let mut uc = uc.with_max_frames(Some(4));
        let stats = uc.execute(Path::new("cars.mp4")).unwrap();
        assert_eq!(stats.frames, 4);
        assert_eq!(calls.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_zero_detections_is_not_an_error() {
        let (mut uc, calls) = use_case(StubReader::new(2), 0);
        let stats = uc.execute(Path::new("cars.mp4")).unwrap();
        assert_eq!(stats.detections, 0);
        assert_eq!(*calls.lock().unwrap(), vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn test_on_frame_receives_detections() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (uc, _) = use_case(StubReader::new(2), 3);
        let mut uc = uc.on_frame(move |frame, detections| {
            sink.lock().unwrap().push((frame.index(), detections.len()));
        });

        uc.execute(Path::new("cars.mp4")).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(0, 3), (1, 3)]);
    }

    #[test]
    fn test_open_failure_propagates() {
        let (mut uc, calls) = use_case(FailingOpenReader, 1);
        let err = uc.execute(Path::new("missing.mp4")).unwrap_err();
        assert!(err.to_string().contains("Could not open video source"));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_decode_error_stops_loop_and_closes_reader() {
        let mut reader = StubReader::new(3);
        reader.fail_at = Some(1);
        let closed = reader.closed.clone();

        let (mut uc, calls) = use_case(reader, 1);
        let err = uc.execute(Path::new("cars.mp4")).unwrap_err();

        assert_eq!(err.to_string(), "decode failed");
        assert_eq!(calls.lock().unwrap().len(), 1);
        assert!(*closed.lock().unwrap());
    }

    #[test]
    fn test_encodes_rendered_frames_at_source_rate() {
        let (writer, log) = video_writer(false);
        let (uc, _) = use_case(StubReader::new(3), 1);
        let mut uc = uc.with_video_output(writer, PathBuf::from("cars_annotated.mp4"));

        let stats = uc.execute(Path::new("cars.mp4")).unwrap();
        assert_eq!(stats.video_frames, 3);

        let log = log.lock().unwrap();
        assert_eq!(
            log.opened,
            Some((PathBuf::from("cars_annotated.mp4"), 64, 48, 30.0))
        );
        assert_eq!(log.frames, vec![(0, 255), (1, 255), (2, 255)]);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn test_decode_error_still_finalizes_video() {
        let mut reader = StubReader::new(3);
        reader.fail_at = Some(2);
        let (writer, log) = video_writer(false);
        let (uc, _) = use_case(reader, 0);
        let mut uc = uc.with_video_output(writer, PathBuf::from("out.mp4"));

        let err = uc.execute(Path::new("cars.mp4")).unwrap_err();
        assert_eq!(err.to_string(), "decode failed");

        let log = log.lock().unwrap();
        assert_eq!(log.frames.len(), 2);
        assert_eq!(log.closes, 1);
    }

    #[test]
    fn test_video_open_failure_propagates_before_detection() {
        let reader = StubReader::new(2);
        let closed = reader.closed.clone();
        let (writer, _) = video_writer(true);
        let (uc, calls) = use_case(reader, 1);
        let mut uc = uc.with_video_output(writer, PathBuf::from("out.mp4"));

        let err = uc.execute(Path::new("cars.mp4")).unwrap_err();
        assert!(err.to_string().contains("Could not create video"));
        assert!(calls.lock().unwrap().is_empty());
        assert!(*closed.lock().unwrap());
    }
}
