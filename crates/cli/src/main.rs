use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;

use yolo_overlay_core::detection::domain::class_label_table::ClassLabelTable;
use yolo_overlay_core::detection::domain::color_picker::{
    ClassColorPicker, ColorPicker, SeededColorPicker,
};
use yolo_overlay_core::detection::domain::detection::Detection;
use yolo_overlay_core::detection::domain::detection_postprocessor::DetectionPostprocessor;
use yolo_overlay_core::detection::domain::postprocess_config::{NmsScoreFloor, PostprocessConfig};
use yolo_overlay_core::detection::infrastructure::onnx_object_detector::{
    DetectorConfig, OnnxObjectDetector,
};
use yolo_overlay_core::pipeline::annotate_frames_use_case::AnnotateFramesUseCase;
use yolo_overlay_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use yolo_overlay_core::rendering::infrastructure::overlay_renderer::OverlayRenderer;
use yolo_overlay_core::shared::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_INPUT_SIZE, DEFAULT_NMS_THRESHOLD,
    DEFAULT_SCORE_THRESHOLD,
};
use yolo_overlay_core::shared::frame::Frame;
use yolo_overlay_core::video::domain::video_reader::VideoReader;
use yolo_overlay_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use yolo_overlay_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use yolo_overlay_core::video::infrastructure::image_file_reader::{is_image, ImageFileReader};
use yolo_overlay_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// YOLO object detection with bounding-box overlays for videos and images.
#[derive(Parser)]
#[command(name = "yolo-overlay")]
struct Cli {
    /// Input video file, stream URL, or image.
    input: PathBuf,

    /// YOLO ONNX model.
    #[arg(long)]
    model: PathBuf,

    /// Newline-delimited class names, one per model class.
    #[arg(long)]
    labels: PathBuf,

    /// Minimum objectness for a row to be considered (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE_THRESHOLD)]
    confidence: f32,

    /// Best class score must exceed this (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_SCORE_THRESHOLD)]
    score: f32,

    /// NMS IoU threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_NMS_THRESHOLD)]
    nms: f32,

    /// Score floor used by NMS: class-score or confidence.
    #[arg(long, default_value = "class-score")]
    nms_floor: NmsScoreFloor,

    /// Stretch frames to the model input instead of padding to a square.
    #[arg(long)]
    no_letterbox: bool,

    /// Model input width, used when the model's input shape is dynamic.
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    input_width: u32,

    /// Model input height, used when the model's input shape is dynamic.
    #[arg(long, default_value_t = DEFAULT_INPUT_SIZE)]
    input_height: u32,

    /// Run inference on CUDA / CoreML / DirectML instead of the CPU.
    #[arg(long)]
    accelerated: bool,

    /// Seed for overlay colors (random when omitted).
    #[arg(long)]
    color_seed: Option<u64>,

    /// Derive overlay colors from the class id instead of drawing them.
    #[arg(long)]
    class_colors: bool,

    /// TrueType font for captions; boxes only when omitted.
    #[arg(long)]
    font: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// Write annotated frames here as frame_NNNNNN.png.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write the annotated video here, at the source frame rate.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let labels = Arc::new(ClassLabelTable::load(&cli.labels)?);
    let postprocessor = DetectionPostprocessor::new(
        postprocess_config(&cli),
        labels,
        color_picker(&cli),
    )?;
    let detector = OnnxObjectDetector::new(&cli.model, detector_config(&cli), postprocessor)?;

    let renderer = match &cli.font {
        Some(path) => OverlayRenderer::with_font_file(path)?,
        None => OverlayRenderer::new(),
    };

    let mut use_case = AnnotateFramesUseCase::new(
        open_reader(&cli.input),
        Box::new(detector),
        Box::new(renderer),
        Box::new(StdoutPipelineLogger::default()),
    )
    .with_max_frames(cli.max_frames)
    .on_frame(log_detections);

    if let Some(dir) = &cli.output_dir {
        use_case = use_case.with_output(Box::new(ImageFileWriter::new()), dir.clone());
    }
    if let Some(path) = &cli.output {
        use_case = use_case.with_video_output(Box::new(FfmpegWriter::new()), path.clone());
    }

    let stats = use_case.execute(&cli.input)?;
    log::info!(
        "Annotated {} frames, {} detections",
        stats.frames,
        stats.detections
    );
    if let Some(dir) = &cli.output_dir {
        log::info!("Wrote {} frames to {}", stats.frames_written, dir.display());
    }
    if let Some(path) = &cli.output {
        log::info!("Wrote {} frames to {}", stats.video_frames, path.display());
    }
    Ok(())
}

fn postprocess_config(cli: &Cli) -> PostprocessConfig {
    PostprocessConfig {
        confidence_threshold: cli.confidence,
        score_threshold: cli.score,
        nms_threshold: cli.nms,
        nms_score_floor: cli.nms_floor,
    }
}

fn detector_config(cli: &Cli) -> DetectorConfig {
    DetectorConfig {
        input_width: cli.input_width,
        input_height: cli.input_height,
        accelerated: cli.accelerated,
        letterbox: !cli.no_letterbox,
    }
}

fn color_picker(cli: &Cli) -> Box<dyn ColorPicker> {
    if cli.class_colors {
        Box::new(ClassColorPicker::new())
    } else if let Some(seed) = cli.color_seed {
        Box::new(SeededColorPicker::with_seed(seed))
    } else {
        Box::new(SeededColorPicker::from_entropy())
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.model.is_file() {
        return Err(format!("Model file not found: {}", cli.model.display()).into());
    }
    if !cli.labels.is_file() {
        return Err(format!("Class names file not found: {}", cli.labels.display()).into());
    }
    if is_image(&cli.input) && !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if let Some(output) = &cli.output {
        if is_image(&cli.input) {
            return Err("--output needs a video input; use --output-dir for images".into());
        }
        if output == &cli.input {
            return Err("--output must differ from the input".into());
        }
    }
    postprocess_config(cli).validate()?;
    if cli.input_width == 0 || cli.input_height == 0 {
        return Err(format!(
            "Input size must be non-zero, got {}x{}",
            cli.input_width, cli.input_height
        )
        .into());
    }
    if cli.max_frames == Some(0) {
        return Err("--max-frames must be at least 1".into());
    }
    if cli.class_colors && cli.color_seed.is_some() {
        return Err("--class-colors and --color-seed are mutually exclusive".into());
    }
    if let Some(font) = &cli.font {
        if !font.is_file() {
            return Err(format!("Font file not found: {}", font.display()).into());
        }
    }
    Ok(())
}

fn open_reader(input: &Path) -> Box<dyn VideoReader> {
    if is_image(input) {
        Box::new(ImageFileReader::new())
    } else {
        Box::new(FfmpegReader::new())
    }
}

fn log_detections(frame: &Frame, detections: &[Detection]) {
    for det in detections {
        let b = det.bbox;
        log::debug!(
            "frame {}: {} at ({}, {}, {}x{})",
            frame.index(),
            det.caption(),
            b.left,
            b.top,
            b.width,
            b.height
        );
    }
}
