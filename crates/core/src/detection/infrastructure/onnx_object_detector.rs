/// YOLO object detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing and inference, then hands the raw output
/// rows to the domain's `DetectionPostprocessor`.
use std::borrow::Cow;
use std::path::Path;

use ndarray::{ArrayViewD, Axis};

use crate::detection::domain::detection::Detection;
use crate::detection::domain::detection_postprocessor::DetectionPostprocessor;
use crate::detection::domain::object_detector::ObjectDetector;
use crate::shared::constants::DEFAULT_INPUT_SIZE;
use crate::shared::frame::Frame;

use super::execution_provider::execution_providers;
use super::letterbox::prepare;

/// Model-side settings fixed for the lifetime of a detector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectorConfig {
    /// Used when the model's input shape is dynamic.
    pub input_width: u32,
    pub input_height: u32,
    pub accelerated: bool,
    /// Pad frames to a square before resizing when the model input is square.
    pub letterbox: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            input_width: DEFAULT_INPUT_SIZE,
            input_height: DEFAULT_INPUT_SIZE,
            accelerated: false,
            letterbox: true,
        }
    }
}

/// YOLO detector backed by an ONNX Runtime session.
pub struct OnnxObjectDetector {
    session: ort::session::Session,
    postprocessor: DetectionPostprocessor,
    input_size: (u32, u32),
    letterbox: bool,
}

impl OnnxObjectDetector {
    /// Load a YOLO ONNX model and prepare for inference.
    ///
    /// The input resolution is read from the model's input shape (expecting
    /// NCHW). Dynamic dimensions fall back to the configured size.
    pub fn new(
        model_path: &Path,
        config: DetectorConfig,
        postprocessor: DetectionPostprocessor,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = ort::session::Session::builder()?
            .with_execution_providers(execution_providers(config.accelerated))?
            .commit_from_file(model_path)?;

        let model_shape = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                // [N, C, H, W]; non-positive entries are dynamic
                if shape.len() >= 4 && shape[2] > 0 && shape[3] > 0 {
                    Some((shape[3] as u32, shape[2] as u32))
                } else {
                    None
                }
            } else {
                None
            }
        });
        let input_size = model_shape.unwrap_or((config.input_width, config.input_height));
        log::info!(
            "Loaded {} with input {}x{}",
            model_path.display(),
            input_size.0,
            input_size.1
        );

        Ok(Self {
            session,
            postprocessor,
            input_size,
            letterbox: config.letterbox,
        })
    }

    pub fn input_size(&self) -> (u32, u32) {
        self.input_size
    }
}

impl ObjectDetector for OnnxObjectDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
        // 1. Preprocess: optional letterbox + resize + normalize → NCHW float32
        let prepared = prepare(frame, self.input_size, self.letterbox)?;

        // 2. Inference
        let input_value = ort::value::Tensor::from_array(prepared.tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;

        // 3. Decode, filter, suppress
        let stride = self.postprocessor.expected_stride();
        let rows = output_rows(tensor, stride)?;
        let detections = self.postprocessor.process(&rows, stride, prepared.scale)?;
        Ok(detections)
    }
}

/// Flattens a `[1, rows, stride]` output, or a transposed `[1, stride, rows]`
/// one, into row-major rows of `stride` values.
fn output_rows(
    tensor: ArrayViewD<'_, f32>,
    stride: usize,
) -> Result<Cow<'_, [f32]>, Box<dyn std::error::Error>> {
    let shape = tensor.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
    }

    if shape[2] == stride {
        if let Some(data) = tensor.to_slice() {
            return Ok(Cow::Borrowed(data));
        }
        return Ok(Cow::Owned(tensor.iter().copied().collect()));
    }

    if shape[1] == stride {
        let transposed = tensor.index_axis_move(Axis(0), 0).reversed_axes();
        return Ok(Cow::Owned(transposed.iter().copied().collect()));
    }

    Err(format!(
        "YOLO output shape {shape:?} does not match {stride} values per row \
         (4 box + 1 objectness + {} classes)",
        stride - 5
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array3, ShapeBuilder};

    #[test]
    fn test_default_config() {
        let config = DetectorConfig::default();
        assert_eq!((config.input_width, config.input_height), (640, 640));
        assert!(!config.accelerated);
        assert!(config.letterbox);
    }

    #[test]
    fn test_output_rows_row_major() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let array = Array3::from_shape_vec((1, 2, 6), data.clone()).unwrap();
        let rows = output_rows(array.view().into_dyn(), 6).unwrap();
        assert!(matches!(rows, Cow::Borrowed(_)));
        assert_eq!(rows.as_ref(), data.as_slice());
    }

    #[test]
    fn test_output_rows_transposed() {
        // Two rows of six values, stored feature-major as [1, 6, 2]
        let rows_expected: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let mut feature_major = vec![0.0; 12];
        for r in 0..2 {
            for f in 0..6 {
                feature_major[f * 2 + r] = rows_expected[r * 6 + f];
            }
        }
        let array = Array3::from_shape_vec((1, 6, 2), feature_major).unwrap();
        let rows = output_rows(array.view().into_dyn(), 6).unwrap();
        assert_eq!(rows.as_ref(), rows_expected.as_slice());
    }

    #[test]
    fn test_output_rows_non_contiguous_view() {
        let data: Vec<f32> = (0..12).map(|v| v as f32).collect();
        let array = Array3::from_shape_vec((1, 2, 6).f(), data).unwrap();
        let rows = output_rows(array.view().into_dyn(), 6).unwrap();
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[1], array[[0, 0, 1]]);
        assert_eq!(rows[6], array[[0, 1, 0]]);
    }

    #[test]
    fn test_output_rows_class_count_mismatch() {
        let array = Array3::<f32>::zeros((1, 10, 7));
        let err = output_rows(array.view().into_dyn(), 6).unwrap_err();
        assert!(err.to_string().contains("does not match 6 values per row"));
    }

    #[test]
    fn test_output_rows_rejects_wrong_rank() {
        let array = ndarray::Array2::<f32>::zeros((2, 6));
        assert!(output_rows(array.view().into_dyn(), 6).is_err());
    }

    #[test]
    fn test_output_rows_empty() {
        let array = Array3::<f32>::zeros((1, 0, 6));
        let rows = output_rows(array.view().into_dyn(), 6).unwrap();
        assert!(rows.is_empty());
    }
}
