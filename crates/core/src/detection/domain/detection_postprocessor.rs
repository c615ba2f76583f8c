//! Turns the raw output tensor of one forward pass into labeled boxes.
//!
//! Each output row is `[cx, cy, w, h, objectness, score_0 .. score_{C-1}]`
//! in model input pixels. Rows are filtered by objectness and best class
//! score, decoded into source-image corner boxes, deduplicated with
//! class-agnostic NMS, then labeled and colored.

use std::sync::Arc;

use thiserror::Error;

use crate::detection::domain::class_label_table::ClassLabelTable;
use crate::detection::domain::color_picker::ColorPicker;
use crate::detection::domain::detection::Detection;
use crate::detection::domain::non_max_suppression::non_max_suppression;
use crate::detection::domain::postprocess_config::PostprocessConfig;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{BOX_VALUES, CLASS_SCORES_OFFSET, OBJECTNESS_OFFSET};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PostprocessError {
    #[error("class label table is empty")]
    EmptyLabelTable,
    #[error("row stride {stride} does not match {labels} labels (expected {expected})")]
    ClassCountMismatch {
        stride: usize,
        expected: usize,
        labels: usize,
    },
    #[error("raw output length {len} is not a multiple of row stride {stride}")]
    StrideMismatch { len: usize, stride: usize },
}

/// Maps model input coordinates to source-image coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScaleFactors {
    pub x: f32,
    pub y: f32,
}

impl ScaleFactors {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// `preprocessed / model_input` along each axis, where `preprocessed`
    /// is the (possibly letterboxed) image that was resized into the model.
    pub fn from_sizes(preprocessed: (u32, u32), model_input: (u32, u32)) -> Self {
        Self {
            x: preprocessed.0 as f32 / model_input.0 as f32,
            y: preprocessed.1 as f32 / model_input.1 as f32,
        }
    }
}

impl Default for ScaleFactors {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// Borrowed view of one output row.
struct RawCandidate<'a> {
    cx: f32,
    cy: f32,
    w: f32,
    h: f32,
    objectness: f32,
    class_scores: &'a [f32],
}

impl<'a> RawCandidate<'a> {
    fn from_row(row: &'a [f32]) -> Self {
        Self {
            cx: row[0],
            cy: row[1],
            w: row[2],
            h: row[3],
            objectness: row[OBJECTNESS_OFFSET],
            class_scores: &row[CLASS_SCORES_OFFSET..],
        }
    }

    /// Highest class score and its index; the first index wins ties.
    fn best_class(&self) -> (usize, f32) {
        self.class_scores
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (i, score)| {
                if score > best.1 {
                    (i, score)
                } else {
                    best
                }
            })
    }

    fn decode(&self, scale: ScaleFactors) -> BoundingBox {
        BoundingBox::from_center(self.cx, self.cy, self.w, self.h, scale.x, scale.y)
    }
}

/// Parallel lists of rows that passed both threshold filters.
#[derive(Default)]
struct Candidates {
    class_ids: Vec<usize>,
    confidences: Vec<f32>,
    boxes: Vec<BoundingBox>,
}

fn collect_candidates(
    raw: &[f32],
    stride: usize,
    config: &PostprocessConfig,
    scale: ScaleFactors,
) -> Candidates {
    let mut candidates = Candidates::default();
    for row in raw.chunks_exact(stride) {
        let candidate = RawCandidate::from_row(row);
        if candidate.objectness.is_nan() || candidate.objectness < config.confidence_threshold {
            continue;
        }
        let (class_id, max_score) = candidate.best_class();
        if max_score <= config.score_threshold {
            continue;
        }
        candidates.class_ids.push(class_id);
        candidates.confidences.push(candidate.objectness);
        candidates.boxes.push(candidate.decode(scale));
    }
    candidates
}

pub struct DetectionPostprocessor {
    config: PostprocessConfig,
    labels: Arc<ClassLabelTable>,
    color_picker: Box<dyn ColorPicker>,
}

impl DetectionPostprocessor {
    pub fn new(
        config: PostprocessConfig,
        labels: Arc<ClassLabelTable>,
        color_picker: Box<dyn ColorPicker>,
    ) -> Result<Self, PostprocessError> {
        if labels.is_empty() {
            return Err(PostprocessError::EmptyLabelTable);
        }
        Ok(Self {
            config,
            labels,
            color_picker,
        })
    }

    pub fn config(&self) -> &PostprocessConfig {
        &self.config
    }

    pub fn labels(&self) -> &ClassLabelTable {
        &self.labels
    }

    /// Row stride the model must emit for this label table: 4 box values,
    /// objectness, then one score per class.
    pub fn expected_stride(&self) -> usize {
        BOX_VALUES + 1 + self.labels.len()
    }

    /// Decodes `raw` (rows of `stride` floats) with the configured thresholds.
    ///
    /// `stride` must equal [`expected_stride`](Self::expected_stride), so
    /// every class id the rows can produce has a label.
    pub fn process(
        &mut self,
        raw: &[f32],
        stride: usize,
        scale: ScaleFactors,
    ) -> Result<Vec<Detection>, PostprocessError> {
        let config = self.config;
        self.process_with(raw, stride, scale, &config)
    }

    /// Same as [`process`](Self::process) with thresholds overridden for this
    /// call only.
    pub fn process_with(
        &mut self,
        raw: &[f32],
        stride: usize,
        scale: ScaleFactors,
        config: &PostprocessConfig,
    ) -> Result<Vec<Detection>, PostprocessError> {
        let expected = self.expected_stride();
        if stride != expected {
            return Err(PostprocessError::ClassCountMismatch {
                stride,
                expected,
                labels: self.labels.len(),
            });
        }
        if raw.len() % stride != 0 {
            return Err(PostprocessError::StrideMismatch {
                len: raw.len(),
                stride,
            });
        }

        let candidates = collect_candidates(raw, stride, config, scale);
        let kept = non_max_suppression(
            &candidates.boxes,
            &candidates.confidences,
            config.nms_floor_value(),
            config.nms_threshold,
        );
        log::debug!(
            "{} rows, {} candidates, {} after NMS",
            raw.len() / stride,
            candidates.boxes.len(),
            kept.len()
        );

        if kept.is_empty() {
            log::info!("No detections after NMS");
            return Ok(Vec::new());
        }

        let mut detections = Vec::with_capacity(kept.len());
        for idx in kept {
            let class_id = candidates.class_ids[idx];
            // class_id < labels.len() once the stride matches
            let class_name = self.labels.get(class_id).unwrap_or_default().to_string();
            detections.push(Detection {
                class_id,
                confidence: candidates.confidences[idx],
                class_name,
                bbox: candidates.boxes[idx],
                color: self.color_picker.pick(class_id),
            });
        }
        Ok(detections)
    }
}
