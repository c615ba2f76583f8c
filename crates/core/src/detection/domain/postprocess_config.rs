use crate::shared::constants::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_NMS_THRESHOLD, DEFAULT_SCORE_THRESHOLD,
};

/// Which threshold NMS uses as its minimum candidate score.
///
/// Candidates are ranked by objectness, but `ClassScore` (the default)
/// drops any whose objectness is at or below the class-score threshold.
/// `Confidence` applies the objectness threshold instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NmsScoreFloor {
    #[default]
    ClassScore,
    Confidence,
}

impl std::str::FromStr for NmsScoreFloor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "class-score" => Ok(Self::ClassScore),
            "confidence" => Ok(Self::Confidence),
            other => Err(format!(
                "NMS floor must be 'class-score' or 'confidence', got '{other}'"
            )),
        }
    }
}

/// Thresholds for decoding and suppressing raw detector rows.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PostprocessConfig {
    /// Rows with objectness below this are skipped.
    pub confidence_threshold: f32,
    /// Rows whose best class score is at or below this are skipped.
    pub score_threshold: f32,
    /// Boxes overlapping a kept box by more than this IoU are suppressed.
    pub nms_threshold: f32,
    pub nms_score_floor: NmsScoreFloor,
}

impl PostprocessConfig {
    pub fn nms_floor_value(&self) -> f32 {
        match self.nms_score_floor {
            NmsScoreFloor::ClassScore => self.score_threshold,
            NmsScoreFloor::Confidence => self.confidence_threshold,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("confidence", self.confidence_threshold),
            ("score", self.score_threshold),
            ("NMS", self.nms_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(format!(
                    "{name} threshold must be between 0.0 and 1.0, got {value}"
                ));
            }
        }
        Ok(())
    }
}

impl Default for PostprocessConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            nms_threshold: DEFAULT_NMS_THRESHOLD,
            nms_score_floor: NmsScoreFloor::ClassScore,
        }
    }
}
