use serde::{Deserialize, Serialize};

/// A face-like region located in one frame, in frame-pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionCandidate {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    /// Match-count derived confidence in [0, 1].
    pub confidence: f32,
    /// Mean position of the matched samples.
    pub centroid: (f32, f32),
}

impl RegionCandidate {
    /// Center of the bounding box (not the centroid).
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Scale every coordinate by independent x/y factors.
    pub fn scaled(&self, sx: f32, sy: f32) -> Self {
        Self {
            x: self.x * sx,
            y: self.y * sy,
            width: self.width * sx,
            height: self.height * sy,
            confidence: self.confidence,
            centroid: (self.centroid.0 * sx, self.centroid.1 * sy),
        }
    }
}

/// How well the region's size fits the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeLabel {
    Good,
    Acceptable,
    TooSmall,
    TooLarge,
}

impl SizeLabel {
    pub fn score(self) -> f32 {
        match self {
            SizeLabel::Good => 1.0,
            SizeLabel::Acceptable => 0.7,
            SizeLabel::TooSmall | SizeLabel::TooLarge => 0.3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SizeLabel::Good => "good",
            SizeLabel::Acceptable => "acceptable",
            SizeLabel::TooSmall => "too small",
            SizeLabel::TooLarge => "too large",
        }
    }
}

/// How far the region sits from the canvas center.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionLabel {
    Centered,
    NearCenter,
    OffCenter,
}

impl PositionLabel {
    pub fn score(self) -> f32 {
        match self {
            PositionLabel::Centered => 1.0,
            PositionLabel::NearCenter => 0.7,
            PositionLabel::OffCenter => 0.4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PositionLabel::Centered => "centered",
            PositionLabel::NearCenter => "near center",
            PositionLabel::OffCenter => "off center",
        }
    }
}

/// Derived quality of a region relative to the canvas. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub size_label: SizeLabel,
    pub position_label: PositionLabel,
    pub confidence: f32,
    /// Weighted combination of confidence, size fit and centering, in [0, 1].
    pub overall_score: f32,
}
