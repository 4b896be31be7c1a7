//! Size and position scoring of a located region against the canvas.

use crate::types::{PositionLabel, QualityAssessment, RegionCandidate, SizeLabel};
use serde::{Deserialize, Serialize};

const CONFIDENCE_WEIGHT: f32 = 0.4;
const SIZE_WEIGHT: f32 = 0.3;
const POSITION_WEIGHT: f32 = 0.3;

/// Tunables for [`assess_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Ideal region side as a fraction of the shorter canvas side.
    pub ideal_fraction: f32,
    /// Centered when the center distance is below this fraction of canvas width.
    pub centered_fraction: f32,
    /// Near center when the center distance is below this fraction of canvas width.
    pub near_center_fraction: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            ideal_fraction: 0.3,
            centered_fraction: 0.1,
            near_center_fraction: 0.2,
        }
    }
}

/// Assess a region with the default scoring thresholds.
pub fn assess(region: &RegionCandidate, canvas_width: f32, canvas_height: f32) -> QualityAssessment {
    assess_with(&ScoringConfig::default(), region, canvas_width, canvas_height)
}

/// Assess a region's size fit and centering on a canvas of the given size.
pub fn assess_with(
    config: &ScoringConfig,
    region: &RegionCandidate,
    canvas_width: f32,
    canvas_height: f32,
) -> QualityAssessment {
    let size_label = size_label(config, region, canvas_width, canvas_height);
    let position_label = position_label(config, region, canvas_width, canvas_height);
    let confidence = region.confidence.clamp(0.0, 1.0);

    let overall_score = (confidence * CONFIDENCE_WEIGHT
        + size_label.score() * SIZE_WEIGHT
        + position_label.score() * POSITION_WEIGHT)
        .clamp(0.0, 1.0);

    QualityAssessment {
        size_label,
        position_label,
        confidence,
        overall_score,
    }
}

fn size_label(
    config: &ScoringConfig,
    region: &RegionCandidate,
    canvas_width: f32,
    canvas_height: f32,
) -> SizeLabel {
    let ideal = canvas_width.min(canvas_height) * config.ideal_fraction;
    if ideal <= 0.0 {
        return SizeLabel::TooLarge;
    }
    let ratio = region.width.min(region.height) / ideal;

    if ratio > 0.8 && ratio < 1.5 {
        SizeLabel::Good
    } else if ratio > 0.6 && ratio < 2.0 {
        SizeLabel::Acceptable
    } else if ratio <= 0.6 {
        SizeLabel::TooSmall
    } else {
        SizeLabel::TooLarge
    }
}

fn position_label(
    config: &ScoringConfig,
    region: &RegionCandidate,
    canvas_width: f32,
    canvas_height: f32,
) -> PositionLabel {
    let (rx, ry) = region.center();
    let dx = rx - canvas_width / 2.0;
    let dy = ry - canvas_height / 2.0;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < canvas_width * config.centered_fraction {
        PositionLabel::Centered
    } else if distance < canvas_width * config.near_center_fraction {
        PositionLabel::NearCenter
    } else {
        PositionLabel::OffCenter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_at(cx: f32, cy: f32, side: f32, confidence: f32) -> RegionCandidate {
        RegionCandidate {
            x: cx - side / 2.0,
            y: cy - side / 2.0,
            width: side,
            height: side,
            confidence,
            centroid: (cx, cy),
        }
    }

    #[test]
    fn test_ideal_centered_region() {
        // ideal side = 480 * 0.3 = 144
        let a = assess(&region_at(320.0, 240.0, 144.0, 1.0), 640.0, 480.0);
        assert_eq!(a.size_label, SizeLabel::Good);
        assert_eq!(a.position_label, PositionLabel::Centered);
        assert!((a.overall_score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_size_bands() {
        let label = |side: f32| assess(&region_at(320.0, 240.0, side, 1.0), 640.0, 480.0).size_label;
        assert_eq!(label(144.0 * 0.7), SizeLabel::Acceptable);
        assert_eq!(label(144.0 * 1.7), SizeLabel::Acceptable);
        assert_eq!(label(144.0 * 0.5), SizeLabel::TooSmall);
        assert_eq!(label(144.0 * 2.5), SizeLabel::TooLarge);
    }

    #[test]
    fn test_size_uses_shorter_side() {
        let mut region = region_at(320.0, 240.0, 144.0, 1.0);
        region.height = 40.0;
        assert_eq!(assess(&region, 640.0, 480.0).size_label, SizeLabel::TooSmall);
    }

    #[test]
    fn test_position_bands() {
        // Thresholds at 64px (centered) and 128px (near center).
        let label = |dx: f32| {
            assess(&region_at(320.0 + dx, 240.0, 144.0, 1.0), 640.0, 480.0).position_label
        };
        assert_eq!(label(63.0), PositionLabel::Centered);
        assert_eq!(label(64.0), PositionLabel::NearCenter);
        assert_eq!(label(127.0), PositionLabel::NearCenter);
        assert_eq!(label(200.0), PositionLabel::OffCenter);
    }

    #[test]
    fn test_diagonal_offset_uses_euclidean_distance() {
        // 50px right, 50px down → ~70.7px, past the 64px centered band.
        let a = assess(&region_at(370.0, 290.0, 144.0, 1.0), 640.0, 480.0);
        assert_eq!(a.position_label, PositionLabel::NearCenter);
    }

    #[test]
    fn test_overall_weights() {
        // confidence 0.5, acceptable size, off-center:
        // 0.5 * 0.4 + 0.7 * 0.3 + 0.4 * 0.3 = 0.53
        let a = assess(&region_at(600.0, 240.0, 144.0 * 0.7, 0.5), 640.0, 480.0);
        assert_eq!(a.size_label, SizeLabel::Acceptable);
        assert_eq!(a.position_label, PositionLabel::OffCenter);
        assert!((a.overall_score - 0.53).abs() < 1e-5, "{}", a.overall_score);
    }

    #[test]
    fn test_overall_saturates() {
        let a = assess(&region_at(320.0, 240.0, 144.0, 7.5), 640.0, 480.0);
        assert_eq!(a.confidence, 1.0);
        assert!(a.overall_score <= 1.0);

        let b = assess(&region_at(0.0, 0.0, 10.0, -3.0), 640.0, 480.0);
        assert_eq!(b.confidence, 0.0);
        assert!(b.overall_score >= 0.0);
    }

    #[test]
    fn test_zero_canvas_does_not_panic() {
        let a = assess(&region_at(0.0, 0.0, 10.0, 0.5), 0.0, 0.0);
        assert!((0.0..=1.0).contains(&a.overall_score));
    }
}
