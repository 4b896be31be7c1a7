//! Last-detection bookkeeping and the quality snapshot handed to hosts.

use facetrack_core::{PositionLabel, QualityAssessment, RegionCandidate, SizeLabel};
use serde::Serialize;
use std::time::Duration;
use tokio::time::Instant;

/// Tri-state detection answer.
///
/// `Yes` and `No` both come from a detection younger than the staleness
/// window; `No` means the newest scan lost it. Anything older is `Unknown`,
/// never a negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Detected {
    Yes,
    No,
    Unknown,
}

/// Point-in-time view of the tracker's latest detection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualitySnapshot {
    pub detected: Detected,
    pub confidence: f32,
    pub size_label: Option<SizeLabel>,
    pub position_label: Option<PositionLabel>,
    pub overall_score: Option<f32>,
    /// Region in display coordinates.
    pub region: Option<RegionCandidate>,
    /// Age of the detection this snapshot is based on.
    pub age_ms: Option<u64>,
}

impl QualitySnapshot {
    pub fn unknown() -> Self {
        Self {
            detected: Detected::Unknown,
            confidence: 0.0,
            size_label: None,
            position_label: None,
            overall_score: None,
            region: None,
            age_ms: None,
        }
    }

    /// Permissive capture gate: only a fresh, low-confidence detection
    /// blocks capture. A lost or unknown region never does.
    pub fn allows_capture(&self, min_confidence: f32) -> bool {
        match self.detected {
            Detected::Yes => self.confidence >= min_confidence,
            Detected::No | Detected::Unknown => true,
        }
    }
}

#[derive(Debug, Clone)]
struct LastDetection {
    region: RegionCandidate,
    assessment: QualityAssessment,
    at: Instant,
}

/// Per-session detection state, owned by the tracker.
#[derive(Debug, Default)]
pub(crate) struct DetectionState {
    last: Option<LastDetection>,
    last_miss: Option<Instant>,
}

impl DetectionState {
    pub(crate) fn record_hit(
        &mut self,
        region: RegionCandidate,
        assessment: QualityAssessment,
        at: Instant,
    ) {
        self.last = Some(LastDetection {
            region,
            assessment,
            at,
        });
    }

    /// A full scan completed and found nothing. Only affects the answer
    /// while the last hit is still fresh.
    pub(crate) fn record_miss(&mut self, at: Instant) {
        self.last_miss = Some(at);
    }

    pub(crate) fn clear(&mut self) {
        self.last = None;
        self.last_miss = None;
    }

    pub(crate) fn snapshot(&self, now: Instant, staleness: Duration) -> QualitySnapshot {
        let Some(last) = &self.last else {
            return QualitySnapshot::unknown();
        };
        let age = now.saturating_duration_since(last.at);
        if age > staleness {
            return QualitySnapshot::unknown();
        }

        let lost = self.last_miss.is_some_and(|miss| miss > last.at);
        QualitySnapshot {
            detected: if lost { Detected::No } else { Detected::Yes },
            confidence: last.assessment.confidence,
            size_label: Some(last.assessment.size_label),
            position_label: Some(last.assessment.position_label),
            overall_score: Some(last.assessment.overall_score),
            region: Some(last.region),
            age_ms: Some(age.as_millis() as u64),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(500);

    fn hit() -> (RegionCandidate, QualityAssessment) {
        let region = RegionCandidate {
            x: 195.0,
            y: 141.0,
            width: 249.0,
            height: 199.0,
            confidence: 1.0,
            centroid: (319.0, 240.0),
        };
        (region, facetrack_core::assess(&region, 640.0, 480.0))
    }

    #[test]
    fn test_fresh_detection_is_yes() {
        let t0 = Instant::now();
        let (region, assessment) = hit();
        let mut state = DetectionState::default();
        state.record_hit(region, assessment, t0);

        let snap = state.snapshot(t0, WINDOW);
        assert_eq!(snap.detected, Detected::Yes);
        assert_eq!(snap.confidence, 1.0);
        assert_eq!(snap.position_label, Some(PositionLabel::Centered));
        assert_eq!(snap.age_ms, Some(0));
    }

    #[test]
    fn test_stale_detection_is_unknown_not_no() {
        let t0 = Instant::now();
        let (region, assessment) = hit();
        let mut state = DetectionState::default();
        state.record_hit(region, assessment, t0);

        assert_eq!(state.snapshot(t0 + WINDOW, WINDOW).detected, Detected::Yes);
        let snap = state.snapshot(t0 + WINDOW + Duration::from_millis(1), WINDOW);
        assert_eq!(snap.detected, Detected::Unknown);
        assert!(snap.region.is_none());
    }

    #[test]
    fn test_misses_without_a_hit_are_unknown() {
        let t0 = Instant::now();
        let mut state = DetectionState::default();
        state.record_miss(t0);
        let snap = state.snapshot(t0 + Duration::from_millis(100), WINDOW);
        assert_eq!(snap.detected, Detected::Unknown);
        assert!(snap.allows_capture(0.9));
    }

    #[test]
    fn test_miss_after_fresh_hit_is_no() {
        let t0 = Instant::now();
        let (region, assessment) = hit();
        let mut state = DetectionState::default();
        state.record_hit(region, assessment, t0);
        state.record_miss(t0 + Duration::from_millis(100));

        let snap = state.snapshot(t0 + Duration::from_millis(200), WINDOW);
        assert_eq!(snap.detected, Detected::No);
        assert!(snap.allows_capture(0.9));

        // A later hit takes over again.
        state.record_hit(region, assessment, t0 + Duration::from_millis(300));
        assert_eq!(state.snapshot(t0 + Duration::from_millis(350), WINDOW).detected, Detected::Yes);
    }

    #[test]
    fn test_stale_hit_with_recent_misses_is_unknown() {
        let t0 = Instant::now();
        let (region, assessment) = hit();
        let mut state = DetectionState::default();
        state.record_hit(region, assessment, t0);
        state.record_miss(t0 + Duration::from_millis(500));

        let snap = state.snapshot(t0 + Duration::from_millis(550), WINDOW);
        assert_eq!(snap.detected, Detected::Unknown);
        assert!(snap.allows_capture(0.0));
    }

    #[test]
    fn test_clear_forgets_everything() {
        let t0 = Instant::now();
        let (region, assessment) = hit();
        let mut state = DetectionState::default();
        state.record_hit(region, assessment, t0);
        state.record_miss(t0);
        state.clear();
        assert_eq!(state.snapshot(t0, WINDOW), QualitySnapshot::unknown());
    }

    #[test]
    fn test_capture_gate_is_permissive() {
        assert!(QualitySnapshot::unknown().allows_capture(0.8));

        let t0 = Instant::now();
        let (region, assessment) = hit();
        let mut state = DetectionState::default();
        state.record_hit(region, assessment, t0);
        let snap = state.snapshot(t0, WINDOW);
        assert!(snap.allows_capture(0.8));

        let weak = QualitySnapshot {
            detected: Detected::Yes,
            confidence: 0.5,
            ..QualitySnapshot::unknown()
        };
        assert!(!weak.allows_capture(0.8));
    }

    #[test]
    fn test_snapshot_serializes_lowercase_state() {
        let json = serde_json::to_value(QualitySnapshot::unknown()).unwrap();
        assert_eq!(json["detected"], "unknown");
        assert!(json["region"].is_null());
    }
}
