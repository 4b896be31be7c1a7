//! facetrack-core: Heuristic face-region locator and quality overlay.
//!
//! Classifies pixels by skin tone, aggregates matches in a centered sampling
//! window into one region candidate, scores its size and centering, and
//! renders the result onto an overlay canvas.

pub mod classifier;
pub mod locator;
pub mod quality;
pub mod raster;
pub mod render;
pub mod types;

pub use classifier::{is_skin_tone, SkinRules};
pub use locator::{LocateError, LocatorConfig, RegionLocator, SkinToneLocator};
pub use quality::{assess, assess_with, ScoringConfig};
pub use raster::{RasterCanvas, TextLabel};
pub use render::{Canvas, OverlayRenderer, OverlaySurface, Rect, RenderError};
pub use types::{PositionLabel, QualityAssessment, RegionCandidate, SizeLabel};
