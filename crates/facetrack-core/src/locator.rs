//! Skin-tone region locator.
//!
//! Scans a centered square sampling window of an RGBA frame, aggregates the
//! skin-toned samples into a centroid and extents, and turns them into a
//! single padded bounding box with a match-count confidence.

use crate::classifier::is_skin_tone;
use crate::types::RegionCandidate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const BYTES_PER_PIXEL: usize = 4;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("malformed RGBA frame: expected {expected} bytes, got {actual}")]
    MalformedFrame { expected: usize, actual: usize },
    #[error("locator failed: {0}")]
    Failed(String),
}

/// Anything that can find a face-like region in an RGBA frame.
///
/// The skin-tone heuristic is the built-in strategy; hosts can plug in a
/// model-backed implementation without changing the tracker or renderer.
pub trait RegionLocator: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Locate at most one region in frame-pixel coordinates.
    ///
    /// Returns `Ok(None)` when nothing was found or the frame has no
    /// dimensions yet.
    fn locate(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<RegionCandidate>, LocateError>;
}

/// Tunables for [`SkinToneLocator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Window radius is `min(width, height) / window_divisor`.
    pub window_divisor: u32,
    /// Sample every Nth pixel on both axes.
    pub sample_step: u32,
    /// Fewer matches than this means no region.
    pub min_matches: u32,
    /// Match count at which confidence saturates to 1.0.
    pub saturation_matches: u32,
    /// Margin added around the matched extents, in pixels.
    pub padding: f32,
    /// Minimum box width and height, in pixels.
    pub min_size: f32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            window_divisor: 3,
            sample_step: 2,
            min_matches: 800,
            saturation_matches: 2000,
            padding: 25.0,
            min_size: 100.0,
        }
    }
}

/// Running sums over matched samples.
#[derive(Debug, Default)]
struct Accumulator {
    matches: u32,
    sum_x: u64,
    sum_y: u64,
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl Accumulator {
    fn add(&mut self, x: usize, y: usize) {
        if self.matches == 0 {
            self.min_x = x;
            self.max_x = x;
            self.min_y = y;
            self.max_y = y;
        } else {
            self.min_x = self.min_x.min(x);
            self.max_x = self.max_x.max(x);
            self.min_y = self.min_y.min(y);
            self.max_y = self.max_y.max(y);
        }
        self.matches += 1;
        self.sum_x += x as u64;
        self.sum_y += y as u64;
    }
}

/// Heuristic locator: largest skin-toned blob inside the sampling window.
#[derive(Debug, Clone, Default)]
pub struct SkinToneLocator {
    config: LocatorConfig,
}

impl SkinToneLocator {
    pub fn new(config: LocatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    fn scan(&self, rgba: &[u8], width: usize, height: usize) -> Accumulator {
        let divisor = self.config.window_divisor.max(1) as usize;
        let step = self.config.sample_step.max(1) as usize;
        let radius = width.min(height) / divisor;
        let (cx, cy) = (width / 2, height / 2);

        let x0 = cx.saturating_sub(radius);
        let x1 = (cx + radius).min(width);
        let y0 = cy.saturating_sub(radius);
        let y1 = (cy + radius).min(height);

        let mut acc = Accumulator::default();
        for y in (y0..y1).step_by(step) {
            let row = y * width * BYTES_PER_PIXEL;
            for x in (x0..x1).step_by(step) {
                let i = row + x * BYTES_PER_PIXEL;
                if is_skin_tone(rgba[i], rgba[i + 1], rgba[i + 2]) {
                    acc.add(x, y);
                }
            }
        }
        acc
    }
}

impl RegionLocator for SkinToneLocator {
    fn name(&self) -> &str {
        "skin-tone"
    }

    fn locate(
        &self,
        rgba: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Option<RegionCandidate>, LocateError> {
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let (w, h) = (width as usize, height as usize);
        let expected = w * h * BYTES_PER_PIXEL;
        if rgba.len() < expected {
            return Err(LocateError::MalformedFrame {
                expected,
                actual: rgba.len(),
            });
        }

        let acc = self.scan(rgba, w, h);
        if acc.matches < self.config.min_matches {
            tracing::trace!(matches = acc.matches, "skin-tone: below match threshold");
            return Ok(None);
        }

        let matches = acc.matches as f32;
        let centroid = (acc.sum_x as f32 / matches, acc.sum_y as f32 / matches);

        let (x, box_w) = pad_axis(
            acc.min_x as f32,
            acc.max_x as f32,
            self.config.padding,
            self.config.min_size,
            width as f32,
        );
        let (y, box_h) = pad_axis(
            acc.min_y as f32,
            acc.max_y as f32,
            self.config.padding,
            self.config.min_size,
            height as f32,
        );

        let saturation = self.config.saturation_matches.max(1) as f32;
        let confidence = (matches / saturation).min(1.0);

        tracing::debug!(
            matches = acc.matches,
            confidence,
            x,
            y,
            width = box_w,
            height = box_h,
            "skin-tone: region located"
        );

        Ok(Some(RegionCandidate {
            x,
            y,
            width: box_w,
            height: box_h,
            confidence,
            centroid,
        }))
    }
}

/// Pad an inclusive `[lo, hi]` extent, grow it symmetrically to `min_size`,
/// shift it back inside `[0, limit]` and clamp. Returns `(start, length)`.
///
/// The result is only shorter than `min_size` when `limit` is.
fn pad_axis(lo: f32, hi: f32, padding: f32, min_size: f32, limit: f32) -> (f32, f32) {
    let mut start = lo - padding;
    let mut end = hi + 1.0 + padding;

    let len = end - start;
    if len < min_size {
        let grow = (min_size - len) / 2.0;
        start -= grow;
        end += grow;
    }

    if start < 0.0 {
        end -= start;
        start = 0.0;
    }
    if end > limit {
        start -= end - limit;
        end = limit;
    }

    let start = start.max(0.0);
    (start, (end - start).max(0.0))
}
