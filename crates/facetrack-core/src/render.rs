//! Overlay rendering: bounding box, corner brackets, landmark dots and a
//! quality panel when a region is present, an animated "searching" ring
//! otherwise.
//!
//! The renderer only draws; it never runs detection. Drawing goes through
//! the [`Canvas`] trait so hosts can back it with any 2D surface.

use crate::types::{QualityAssessment, RegionCandidate};
use image::Rgba;
use std::f32::consts::TAU;
use std::time::Duration;
use thiserror::Error;

pub const GREEN: Rgba<u8> = Rgba([0, 220, 90, 255]);
pub const YELLOW: Rgba<u8> = Rgba([255, 210, 0, 255]);
pub const ORANGE: Rgba<u8> = Rgba([255, 140, 0, 255]);
pub const LANDMARK: Rgba<u8> = Rgba([0, 200, 255, 255]);
pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const PANEL: Rgba<u8> = Rgba([0, 0, 0, 160]);

const SEARCH_DASHES: usize = 12;
const SEARCH_PULSE_PERIOD_SECS: f32 = 1.5;
/// Radians per second.
const SEARCH_SPIN_RATE: f32 = TAU / 4.0;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("drawing context unavailable: {0}")]
    ContextUnavailable(String),
}

/// Axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Minimal 2D drawing context.
pub trait Canvas {
    /// Pixel size of the drawing surface.
    fn size(&self) -> (u32, u32);
    /// Erase everything drawn so far.
    fn clear(&mut self);
    fn stroke_rect(&mut self, rect: Rect, color: Rgba<u8>, thickness: u32);
    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>);
    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba<u8>, thickness: u32);
    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba<u8>);
    fn text(&mut self, at: (f32, f32), text: &str, color: Rgba<u8>);
}

/// A surface the tracker owns for one session, e.g. a canvas element laid
/// over the video.
pub trait OverlaySurface: Send {
    /// Match the frame's pixel size and the size it is displayed at.
    fn resize(&mut self, width: u32, height: u32, display: (u32, u32));

    /// Borrow the drawing context. May fail if the surface is gone.
    fn context(&mut self) -> Result<&mut dyn Canvas, RenderError>;
}

/// Box color for a confidence value.
pub fn confidence_color(confidence: f32) -> Rgba<u8> {
    if confidence >= 0.8 {
        GREEN
    } else if confidence >= 0.6 {
        YELLOW
    } else {
        ORANGE
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer;

impl OverlayRenderer {
    pub fn new() -> Self {
        Self
    }

    /// Redraw the overlay for one tick.
    ///
    /// `frame_size` is the pixel size the region was located in; it is
    /// scaled to the canvas. `elapsed` is wall-clock time since tracking
    /// started and drives the searching animation.
    pub fn render(
        &self,
        canvas: &mut dyn Canvas,
        frame_size: (u32, u32),
        region: Option<&RegionCandidate>,
        assessment: Option<&QualityAssessment>,
        elapsed: Duration,
    ) {
        canvas.clear();

        match region {
            Some(region) => {
                let (cw, ch) = canvas.size();
                let sx = cw as f32 / frame_size.0.max(1) as f32;
                let sy = ch as f32 / frame_size.1.max(1) as f32;
                let region = region.scaled(sx, sy);

                draw_region(canvas, &region);
                if let Some(assessment) = assessment {
                    draw_quality_panel(canvas, assessment);
                }
            }
            None => draw_searching(canvas, elapsed),
        }
    }
}

fn draw_region(canvas: &mut dyn Canvas, region: &RegionCandidate) {
    let color = confidence_color(region.confidence);
    let rect = Rect {
        x: region.x,
        y: region.y,
        width: region.width,
        height: region.height,
    };
    canvas.stroke_rect(rect, color, 2);

    // L-shaped brackets
    let len = region.width.min(region.height) * 0.2;
    let (l, t) = (region.x, region.y);
    let (r, b) = (region.x + region.width, region.y + region.height);
    for &((cx, cy), (dx, dy)) in &[
        ((l, t), (1.0, 1.0)),
        ((r, t), (-1.0, 1.0)),
        ((l, b), (1.0, -1.0)),
        ((r, b), (-1.0, -1.0)),
    ] {
        canvas.line((cx, cy), (cx + dx * len, cy), color, 4);
        canvas.line((cx, cy), (cx, cy + dy * len), color, 4);
    }

    // Decorative only: fixed offsets from the box center.
    let (cx, cy) = region.center();
    let (w, h) = (region.width, region.height);
    let dot = (w.min(h) * 0.025).max(2.0);
    for &(ox, oy) in &[(-0.18, -0.12), (0.18, -0.12), (0.0, 0.05), (0.0, 0.22)] {
        canvas.fill_circle((cx + ox * w, cy + oy * h), dot, LANDMARK);
    }

    let percent = (region.confidence * 100.0).round() as u32;
    canvas.text(
        (region.x, (region.y - 18.0).max(0.0)),
        &format!("Face {percent}%"),
        color,
    );
}

fn draw_quality_panel(canvas: &mut dyn Canvas, assessment: &QualityAssessment) {
    let panel = Rect {
        x: 10.0,
        y: 10.0,
        width: 190.0,
        height: 84.0,
    };
    canvas.fill_rect(panel, PANEL);

    let lines = [
        format!("Size: {}", assessment.size_label.as_str()),
        format!("Position: {}", assessment.position_label.as_str()),
        format!("Confidence: {}%", (assessment.confidence * 100.0).round() as u32),
        format!("Overall: {}%", (assessment.overall_score * 100.0).round() as u32),
    ];
    for (i, line) in lines.iter().enumerate() {
        canvas.text((panel.x + 8.0, panel.y + 8.0 + i as f32 * 18.0), line, WHITE);
    }
}

/// Radius scale and rotation of the searching ring at `elapsed`.
pub fn searching_phase(elapsed: Duration) -> (f32, f32) {
    let t = elapsed.as_secs_f32();
    let pulse = 1.0 + 0.08 * (TAU * t / SEARCH_PULSE_PERIOD_SECS).sin();
    let rotation = (t * SEARCH_SPIN_RATE).rem_euclid(TAU);
    (pulse, rotation)
}

fn draw_searching(canvas: &mut dyn Canvas, elapsed: Duration) {
    let (w, h) = canvas.size();
    if w == 0 || h == 0 {
        return;
    }
    let (w, h) = (w as f32, h as f32);
    let center = (w / 2.0, h / 2.0);
    let (pulse, rotation) = searching_phase(elapsed);
    let radius = w.min(h) * 0.25 * pulse;

    let slot = TAU / SEARCH_DASHES as f32;
    for i in 0..SEARCH_DASHES {
        let start = rotation + i as f32 * slot;
        let end = start + slot * 0.6;
        // Each dash as a short polyline along the arc.
        let mut prev = point_on_circle(center, radius, start);
        for step in 1..=4 {
            let angle = start + (end - start) * step as f32 / 4.0;
            let next = point_on_circle(center, radius, angle);
            canvas.line(prev, next, WHITE, 2);
            prev = next;
        }
    }

    canvas.text(
        (center.0 - 80.0, center.1 + radius + 16.0),
        "Searching for face...",
        WHITE,
    );
}

fn point_on_circle(center: (f32, f32), radius: f32, angle: f32) -> (f32, f32) {
    (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
}
