//! In-memory overlay surface backed by an RGBA image.
//!
//! Shapes are rasterized with `imageproc`. Text is not typeset here; it is
//! kept as positioned [`TextLabel`]s for the host to draw with its own fonts.

use crate::render::{Canvas, OverlaySurface, Rect, RenderError};
use image::{Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_filled_rect_mut, draw_hollow_rect_mut, draw_line_segment_mut,
};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// A text annotation placed on the overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct TextLabel {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub color: Rgba<u8>,
}

/// Transparent RGBA overlay the size of the video frame.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    image: RgbaImage,
    labels: Vec<TextLabel>,
    display: (u32, u32),
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, TRANSPARENT),
            labels: Vec::new(),
            display: (width, height),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn labels(&self) -> &[TextLabel] {
        &self.labels
    }

    /// Size the overlay is shown at, which may differ from its pixel size.
    pub fn display_size(&self) -> (u32, u32) {
        self.display
    }

    /// True if nothing has been drawn since the last clear.
    pub fn is_blank(&self) -> bool {
        self.labels.is_empty() && self.image.pixels().all(|p| p[3] == 0)
    }

    /// Alpha-blend the overlay onto `frame`. Pixels outside either image
    /// are skipped.
    pub fn compose_onto(&self, frame: &mut RgbaImage) {
        let w = self.image.width().min(frame.width());
        let h = self.image.height().min(frame.height());
        for y in 0..h {
            for x in 0..w {
                let over = self.image.get_pixel(x, y);
                let alpha = over[3] as u32;
                if alpha == 0 {
                    continue;
                }
                let under = frame.get_pixel_mut(x, y);
                for c in 0..3 {
                    let blended = (over[c] as u32 * alpha + under[c] as u32 * (255 - alpha)) / 255;
                    under[c] = blended as u8;
                }
                under[3] = under[3].max(over[3]);
            }
        }
    }

    fn has_area(&self) -> bool {
        self.image.width() > 0 && self.image.height() > 0
    }
}

impl Canvas for RasterCanvas {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn clear(&mut self) {
        for p in self.image.pixels_mut() {
            *p = TRANSPARENT;
        }
        self.labels.clear();
    }

    fn stroke_rect(&mut self, rect: Rect, color: Rgba<u8>, thickness: u32) {
        if !self.has_area() {
            return;
        }
        for i in 0..thickness.max(1) {
            let inset = i as f32;
            if let Some(r) = to_pixel_rect(Rect {
                x: rect.x + inset,
                y: rect.y + inset,
                width: rect.width - 2.0 * inset,
                height: rect.height - 2.0 * inset,
            }) {
                draw_hollow_rect_mut(&mut self.image, r, color);
            }
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>) {
        if !self.has_area() {
            return;
        }
        if let Some(r) = to_pixel_rect(rect) {
            draw_filled_rect_mut(&mut self.image, r, color);
        }
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), color: Rgba<u8>, thickness: u32) {
        if !self.has_area() {
            return;
        }
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt();
        let (nx, ny) = if len > 0.0 { (-dy / len, dx / len) } else { (0.0, 0.0) };

        let thickness = thickness.max(1);
        for i in 0..thickness {
            let offset = i as f32 - (thickness - 1) as f32 / 2.0;
            let (ox, oy) = (nx * offset, ny * offset);
            draw_line_segment_mut(
                &mut self.image,
                (from.0 + ox, from.1 + oy),
                (to.0 + ox, to.1 + oy),
                color,
            );
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32, color: Rgba<u8>) {
        if !self.has_area() {
            return;
        }
        draw_filled_circle_mut(
            &mut self.image,
            (center.0.round() as i32, center.1.round() as i32),
            radius.round().max(1.0) as i32,
            color,
        );
    }

    fn text(&mut self, at: (f32, f32), text: &str, color: Rgba<u8>) {
        self.labels.push(TextLabel {
            x: at.0,
            y: at.1,
            text: text.to_string(),
            color,
        });
    }
}

impl OverlaySurface for RasterCanvas {
    fn resize(&mut self, width: u32, height: u32, display: (u32, u32)) {
        if self.image.dimensions() != (width, height) {
            self.image = RgbaImage::from_pixel(width, height, TRANSPARENT);
        }
        self.labels.clear();
        self.display = display;
    }

    fn context(&mut self) -> Result<&mut dyn Canvas, RenderError> {
        Ok(self as &mut dyn Canvas)
    }
}

/// Round to whole pixels; `None` for empty rectangles.
fn to_pixel_rect(rect: Rect) -> Option<imageproc::rect::Rect> {
    let w = rect.width.round();
    let h = rect.height.round();
    if w < 1.0 || h < 1.0 {
        return None;
    }
    Some(imageproc::rect::Rect::at(rect.x.round() as i32, rect.y.round() as i32).of_size(w as u32, h as u32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{OverlayRenderer, GREEN};
    use crate::types::RegionCandidate;
    use std::time::Duration;

    #[test]
    fn test_new_canvas_is_blank() {
        let canvas = RasterCanvas::new(64, 48);
        assert!(canvas.is_blank());
        assert_eq!(canvas.size(), (64, 48));
    }

    #[test]
    fn test_stroke_rect_draws_outline_only() {
        let mut canvas = RasterCanvas::new(64, 64);
        canvas.stroke_rect(Rect { x: 10.0, y: 10.0, width: 20.0, height: 20.0 }, GREEN, 1);
        assert_eq!(*canvas.image().get_pixel(10, 10), GREEN);
        assert_eq!(*canvas.image().get_pixel(29, 20), GREEN);
        assert_eq!(canvas.image().get_pixel(20, 20)[3], 0);
    }

    #[test]
    fn test_clear_erases_pixels_and_labels() {
        let mut canvas = RasterCanvas::new(32, 32);
        canvas.fill_rect(Rect { x: 0.0, y: 0.0, width: 8.0, height: 8.0 }, GREEN);
        canvas.text((1.0, 1.0), "hello", GREEN);
        assert!(!canvas.is_blank());
        canvas.clear();
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_degenerate_shapes_are_ignored() {
        let mut canvas = RasterCanvas::new(32, 32);
        canvas.fill_rect(Rect { x: 4.0, y: 4.0, width: 0.2, height: 10.0 }, GREEN);
        canvas.stroke_rect(Rect { x: 4.0, y: 4.0, width: 10.0, height: 0.0 }, GREEN, 3);
        assert!(canvas.is_blank());

        let mut empty = RasterCanvas::new(0, 0);
        empty.line((0.0, 0.0), (10.0, 10.0), GREEN, 2);
        empty.fill_circle((1.0, 1.0), 3.0, GREEN);
        assert!(empty.is_blank());
    }

    #[test]
    fn test_resize_reallocates_and_records_display() {
        let mut canvas = RasterCanvas::new(8, 8);
        canvas.fill_rect(Rect { x: 0.0, y: 0.0, width: 8.0, height: 8.0 }, GREEN);
        canvas.resize(640, 480, (1280, 960));
        assert_eq!(canvas.size(), (640, 480));
        assert_eq!(canvas.display_size(), (1280, 960));
        assert!(canvas.is_blank());
    }

    #[test]
    fn test_render_region_onto_raster() {
        let mut canvas = RasterCanvas::new(640, 480);
        let region = RegionCandidate {
            x: 200.0,
            y: 150.0,
            width: 240.0,
            height: 180.0,
            confidence: 0.95,
            centroid: (320.0, 240.0),
        };
        OverlayRenderer::new().render(&mut canvas, (640, 480), Some(&region), None, Duration::ZERO);
        assert_eq!(*canvas.image().get_pixel(200, 150), GREEN);
        assert_eq!(canvas.labels()[0].text, "Face 95%");
    }

    #[test]
    fn test_compose_blends_only_drawn_pixels() {
        let mut overlay = RasterCanvas::new(4, 4);
        overlay.fill_rect(Rect { x: 0.0, y: 0.0, width: 2.0, height: 2.0 }, Rgba([255, 0, 0, 255]));
        let mut frame = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 255, 255]));
        overlay.compose_onto(&mut frame);
        assert_eq!(*frame.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
        assert_eq!(*frame.get_pixel(3, 3), Rgba([0, 0, 255, 255]));
    }
}
