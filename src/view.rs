// Pan/zoom coordinate transform
// Maps between image pixel coordinates and positions inside the viewport

use eframe::egui::{vec2, Pos2, Rect, Vec2};
use log::debug;

/// Smallest allowed zoom (screen points per image pixel)
pub const MIN_ZOOM: f32 = 0.01;

/// Largest allowed zoom
pub const MAX_ZOOM: f32 = 512.0;

/// One zoom level is a factor of 2^(1/10)
pub const DEFAULT_ZOOM_SENSITIVITY: f32 = 1.071_773_5;

/// Zooms within this many octaves of a power of two count as that power.
/// Only absorbs float error from `log2`/`powf`, so 1.9995 is still below 2.
const POWER_OF_TWO_SLACK: f32 = 1e-5;

/// Inclusive range of image pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRange {
    pub min_x: i64,
    pub min_y: i64,
    pub max_x: i64,
    pub max_y: i64,
}

impl PixelRange {
    pub fn xs(&self) -> std::ops::RangeInclusive<i64> {
        self.min_x..=self.max_x
    }

    pub fn ys(&self) -> std::ops::RangeInclusive<i64> {
        self.min_y..=self.max_y
    }

    pub fn count(&self) -> usize {
        ((self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)) as usize
    }
}

/// Viewport state for pan/zoom
///
/// Positions passed to and returned from this type are relative to the
/// top-left corner of the viewport, except for the `screen_*` methods which
/// add the viewport origin back.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewTransform {
    zoom: f32,
    offset: Vec2,
    viewport: Rect,
    image_size: Vec2,
    pixel_ratio: f32,
    zoom_sensitivity: f32,
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
            viewport: Rect::from_min_size(Pos2::ZERO, vec2(1200.0, 800.0)),
            image_size: Vec2::ZERO,
            pixel_ratio: 1.0,
            zoom_sensitivity: DEFAULT_ZOOM_SENSITIVITY,
        }
    }
}

impl ViewTransform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn viewport(&self) -> Rect {
        self.viewport
    }

    pub fn viewport_size(&self) -> Vec2 {
        self.viewport.size()
    }

    pub fn image_size(&self) -> Vec2 {
        self.image_size
    }

    pub fn pixel_ratio(&self) -> f32 {
        self.pixel_ratio
    }

    /// Update the viewport rectangle (called every frame with the central panel rect)
    pub fn set_viewport(&mut self, viewport: Rect) {
        self.viewport = viewport;
    }

    /// Update the image size in pixels (called when a new image loads)
    pub fn set_image_size(&mut self, width: u32, height: u32) {
        self.image_size = vec2(width as f32, height as f32);
    }

    /// Physical pixels per logical point
    pub fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio > 0.0 {
            self.pixel_ratio = ratio;
        }
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Zoom as seen in physical pixels
    pub fn real_zoom(&self) -> f32 {
        self.zoom * self.pixel_ratio
    }

    pub fn scaled_image_size(&self) -> Vec2 {
        self.zoom * self.image_size
    }

    /// Offset that centers the scaled image in the viewport
    pub fn center_offset(&self) -> Vec2 {
        (self.viewport_size() - self.scaled_image_size()) / 2.0
    }

    /// Image pixel coordinates of the given viewport position
    pub fn pixel_at_position(&self, position: Vec2) -> Vec2 {
        let image_pos = position - (self.offset + self.center_offset());
        image_pos / self.zoom
    }

    /// Viewport position of the given image pixel coordinates
    pub fn position_at_pixel(&self, pixel: Vec2) -> Vec2 {
        self.zoom * pixel + (self.offset + self.center_offset())
    }

    /// Screen position of the given image pixel coordinates
    pub fn screen_position_at_pixel(&self, pixel: Vec2) -> Pos2 {
        self.viewport.min + self.position_at_pixel(pixel)
    }

    /// Screen rectangle covered by the image
    pub fn image_rect(&self) -> Rect {
        Rect::from_min_max(
            self.screen_position_at_pixel(Vec2::ZERO),
            self.screen_position_at_pixel(self.image_size),
        )
    }

    /// Move the image so that `pixel` lands on `position`.
    ///
    /// The offset is clamped so the image can never leave the viewport entirely.
    pub fn set_pixel_at_position(&mut self, position: Vec2, pixel: Vec2) {
        let offset = position - pixel * self.zoom;
        let offset = offset
            .min(self.viewport_size())
            .max(-self.scaled_image_size());
        self.offset = offset - self.center_offset();
    }

    /// Centers the image without affecting the zoom
    pub fn center(&mut self) {
        self.offset = Vec2::ZERO;
    }

    /// Centers and scales the image so that it fits inside the viewport
    pub fn fit(&mut self) {
        if self.image_size.x <= 0.0 || self.image_size.y <= 0.0 {
            return;
        }
        let scale = self.viewport_size() / self.image_size;
        let zoom = scale.min_elem();
        if zoom <= 0.0 {
            return;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        self.center();
        debug!("Fit: zoom {:.4}", self.zoom);
    }

    /// Zoom by `amount` levels, keeping the pixel under `focus` in place
    pub fn zoom_by(&mut self, amount: f32, focus: Vec2) {
        if amount == 0.0 {
            return;
        }
        let focused_pixel = self.pixel_at_position(focus);
        let scale_factor = self.zoom_sensitivity.powf(amount);
        self.zoom = (scale_factor * self.zoom).clamp(MIN_ZOOM, MAX_ZOOM);
        self.set_pixel_at_position(focus, focused_pixel);
    }

    /// Zoom by a multiplicative factor around `focus`
    pub fn zoom_by_factor(&mut self, factor: f32, focus: Vec2) {
        if factor <= 0.0 || factor == 1.0 {
            return;
        }
        self.zoom_by(factor.ln() / self.zoom_sensitivity.ln(), focus);
    }

    /// Zoom in to the next power of two, keeping the viewport center fixed
    pub fn zoom_in(&mut self) {
        let level = match self.power_of_two_level() {
            Some(n) => n + 1.0,
            None => self.zoom.log2().ceil(),
        };
        self.zoom_to_power_of_two(level);
    }

    /// Zoom out to the previous power of two, keeping the viewport center fixed
    pub fn zoom_out(&mut self) {
        let level = match self.power_of_two_level() {
            Some(n) => n - 1.0,
            None => self.zoom.log2().floor(),
        };
        self.zoom_to_power_of_two(level);
    }

    /// The exponent `n` when the zoom sits on `2^n`
    fn power_of_two_level(&self) -> Option<f32> {
        let l = self.zoom.log2();
        let n = l.round();
        ((l - n).abs() < POWER_OF_TWO_SLACK).then_some(n)
    }

    fn zoom_to_power_of_two(&mut self, level: f32) {
        let center_pos = self.viewport_size() / 2.0;
        let center_pixel = self.pixel_at_position(center_pos);
        self.zoom = 2.0f32.powf(level).clamp(MIN_ZOOM, MAX_ZOOM);
        self.set_pixel_at_position(center_pos, center_pixel);
        debug!("Zoom: {:.4}", self.zoom);
    }

    pub fn zoom_level(&self) -> f32 {
        self.real_zoom().ln() / self.zoom_sensitivity.ln()
    }

    pub fn set_zoom_level(&mut self, level: f32) {
        self.zoom =
            (self.zoom_sensitivity.powf(level) / self.pixel_ratio).clamp(MIN_ZOOM, MAX_ZOOM);
    }

    /// Drag the image by `delta` points, anchored at `anchor`
    pub fn pan_by(&mut self, delta: Vec2, anchor: Vec2) {
        let pixel = self.pixel_at_position(anchor);
        self.set_pixel_at_position(anchor + delta, pixel);
    }

    /// Image pixels that intersect the viewport
    pub fn visible_pixels(&self) -> Option<PixelRange> {
        if self.image_size.x < 1.0 || self.image_size.y < 1.0 {
            return None;
        }
        let xy0 = self.position_at_pixel(Vec2::ZERO);
        let size = self.viewport_size();
        let last_x = self.image_size.x as i64 - 1;
        let last_y = self.image_size.y as i64 - 1;

        let range = PixelRange {
            min_x: ((-xy0.x / self.zoom).floor() as i64).max(0),
            min_y: ((-xy0.y / self.zoom).floor() as i64).max(0),
            max_x: (((size.x - xy0.x) / self.zoom).ceil() as i64).min(last_x),
            max_y: (((size.y - xy0.y) / self.zoom).ceil() as i64).min(last_y),
        };

        if range.max_x < range.min_x || range.max_y < range.min_y {
            return None;
        }
        Some(range)
    }

    /// Integer pixel under a viewport position, if it lies inside the image
    pub fn hovered_pixel(&self, position: Vec2) -> Option<(i64, i64)> {
        let p = self.pixel_at_position(position);
        let (x, y) = (p.x.floor(), p.y.floor());
        if x < 0.0 || y < 0.0 || x >= self.image_size.x || y >= self.image_size.y {
            return None;
        }
        Some((x as i64, y as i64))
    }
}
