use serde::{Deserialize, Serialize};

use crate::domain::market_data::PriceRange;

/// Value Object - Viewport
///
/// Visible index window plus the derived pixel mapping. Only
/// [`crate::domain::chart::ViewportModel`] produces validated instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub start_index: usize,
    pub end_index: usize,
    /// Pixels per point
    pub scale: f64,
    /// Pixel x of index 0 relative to the left edge
    pub offset: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self { start_index: 0, end_index: 0, scale: 1.0, offset: 0.0, width: 800.0, height: 600.0 }
    }
}

impl Viewport {
    pub fn visible_count(&self) -> usize {
        self.end_index - self.start_index + 1
    }

    /// Centre x of the slot occupied by `index`
    pub fn index_to_x(&self, index: f64) -> f64 {
        self.offset + index * self.scale + self.scale / 2.0
    }

    /// Fractional index under `x`
    pub fn x_to_fractional_index(&self, x: f64) -> f64 {
        if self.scale <= 0.0 {
            return self.start_index as f64;
        }
        (x - self.offset) / self.scale
    }

    /// Whole-pixel width of candle bodies and volume bars
    pub fn body_width(&self) -> f64 {
        (self.scale * 0.8).max(1.0)
    }
}

/// Value Object - axis-aligned rectangle in surface pixels.
///
/// Dirty regions are `Option<Rect>` where `None` means the whole surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width: width.max(0.0), height: height.max(0.0) }
    }

    /// Rectangle spanning two corners in any order
    pub fn from_points(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self::new(x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Bounding box of both rectangles
    pub fn union(&self, other: &Rect) -> Rect {
        Rect::from_points(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Closed-interval overlap test, so a zero-width wick line touching the
    /// region still counts.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.x <= other.right()
            && other.x <= self.right()
            && self.y <= other.bottom()
            && other.y <= self.bottom()
    }

    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect::from_points(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        ))
    }

    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.x && x <= self.right() && y >= self.y && y <= self.bottom()
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Grow on every side by `amount`
    pub fn inflate(&self, amount: f64) -> Rect {
        Rect::new(self.x - amount, self.y - amount, self.width + 2.0 * amount, self.height + 2.0 * amount)
    }
}

/// Straight line between two points, the unit of batched stroke commands
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Segment {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_points(self.x0, self.y0, self.x1, self.y1)
    }
}

/// Maps a value band onto a vertical pixel band (top = max).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceScale {
    pub range: PriceRange,
    pub top: f64,
    pub height: f64,
}

impl PriceScale {
    pub fn new(range: PriceRange, top: f64, height: f64) -> Self {
        Self { range, top, height }
    }

    pub fn price_to_y(&self, price: f64) -> f64 {
        let span = self.range.span();
        if span <= 0.0 {
            return self.top + self.height / 2.0;
        }
        let normalized = (price - self.range.min) / span;
        self.top + self.height * (1.0 - normalized)
    }

    pub fn y_to_price(&self, y: f64) -> f64 {
        if self.height <= 0.0 {
            return self.range.min;
        }
        let normalized = 1.0 - (y - self.top) / self.height;
        self.range.min + self.range.span() * normalized
    }
}

/// Value Object - Color
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::new(r, g, b, 1.0)
    }

    pub fn from_hex(hex: u32) -> Self {
        let r = ((hex >> 16) & 0xFF) as f32 / 255.0;
        let g = ((hex >> 8) & 0xFF) as f32 / 255.0;
        let b = (hex & 0xFF) as f32 / 255.0;
        Self::rgb(r, g, b)
    }

    pub fn to_hex(&self) -> u32 {
        let r = (self.r * 255.0).round() as u32;
        let g = (self.g * 255.0).round() as u32;
        let b = (self.b * 255.0).round() as u32;
        (r << 16) | (g << 8) | b
    }

    pub fn with_alpha(&self, alpha: f32) -> Self {
        Self { a: alpha, ..*self }
    }

    /// Packed RGBA8, the pixel format of the raster backend
    pub fn to_rgba8(&self) -> [u8; 4] {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), channel(self.a)]
    }

    /// CSS `rgba()` string for 2D canvas contexts
    pub fn to_css(&self) -> String {
        let [r, g, b, _] = self.to_rgba8();
        format!("rgba({},{},{},{:.3})", r, g, b, self.a.clamp(0.0, 1.0))
    }

    pub const BLACK: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const RED: Color = Color { r: 1.0, g: 0.0, b: 0.0, a: 1.0 };
    pub const GREEN: Color = Color { r: 0.0, g: 1.0, b: 0.0, a: 1.0 };
    pub const BLUE: Color = Color { r: 0.0, g: 0.0, b: 1.0, a: 1.0 };
    pub const TRANSPARENT: Color = Color { r: 0.0, g: 0.0, b: 0.0, a: 0.0 };
}

impl From<(f32, f32, f32)> for Color {
    fn from((r, g, b): (f32, f32, f32)) -> Self {
        Self::rgb(r, g, b)
    }
}

impl From<(f32, f32, f32, f32)> for Color {
    fn from((r, g, b, a): (f32, f32, f32, f32)) -> Self {
        Self::new(r, g, b, a)
    }
}

impl From<u32> for Color {
    fn from(hex: u32) -> Self {
        Self::from_hex(hex)
    }
}
