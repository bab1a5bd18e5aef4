//! CPU raster backend: an RGBA8 pixel buffer. Used for headless rendering,
//! snapshots and pixel-level tests.

use std::any::Any;

use bytemuck::{Pod, Zeroable};

use super::surface::{DrawTarget, LayerKind, SurfaceFactory};
use crate::domain::chart::{Color, Rect, Segment};
use crate::domain::errors::ChartResult;

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Pod, Zeroable)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl From<Color> for Rgba8 {
    fn from(color: Color) -> Self {
        let [r, g, b, a] = color.to_rgba8();
        Self { r, g, b, a }
    }
}

impl Rgba8 {
    pub const TRANSPARENT: Rgba8 = Rgba8 { r: 0, g: 0, b: 0, a: 0 };

    /// Source-over blend of `src` onto `self`
    fn blend(self, src: Rgba8) -> Rgba8 {
        if src.a == 255 || self.a == 0 {
            return src;
        }
        let sa = src.a as f32 / 255.0;
        let da = self.a as f32 / 255.0;
        let out_a = sa + da * (1.0 - sa);
        if out_a <= 0.0 {
            return Rgba8::TRANSPARENT;
        }
        let mix = |s: u8, d: u8| {
            let value = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
            value.round().clamp(0.0, 255.0) as u8
        };
        Rgba8 {
            r: mix(src.r, self.r),
            g: mix(src.g, self.g),
            b: mix(src.b, self.b),
            a: (out_a * 255.0).round() as u8,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PixelSurface {
    width: u32,
    height: u32,
    pixels: Vec<Rgba8>,
    draw_calls: usize,
    clip: Option<Rect>,
}

impl PixelSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Rgba8::TRANSPARENT; (width as usize) * (height as usize)],
            draw_calls: 0,
            clip: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }

    /// Raw RGBA bytes, row-major
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.pixels)
    }

    /// Paint commands received so far
    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Count of pixels whose alpha is non-zero inside `rect`
    pub fn painted_pixels_in(&self, rect: &Rect) -> usize {
        let (x0, y0, x1, y1) = self.pixel_span(rect);
        let mut count = 0;
        for y in y0..y1 {
            for x in x0..x1 {
                if self.pixels[(y * self.width + x) as usize].a != 0 {
                    count += 1;
                }
            }
        }
        count
    }

    /// Pixel bounds covered by `rect`, clipped to the buffer
    fn pixel_span(&self, rect: &Rect) -> (u32, u32, u32, u32) {
        let clip = |v: f64, max: u32| v.max(0.0).min(max as f64) as u32;
        (
            clip(rect.x.floor(), self.width),
            clip(rect.y.floor(), self.height),
            clip(rect.right().ceil(), self.width),
            clip(rect.bottom().ceil(), self.height),
        )
    }

    fn fill_span(&mut self, rect: &Rect, color: Rgba8) {
        let rect = match self.clip {
            Some(clip) => match rect.intersection(&clip) {
                Some(inside) => inside,
                None => return,
            },
            None => *rect,
        };
        let (x0, y0, x1, y1) = self.pixel_span(&rect);
        for y in y0..y1 {
            let row = (y * self.width) as usize;
            for x in x0..x1 {
                let idx = row + x as usize;
                self.pixels[idx] = self.pixels[idx].blend(color);
            }
        }
    }

    fn stroke_line(&mut self, segment: &Segment, color: Rgba8, width: f64) {
        let dx = segment.x1 - segment.x0;
        let dy = segment.y1 - segment.y0;
        let steps = dx.abs().max(dy.abs()).ceil().max(1.0) as usize;
        let half = (width / 2.0).max(0.5);
        let mut last = None;
        for step in 0..=steps {
            let t = step as f64 / steps as f64;
            let x = (segment.x0 + dx * t).floor();
            let y = (segment.y0 + dy * t).floor();
            if last == Some((x, y)) {
                continue;
            }
            last = Some((x, y));
            let dot = Rect::new(x + 0.5 - half, y + 0.5 - half, half * 2.0, half * 2.0);
            self.fill_span(&dot, color);
        }
    }
}

impl DrawTarget for PixelSurface {
    fn size(&self) -> (f64, f64) {
        (self.width as f64, self.height as f64)
    }

    fn resize(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0).round() as u32;
        self.height = height.max(0.0).round() as u32;
        self.pixels = vec![Rgba8::TRANSPARENT; (self.width as usize) * (self.height as usize)];
        self.clip = None;
    }

    fn clear_rect(&mut self, rect: &Rect) {
        let (x0, y0, x1, y1) = self.pixel_span(rect);
        for y in y0..y1 {
            let row = (y * self.width) as usize;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(Rgba8::TRANSPARENT);
        }
    }

    fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    fn fill_rects(&mut self, rects: &[Rect], color: Color) {
        self.draw_calls += 1;
        let color = Rgba8::from(color);
        for rect in rects {
            self.fill_span(rect, color);
        }
    }

    fn stroke_segments(&mut self, segments: &[Segment], color: Color, width: f64) {
        self.draw_calls += 1;
        let color = Rgba8::from(color);
        for segment in segments {
            self.stroke_line(segment, color, width);
        }
    }

    fn stroke_polyline(&mut self, points: &[(f64, f64)], color: Color, width: f64) {
        self.draw_calls += 1;
        let color = Rgba8::from(color);
        for pair in points.windows(2) {
            let segment = Segment::new(pair[0].0, pair[0].1, pair[1].0, pair[1].1);
            self.stroke_line(&segment, color, width);
        }
    }

    fn fill_text(&mut self, _text: &str, _x: f64, _y: f64, _color: Color, _font: &str) {
        // no glyph rasterizer; text is only counted
        self.draw_calls += 1;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Creates [`PixelSurface`] targets
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterSurfaceFactory;

impl SurfaceFactory for RasterSurfaceFactory {
    fn create(
        &mut self,
        _name: &str,
        _layer: LayerKind,
        width: f64,
        height: f64,
    ) -> ChartResult<Box<dyn DrawTarget>> {
        Ok(Box::new(PixelSurface::new(width.max(0.0).round() as u32, height.max(0.0).round() as u32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_touches_only_its_rect() {
        let mut surface = PixelSurface::new(20, 20);
        surface.fill_rects(&[Rect::new(0.0, 0.0, 20.0, 20.0)], Color::RED);
        surface.clear_rect(&Rect::new(5.0, 5.0, 5.0, 5.0));
        assert_eq!(surface.pixel(6, 6), Some(Rgba8::TRANSPARENT));
        assert_eq!(surface.pixel(0, 0), Some(Rgba8::from(Color::RED)));
        assert_eq!(surface.painted_pixels_in(&Rect::new(0.0, 0.0, 20.0, 20.0)), 400 - 25);
    }

    #[test]
    fn clip_limits_blending() {
        let mut surface = PixelSurface::new(10, 10);
        surface.set_clip(Some(Rect::new(2.0, 2.0, 3.0, 3.0)));
        surface.fill_rects(&[Rect::new(0.0, 0.0, 10.0, 10.0)], Color::RED.with_alpha(0.4));
        assert_eq!(surface.painted_pixels_in(&Rect::new(0.0, 0.0, 10.0, 10.0)), 9);

        surface.set_clip(None);
        surface.fill_rects(&[Rect::new(0.0, 0.0, 10.0, 10.0)], Color::RED);
        assert_eq!(surface.painted_pixels_in(&Rect::new(0.0, 0.0, 10.0, 10.0)), 100);
    }

    #[test]
    fn bytes_are_rgba_rows() {
        let mut surface = PixelSurface::new(2, 1);
        surface.fill_rects(&[Rect::new(1.0, 0.0, 1.0, 1.0)], Color::BLUE);
        assert_eq!(surface.as_bytes(), &[0, 0, 0, 0, 0, 0, 255, 255]);
    }
}
