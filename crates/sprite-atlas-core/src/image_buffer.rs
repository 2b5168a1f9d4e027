use crate::model::Rect;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};

/// One RGBA8 pixel.
pub type Pixel = [u8; 4];

pub const TRANSPARENT: Pixel = [0, 0, 0, 0];

/// Mutable RGBA8 pixel buffer, row-major with a top-left origin.
///
/// Thin wrapper over `image::RgbaImage` that adds the bulk row operations the
/// preprocessing and compositing stages need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    rgba: RgbaImage,
}

impl ImageBuffer {
    /// Fully transparent buffer.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            rgba: RgbaImage::new(width, height),
        }
    }

    pub fn from_pixel(width: u32, height: u32, px: Pixel) -> Self {
        Self {
            rgba: RgbaImage::from_pixel(width, height, Rgba(px)),
        }
    }

    pub fn from_rgba(rgba: RgbaImage) -> Self {
        Self { rgba }
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.rgba
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.rgba
    }

    pub fn width(&self) -> u32 {
        self.rgba.width()
    }

    pub fn height(&self) -> u32 {
        self.rgba.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.rgba.dimensions()
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Raw RGBA bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        &self.rgba
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        self.rgba.get_pixel(x, y).0
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, px: Pixel) {
        self.rgba.put_pixel(x, y, Rgba(px));
    }

    /// Pixel at `(x, y)` with coordinates clamped into the buffer.
    pub fn get_pixel_clamped(&self, x: i64, y: i64) -> Pixel {
        let cx = x.clamp(0, self.width() as i64 - 1) as u32;
        let cy = y.clamp(0, self.height() as i64 - 1) as u32;
        self.get_pixel(cx, cy)
    }

    fn row_range(&self, y: u32, x: u32, w: u32) -> std::ops::Range<usize> {
        let stride = self.width() as usize * 4;
        let start = y as usize * stride + x as usize * 4;
        start..start + w as usize * 4
    }

    /// Bytes of `w` pixels of row `y` starting at column `x`.
    pub fn row_span(&self, y: u32, x: u32, w: u32) -> &[u8] {
        let r = self.row_range(y, x, w);
        let bytes: &[u8] = &self.rgba;
        &bytes[r]
    }

    pub fn row_span_mut(&mut self, y: u32, x: u32, w: u32) -> &mut [u8] {
        let r = self.row_range(y, x, w);
        let bytes: &mut [u8] = &mut self.rgba;
        &mut bytes[r]
    }

    /// Copy `src_rect` of `src` into this buffer at `(dx, dy)`, row by row.
    /// The copy is clipped to both buffers.
    pub fn copy_from(&mut self, src: &ImageBuffer, src_rect: Rect, dx: u32, dy: u32) {
        let w = src_rect
            .w
            .min(src.width().saturating_sub(src_rect.x))
            .min(self.width().saturating_sub(dx));
        let h = src_rect
            .h
            .min(src.height().saturating_sub(src_rect.y))
            .min(self.height().saturating_sub(dy));
        if w == 0 || h == 0 {
            return;
        }
        for row in 0..h {
            let from = src.row_span(src_rect.y + row, src_rect.x, w);
            self.row_span_mut(dy + row, dx, w).copy_from_slice(from);
        }
    }

    /// Copy of the sub-rectangle `rect` (clipped to the buffer).
    pub fn sub_image(&self, rect: Rect) -> ImageBuffer {
        let w = rect.w.min(self.width().saturating_sub(rect.x));
        let h = rect.h.min(self.height().saturating_sub(rect.y));
        let mut out = ImageBuffer::new(w, h);
        out.copy_from(self, Rect::new(rect.x, rect.y, w, h), 0, 0);
        out
    }

    /// Copy row `from` onto row `to` across the full width.
    pub fn copy_row(&mut self, from: u32, to: u32) {
        if from == to {
            return;
        }
        let w = self.width();
        let src = self.row_range(from, 0, w);
        let dst = self.row_range(to, 0, w);
        let bytes: &mut [u8] = &mut self.rgba;
        bytes.copy_within(src, dst.start);
    }

    /// Copy column `from` onto column `to` across the full height.
    pub fn copy_column(&mut self, from: u32, to: u32) {
        if from == to {
            return;
        }
        for y in 0..self.height() {
            let px = self.get_pixel(from, y);
            self.put_pixel(to, y, px);
        }
    }

    /// True if every pixel inside `rect` has alpha 255.
    pub fn is_fully_opaque(&self, rect: Rect) -> bool {
        (rect.y..rect.y + rect.h).all(|y| {
            self.row_span(y, rect.x, rect.w)
                .chunks_exact(4)
                .all(|px| px[3] == 255)
        })
    }

    /// Per-column and per-row "any alpha > 0" flags of `rect`, plus the count
    /// of non-transparent pixels.
    pub fn alpha_coverage(&self, rect: Rect) -> (Vec<bool>, Vec<bool>, usize) {
        let mut cols = vec![false; rect.w as usize];
        let mut rows = vec![false; rect.h as usize];
        let mut visible = 0usize;
        for (ry, row_flag) in rows.iter_mut().enumerate() {
            let span = self.row_span(rect.y + ry as u32, rect.x, rect.w);
            for (cx, px) in span.chunks_exact(4).enumerate() {
                if px[3] > 0 {
                    cols[cx] = true;
                    *row_flag = true;
                    visible += 1;
                }
            }
        }
        (cols, rows, visible)
    }

    /// Multiply RGB by alpha; optionally zero the alpha channel afterwards (additive blending).
    pub fn premultiply_alpha(&mut self, zero_alpha: bool) {
        let bytes: &mut [u8] = &mut self.rgba;
        for px in bytes.chunks_exact_mut(4) {
            let a = px[3] as u16;
            for c in &mut px[..3] {
                *c = ((*c as u16 * a + 127) / 255) as u8;
            }
            if zero_alpha {
                px[3] = 0;
            }
        }
    }

    /// Resampled copy scaled by `factor` (each dimension at least 1 pixel).
    pub fn rescaled(&self, factor: f32) -> ImageBuffer {
        let w = ((self.width() as f32 * factor) as u32).max(1);
        let h = ((self.height() as f32 * factor) as u32).max(1);
        ImageBuffer {
            rgba: imageops::resize(&self.rgba, w, h, FilterType::Triangle),
        }
    }
}

impl From<RgbaImage> for ImageBuffer {
    fn from(rgba: RgbaImage) -> Self {
        Self::from_rgba(rgba)
    }
}
