//! Low-resolution ink probe.
//!
//! One grayscale render per page at preview resolution, folded into a
//! summed-area table so window scoring can query ink density in O(1) per
//! candidate. This is the only pixel consumer outside the autocrop phase.

use super::error::Result;
use super::PageRaster;
use crate::geometry::Rect;

/// Preview render resolution. Coarse is fine: ink density is a ratio.
pub const PREVIEW_DPI: f32 = 36.0;

/// Per-page ink density lookup over a summed-area table.
pub struct PagePreview {
    /// Pixels per point at the preview resolution.
    scale: f32,
    width: u32,
    height: u32,
    /// (width + 1) * (height + 1) inclusive prefix sums of ink pixels.
    integral: Vec<u32>,
}

impl PagePreview {
    /// Render `page` at preview resolution and precompute the ink table.
    /// Pixels with luma below `white_th` count as ink.
    pub fn build(raster: &dyn PageRaster, page: u32, white_th: u8) -> Result<Self> {
        let rgb = raster.render(page, PREVIEW_DPI, None)?;
        let gray = image::DynamicImage::ImageRgb8(rgb).into_luma8();
        let (width, height) = gray.dimensions();

        let w1 = (width + 1) as usize;
        let mut integral = vec![0u32; w1 * (height + 1) as usize];
        for y in 0..height as usize {
            let mut row_sum = 0u32;
            for x in 0..width as usize {
                let ink = (gray.get_pixel(x as u32, y as u32).0[0] < white_th) as u32;
                row_sum += ink;
                integral[(y + 1) * w1 + (x + 1)] = integral[y * w1 + (x + 1)] + row_sum;
            }
        }

        Ok(Self {
            scale: PREVIEW_DPI / 72.0,
            width,
            height,
            integral,
        })
    }

    /// A preview that reports zero ink everywhere, for pages whose render
    /// failed. Scoring degrades to object geometry alone.
    pub fn blank() -> Self {
        Self {
            scale: PREVIEW_DPI / 72.0,
            width: 0,
            height: 0,
            integral: vec![0],
        }
    }

    /// Fraction of ink pixels inside `rect` (point coordinates).
    pub fn ink_fraction(&self, rect: &Rect) -> f32 {
        let x0 = ((rect.x0 * self.scale).floor().max(0.0) as u32).min(self.width);
        let y0 = ((rect.y0 * self.scale).floor().max(0.0) as u32).min(self.height);
        let x1 = ((rect.x1 * self.scale).ceil().max(0.0) as u32).min(self.width);
        let y1 = ((rect.y1 * self.scale).ceil().max(0.0) as u32).min(self.height);
        if x1 <= x0 || y1 <= y0 {
            return 0.0;
        }

        let w1 = (self.width + 1) as usize;
        let at = |x: u32, y: u32| self.integral[y as usize * w1 + x as usize];
        let ink = at(x1, y1) + at(x0, y0) - at(x0, y1) - at(x1, y0);
        let pixels = (x1 - x0) * (y1 - y0);
        ink as f32 / pixels as f32
    }
}
