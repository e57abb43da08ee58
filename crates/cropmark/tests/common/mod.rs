//! Shared fixtures: synthesized pages and a rect-painting raster.
#![allow(dead_code)]

use cropmark::geometry::Rect;
use cropmark::pdf::document::DocumentInfo;
use cropmark::pdf::error::Result as PdfResult;
use cropmark::pdf::page::{lines_to_blocks, PageObject, PageView, TextLine, TextSpan};
use cropmark::pdf::PageRaster;
use image::RgbImage;

pub const PAGE_W: f32 = 612.0;
pub const PAGE_H: f32 = 792.0;

/// Paints per-page dark rectangles on white, honoring clips.
pub struct SyntheticRaster {
    pub dark: Vec<(u32, Rect)>,
}

impl PageRaster for SyntheticRaster {
    fn render(&self, page: u32, dpi: f32, clip: Option<Rect>) -> PdfResult<RgbImage> {
        let scale = dpi / 72.0;
        let region = clip.unwrap_or(Rect::new(0.0, 0.0, PAGE_W, PAGE_H));
        let w = ((region.width() * scale).ceil() as u32).max(1);
        let h = ((region.height() * scale).ceil() as u32).max(1);
        let mut img = RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
        for (p, rect) in &self.dark {
            if *p != page {
                continue;
            }
            for y in 0..h {
                for x in 0..w {
                    let px = region.x0 + (x as f32 + 0.5) / scale;
                    let py = region.y0 + (y as f32 + 0.5) / scale;
                    if px >= rect.x0 && px < rect.x1 && py >= rect.y0 && py < rect.y1 {
                        img.put_pixel(x, y, image::Rgb([20, 20, 20]));
                    }
                }
            }
        }
        Ok(img)
    }
}

pub fn text_line(text: &str, x0: f32, y0: f32, x1: f32, font_size: f32) -> TextLine {
    let rect = Rect::new(x0, y0, x1, y0 + font_size * 1.15);
    TextLine {
        spans: vec![TextSpan {
            text: text.to_string(),
            rect,
            font_size,
            font_name: "Times-Roman".to_string(),
            is_bold: false,
            is_italic: false,
        }],
        rect,
        text: text.to_string(),
        font_size,
        is_bold: false,
    }
}

pub fn page(number: u32, lines: Vec<TextLine>, objects: Vec<PageObject>) -> PageView {
    PageView {
        number,
        rect: Rect::new(0.0, 0.0, PAGE_W, PAGE_H),
        blocks: lines_to_blocks(&lines),
        lines,
        objects,
    }
}

pub fn doc_info(page_count: u32) -> DocumentInfo {
    DocumentInfo {
        name: "paper.pdf".to_string(),
        page_count,
        sha256: "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824".to_string(),
    }
}

/// A paragraph of evenly spaced full-width body lines starting at `y0`.
pub fn body_paragraph(y0: f32, count: usize) -> Vec<TextLine> {
    (0..count)
        .map(|i| {
            text_line(
                "a full width line of running body text for the paragraph",
                72.0,
                y0 + i as f32 * 14.0,
                540.0,
                10.0,
            )
        })
        .collect()
}
