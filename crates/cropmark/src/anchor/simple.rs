//! Simple two-window anchor selector.
//!
//! Builds one window above and one below the caption, scores each by ink
//! density and object coverage, and keeps the better one. The below window
//! must beat the above window by a small relative margin so near-ties stay
//! with the conventional caption-below-figure reading.

use super::{usable, AnchorChoice, AnchorContext, Side, NEIGHBOR_CLEARANCE};
use crate::geometry::Rect;
use crate::pdf::page::object_coverage;

/// Relative edge the below window needs over the above window.
const BELOW_TIE_MARGIN: f32 = 1.02;

const INK_WEIGHT: f32 = 0.6;
const OBJECT_WEIGHT: f32 = 0.4;

/// The candidate window on one side of the caption.
pub fn window(caption: &Rect, ctx: &AnchorContext<'_>, side: Side) -> Rect {
    let (x0, x1) = ctx.x_extent();
    let gap = ctx.config.caption_gap_pt;
    let clip_h = ctx.config.clip_height_pt;
    let page = &ctx.page.rect;

    let rect = match side {
        Side::Above => {
            let mut top = page.y0.max(caption.y0 - clip_h);
            if let Some(prev) = ctx.neighbors.prev_bottom {
                top = top.max(prev + NEIGHBOR_CLEARANCE);
            }
            Rect::new(x0, top - gap, x1, caption.y0 - gap)
        }
        Side::Below => {
            let mut bottom = page.y1.min(caption.y1 + gap + clip_h);
            if let Some(next) = ctx.neighbors.next_top {
                bottom = bottom.min(next - NEIGHBOR_CLEARANCE);
            }
            Rect::new(x0, caption.y1 + gap, x1, bottom)
        }
    };
    rect.clamped(page)
}

/// Ink/object score used both here and by the direction vote preflight.
pub fn score(ctx: &AnchorContext<'_>, rect: &Rect) -> f32 {
    if !usable(rect) {
        return 0.0;
    }
    INK_WEIGHT * ctx.preview.ink_fraction(rect) + OBJECT_WEIGHT * object_coverage(&ctx.page.objects, rect)
}

/// Pick the better of the allowed windows, or `None` when both collapse.
pub fn choose(caption: &Rect, ctx: &AnchorContext<'_>, above: bool, below: bool) -> Option<AnchorChoice> {
    let above_window = above.then(|| window(caption, ctx, Side::Above)).filter(usable);
    let below_window = below.then(|| window(caption, ctx, Side::Below)).filter(usable);

    let choice = |side, rect| AnchorChoice {
        side,
        baseline_rect: rect,
        empty: false,
        scan_trace: None,
    };

    match (above_window, below_window) {
        (None, None) => None,
        (Some(w), None) => Some(choice(Side::Above, w)),
        (None, Some(w)) => Some(choice(Side::Below, w)),
        (Some(aw), Some(bw)) => {
            let above_score = score(ctx, &aw);
            let below_score = score(ctx, &bw);
            if below_score > above_score * BELOW_TIE_MARGIN {
                Some(choice(Side::Below, bw))
            } else {
                Some(choice(Side::Above, aw))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::CaptionNeighbors;
    use crate::config::CropConfig;
    use crate::ident::AttachmentKind;
    use crate::pdf::page::{PageObject, PageView};
    use crate::pdf::preview::PagePreview;
    use crate::pdf::{error::Result as PdfResult, PageRaster};
    use image::RgbImage;

    /// Paints the page's objects dark on white.
    struct ObjectRaster {
        page_w: f32,
        page_h: f32,
        objects: Vec<Rect>,
    }

    impl PageRaster for ObjectRaster {
        fn render(&self, _page: u32, dpi: f32, _clip: Option<Rect>) -> PdfResult<RgbImage> {
            let scale = dpi / 72.0;
            let w = (self.page_w * scale) as u32;
            let h = (self.page_h * scale) as u32;
            let mut img = RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
            for obj in &self.objects {
                for y in 0..h {
                    for x in 0..w {
                        let px = x as f32 / scale;
                        let py = y as f32 / scale;
                        if px >= obj.x0 && px < obj.x1 && py >= obj.y0 && py < obj.y1 {
                            img.put_pixel(x, y, image::Rgb([20, 20, 20]));
                        }
                    }
                }
            }
            Ok(img)
        }
    }

    fn fixture(object: Rect) -> (PageView, PagePreview) {
        let page = PageView {
            number: 1,
            rect: Rect::new(0.0, 0.0, 612.0, 792.0),
            lines: Vec::new(),
            blocks: Vec::new(),
            objects: vec![PageObject::raster(object)],
        };
        let raster = ObjectRaster {
            page_w: 612.0,
            page_h: 792.0,
            objects: vec![object],
        };
        let preview = PagePreview::build(&raster, 1, 250).unwrap();
        (page, preview)
    }

    #[test]
    fn test_prefers_side_with_figure() {
        let object = Rect::new(72.0, 100.0, 540.0, 440.0);
        let (page, preview) = fixture(object);
        let config = CropConfig::default();
        let ctx = AnchorContext {
            page: &page,
            preview: &preview,
            layout: None,
            config: &config,
            kind: AttachmentKind::Figure,
            neighbors: CaptionNeighbors::default(),
        };
        let caption = Rect::new(72.0, 455.0, 300.0, 467.0);
        let choice = choose(&caption, &ctx, true, true).unwrap();
        assert_eq!(choice.side, Side::Above);
        assert!(choice.baseline_rect.y1 <= caption.y0);
    }

    #[test]
    fn test_below_figure_wins() {
        let object = Rect::new(72.0, 200.0, 540.0, 600.0);
        let (page, preview) = fixture(object);
        let config = CropConfig::default();
        let ctx = AnchorContext {
            page: &page,
            preview: &preview,
            layout: None,
            config: &config,
            kind: AttachmentKind::Figure,
            neighbors: CaptionNeighbors::default(),
        };
        let caption = Rect::new(72.0, 100.0, 300.0, 112.0);
        let choice = choose(&caption, &ctx, true, true).unwrap();
        assert_eq!(choice.side, Side::Below);
    }

    #[test]
    fn test_forced_side_restriction() {
        let object = Rect::new(72.0, 100.0, 540.0, 440.0);
        let (page, preview) = fixture(object);
        let config = CropConfig::default();
        let ctx = AnchorContext {
            page: &page,
            preview: &preview,
            layout: None,
            config: &config,
            kind: AttachmentKind::Figure,
            neighbors: CaptionNeighbors::default(),
        };
        let caption = Rect::new(72.0, 455.0, 300.0, 467.0);
        // Only below allowed even though the figure sits above.
        let choice = choose(&caption, &ctx, false, true).unwrap();
        assert_eq!(choice.side, Side::Below);
    }

    #[test]
    fn test_neighbor_clearance_respected() {
        let object = Rect::new(72.0, 100.0, 540.0, 440.0);
        let (page, preview) = fixture(object);
        let config = CropConfig::default();
        let ctx = AnchorContext {
            page: &page,
            preview: &preview,
            layout: None,
            config: &config,
            kind: AttachmentKind::Figure,
            neighbors: CaptionNeighbors {
                prev_bottom: Some(90.0),
                next_top: None,
            },
        };
        let caption = Rect::new(72.0, 455.0, 300.0, 467.0);
        let w = window(&caption, &ctx, Side::Above);
        assert!(w.y0 >= 90.0 + NEIGHBOR_CLEARANCE - config.caption_gap_pt - 1e-3);
    }

    #[test]
    fn test_caption_at_page_edge_no_negative_window() {
        let object = Rect::new(72.0, 100.0, 540.0, 440.0);
        let (page, preview) = fixture(object);
        let config = CropConfig::default();
        let ctx = AnchorContext {
            page: &page,
            preview: &preview,
            layout: None,
            config: &config,
            kind: AttachmentKind::Figure,
            neighbors: CaptionNeighbors::default(),
        };
        // Caption hugging the bottom edge: the below window collapses but
        // never goes negative, so only above remains.
        let caption = Rect::new(72.0, 780.0, 300.0, 791.0);
        let below = window(&caption, &ctx, Side::Below);
        assert!(below.height() >= 0.0);
        let choice = choose(&caption, &ctx, true, true).unwrap();
        assert_eq!(choice.side, Side::Above);
    }
}
