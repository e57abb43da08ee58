//! Phase D: whitespace autocrop.
//!
//! The only pixel-space phase. Renders the current window at the output
//! resolution, masks paragraph text near the caption (figures only), and
//! tightens the window to the non-white bounding box plus padding. Two
//! protections keep it honest: the far edge may only creep inward a few
//! pixels, and a crop that loses too much area or height is rejected
//! outright, padding the near edge back toward the caption instead.

use super::{PhaseTrace, RefineContext};
use crate::anchor::Side;
use crate::geometry::Rect;
use tracing::warn;

/// Fraction of the window, measured from the near edge, whose paragraph
/// lines are masked to white before the crop (figures only).
const TEXT_MASK_NEAR_FRACTION: f32 = 0.6;

/// Apply the autocrop. Returns the resulting rect and whether the phase
/// ran (a failed render skips the phase entirely).
pub fn apply(window: &Rect, ctx: &RefineContext<'_>, trace: &mut Vec<PhaseTrace>) -> (Rect, bool) {
    let dpi = ctx.config.dpi as f32;
    let scale = dpi / 72.0;

    let rendered = match ctx.raster.render(ctx.page.number, dpi, Some(*window)) {
        Ok(img) => img,
        Err(e) => {
            warn!(page = ctx.page.number, error = %e, "autocrop render failed, keeping pre-crop window");
            trace.push(PhaseTrace::new("D", *window, *window).with_note(format!("render failed: {}", e)));
            return (*window, false);
        }
    };
    let gray = image::DynamicImage::ImageRgb8(rendered).into_luma8();
    let (img_w, img_h) = gray.dimensions();

    // Paragraph-text mask over the near band, in local pixel space.
    let masks: Vec<(u32, u32, u32, u32)> = if ctx.kind == crate::ident::AttachmentKind::Figure {
        let band = ctx.near_band(window, TEXT_MASK_NEAR_FRACTION * window.height());
        ctx.page
            .lines
            .iter()
            .filter(|l| l.is_paragraph_shaped(window.width()) && l.rect.intersects(&band))
            .filter_map(|l| l.rect.intersection(window))
            .map(|r| {
                (
                    (((r.x0 - window.x0) * scale).floor().max(0.0) as u32).min(img_w),
                    (((r.y0 - window.y0) * scale).floor().max(0.0) as u32).min(img_h),
                    (((r.x1 - window.x0) * scale).ceil().max(0.0) as u32).min(img_w),
                    (((r.y1 - window.y0) * scale).ceil().max(0.0) as u32).min(img_h),
                )
            })
            .collect()
    } else {
        Vec::new()
    };
    let masked = |x: u32, y: u32| masks.iter().any(|&(x0, y0, x1, y1)| x >= x0 && x < x1 && y >= y0 && y < y1);

    // Tight non-white bbox.
    let th = ctx.config.autocrop_white_th;
    let mut min_x = img_w;
    let mut max_x = 0u32;
    let mut min_y = img_h;
    let mut max_y = 0u32;
    let mut any_ink = false;
    for y in 0..img_h {
        for x in 0..img_w {
            if gray.get_pixel(x, y).0[0] < th && !masked(x, y) {
                any_ink = true;
                min_x = min_x.min(x);
                max_x = max_x.max(x);
                min_y = min_y.min(y);
                max_y = max_y.max(y);
            }
        }
    }

    if !any_ink {
        trace.push(PhaseTrace::new("D", *window, *window).with_note("window is blank, crop skipped"));
        return (*window, false);
    }

    let pad = ctx.config.autocrop_pad_px as f32;
    let tight = Rect::new(
        window.x0 + (min_x as f32 - pad).max(0.0) / scale,
        window.y0 + (min_y as f32 - pad).max(0.0) / scale,
        window.x0 + ((max_x + 1) as f32 + pad).min(img_w as f32) / scale,
        window.y0 + ((max_y + 1) as f32 + pad).min(img_h as f32) / scale,
    );

    // Far-edge guard: the far edge creeps inward at most this far.
    let far_guard = ctx.config.protect_far_edge_px as f32 / scale;
    let guarded = match ctx.side {
        Side::Above => Rect::new(tight.x0, tight.y0.min(window.y0 + far_guard), tight.x1, tight.y1),
        Side::Below => Rect::new(tight.x0, tight.y0, tight.x1, tight.y1.max(window.y1 - far_guard)),
    };

    // Shrink limit: reject crops that lose too much of the window.
    let min_area = (1.0 - ctx.config.autocrop_shrink_limit) * window.area();
    let min_height = ctx.config.autocrop_min_height_px as f32 / scale;
    if guarded.area() < min_area || guarded.height() < min_height {
        let pad_back = ctx.config.near_edge_pad_px as f32 / scale;
        let near = ctx.near_edge(window);
        let boundary = ctx.caption_boundary();
        let restored = match ctx.side {
            Side::Above => ctx.with_near_edge_at(window, (near + pad_back).min(boundary)),
            Side::Below => ctx.with_near_edge_at(window, (near - pad_back).max(boundary)),
        };
        trace.push(
            PhaseTrace::new("D", *window, restored).with_note(format!(
                "autocrop rejected: area {:.0} < {:.0} or height {:.1} < {:.1}",
                guarded.area(),
                min_area,
                guarded.height(),
                min_height
            )),
        );
        return (restored, true);
    }

    trace.push(PhaseTrace::new("D", *window, guarded));
    (guarded, true)
}
