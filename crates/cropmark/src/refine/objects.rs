//! Phase B: object alignment.
//!
//! Merges the window's drawings and images into connected components,
//! aligns the near edge to the component closest to the caption (keeping
//! side-by-side sub-figures via a cross-axis union), and recovers a crop
//! that cut an object in half by growing the far edge outward in fixed
//! steps. By default only the near edge moves inward, so the phase can
//! never over-shrink from both sides at once.

use super::{PhaseTrace, RefineContext};
use crate::anchor::Side;
use crate::geometry::Rect;

/// An object reaching within this distance of both sides of the far edge
/// counts as cut by it.
const FLUSH_TOLERANCE: f32 = 2.0;

/// Far-edge recovery step and total budget.
const EXPAND_STEP: f32 = 60.0;
const EXPAND_LIMIT: f32 = 200.0;

/// Fraction of mutual vertical overlap that joins side-by-side components.
const CROSS_AXIS_OVERLAP: f32 = 0.3;

/// Greedy bbox merge: rectangles closer than `gap` collapse into one
/// component, repeated until stable.
pub fn merge_into_components(rects: &[Rect], gap: f32) -> Vec<Rect> {
    let mut components: Vec<Rect> = rects.to_vec();
    loop {
        let mut merged: Vec<Rect> = Vec::with_capacity(components.len());
        let mut changed = false;
        'outer: for rect in &components {
            for existing in merged.iter_mut() {
                if existing.gap_to(rect) <= gap {
                    *existing = existing.union(rect);
                    changed = true;
                    continue 'outer;
                }
            }
            merged.push(*rect);
        }
        components = merged;
        if !changed {
            break;
        }
    }
    components
}

/// Apply the object alignment to the post-trim window.
pub fn apply(window: &Rect, ctx: &RefineContext<'_>, trace: &mut Vec<PhaseTrace>) -> Rect {
    let Some(region) = component_region(window, ctx) else {
        trace.push(PhaseTrace::new("B", *window, *window).with_note("no objects above area threshold"));
        return *window;
    };

    // Near edge moves inward to the padded region; the far edge stays put
    // unless both-edge refinement is explicitly enabled.
    let mut current = *window;
    let near_target = match ctx.side {
        Side::Above => region.y1.min(window.y1),
        Side::Below => region.y0.max(window.y0),
    };
    current = ctx.with_near_edge_at(&current, near_target);

    if !ctx.config.refine_near_edge_only {
        let far_target = match ctx.side {
            Side::Above => region.y0.max(window.y0),
            Side::Below => region.y1.min(window.y1),
        };
        current = ctx.with_far_edge_at(&current, far_target);
    }

    // A component flush against the far edge means the window cut an
    // object in half; grow outward to recover it.
    let mut expanded = 0.0f32;
    while expanded + EXPAND_STEP <= EXPAND_LIMIT && far_edge_flush(&current, ctx) {
        let far = ctx.far_edge(&current);
        let grown = match ctx.side {
            Side::Above => (far - EXPAND_STEP).max(ctx.page.rect.y0),
            Side::Below => (far + EXPAND_STEP).min(ctx.page.rect.y1),
        };
        if (grown - far).abs() < 0.5 {
            break;
        }
        current = ctx.with_far_edge_at(&current, grown);
        expanded += EXPAND_STEP;
    }

    // After a recovery the coarse steps overshoot; snap the far edge back
    // onto the now-complete component plus padding. Inward moves only.
    if expanded > 0.0
        && let Some(region) = component_region(&current, ctx)
    {
        let far = ctx.far_edge(&current);
        match ctx.side {
            Side::Above if region.y0 > far => current = ctx.with_far_edge_at(&current, region.y0),
            Side::Below if region.y1 < far => current = ctx.with_far_edge_at(&current, region.y1),
            _ => {}
        }
    }

    let mut entry = PhaseTrace::new("B", *window, current);
    if expanded > 0.0 {
        entry = entry.with_note(format!("far edge expanded {}pt", expanded));
    }
    trace.push(entry);
    current
}

/// The padded component region the window should align to: the component
/// nearest the caption, unioned with everything stacked beside it.
fn component_region(window: &Rect, ctx: &RefineContext<'_>) -> Option<Rect> {
    let min_ratio = ctx.config.min_area_ratio(ctx.kind);
    let window_area = window.area();
    let rects: Vec<Rect> = ctx
        .page
        .objects
        .iter()
        .filter_map(|o| o.rect.intersection(window))
        .filter(|r| window_area > 0.0 && r.area() / window_area >= min_ratio)
        .collect();
    if rects.is_empty() {
        return None;
    }
    let components = merge_into_components(&rects, ctx.config.object_merge_gap_pt);
    let chosen = components
        .iter()
        .min_by(|a, b| a.gap_to(&ctx.caption_rect).total_cmp(&b.gap_to(&ctx.caption_rect)))
        .copied()?;
    let mut region = chosen;
    for comp in &components {
        let overlap = vertical_overlap(comp, &chosen);
        let min_h = comp.height().min(chosen.height()).max(1.0);
        if overlap / min_h >= CROSS_AXIS_OVERLAP {
            region = region.union(comp);
        }
    }
    Some(region.padded(ctx.config.object_pad_pt))
}

fn vertical_overlap(a: &Rect, b: &Rect) -> f32 {
    (a.y1.min(b.y1) - a.y0.max(b.y0)).max(0.0)
}

/// Whether any page object spans the window's far edge, meaning the
/// window cut it. Objects merely touching the edge from inside do not
/// trigger recovery.
fn far_edge_flush(window: &Rect, ctx: &RefineContext<'_>) -> bool {
    let far = ctx.far_edge(window);
    ctx.page.objects.iter().any(|o| {
        let horizontal = o.rect.x0 < window.x1 && o.rect.x1 > window.x0;
        horizontal && o.rect.y0 <= far - FLUSH_TOLERANCE && o.rect.y1 >= far + FLUSH_TOLERANCE
    })
}
