//! Multi-scale scanning anchor selector.
//!
//! Candidate windows sit flush against the caption on the near side; their
//! far extent walks the configured scan heights plus every scan step in
//! between, clamped by page bounds and the guarded midpoint toward the
//! neighboring caption. Figures and tables score differently: figures want
//! ink and objects, tables want column alignment and horizontal rules.
//! The winner's edges snap to nearby horizontal rules.

use super::{usable, AnchorChoice, AnchorContext, ScanTrace, Side};
use crate::geometry::Rect;
use crate::ident::AttachmentKind;
use crate::pdf::page::{object_coverage, ObjectKind, PageObject};
use tracing::trace;

/// Maximum distance an edge snaps to a horizontal rule.
const EDGE_SNAP_DIST: f32 = 14.0;

/// Component count above which the component bonus saturates.
const COMPONENT_SATURATION: f32 = 3.0;

/// Bucket width for the column-alignment histogram.
const COLUMN_BUCKET_PT: f32 = 4.0;

/// Figure score weights.
const FIG_INK: f32 = 0.55;
const FIG_OBJECT: f32 = 0.25;
const FIG_PARAGRAPH: f32 = 0.20;
const FIG_COMPONENTS: f32 = 0.08;

/// Table score weights.
const TAB_INK: f32 = 0.40;
const TAB_COLUMN: f32 = 0.25;
const TAB_HLINE: f32 = 0.20;
const TAB_OBJECT: f32 = 0.15;
const TAB_PARAGRAPH: f32 = 0.25;

/// Scan one or both sides and keep the best-scoring window.
pub fn choose(caption: &Rect, ctx: &AnchorContext<'_>, above: bool, below: bool) -> Option<AnchorChoice> {
    let mut best: Option<(f32, Side, Rect)> = None;
    let mut scored = 0usize;

    for side in [Side::Above, Side::Below] {
        let allowed = match side {
            Side::Above => above,
            Side::Below => below,
        };
        if !allowed {
            continue;
        }
        for window in candidate_windows(caption, ctx, side) {
            let score = score_window(ctx, &window, caption, side);
            scored += 1;
            if score > 0.0 && best.map_or(true, |(b, _, _)| score > b) {
                best = Some((score, side, window));
            }
        }
    }

    let (score, side, window) = best?;
    let snapped = snap_edges(&window, ctx, caption, side);
    trace!(score, side = side.name(), "scan selected window");

    Some(AnchorChoice {
        side,
        baseline_rect: snapped,
        empty: false,
        scan_trace: Some(ScanTrace {
            windows_scored: scored,
            best_score: score,
            chosen_height: snapped.height(),
        }),
    })
}

/// Windows flush to the caption with far extents at every scan height and
/// every scan step between the smallest and largest height.
fn candidate_windows(caption: &Rect, ctx: &AnchorContext<'_>, side: Side) -> Vec<Rect> {
    let (x0, x1) = ctx.x_extent();
    let (limit_top, limit_bot) = ctx.side_limits(caption, side);
    if limit_bot - limit_top < 1.0 {
        return Vec::new();
    }

    let mut extents: Vec<f32> = ctx.config.scan_heights.clone();
    let min_h = extents.iter().copied().fold(f32::INFINITY, f32::min);
    let max_h = extents.iter().copied().fold(0.0f32, f32::max);
    if min_h.is_finite() && ctx.config.scan_step_pt > 1.0 {
        let mut h = min_h;
        while h < max_h {
            extents.push(h);
            h += ctx.config.scan_step_pt;
        }
    }
    extents.sort_by(|a, b| a.total_cmp(b));
    extents.dedup_by(|a, b| (*a - *b).abs() < 0.5);

    let mut windows = Vec::with_capacity(extents.len());
    for h in extents {
        let rect = match side {
            Side::Above => Rect::new(x0, (limit_bot - h).max(limit_top), x1, limit_bot),
            Side::Below => Rect::new(x0, limit_top, x1, (limit_top + h).min(limit_bot)),
        };
        if usable(&rect) {
            windows.push(rect);
        }
    }
    // Clamping can collapse distinct heights onto the same window.
    windows.dedup_by(|a, b| (a.y0 - b.y0).abs() < 0.5 && (a.y1 - b.y1).abs() < 0.5);
    windows
}

fn score_window(ctx: &AnchorContext<'_>, window: &Rect, caption: &Rect, side: Side) -> f32 {
    let ink = ctx.preview.ink_fraction(window);
    let obj_cov = object_coverage(&ctx.page.objects, window);
    let para_cov = ctx.paragraph_coverage(window);

    // Distance of the far edge from the caption, normalized by page height.
    let far_dist = match side {
        Side::Above => caption.y0 - window.y0,
        Side::Below => window.y1 - caption.y1,
    };
    let dist = (far_dist / ctx.page.rect.height()).max(0.0);
    let lambda = ctx.config.scan_dist_lambda;

    match ctx.kind {
        AttachmentKind::Figure => {
            let components = component_count(ctx, window);
            FIG_INK * ink + FIG_OBJECT * obj_cov - FIG_PARAGRAPH * para_cov
                + FIG_COMPONENTS * (components as f32 / COMPONENT_SATURATION).min(1.0)
                - lambda * dist
        }
        AttachmentKind::Table => {
            TAB_INK * ink + TAB_COLUMN * column_align_peak(&ctx.page.objects, window)
                + TAB_HLINE * horizontal_rule_density(&ctx.page.objects, window)
                + TAB_OBJECT * obj_cov
                - TAB_PARAGRAPH * para_cov
                - lambda * dist
        }
    }
}

/// Connected object components intersecting the window.
fn component_count(ctx: &AnchorContext<'_>, window: &Rect) -> usize {
    let rects: Vec<Rect> = ctx
        .page
        .objects
        .iter()
        .filter(|o| o.rect.intersects(window))
        .map(|o| o.rect)
        .collect();
    crate::refine::objects::merge_into_components(&rects, ctx.config.object_merge_gap_pt).len()
}

/// Peak of the vertical-edge histogram, from vector paths and vertical
/// rules only (raster content feeds ink and coverage instead).
fn column_align_peak(objects: &[PageObject], window: &Rect) -> f32 {
    let mut buckets: Vec<(i32, usize)> = Vec::new();
    let mut total = 0usize;

    let mut push = |x: f32| {
        let key = (x / COLUMN_BUCKET_PT).round() as i32;
        total += 1;
        if let Some(entry) = buckets.iter_mut().find(|(k, _)| *k == key) {
            entry.1 += 1;
        } else {
            buckets.push((key, 1));
        }
    };

    for obj in objects.iter().filter(|o| o.rect.intersects(window)) {
        match obj.kind {
            ObjectKind::VerticalRule => push((obj.rect.x0 + obj.rect.x1) / 2.0),
            ObjectKind::VectorPath => {
                push(obj.rect.x0);
                push(obj.rect.x1);
            }
            _ => {}
        }
    }

    if total == 0 {
        return 0.0;
    }
    let peak = buckets.iter().map(|(_, c)| *c).max().unwrap_or(0);
    (peak as f32 / 4.0).min(1.0)
}

/// Horizontal rule count in the window, saturating at six.
fn horizontal_rule_density(objects: &[PageObject], window: &Rect) -> f32 {
    let count = objects
        .iter()
        .filter(|o| o.kind == ObjectKind::HorizontalRule && o.rect.intersects(window))
        .count();
    (count as f32 / 6.0).min(1.0)
}

/// Snap the window's top and bottom to the nearest horizontal rule within
/// range, then re-clamp into the side limits.
fn snap_edges(window: &Rect, ctx: &AnchorContext<'_>, caption: &Rect, side: Side) -> Rect {
    let rules: Vec<f32> = ctx
        .page
        .objects
        .iter()
        .filter(|o| o.kind == ObjectKind::HorizontalRule)
        .map(|o| (o.rect.y0 + o.rect.y1) / 2.0)
        .collect();

    let snap = |edge: f32| -> f32 {
        rules
            .iter()
            .copied()
            .map(|y| (y, (y - edge).abs()))
            .filter(|(_, d)| *d <= EDGE_SNAP_DIST)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(y, _)| y)
            .unwrap_or(edge)
    };

    let (limit_top, limit_bot) = ctx.side_limits(caption, side);
    let snapped = Rect::new(window.x0, snap(window.y0), window.x1, snap(window.y1));
    Rect::new(
        snapped.x0,
        snapped.y0.clamp(limit_top, limit_bot),
        snapped.x1,
        snapped.y1.clamp(limit_top, limit_bot),
    )
}
