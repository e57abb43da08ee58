//! Phase A: text trimming.
//!
//! Removes body text from the window in three sub-phases working outward
//! from the caption: near-adjacent lines (A1), the near-distant mid band
//! (A2), and far-side paragraphs (A3). A dedicated heuristic catches the
//! stray pair of lines left hanging just off the near edge. Multi-line
//! captions are protected: lines that belong to the caption's own text are
//! never trimmed. A1 removes at most 25% of the baseline height; the whole
//! phase never removes more than 50%.

use super::{PhaseTrace, RefineContext};
use crate::anchor::Side;
use crate::geometry::Rect;
use crate::pdf::page::TextLine;

/// A1 removes at most this fraction of the baseline height.
const A1_MAX_TRIM_FRACTION: f32 = 0.25;

/// Phase A in total removes at most this fraction of the baseline height.
const TOTAL_MAX_TRIM_FRACTION: f32 = 0.50;

/// Minimum aggregated paragraph coverage before the mid band is trimmed.
const A2_MIN_COVERAGE: f32 = 0.30;

/// Conservative mid-band trimming follows chains of lines closer than this.
const A2_CHAIN_GAP: f32 = 20.0;

/// Near-edge band of the exact-two-line heuristic, in line heights.
const TWO_LINE_BAND_FACTOR: f32 = 3.5;

/// Tolerance on the two lines' combined height vs two line heights.
const TWO_LINE_HEIGHT_TOLERANCE: f32 = 0.35;

/// Left-edge alignment tolerance for the two-line heuristic.
const TWO_LINE_ALIGN_TOLERANCE: f32 = 12.0;

/// Caption lines shorter than this are not used for protection matching.
const PROTECT_MIN_CHARS: usize = 8;

/// Far-side fallback: distance thresholds by line length.
const FAR_ANY_TEXT_DIST: f32 = 25.0;
const FAR_MEDIUM_TEXT_DIST: f32 = 20.0;
const FAR_LONG_TEXT_DIST: f32 = 15.0;
const FAR_MEDIUM_TEXT_CHARS: usize = 30;
const FAR_LONG_TEXT_CHARS: usize = 60;

/// Margin left between the far edge and the object content after the
/// fallback trim fires.
const FAR_CONTENT_MARGIN: f32 = 5.0;

/// Apply all of Phase A; appends one trace entry per sub-phase.
pub fn apply(window: &Rect, ctx: &RefineContext<'_>, trace: &mut Vec<PhaseTrace>) -> Rect {
    let baseline_h = window.height();
    let mut current = *window;

    let after = a1_near_adjacent(&current, ctx, baseline_h);
    trace.push(PhaseTrace::new("A1", current, after));
    current = after;

    let after = exact_two_line(&current, ctx, baseline_h);
    trace.push(PhaseTrace::new("A-two-line", current, after));
    current = after;

    let after = a2_near_distant(&current, ctx, baseline_h);
    trace.push(PhaseTrace::new("A2", current, after));
    current = after;

    let after = a3_far_side(&current, ctx, baseline_h);
    trace.push(PhaseTrace::new("A3", current, after));
    current = after;

    current
}

/// A line belonging to the caption's own (possibly wrapped) text.
fn is_caption_line(line: &TextLine, ctx: &RefineContext<'_>) -> bool {
    let text = line.text.trim();
    text.chars().count() >= PROTECT_MIN_CHARS && ctx.caption_text.contains(text)
}

/// Trimmable body line: paragraph-shaped and not part of the caption.
fn trimmable(line: &TextLine, window: &Rect, ctx: &RefineContext<'_>) -> bool {
    line.rect.intersects(window) && line.is_paragraph_shaped(window.width()) && !is_caption_line(line, ctx)
}

/// Near-edge coordinate that excludes every given line, plus the trim gap.
fn near_exclusion_edge(ctx: &RefineContext<'_>, lines: &[&TextLine]) -> f32 {
    let gap = ctx.thresholds.text_trim_gap;
    match ctx.side {
        Side::Above => lines.iter().map(|l| l.rect.y0).fold(f32::INFINITY, f32::min) - gap,
        Side::Below => lines.iter().map(|l| l.rect.y1).fold(f32::NEG_INFINITY, f32::max) + gap,
    }
}

/// Far-edge coordinate that excludes every given line, plus the trim gap.
fn far_exclusion_edge(ctx: &RefineContext<'_>, lines: &[&TextLine]) -> f32 {
    let gap = ctx.thresholds.text_trim_gap;
    match ctx.side {
        Side::Above => lines.iter().map(|l| l.rect.y1).fold(f32::NEG_INFINITY, f32::max) + gap,
        Side::Below => lines.iter().map(|l| l.rect.y0).fold(f32::INFINITY, f32::min) - gap,
    }
}

/// Clamp a near-edge trim so at most `max_frac` of the baseline height goes.
fn clamp_near_trim(ctx: &RefineContext<'_>, before: &Rect, proposed: Rect, baseline_h: f32, max_frac: f32) -> Rect {
    let removed = before.height() - proposed.height();
    let allowed = max_frac * baseline_h - (baseline_h - before.height()).max(0.0);
    if removed <= allowed.max(0.0) {
        return proposed;
    }
    let limited_edge = match ctx.side {
        Side::Above => before.y1 - allowed.max(0.0),
        Side::Below => before.y0 + allowed.max(0.0),
    };
    ctx.with_near_edge_at(before, limited_edge)
}

/// Clamp any trim so the window keeps at least half the baseline height.
fn clamp_total(ctx: &RefineContext<'_>, proposed: Rect, baseline_h: f32, moved_near: bool) -> Rect {
    let min_h = (1.0 - TOTAL_MAX_TRIM_FRACTION) * baseline_h;
    if proposed.height() >= min_h {
        return proposed;
    }
    if moved_near {
        let edge = match ctx.side {
            Side::Above => proposed.y0 + min_h,
            Side::Below => proposed.y1 - min_h,
        };
        ctx.with_near_edge_at(&proposed, edge)
    } else {
        let edge = match ctx.side {
            Side::Above => proposed.y1 - min_h,
            Side::Below => proposed.y0 + min_h,
        };
        ctx.with_far_edge_at(&proposed, edge)
    }
}

/// A1: remove paragraph-shaped lines hugging the near edge.
fn a1_near_adjacent(window: &Rect, ctx: &RefineContext<'_>, baseline_h: f32) -> Rect {
    let band = ctx.near_band(window, ctx.thresholds.adjacent_th);
    let lines: Vec<&TextLine> = ctx
        .page
        .lines
        .iter()
        .filter(|l| l.rect.intersects(&band) && trimmable(l, window, ctx))
        .collect();
    if lines.is_empty() {
        return *window;
    }

    let proposed = ctx.with_near_edge_at(window, near_exclusion_edge(ctx, &lines));
    let proposed = clamp_near_trim(ctx, window, proposed, baseline_h, A1_MAX_TRIM_FRACTION);
    clamp_total(ctx, proposed, baseline_h, true)
}

/// The exact-two-line heuristic: a pair of aligned stray lines just off the
/// near edge whose combined height matches two text lines is trimmed as a
/// unit, whatever their shape.
fn exact_two_line(window: &Rect, ctx: &RefineContext<'_>, baseline_h: f32) -> Rect {
    let line_h = ctx.thresholds.line_height;
    let band = ctx.near_band(window, TWO_LINE_BAND_FACTOR * line_h);
    let lines: Vec<&TextLine> = ctx
        .page
        .lines
        .iter()
        .filter(|l| l.rect.intersects(&band) && l.rect.intersects(window) && !is_caption_line(l, ctx))
        .collect();

    if lines.len() != 2 {
        return *window;
    }
    let aligned = (lines[0].rect.x0 - lines[1].rect.x0).abs() <= TWO_LINE_ALIGN_TOLERANCE;
    let combined = lines[0].rect.height() + lines[1].rect.height();
    let expected = 2.0 * line_h;
    if !aligned || (combined - expected).abs() > TWO_LINE_HEIGHT_TOLERANCE * expected {
        return *window;
    }

    let proposed = ctx.with_near_edge_at(window, near_exclusion_edge(ctx, &lines));
    clamp_total(ctx, proposed, baseline_h, true)
}

/// A2: trim the near-distant band when body text covers enough of it.
fn a2_near_distant(window: &Rect, ctx: &RefineContext<'_>, baseline_h: f32) -> Rect {
    let near = ctx.thresholds.adjacent_th;
    let far = ctx.thresholds.far_text_th.min(window.height());
    if far <= near {
        return *window;
    }

    let mut lines: Vec<&TextLine> = ctx
        .page
        .lines
        .iter()
        .filter(|l| {
            let d = ctx.distance_from_near(window, &l.rect);
            d > near && d <= far && trimmable(l, window, ctx)
        })
        .collect();
    if lines.is_empty() {
        return *window;
    }

    let band_h = far - near;
    let coverage: f32 = lines.iter().map(|l| l.rect.height()).sum::<f32>() / band_h;
    if coverage < A2_MIN_COVERAGE {
        return *window;
    }

    lines.sort_by(|a, b| {
        ctx.distance_from_near(window, &a.rect)
            .total_cmp(&ctx.distance_from_near(window, &b.rect))
    });

    let kept: Vec<&TextLine> = if ctx.config.aggressive_mid_trim() {
        lines
    } else {
        // Conservative: only the chain of lines linked by small gaps,
        // starting from the near side of the band.
        let mut chain = vec![lines[0]];
        for pair in lines.windows(2) {
            let gap = match ctx.side {
                Side::Above => pair[0].rect.y0 - pair[1].rect.y1,
                Side::Below => pair[1].rect.y0 - pair[0].rect.y1,
            };
            if gap < A2_CHAIN_GAP {
                chain.push(pair[1]);
            } else {
                break;
            }
        }
        chain
    };

    let proposed = ctx.with_near_edge_at(window, near_exclusion_edge(ctx, &kept));
    clamp_total(ctx, proposed, baseline_h, true)
}

/// A3: remove far-side paragraphs, stray bullets and hanging text beyond
/// the figure content, and section headings flagged by the layout model.
fn a3_far_side(window: &Rect, ctx: &RefineContext<'_>, baseline_h: f32) -> Rect {
    let mut current = *window;

    // Paragraph rule: body lines far from the caption covering enough of
    // the far half.
    let far_half = ctx.far_half(&current);
    let candidates: Vec<&TextLine> = ctx
        .page
        .lines
        .iter()
        .filter(|l| {
            l.rect.intersects(&far_half)
                && ctx.distance_from_near(&current, &l.rect) > ctx.thresholds.far_side_min_dist
                && trimmable(l, &current, ctx)
        })
        .collect();
    if !candidates.is_empty() && far_half.height() > 0.0 {
        let coverage: f32 = candidates.iter().map(|l| l.rect.height()).sum::<f32>() / far_half.height();
        if coverage >= ctx.config.far_side_para_min_ratio {
            let proposed = ctx.with_far_edge_at(&current, far_exclusion_edge(ctx, &candidates));
            current = clamp_total(ctx, proposed, baseline_h, false);
        }
    }

    // Fallback: bullets and text hanging beyond the object content.
    if let Some(content_far) = object_far_extent(&current, ctx) {
        let hanging: Vec<&TextLine> = ctx
            .page
            .lines
            .iter()
            .filter(|l| l.rect.intersects(&current) && !is_caption_line(l, ctx))
            .filter(|l| {
                let beyond = match ctx.side {
                    Side::Above => content_far - l.rect.y1,
                    Side::Below => l.rect.y0 - content_far,
                };
                if beyond <= 0.0 {
                    return false;
                }
                let chars = l.text.trim().chars().count();
                let bullet = matches!(l.text.trim_start().chars().next(), Some('\u{2022}' | '-' | '\u{00B7}'));
                bullet
                    || beyond > FAR_ANY_TEXT_DIST
                    || (beyond > FAR_MEDIUM_TEXT_DIST && chars > FAR_MEDIUM_TEXT_CHARS)
                    || (beyond > FAR_LONG_TEXT_DIST && chars > FAR_LONG_TEXT_CHARS)
            })
            .collect();
        if !hanging.is_empty() {
            // Everything beyond the content is strays and whitespace: pull
            // the far edge close to the content, past every removed line.
            let exclusion = far_exclusion_edge(ctx, &hanging);
            let edge = match ctx.side {
                Side::Above => exclusion.max(content_far - FAR_CONTENT_MARGIN),
                Side::Below => exclusion.min(content_far + FAR_CONTENT_MARGIN),
            };
            let proposed = ctx.with_far_edge_at(&current, edge);
            current = clamp_total(ctx, proposed, baseline_h, false);
        }
    }

    // Section-heading veto from the layout model.
    if let Some(layout) = ctx.layout {
        let far_half = ctx.far_half(&current);
        let intruding: Vec<Rect> = layout
            .titles
            .iter()
            .filter(|t| t.intersects(&far_half))
            .copied()
            .collect();
        if !intruding.is_empty() {
            let gap = ctx.thresholds.text_trim_gap;
            let edge = match ctx.side {
                Side::Above => {
                    intruding.iter().map(|t| t.y1).fold(f32::NEG_INFINITY, f32::max) + gap
                }
                Side::Below => intruding.iter().map(|t| t.y0).fold(f32::INFINITY, f32::min) - gap,
            };
            let proposed = ctx.with_far_edge_at(&current, edge);
            current = clamp_total(ctx, proposed, baseline_h, false);
        }
    }

    current
}

/// Far-most extent of object content inside the window, toward the far edge.
fn object_far_extent(window: &Rect, ctx: &RefineContext<'_>) -> Option<f32> {
    let mut extent: Option<f32> = None;
    for obj in ctx.page.objects.iter().filter(|o| o.rect.intersects(window)) {
        let candidate = match ctx.side {
            Side::Above => obj.rect.y0,
            Side::Below => obj.rect.y1,
        };
        extent = Some(match (extent, ctx.side) {
            (None, _) => candidate,
            (Some(e), Side::Above) => e.min(candidate),
            (Some(e), Side::Below) => e.max(candidate),
        });
    }
    extent
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anchor::Side;
    use crate::config::CropConfig;
    use crate::ident::AttachmentKind;
    use crate::metrics::Thresholds;
    use crate::pdf::page::{lines_to_blocks, PageObject, PageView, TextSpan};
    use crate::pdf::preview::PagePreview;
    use crate::refine::testutil::SyntheticRaster;

    fn body_line(text: &str, x0: f32, y0: f32, x1: f32) -> TextLine {
        let rect = Rect::new(x0, y0, x1, y0 + 11.5);
        TextLine {
            spans: vec![TextSpan {
                text: text.to_string(),
                rect,
                font_size: 10.0,
                font_name: "Times".to_string(),
                is_bold: false,
                is_italic: false,
            }],
            rect,
            text: text.to_string(),
            font_size: 10.0,
            is_bold: false,
        }
    }

    struct Fixture {
        page: PageView,
        raster: SyntheticRaster,
        config: CropConfig,
        thresholds: Thresholds,
        caption_rect: Rect,
        caption_text: String,
    }

    impl Fixture {
        fn new(lines: Vec<TextLine>, objects: Vec<PageObject>) -> Self {
            let page = PageView {
                number: 1,
                rect: Rect::new(0.0, 0.0, 612.0, 792.0),
                blocks: lines_to_blocks(&lines),
                lines,
                objects: objects.clone(),
            };
            Self {
                raster: SyntheticRaster {
                    page_w: 612.0,
                    page_h: 792.0,
                    dark: objects.iter().map(|o| o.rect).collect(),
                },
                page,
                config: CropConfig::default(),
                thresholds: Thresholds {
                    adjacent_th: 24.0,
                    far_text_th: 120.0,
                    text_trim_gap: 6.0,
                    far_side_min_dist: 96.0,
                    line_height: 12.0,
                },
                caption_rect: Rect::new(72.0, 455.0, 400.0, 467.0),
                caption_text: "Figure 1: Overview of the system.".to_string(),
            }
        }

        fn run(&self, window: Rect, side: Side) -> (Rect, Vec<PhaseTrace>) {
            let preview = PagePreview::build(&self.raster, 1, 250).unwrap();
            let ctx = RefineContext {
                page: &self.page,
                preview: &preview,
                raster: &self.raster,
                layout: None,
                thresholds: &self.thresholds,
                config: &self.config,
                caption_rect: self.caption_rect,
                caption_text: &self.caption_text,
                side,
                kind: AttachmentKind::Figure,
            };
            let mut trace = Vec::new();
            let rect = apply(&window, &ctx, &mut trace);
            (rect, trace)
        }
    }

    #[test]
    fn test_a1_trims_near_paragraph() {
        // Body line 10pt off the near edge of an above-window.
        let fixture = Fixture::new(
            vec![body_line("a full width paragraph line of body text", 72.0, 428.0, 540.0)],
            vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 420.0))],
        );
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, trace) = fixture.run(window, Side::Above);
        assert!(rect.y1 <= 428.0 - 6.0 + 0.1, "near edge {} not past the line", rect.y1);
        assert!(trace.iter().any(|t| t.phase == "A1" && t.applied));
    }

    #[test]
    fn test_a1_cap_quarter_of_baseline() {
        // A wall of body lines filling the near band and beyond.
        let mut lines = Vec::new();
        for i in 0..10 {
            lines.push(body_line(
                "a full width paragraph line of body text",
                72.0,
                440.0 - i as f32 * 14.0,
                540.0,
            ));
        }
        let fixture = Fixture::new(lines, Vec::new());
        let window = Rect::new(20.0, 250.0, 592.0, 450.0);
        let (_, trace) = fixture.run(window, Side::Above);
        let a1 = trace.iter().find(|t| t.phase == "A1").unwrap();
        let removed = a1.before.height() - a1.after.height();
        assert!(removed <= 0.25 * 200.0 + 0.1, "A1 removed {}", removed);
    }

    #[test]
    fn test_caption_lines_protected() {
        // A wrapped caption line sitting inside the window near edge.
        let caption_continuation = "Overview of the system.";
        let fixture = Fixture::new(
            vec![body_line(caption_continuation, 72.0, 430.0, 400.0)],
            vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 425.0))],
        );
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, _) = fixture.run(window, Side::Above);
        // The line is part of the caption text, so nothing is trimmed.
        assert_eq!(rect.y1, 450.0);
    }

    #[test]
    fn test_a2_aggressive_trims_mid_band() {
        // Dense text in the 24..120pt band off the near edge.
        let mut lines = Vec::new();
        for i in 0..5 {
            lines.push(body_line(
                "mid band body text that fills the line width",
                72.0,
                410.0 - i as f32 * 14.0,
                540.0,
            ));
        }
        let fixture = Fixture::new(lines, vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 330.0))]);
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, trace) = fixture.run(window, Side::Above);
        // All five lines (354..421.5) are gone.
        assert!(rect.y1 <= 354.0 - 6.0 + 0.1, "near edge {}", rect.y1);
        assert!(trace.iter().any(|t| t.phase == "A2" && t.applied));
    }

    #[test]
    fn test_a2_conservative_stops_at_gap() {
        let mut fixture_lines = Vec::new();
        // Two chained lines near the band start, then a 40pt gap, then more.
        fixture_lines.push(body_line("chained line one of the mid band text", 72.0, 410.0, 540.0));
        fixture_lines.push(body_line("chained line two of the mid band text", 72.0, 396.0, 540.0));
        fixture_lines.push(body_line("separate block after a large gap here", 72.0, 340.0, 540.0));
        let mut fixture = Fixture::new(
            fixture_lines,
            vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 330.0))],
        );
        fixture.config.preset = crate::config::Preset::None;
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, _) = fixture.run(window, Side::Above);
        // The chain stops before the separated block.
        assert!(rect.y1 >= 351.0, "near edge {} trimmed past the gap", rect.y1);
        assert!(rect.y1 <= 396.0 - 6.0 + 0.1);
    }

    #[test]
    fn test_a3_trims_far_paragraphs() {
        // Body paragraph filling the far half of a below-window.
        let caption_rect = Rect::new(72.0, 80.0, 400.0, 92.0);
        let mut lines = Vec::new();
        for i in 0..8 {
            lines.push(body_line(
                "far side paragraph text occupying full width",
                72.0,
                300.0 + i as f32 * 14.0,
                540.0,
            ));
        }
        let mut fixture = Fixture::new(lines, vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 260.0))]);
        fixture.caption_rect = caption_rect;
        let window = Rect::new(20.0, 97.0, 592.0, 450.0);
        let (rect, trace) = fixture.run(window, Side::Below);
        assert!(rect.y1 <= 300.0 + 0.1, "far edge {} kept the paragraph", rect.y1);
        assert!(trace.iter().any(|t| t.phase == "A3" && t.applied));
    }

    #[test]
    fn test_a3_fallback_removes_hanging_short_lines() {
        // Two short lines well beyond the figure top of an above-window:
        // too narrow for the paragraph rule, caught by the fallback, which
        // then pulls the far edge close to the figure content.
        let lines = vec![
            body_line("short tail.", 72.0, 100.0, 200.0),
            body_line("and blank.", 72.0, 113.0, 190.0),
        ];
        let fixture = Fixture::new(lines, vec![PageObject::raster(Rect::new(72.0, 150.0, 540.0, 440.0))]);
        let window = Rect::new(20.0, 95.0, 592.0, 450.0);
        let (rect, _) = fixture.run(window, Side::Above);
        assert!((rect.y0 - 145.0).abs() < 0.1, "far edge {}", rect.y0);
    }

    #[test]
    fn test_total_trim_capped_at_half() {
        // Text everywhere: A must stop at 50% of the baseline height.
        let mut lines = Vec::new();
        for i in 0..25 {
            lines.push(body_line(
                "a full width paragraph line of body text",
                72.0,
                100.0 + i as f32 * 14.0,
                540.0,
            ));
        }
        let fixture = Fixture::new(lines, Vec::new());
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, _) = fixture.run(window, Side::Above);
        assert!(rect.height() >= 0.5 * 350.0 - 0.1, "height {}", rect.height());
    }

    #[test]
    fn test_two_line_unit_trim() {
        // Exactly two aligned short lines in the near band, nothing else.
        let lines = vec![
            body_line("last line of abstract.", 72.0, 430.0, 260.0),
            body_line("short continuation.", 72.0, 416.0, 250.0),
        ];
        let fixture = Fixture::new(lines, vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 400.0))]);
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, trace) = fixture.run(window, Side::Above);
        assert!(
            trace.iter().any(|t| t.phase == "A-two-line" && t.applied),
            "two-line heuristic did not fire: {:?}",
            trace
        );
        assert!(rect.y1 <= 416.0 - 6.0 + 0.1, "near edge {}", rect.y1);
    }

    #[test]
    fn test_no_text_no_change() {
        let fixture = Fixture::new(Vec::new(), vec![PageObject::raster(Rect::new(72.0, 100.0, 540.0, 440.0))]);
        let window = Rect::new(20.0, 100.0, 592.0, 450.0);
        let (rect, trace) = fixture.run(window, Side::Above);
        assert_eq!(rect, window);
        assert!(trace.iter().all(|t| !t.applied));
    }
}
