//! Anchor selection: the baseline crop window around a caption.
//!
//! Two strategies produce the window the refiners start from: the simple
//! two-window selector and the default multi-scale scan. Both honor forced
//! directions, the document-wide direction vote, page bounds, and the
//! mid-caption guard. When everything fails the caption still gets a
//! best-effort window centered on itself.

pub mod scan;
pub mod simple;
pub mod vote;

use crate::config::{AnchorMode, CropConfig};
use crate::geometry::Rect;
use crate::ident::AttachmentKind;
use crate::layout::PageLayout;
use crate::pdf::page::PageView;
use crate::pdf::preview::PagePreview;
use serde::Serialize;
use tracing::debug;

pub use vote::VoteOutcome;

/// Windows shorter than this are treated as degenerate.
const MIN_WINDOW_HEIGHT: f32 = 20.0;

/// Clearance kept from a neighboring caption in the simple selector.
pub(crate) const NEIGHBOR_CLEARANCE: f32 = 8.0;

/// Which side of the caption the window extends from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Above,
    Below,
}

impl Side {
    pub fn name(&self) -> &'static str {
        match self {
            Side::Above => "above",
            Side::Below => "below",
        }
    }
}

/// Vertical positions of the neighboring captions on the same page.
#[derive(Debug, Clone, Copy, Default)]
pub struct CaptionNeighbors {
    /// Bottom edge of the closest caption above this one.
    pub prev_bottom: Option<f32>,
    /// Top edge of the closest caption below this one.
    pub next_top: Option<f32>,
}

impl CaptionNeighbors {
    /// Compute neighbors of `caption_rect` among all caption rects on the page.
    pub fn of(caption_rect: &Rect, page_captions: &[Rect]) -> Self {
        let mut prev_bottom: Option<f32> = None;
        let mut next_top: Option<f32> = None;
        for other in page_captions {
            if (other.y0 - caption_rect.y0).abs() < 0.5 && (other.y1 - caption_rect.y1).abs() < 0.5 {
                continue;
            }
            if other.y1 <= caption_rect.y0 {
                prev_bottom = Some(prev_bottom.map_or(other.y1, |p: f32| p.max(other.y1)));
            } else if other.y0 >= caption_rect.y1 {
                next_top = Some(next_top.map_or(other.y0, |n: f32| n.min(other.y0)));
            }
        }
        Self { prev_bottom, next_top }
    }
}

/// Everything the selectors need about the caption's page.
pub struct AnchorContext<'a> {
    pub page: &'a PageView,
    pub preview: &'a PagePreview,
    pub layout: Option<&'a PageLayout>,
    pub config: &'a CropConfig,
    pub kind: AttachmentKind,
    pub neighbors: CaptionNeighbors,
}

impl AnchorContext<'_> {
    /// Paragraph coverage for scoring: layout regions when guided, line
    /// shape otherwise.
    pub fn paragraph_coverage(&self, window: &Rect) -> f32 {
        match self.layout {
            Some(layout) => layout.paragraph_overlap(window),
            None => crate::pdf::page::paragraph_coverage(&self.page.lines, window),
        }
    }

    /// Vertical limits a window on `side` of `caption` must respect: page
    /// bounds and the guarded midpoint toward the neighboring caption.
    pub fn side_limits(&self, caption: &Rect, side: Side) -> (f32, f32) {
        let guard = self.config.caption_mid_guard_pt;
        match side {
            Side::Above => {
                let mut top = self.page.rect.y0;
                if let Some(prev) = self.neighbors.prev_bottom {
                    top = top.max((prev + caption.y0) / 2.0 + guard);
                }
                (top, caption.y0 - self.config.caption_gap_pt)
            }
            Side::Below => {
                let mut bottom = self.page.rect.y1;
                if let Some(next) = self.neighbors.next_top {
                    bottom = bottom.min((caption.y1 + next) / 2.0 - guard);
                }
                (caption.y1 + self.config.caption_gap_pt, bottom)
            }
        }
    }

    /// Horizontal extent every window uses.
    pub fn x_extent(&self) -> (f32, f32) {
        (
            self.page.rect.x0 + self.config.margin_x_pt,
            self.page.rect.x1 - self.config.margin_x_pt,
        )
    }
}

/// Scan diagnostics carried into the record trace.
#[derive(Debug, Clone, Serialize)]
pub struct ScanTrace {
    pub windows_scored: usize,
    pub best_score: f32,
    pub chosen_height: f32,
}

/// The selected baseline window.
#[derive(Debug, Clone)]
pub struct AnchorChoice {
    pub side: Side,
    pub baseline_rect: Rect,
    /// True when no side produced a usable window and the rect is the
    /// caption-centered fallback.
    pub empty: bool,
    pub scan_trace: Option<ScanTrace>,
}

/// Sides a caption's window may extend to, after forcing and the vote.
/// Forced direction always wins; the vote restricts until a force overrides.
pub fn allowed_sides(config: &CropConfig, kind: AttachmentKind, raw_ident: &str, global: VoteOutcome) -> (bool, bool) {
    if config.forced_above(kind, raw_ident) {
        return (true, false);
    }
    if config.forced_below(kind, raw_ident) {
        return (false, true);
    }
    match global {
        VoteOutcome::Above => (true, false),
        VoteOutcome::Below => (false, true),
        VoteOutcome::Auto => (true, true),
    }
}

/// Produce the baseline window for one caption.
pub fn choose(caption_rect: &Rect, raw_ident: &str, ctx: &AnchorContext<'_>, global: VoteOutcome) -> AnchorChoice {
    let (above, below) = allowed_sides(ctx.config, ctx.kind, raw_ident, global);

    let choice = match ctx.config.anchor_mode {
        AnchorMode::V2 => scan::choose(caption_rect, ctx, above, below)
            .or_else(|| simple::choose(caption_rect, ctx, above, below)),
        AnchorMode::V1 => simple::choose(caption_rect, ctx, above, below),
    };

    match choice {
        Some(choice) => choice,
        None => {
            debug!(ident = raw_ident, "no usable anchor window, using caption-centered fallback");
            empty_fallback(caption_rect, ctx, above)
        }
    }
}

/// Best-effort window for degenerate pages: caption width x clip height,
/// centered on the caption, clamped to the page.
fn empty_fallback(caption_rect: &Rect, ctx: &AnchorContext<'_>, prefer_above: bool) -> AnchorChoice {
    let center_y = (caption_rect.y0 + caption_rect.y1) / 2.0;
    let half = ctx.config.clip_height_pt / 2.0;
    let rect = Rect::new(caption_rect.x0, center_y - half, caption_rect.x1, center_y + half)
        .clamped(&ctx.page.rect);
    AnchorChoice {
        side: if prefer_above { Side::Above } else { Side::Below },
        baseline_rect: rect,
        empty: true,
        scan_trace: None,
    }
}

/// Shared validity test for candidate windows.
pub(crate) fn usable(rect: &Rect) -> bool {
    rect.height() >= MIN_WINDOW_HEIGHT && rect.width() >= MIN_WINDOW_HEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GlobalAnchor;

    #[test]
    fn test_neighbors_of() {
        let cap = Rect::new(72.0, 400.0, 540.0, 412.0);
        let others = vec![
            Rect::new(72.0, 100.0, 540.0, 112.0),
            cap,
            Rect::new(72.0, 700.0, 540.0, 712.0),
        ];
        let n = CaptionNeighbors::of(&cap, &others);
        assert_eq!(n.prev_bottom, Some(112.0));
        assert_eq!(n.next_top, Some(700.0));
    }

    #[test]
    fn test_neighbors_none() {
        let cap = Rect::new(72.0, 400.0, 540.0, 412.0);
        let n = CaptionNeighbors::of(&cap, &[cap]);
        assert!(n.prev_bottom.is_none());
        assert!(n.next_top.is_none());
    }

    #[test]
    fn test_allowed_sides_forced_beats_vote() {
        let config = CropConfig {
            force_above_ids: vec!["4".to_string()],
            global_anchor: GlobalAnchor::Auto,
            ..CropConfig::default()
        };
        assert_eq!(
            allowed_sides(&config, AttachmentKind::Figure, "4", VoteOutcome::Below),
            (true, false)
        );
        assert_eq!(
            allowed_sides(&config, AttachmentKind::Figure, "5", VoteOutcome::Below),
            (false, true)
        );
        assert_eq!(
            allowed_sides(&config, AttachmentKind::Figure, "5", VoteOutcome::Auto),
            (true, true)
        );
    }

    #[test]
    fn test_table_force_lists_are_separate() {
        let config = CropConfig {
            force_table_below_ids: vec!["2".to_string()],
            ..CropConfig::default()
        };
        assert_eq!(
            allowed_sides(&config, AttachmentKind::Table, "2", VoteOutcome::Auto),
            (false, true)
        );
        assert_eq!(
            allowed_sides(&config, AttachmentKind::Figure, "2", VoteOutcome::Auto),
            (true, true)
        );
    }
}
