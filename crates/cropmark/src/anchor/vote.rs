//! Document-wide anchor direction vote.
//!
//! A cheap preflight before the scanning selector: every caption of a kind
//! scores its simple above and below windows, the totals are compared, and
//! only a clear margin settles a document-wide side. Anything less leaves
//! every caption to decide individually.

use super::{simple, AnchorContext, CaptionNeighbors, Side};
use crate::caption::Caption;
use crate::config::{CropConfig, GlobalAnchor};
use crate::ident::AttachmentKind;
use crate::layout::LayoutModel;
use crate::pdf::page::PageView;
use crate::pdf::preview::PagePreview;
use serde::Serialize;
use tracing::debug;

/// The settled direction for one attachment kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    Auto,
    Above,
    Below,
}

/// Accumulate above/below scores over all captions of `kind` and settle a
/// side when one total clears the margin.
pub fn global_vote(
    kind: AttachmentKind,
    captions: &[Caption],
    pages: &[PageView],
    previews: &[PagePreview],
    layout: Option<&LayoutModel>,
    config: &CropConfig,
) -> VoteOutcome {
    if config.global_anchor == GlobalAnchor::Off {
        return VoteOutcome::Auto;
    }

    let mut above_total = 0.0f32;
    let mut below_total = 0.0f32;
    let mut counted = 0usize;

    for caption in captions.iter().filter(|c| c.kind == kind) {
        // Previews are positional with the pages slice.
        let Some(pos) = pages.iter().position(|p| p.number == caption.page) else {
            continue;
        };
        let page = &pages[pos];
        let Some(preview) = previews.get(pos) else {
            continue;
        };
        let page_captions: Vec<_> = captions
            .iter()
            .filter(|c| c.page == caption.page)
            .map(|c| c.rect)
            .collect();
        let ctx = AnchorContext {
            page,
            preview,
            layout: layout.and_then(|m| m.page(caption.page)),
            config,
            kind,
            neighbors: CaptionNeighbors::of(&caption.rect, &page_captions),
        };
        above_total += simple::score(&ctx, &simple::window(&caption.rect, &ctx, Side::Above));
        below_total += simple::score(&ctx, &simple::window(&caption.rect, &ctx, Side::Below));
        counted += 1;
    }

    if counted == 0 {
        return VoteOutcome::Auto;
    }

    let margin = config.vote_margin(kind);
    let outcome = if below_total > above_total * (1.0 + margin) {
        VoteOutcome::Below
    } else if above_total > below_total * (1.0 + margin) {
        VoteOutcome::Above
    } else {
        VoteOutcome::Auto
    };
    debug!(
        kind = %kind,
        above_total,
        below_total,
        counted,
        outcome = ?outcome,
        "global anchor vote"
    );
    outcome
}
