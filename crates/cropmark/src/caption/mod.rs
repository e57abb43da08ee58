//! Caption index and selection.
//!
//! Every text line on every page is matched against the caption patterns;
//! each hit becomes a scored candidate. Selection then picks at most one
//! caption per `(kind, identifier)` document-wide, or one per page when
//! continued captions are allowed. Identifiers whose best candidate stays
//! below the acceptance threshold are reported as uncertain and emit no
//! attachment.

pub mod patterns;
pub mod score;

use crate::geometry::Rect;
use crate::ident::{AttachmentKind, Identifier};
use crate::pdf::page::PageView;
use ahash::AHashMap;
use tracing::debug;

pub use patterns::{is_continued, match_caption_line, CaptionMatch};
pub use score::{score_candidate, ScoreBreakdown, MIN_CAPTION_SCORE};

/// One caption-like occurrence on a page.
#[derive(Debug, Clone)]
pub struct CaptionCandidate {
    pub kind: AttachmentKind,
    pub ident: Identifier,
    pub page: u32,
    pub line_idx: usize,
    pub rect: Rect,
    /// The matched line's text.
    pub text: String,
    /// Caption text after the head, used for slugs and records.
    pub tail: String,
    pub breakdown: ScoreBreakdown,
    pub total_score: f32,
    pub continued_marker: bool,
}

/// The chosen caption for one `(kind, ident)` (or one per page when
/// continued captions are allowed).
#[derive(Debug, Clone)]
pub struct Caption {
    pub kind: AttachmentKind,
    pub ident: Identifier,
    pub page: u32,
    pub line_idx: usize,
    pub rect: Rect,
    /// Full caption text: the matched line plus the rest of its block.
    pub text: String,
    pub tail: String,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    pub continued: bool,
}

/// An identifier whose best candidate scored below the threshold.
#[derive(Debug, Clone)]
pub struct UncertainId {
    pub kind: AttachmentKind,
    pub ident: Identifier,
    pub best_score: f32,
    pub candidates: usize,
}

/// Selection result for the whole document.
#[derive(Debug, Default)]
pub struct CaptionSelection {
    /// Document order: page, then vertical position.
    pub captions: Vec<Caption>,
    pub uncertain: Vec<UncertainId>,
}

/// Scan every line of every page for caption candidates.
pub fn build_candidates(pages: &[PageView]) -> Vec<CaptionCandidate> {
    let mut candidates = Vec::new();
    for page in pages {
        for (line_idx, line) in page.lines.iter().enumerate() {
            let Some(m) = match_caption_line(&line.text) else {
                continue;
            };
            let breakdown = score_candidate(page, line_idx, &m);
            candidates.push(CaptionCandidate {
                kind: m.kind,
                ident: m.ident,
                page: page.number,
                line_idx,
                rect: line.rect,
                text: line.text.clone(),
                tail: m.tail,
                breakdown,
                total_score: breakdown.total(),
                continued_marker: is_continued(&line.text),
            });
        }
    }
    debug!(candidates = candidates.len(), "caption index built");
    candidates
}

/// Pick the winning caption per identifier.
///
/// With `smart` scoring off the first candidate in document order wins
/// unconditionally. With it on, the maximum-scoring candidate wins if it
/// reaches [`MIN_CAPTION_SCORE`]; otherwise the id is uncertain.
pub fn select(
    pages: &[PageView],
    candidates: Vec<CaptionCandidate>,
    allow_continued: bool,
    smart: bool,
) -> CaptionSelection {
    let mut groups: AHashMap<(AttachmentKind, String), Vec<CaptionCandidate>> = AHashMap::new();
    for cand in candidates {
        groups
            .entry((cand.kind, cand.ident.raw().to_string()))
            .or_default()
            .push(cand);
    }

    let mut selection = CaptionSelection::default();

    for ((_kind, _raw), mut group) in groups {
        group.sort_by(|a, b| {
            a.page
                .cmp(&b.page)
                .then_with(|| a.rect.y0.total_cmp(&b.rect.y0))
        });

        if allow_continued {
            // One winner per page; later pages are continued copies.
            let mut by_page: AHashMap<u32, Vec<CaptionCandidate>> = AHashMap::new();
            for cand in group {
                by_page.entry(cand.page).or_default().push(cand);
            }
            let mut pages_sorted: Vec<u32> = by_page.keys().copied().collect();
            pages_sorted.sort_unstable();
            let first_page = pages_sorted[0];
            for page_no in pages_sorted {
                let group = by_page.remove(&page_no).unwrap();
                match pick_winner(group, smart) {
                    Ok(mut winner) => {
                        winner.continued = winner.continued || page_no > first_page;
                        selection.captions.push(finalize(winner, pages));
                    }
                    Err(uncertain) => selection.uncertain.push(uncertain),
                }
            }
        } else {
            match pick_winner(group, smart) {
                Ok(winner) => selection.captions.push(finalize(winner, pages)),
                Err(uncertain) => selection.uncertain.push(uncertain),
            }
        }
    }

    selection
        .captions
        .sort_by(|a, b| a.page.cmp(&b.page).then_with(|| a.rect.y0.total_cmp(&b.rect.y0)));
    selection
        .uncertain
        .sort_by(|a, b| (a.kind.rank(), a.ident.sort_key()).cmp(&(b.kind.rank(), b.ident.sort_key())));
    selection
}

fn pick_winner(group: Vec<CaptionCandidate>, smart: bool) -> Result<Caption, UncertainId> {
    debug_assert!(!group.is_empty());
    let count = group.len();

    let best = if smart {
        group
            .into_iter()
            .max_by(|a, b| {
                a.total_score
                    .total_cmp(&b.total_score)
                    // Stable tie-break: earliest occurrence wins.
                    .then_with(|| b.page.cmp(&a.page))
                    .then_with(|| b.rect.y0.total_cmp(&a.rect.y0))
            })
            .unwrap()
    } else {
        group.into_iter().next().unwrap()
    };

    if smart && best.total_score < MIN_CAPTION_SCORE {
        return Err(UncertainId {
            kind: best.kind,
            ident: best.ident,
            best_score: best.total_score,
            candidates: count,
        });
    }

    Ok(Caption {
        kind: best.kind,
        ident: best.ident,
        page: best.page,
        line_idx: best.line_idx,
        rect: best.rect,
        text: best.text,
        tail: best.tail,
        score: best.total_score,
        breakdown: best.breakdown,
        continued: best.continued_marker,
    })
}

/// Extend the caption text with the remaining lines of its block.
fn finalize(mut caption: Caption, pages: &[PageView]) -> Caption {
    let Some(page) = pages.iter().find(|p| p.number == caption.page) else {
        return caption;
    };
    if let Some(block) = page.block_for_line(caption.line_idx) {
        let mut text = caption.text.clone();
        for i in (caption.line_idx + 1)..(block.first_line + block.line_count) {
            text.push(' ');
            text.push_str(page.lines[i].text.trim());
        }
        caption.text = text;
    }
    caption
}
