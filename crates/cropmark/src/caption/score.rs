//! Caption candidate scoring.
//!
//! Four axes, total capped at 100: position relative to the nearest
//! drawing/image (40), line formatting (30), surrounding structure (20),
//! and wording context (reference phrases push a mention below the
//! acceptance threshold).

use super::patterns::CaptionMatch;
use crate::pdf::page::PageView;
use serde::Serialize;

/// Candidates below this total are uncertain and emit nothing.
pub const MIN_CAPTION_SCORE: f32 = 25.0;

/// Distance buckets for the position axis, (max gap pt, points).
const POSITION_BUCKETS: [(f32, f32); 5] = [(10.0, 40.0), (20.0, 35.0), (40.0, 28.0), (80.0, 18.0), (150.0, 8.0)];

/// A long paragraph after the identifier reads as body text.
const LONG_PARAGRAPH_CHARS: usize = 300;

/// Word-count range of a short descriptive sentence.
const DESCRIPTIVE_WORDS: std::ops::RangeInclusive<usize> = 3..=40;

const CAPTION_KEYWORDS: [&str; 4] = ["shows", "illustrates", "展示", "comparison"];
const REFERENCE_KEYWORDS: [&str; 3] = ["as shown in", "如图所示", "see Figure"];

/// Per-axis score components.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ScoreBreakdown {
    pub position: f32,
    pub format: f32,
    pub structure: f32,
    pub context: f32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> f32 {
        (self.position + self.format + self.structure + self.context).min(100.0)
    }
}

/// Score one caption-like line on its page.
pub fn score_candidate(page: &PageView, line_idx: usize, m: &CaptionMatch) -> ScoreBreakdown {
    let line = &page.lines[line_idx];

    // Position: inverse distance to the nearest object bbox on the page.
    let nearest_gap = page
        .objects
        .iter()
        .map(|o| line.rect.gap_to(&o.rect))
        .fold(f32::INFINITY, f32::min);
    let position = POSITION_BUCKETS
        .iter()
        .find(|(max_gap, _)| nearest_gap < *max_gap)
        .map(|(_, pts)| *pts)
        .unwrap_or(0.0);

    // Format: bold span, standalone paragraph, trailing punctuation.
    let mut format = 0.0;
    if line.spans.iter().any(|s| s.is_bold) {
        format += 15.0;
    }
    let own_paragraph = page.block_for_line(line_idx).map(|b| b.line_count == 1).unwrap_or(false);
    if own_paragraph {
        format += 10.0;
    }
    if line
        .text
        .trim_end()
        .chars()
        .last()
        .is_some_and(|c| matches!(c, '.' | ':' | '：' | '。'))
    {
        format += 5.0;
    }

    // Structure: a short descriptive follow-up helps, a long paragraph after
    // the identifier reads as body text.
    let mut structure = 0.0;
    let block_tail_len = block_text_after_head(page, line_idx, m);
    if block_tail_len >= LONG_PARAGRAPH_CHARS {
        structure -= 8.0;
    } else if let Some(next) = next_nonempty_line(page, line_idx) {
        let words = next.split_whitespace().count();
        if DESCRIPTIVE_WORDS.contains(&words) && super::patterns::match_caption_line(next).is_none() {
            structure += 12.0;
        }
    }

    // Context: caption verbs vs reference phrasing.
    let mut context = 0.0;
    let text = &line.text;
    if CAPTION_KEYWORDS.iter().any(|k| text.contains(k)) || CAPTION_KEYWORDS.iter().any(|k| m.tail.contains(k)) {
        context += 10.0;
    }
    if REFERENCE_KEYWORDS.iter().any(|k| text.contains(k)) {
        context -= 15.0;
    }

    ScoreBreakdown {
        position,
        format,
        structure,
        context,
    }
}

/// Character count of the caption's block text after the matched head.
fn block_text_after_head(page: &PageView, line_idx: usize, m: &CaptionMatch) -> usize {
    let Some(block) = page.block_for_line(line_idx) else {
        return m.tail.chars().count();
    };
    let mut count = m.tail.chars().count();
    for i in (line_idx + 1)..(block.first_line + block.line_count) {
        count += page.lines[i].text.chars().count();
    }
    count
}

fn next_nonempty_line<'a>(page: &'a PageView, line_idx: usize) -> Option<&'a str> {
    page.lines[line_idx + 1..]
        .iter()
        .map(|l| l.text.trim())
        .find(|t| !t.is_empty())
}
