//! Page content model and its assembly from raw spans.
//!
//! A `PageView` is the read-only, backend-independent view of one page:
//! text lines and blocks, drawing/image objects, and the page rectangle,
//! all in top-left-origin PDF points. The pdfium adapter produces spans and
//! raw object rects; everything here is pure and synthesizable in tests.

use crate::geometry::Rect;

/// Baseline proximity tolerance as a fraction of the reference font size.
const LINE_Y_TOLERANCE_FRACTION: f32 = 0.45;

/// Vertical gap multiplier that breaks a paragraph.
const PARAGRAPH_GAP_MULTIPLIER: f32 = 1.6;

/// Left indent change that breaks a paragraph.
const PARAGRAPH_INDENT_THRESHOLD: f32 = 18.0;

/// Font size change that breaks a paragraph.
const PARAGRAPH_FONT_CHANGE_THRESHOLD: f32 = 1.5;

/// Rules thinner than this and longer than `RULE_MIN_LENGTH` are
/// classified as horizontal/vertical rule segments.
const RULE_MAX_THICKNESS: f32 = 2.5;
const RULE_MIN_LENGTH: f32 = 8.0;

/// A contiguous run of text sharing one font setting.
#[derive(Debug, Clone)]
pub struct TextSpan {
    pub text: String,
    pub rect: Rect,
    pub font_size: f32,
    pub font_name: String,
    pub is_bold: bool,
    pub is_italic: bool,
}

/// A line of text; its rect encloses all of its spans.
#[derive(Debug, Clone)]
pub struct TextLine {
    pub spans: Vec<TextSpan>,
    pub rect: Rect,
    pub text: String,
    pub font_size: f32,
    pub is_bold: bool,
}

impl TextLine {
    /// Body-text shape test used by trimming and coverage metrics: wide
    /// relative to the reference width, body-range font.
    pub fn is_paragraph_shaped(&self, ref_width: f32) -> bool {
        self.rect.width() >= 0.5 * ref_width && (7.0..=16.0).contains(&self.font_size)
    }
}

/// Consecutive lines grouped into one paragraph-level block.
#[derive(Debug, Clone)]
pub struct TextBlock {
    pub rect: Rect,
    /// Index of the first line of this block in `PageView::lines`.
    pub first_line: usize,
    pub line_count: usize,
}

/// Coarse classification of a drawing/image object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Raster,
    VectorPath,
    HorizontalRule,
    VerticalRule,
}

/// A drawing or image bounding box on the page.
#[derive(Debug, Clone, Copy)]
pub struct PageObject {
    pub rect: Rect,
    pub kind: ObjectKind,
}

impl PageObject {
    pub fn raster(rect: Rect) -> Self {
        Self {
            rect,
            kind: ObjectKind::Raster,
        }
    }

    /// Classify a path bbox: thin-and-long boxes become rule segments.
    pub fn path(rect: Rect) -> Self {
        let kind = if rect.height() <= RULE_MAX_THICKNESS && rect.width() >= RULE_MIN_LENGTH {
            ObjectKind::HorizontalRule
        } else if rect.width() <= RULE_MAX_THICKNESS && rect.height() >= RULE_MIN_LENGTH {
            ObjectKind::VerticalRule
        } else {
            ObjectKind::VectorPath
        };
        Self { rect, kind }
    }
}

/// Read-only view of one page in top-left-origin points.
#[derive(Debug, Clone)]
pub struct PageView {
    /// 1-based page number.
    pub number: u32,
    pub rect: Rect,
    /// Lines sorted top-to-bottom, left-to-right.
    pub lines: Vec<TextLine>,
    /// Paragraph-level blocks over consecutive lines.
    pub blocks: Vec<TextBlock>,
    pub objects: Vec<PageObject>,
}

impl PageView {
    /// Assemble a view from raw spans and objects.
    pub fn assemble(number: u32, rect: Rect, spans: Vec<TextSpan>, objects: Vec<PageObject>) -> Self {
        let lines = spans_to_lines(spans);
        let blocks = lines_to_blocks(&lines);
        Self {
            number,
            rect,
            lines,
            blocks,
            objects,
        }
    }

    pub fn lines_in<'a>(&'a self, window: &'a Rect) -> impl Iterator<Item = &'a TextLine> {
        self.lines.iter().filter(move |l| l.rect.intersects(window))
    }

    pub fn objects_in<'a>(&'a self, window: &'a Rect) -> impl Iterator<Item = &'a PageObject> {
        self.objects.iter().filter(move |o| o.rect.intersects(window))
    }

    /// The block a line index belongs to, if any.
    pub fn block_for_line(&self, line_idx: usize) -> Option<&TextBlock> {
        self.blocks
            .iter()
            .find(|b| line_idx >= b.first_line && line_idx < b.first_line + b.line_count)
    }
}

/// Group spans into lines by vertical-center proximity, then sort each line
/// left-to-right. The tolerance is fixed to the first span's font size so it
/// does not shrink as subscripts join the line.
pub fn spans_to_lines(spans: Vec<TextSpan>) -> Vec<TextLine> {
    if spans.is_empty() {
        return Vec::new();
    }

    let mut sorted = spans;
    sorted.sort_by(|a, b| {
        let ay = (a.rect.y0 + a.rect.y1) / 2.0;
        let by = (b.rect.y0 + b.rect.y1) / 2.0;
        ay.total_cmp(&by).then_with(|| a.rect.x0.total_cmp(&b.rect.x0))
    });

    let mut lines: Vec<TextLine> = Vec::new();
    let first = sorted.remove(0);
    let mut tolerance_fs = first.font_size.max(1.0);
    let mut current: Vec<TextSpan> = vec![first];

    for span in sorted {
        let current_center =
            current.iter().map(|s| (s.rect.y0 + s.rect.y1) / 2.0).sum::<f32>() / current.len() as f32;
        let span_center = (span.rect.y0 + span.rect.y1) / 2.0;

        if (span_center - current_center).abs() < LINE_Y_TOLERANCE_FRACTION * tolerance_fs {
            current.push(span);
        } else {
            lines.push(finalize_line(current));
            tolerance_fs = span.font_size.max(1.0);
            current = vec![span];
        }
    }
    lines.push(finalize_line(current));
    lines
}

fn finalize_line(mut spans: Vec<TextSpan>) -> TextLine {
    spans.sort_by(|a, b| a.rect.x0.total_cmp(&b.rect.x0));

    let mut rect = spans[0].rect;
    let mut text = String::new();
    for span in &spans {
        rect = rect.union(&span.rect);
        if !text.is_empty() && needs_space_between(&text, &span.text) {
            text.push(' ');
        }
        text.push_str(&span.text);
    }

    let font_size = dominant_font_size(spans.iter().map(|s| s.font_size));
    let bold_count = spans.iter().filter(|s| s.is_bold).count();
    let majority = spans.len().div_ceil(2);

    TextLine {
        rect,
        text,
        font_size,
        is_bold: bold_count >= majority,
        spans,
    }
}

/// Most frequent font size, quantized to 0.5pt.
fn dominant_font_size(sizes: impl Iterator<Item = f32>) -> f32 {
    let mut counts: Vec<(i32, usize)> = Vec::new();
    for fs in sizes {
        let key = (fs * 2.0).round() as i32;
        if let Some(entry) = counts.iter_mut().find(|(k, _)| *k == key) {
            entry.1 += 1;
        } else {
            counts.push((key, 1));
        }
    }
    if counts.is_empty() {
        return 0.0;
    }
    counts.sort_by_key(|b| std::cmp::Reverse(b.1));
    counts[0].0 as f32 / 2.0
}

/// Returns true if the character is a CJK ideograph, Hiragana, Katakana, or Hangul.
pub fn is_cjk_char(c: char) -> bool {
    let cp = c as u32;
    matches!(cp,
        0x4E00..=0x9FFF
        | 0x3040..=0x309F
        | 0x30A0..=0x30FF
        | 0xAC00..=0xD7AF
        | 0x3400..=0x4DBF
        | 0xF900..=0xFAFF
    )
}

/// CJK text does not get spaces inserted between adjacent chunks.
fn needs_space_between(prev: &str, next: &str) -> bool {
    let prev_ends_cjk = prev.chars().last().is_some_and(is_cjk_char);
    let next_starts_cjk = next.chars().next().is_some_and(is_cjk_char);
    !(prev_ends_cjk && next_starts_cjk)
}

/// Group consecutive lines into paragraph blocks using vertical gaps,
/// indent changes, and font-size changes.
pub fn lines_to_blocks(lines: &[TextLine]) -> Vec<TextBlock> {
    if lines.is_empty() {
        return Vec::new();
    }

    // Baseline spacing: the smallest meaningful inter-line gap.
    let avg_font = lines.iter().map(|l| l.font_size).sum::<f32>() / lines.len() as f32;
    let mut spacings: Vec<f32> = lines
        .windows(2)
        .map(|w| (w[1].rect.y0 - w[0].rect.y0).abs())
        .filter(|&g| g > avg_font * 0.4)
        .collect();
    let base_spacing = if spacings.is_empty() {
        avg_font.max(1.0)
    } else {
        spacings.sort_by(|a, b| a.total_cmp(b));
        spacings[0]
    };

    let mut blocks: Vec<TextBlock> = Vec::new();
    let mut start = 0usize;
    let mut rect = lines[0].rect;

    for i in 1..lines.len() {
        let prev = &lines[i - 1];
        let line = &lines[i];

        let gap = line.rect.y0 - prev.rect.y1;
        let font_change = (line.font_size - prev.font_size).abs() > PARAGRAPH_FONT_CHANGE_THRESHOLD;
        let indent_change = (line.rect.x0 - prev.rect.x0).abs() > PARAGRAPH_INDENT_THRESHOLD;
        let big_gap = gap > base_spacing * PARAGRAPH_GAP_MULTIPLIER;
        let some_gap = gap > base_spacing * 0.8;

        if big_gap || (some_gap && (font_change || indent_change)) {
            blocks.push(TextBlock {
                rect,
                first_line: start,
                line_count: i - start,
            });
            start = i;
            rect = line.rect;
        } else {
            rect = rect.union(&line.rect);
        }
    }
    blocks.push(TextBlock {
        rect,
        first_line: start,
        line_count: lines.len() - start,
    });
    blocks
}

/// Fraction of the window height occupied by paragraph-shaped lines.
pub fn paragraph_coverage(lines: &[TextLine], window: &Rect) -> f32 {
    if window.height() <= 0.0 {
        return 0.0;
    }
    let covered: f32 = lines
        .iter()
        .filter(|l| l.is_paragraph_shaped(window.width()))
        .filter_map(|l| l.rect.intersection(window))
        .map(|r| r.height())
        .sum();
    (covered / window.height()).min(1.0)
}

/// Fraction of the window area intersected by object bboxes.
pub fn object_coverage(objects: &[PageObject], window: &Rect) -> f32 {
    if window.area() <= 0.0 {
        return 0.0;
    }
    let covered: f32 = objects
        .iter()
        .filter_map(|o| o.rect.intersection(window))
        .map(|r| r.area())
        .sum();
    (covered / window.area()).min(1.0)
}
