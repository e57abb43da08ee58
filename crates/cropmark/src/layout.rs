//! Optional layout model.
//!
//! Classifies each page's blocks into paragraph and title regions. The
//! model only *guides* other phases: window scoring downweights overlap
//! with paragraph regions, and the far-side trim vetoes section headings.
//! Every consumer degrades to its unguided form when the model is absent.

use crate::geometry::Rect;
use crate::metrics::LineMetrics;
use crate::pdf::page::PageView;
use serde::Serialize;

/// Titles are at most this many words.
const TITLE_MAX_WORDS: usize = 12;

/// Titles are at most this many lines.
const TITLE_MAX_LINES: usize = 2;

/// Font-size ratio over body text that marks a title.
const TITLE_FONT_RATIO: f32 = 1.15;

/// Paragraph regions need at least this fraction of page width.
const PARAGRAPH_MIN_WIDTH_FRACTION: f32 = 0.35;

/// Block classification for one page.
#[derive(Debug, Clone, Serialize)]
pub struct PageLayout {
    pub page: u32,
    pub paragraphs: Vec<Rect>,
    pub titles: Vec<Rect>,
}

impl PageLayout {
    /// Fraction of the window area covered by paragraph regions.
    pub fn paragraph_overlap(&self, window: &Rect) -> f32 {
        if window.area() <= 0.0 {
            return 0.0;
        }
        let covered: f32 = self
            .paragraphs
            .iter()
            .filter_map(|p| p.intersection(window))
            .map(|r| r.area())
            .sum();
        (covered / window.area()).min(1.0)
    }

    /// Whether any title region intersects the given band.
    pub fn title_in(&self, band: &Rect) -> bool {
        self.titles.iter().any(|t| t.intersects(band))
    }
}

/// Document-wide layout guidance.
#[derive(Debug, Clone, Serialize)]
pub struct LayoutModel {
    pub pages: Vec<PageLayout>,
}

impl LayoutModel {
    /// Build the model; `None` when there is nothing to classify.
    pub fn build(pages: &[PageView], metrics: &LineMetrics) -> Option<Self> {
        if pages.iter().all(|p| p.lines.is_empty()) {
            return None;
        }

        let layouts = pages.iter().map(|p| classify_page(p, metrics)).collect();
        Some(Self { pages: layouts })
    }

    pub fn page(&self, number: u32) -> Option<&PageLayout> {
        self.pages.iter().find(|p| p.page == number)
    }
}

fn classify_page(page: &PageView, metrics: &LineMetrics) -> PageLayout {
    let mut paragraphs = Vec::new();
    let mut titles = Vec::new();

    for block in &page.blocks {
        let lines = &page.lines[block.first_line..block.first_line + block.line_count];
        let word_count: usize = lines.iter().map(|l| l.text.split_whitespace().count()).sum();
        let bold_majority = lines.iter().filter(|l| l.is_bold).count() * 2 >= lines.len();
        let max_font = lines.iter().map(|l| l.font_size).fold(0.0f32, f32::max);

        let looks_like_title = block.line_count <= TITLE_MAX_LINES
            && word_count <= TITLE_MAX_WORDS
            && (bold_majority || max_font > metrics.typical_font_size * TITLE_FONT_RATIO);

        if looks_like_title {
            titles.push(block.rect);
            continue;
        }

        let wide_enough = block.rect.width() >= page.rect.width() * PARAGRAPH_MIN_WIDTH_FRACTION;
        let body_font = lines.iter().any(|l| (7.0..=16.0).contains(&l.font_size));
        if wide_enough && body_font && (block.line_count >= 2 || word_count >= 10) {
            paragraphs.push(block.rect);
        }
    }

    PageLayout {
        page: page.number,
        paragraphs,
        titles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::page::{lines_to_blocks, TextLine, TextSpan};

    fn line(text: &str, x0: f32, y0: f32, x1: f32, fs: f32, bold: bool) -> TextLine {
        let rect = Rect::new(x0, y0, x1, y0 + fs * 1.2);
        TextLine {
            spans: vec![TextSpan {
                text: text.to_string(),
                rect,
                font_size: fs,
                font_name: "Times".to_string(),
                is_bold: bold,
                is_italic: false,
            }],
            rect,
            text: text.to_string(),
            font_size: fs,
            is_bold: bold,
        }
    }

    fn page(lines: Vec<TextLine>) -> PageView {
        PageView {
            number: 1,
            rect: Rect::new(0.0, 0.0, 612.0, 792.0),
            blocks: lines_to_blocks(&lines),
            lines,
            objects: Vec::new(),
        }
    }

    #[test]
    fn test_paragraph_block_classified() {
        let p = page(vec![
            line("a long run of body text continuing on", 72.0, 100.0, 540.0, 10.0, false),
            line("the next line of the same paragraph here", 72.0, 114.0, 540.0, 10.0, false),
            line("and a third line to finish the thought", 72.0, 128.0, 540.0, 10.0, false),
        ]);
        let model = LayoutModel::build(std::slice::from_ref(&p), &LineMetrics::fallback()).unwrap();
        let layout = model.page(1).unwrap();
        assert_eq!(layout.paragraphs.len(), 1);
        assert!(layout.titles.is_empty());
    }

    #[test]
    fn test_bold_short_block_is_title() {
        let p = page(vec![line("3 Results", 72.0, 100.0, 180.0, 10.0, true)]);
        let model = LayoutModel::build(std::slice::from_ref(&p), &LineMetrics::fallback()).unwrap();
        let layout = model.page(1).unwrap();
        assert_eq!(layout.titles.len(), 1);
        assert!(layout.paragraphs.is_empty());
    }

    #[test]
    fn test_large_font_block_is_title() {
        let p = page(vec![line("Methods Overview", 72.0, 100.0, 300.0, 16.0, false)]);
        let model = LayoutModel::build(std::slice::from_ref(&p), &LineMetrics::fallback()).unwrap();
        assert_eq!(model.page(1).unwrap().titles.len(), 1);
    }

    #[test]
    fn test_empty_document_yields_none() {
        let p = page(Vec::new());
        assert!(LayoutModel::build(std::slice::from_ref(&p), &LineMetrics::fallback()).is_none());
    }

    #[test]
    fn test_paragraph_overlap_fraction() {
        let layout = PageLayout {
            page: 1,
            paragraphs: vec![Rect::new(0.0, 0.0, 100.0, 50.0)],
            titles: Vec::new(),
        };
        let window = Rect::new(0.0, 0.0, 100.0, 100.0);
        assert!((layout.paragraph_overlap(&window) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_title_in_band() {
        let layout = PageLayout {
            page: 1,
            paragraphs: Vec::new(),
            titles: vec![Rect::new(72.0, 100.0, 200.0, 114.0)],
        };
        assert!(layout.title_in(&Rect::new(0.0, 90.0, 612.0, 120.0)));
        assert!(!layout.title_in(&Rect::new(0.0, 300.0, 612.0, 400.0)));
    }
}
