//! Document line-metrics probe.
//!
//! Samples the first few pages to find the document's typical font size,
//! line height, and column count. The resulting metrics drive the adaptive
//! trim thresholds; explicit config values always win over adaptive ones,
//! and adaptive ones win over the compile-time fallbacks.

use crate::config::CropConfig;
use crate::geometry::Rect;
use crate::pdf::page::{PageView, TextLine};
use serde::Serialize;

/// Pages sampled by the probe.
const PROBE_PAGE_LIMIT: usize = 5;

/// Minimum line dimensions considered by the probe.
const MIN_LINE_HEIGHT: f32 = 3.0;
const MIN_LINE_WIDTH: f32 = 10.0;

/// Body font range sampled by the probe.
const PROBE_FONT_RANGE: std::ops::RangeInclusive<f32> = 8.0..=14.0;

/// Below this many samples the probe returns the conservative default.
const MIN_SAMPLES: usize = 10;

/// Conservative fallback line height.
const DEFAULT_LINE_HEIGHT: f32 = 12.0;

/// Column split parameters (fractions of page width / sampled y-span).
const COLUMN_GAP_FRACTION: f32 = 0.04;
const COLUMN_SPAN_FRACTION: f32 = 0.3;

/// Document-wide typography facts.
#[derive(Debug, Clone, Serialize)]
pub struct LineMetrics {
    pub typical_font_size: f32,
    pub typical_line_height: f32,
    pub typical_line_gap: f32,
    pub median_line_height: f32,
    pub p75_line_height: f32,
    pub columns: u32,
    pub sampled_lines: usize,
}

impl LineMetrics {
    /// Conservative defaults for documents the probe cannot read.
    pub fn fallback() -> Self {
        Self {
            typical_font_size: 10.0,
            typical_line_height: DEFAULT_LINE_HEIGHT,
            typical_line_gap: 2.0,
            median_line_height: DEFAULT_LINE_HEIGHT,
            p75_line_height: DEFAULT_LINE_HEIGHT + 1.0,
            columns: 1,
            sampled_lines: 0,
        }
    }

    /// Probe up to the first five pages.
    pub fn probe(pages: &[PageView]) -> Self {
        let sample: Vec<&PageView> = pages.iter().take(PROBE_PAGE_LIMIT).collect();

        let mut heights: Vec<f32> = Vec::new();
        let mut fonts: Vec<f32> = Vec::new();
        let mut gaps: Vec<f32> = Vec::new();

        for page in &sample {
            let kept: Vec<&TextLine> = page.lines.iter().filter(|l| probe_keeps(l)).collect();
            for pair in kept.windows(2) {
                let gap = pair[1].rect.y0 - pair[0].rect.y1;
                if gap > 0.0 && gap < 3.0 * pair[0].font_size {
                    gaps.push(gap);
                }
            }
            for line in kept {
                heights.push(line.rect.height());
                fonts.push(line.font_size);
            }
        }

        if heights.len() < MIN_SAMPLES {
            return Self::fallback();
        }

        let median_line_height = trimmed_median(&mut heights.clone());
        let p75_line_height = percentile(&mut heights.clone(), 0.75);
        let typical_font_size = trimmed_median(&mut fonts);
        let typical_line_gap = if gaps.is_empty() {
            2.0
        } else {
            trimmed_median(&mut gaps)
        };

        Self {
            typical_font_size,
            typical_line_height: median_line_height,
            typical_line_gap,
            median_line_height,
            p75_line_height,
            columns: estimate_columns(&sample),
            sampled_lines: heights.len(),
        }
    }
}

fn probe_keeps(line: &TextLine) -> bool {
    line.rect.height() >= MIN_LINE_HEIGHT
        && line.rect.width() >= MIN_LINE_WIDTH
        && PROBE_FONT_RANGE.contains(&line.font_size)
}

/// Median over the middle 80% of the sorted samples.
fn trimmed_median(values: &mut [f32]) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let trim = values.len() / 10;
    let core = &values[trim..values.len() - trim];
    core[core.len() / 2]
}

fn percentile(values: &mut [f32], p: f32) -> f32 {
    values.sort_by(|a, b| a.total_cmp(b));
    let idx = ((values.len() - 1) as f32 * p).round() as usize;
    values[idx]
}

/// Column count from the largest horizontal gap between line edges: both
/// sides of a candidate split must span enough of the sampled height.
fn estimate_columns(pages: &[&PageView]) -> u32 {
    let mut edges: Vec<(f32, f32)> = Vec::new();
    let mut y_min = f32::MAX;
    let mut y_max = f32::MIN;
    let mut page_width = 0.0f32;

    for page in pages {
        page_width = page_width.max(page.rect.width());
        for line in page.lines.iter().filter(|l| probe_keeps(l)) {
            edges.push((line.rect.x0, line.rect.x1));
            y_min = y_min.min(line.rect.y0);
            y_max = y_max.max(line.rect.y1);
        }
    }

    let y_span = y_max - y_min;
    if edges.len() < 8 || y_span < 1.0 || page_width < 1.0 {
        return 1;
    }

    edges.sort_by(|a, b| a.0.total_cmp(&b.0));
    let min_gap = page_width * COLUMN_GAP_FRACTION;

    let mut max_right = f32::MIN;
    let mut best_gap = 0.0f32;
    let mut best_split = None;
    for &(left, right) in &edges {
        if max_right > f32::MIN {
            let gap = left - max_right;
            if gap > min_gap && gap > best_gap {
                best_gap = gap;
                best_split = Some((max_right + left) / 2.0);
            }
        }
        max_right = max_right.max(right);
    }

    let Some(split_x) = best_split else {
        return 1;
    };

    let span_of = |pred: &dyn Fn(&Rect) -> bool| -> f32 {
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for page in pages {
            for line in page.lines.iter().filter(|l| probe_keeps(l)) {
                if pred(&line.rect) {
                    lo = lo.min(line.rect.y0);
                    hi = hi.max(line.rect.y1);
                }
            }
        }
        if hi > lo { hi - lo } else { 0.0 }
    };

    let left_span = span_of(&|r: &Rect| (r.x0 + r.x1) / 2.0 < split_x);
    let right_span = span_of(&|r: &Rect| (r.x0 + r.x1) / 2.0 >= split_x);

    if left_span >= y_span * COLUMN_SPAN_FRACTION && right_span >= y_span * COLUMN_SPAN_FRACTION {
        2
    } else {
        1
    }
}

/// Resolved trim thresholds, point units.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Thresholds {
    pub adjacent_th: f32,
    pub far_text_th: f32,
    pub text_trim_gap: f32,
    pub far_side_min_dist: f32,
    /// The line height the adaptive values derive from.
    pub line_height: f32,
}

impl Thresholds {
    /// Merge order: explicit config value > adaptive (line-height multiple)
    /// > compile-time fallback.
    pub fn resolve(config: &CropConfig, metrics: &LineMetrics) -> Self {
        let l = metrics.typical_line_height;
        let adaptive = config.adaptive_line_height;

        let pick = |explicit: Option<f32>, factor: f32, fallback: f32| -> f32 {
            match explicit {
                Some(v) => v,
                None if adaptive => factor * l,
                None => fallback,
            }
        };

        Self {
            adjacent_th: pick(config.adjacent_th_pt, 2.0, 24.0),
            far_text_th: pick(config.far_text_th_pt, 10.0, 300.0),
            text_trim_gap: if adaptive { 0.5 * l } else { 6.0 },
            far_side_min_dist: pick(config.far_side_min_dist_pt, 8.0, 100.0),
            line_height: l,
        }
    }
}
