//! Extract command: run the full pipeline on one PDF.

use anyhow::{Context, Result};
use cropmark::CropConfig;
use std::path::{Path, PathBuf};

/// CLI overrides for the extract command, applied on top of the config
/// file and environment. `None` / `false` leaves the underlying value
/// untouched.
#[derive(Debug, Default)]
pub struct ExtractOverrides {
    pub dpi: Option<u32>,
    pub clip_height: Option<f32>,
    pub margin_x: Option<f32>,
    pub caption_gap: Option<f32>,
    pub scan_heights: Option<Vec<f32>>,
    pub scan_step: Option<f32>,
    pub scan_dist_lambda: Option<f32>,
    pub caption_mid_guard: Option<f32>,
    pub no_text_trim: bool,
    pub adjacent_th: Option<f32>,
    pub far_text_th: Option<f32>,
    pub far_side_min_dist: Option<f32>,
    pub far_side_para_min_ratio: Option<f32>,
    pub object_pad: Option<f32>,
    pub object_min_area_ratio: Option<f32>,
    pub object_merge_gap: Option<f32>,
    pub no_autocrop: bool,
    pub autocrop_pad_px: Option<u32>,
    pub autocrop_white_th: Option<u8>,
    pub autocrop_shrink_limit: Option<f32>,
    pub autocrop_min_height_px: Option<u32>,
    pub protect_far_edge_px: Option<u32>,
    pub near_edge_pad_px: Option<u32>,
    pub refine_both_edges: bool,
    pub no_smart_captions: bool,
    pub layout_driven: Option<cropmark::LayoutDriven>,
    pub no_adaptive_line_height: bool,
    pub global_anchor: Option<cropmark::GlobalAnchor>,
    pub global_anchor_margin: Option<f32>,
    pub allow_continued: bool,
    pub anchor_mode: Option<cropmark::AnchorMode>,
    pub no_prune: bool,
    pub force_above: Option<Vec<String>>,
    pub force_below: Option<Vec<String>>,
    pub force_table_above: Option<Vec<String>>,
    pub force_table_below: Option<Vec<String>>,
    pub max_caption_words: Option<usize>,
    pub preset: Option<cropmark::Preset>,
    pub csv: bool,
    pub no_run_log: bool,
    pub debug_overlays: bool,
}

/// Apply CLI overrides to the config. CLI always wins.
pub fn apply_overrides(config: &mut CropConfig, o: &ExtractOverrides) {
    if let Some(v) = o.dpi {
        config.dpi = v;
    }
    if let Some(v) = o.clip_height {
        config.clip_height_pt = v;
    }
    if let Some(v) = o.margin_x {
        config.margin_x_pt = v;
    }
    if let Some(v) = o.caption_gap {
        config.caption_gap_pt = v;
    }
    if let Some(v) = &o.scan_heights {
        config.scan_heights = v.clone();
    }
    if let Some(v) = o.scan_step {
        config.scan_step_pt = v;
    }
    if let Some(v) = o.scan_dist_lambda {
        config.scan_dist_lambda = v;
    }
    if let Some(v) = o.caption_mid_guard {
        config.caption_mid_guard_pt = v;
    }
    if o.no_text_trim {
        config.text_trim = false;
    }
    if let Some(v) = o.adjacent_th {
        config.adjacent_th_pt = Some(v);
    }
    if let Some(v) = o.far_text_th {
        config.far_text_th_pt = Some(v);
    }
    if let Some(v) = o.far_side_min_dist {
        config.far_side_min_dist_pt = Some(v);
    }
    if let Some(v) = o.far_side_para_min_ratio {
        config.far_side_para_min_ratio = v;
    }
    if let Some(v) = o.object_pad {
        config.object_pad_pt = v;
    }
    if let Some(v) = o.object_min_area_ratio {
        config.object_min_area_ratio = Some(v);
    }
    if let Some(v) = o.object_merge_gap {
        config.object_merge_gap_pt = v;
    }
    if o.no_autocrop {
        config.autocrop = false;
    }
    if let Some(v) = o.autocrop_pad_px {
        config.autocrop_pad_px = v;
    }
    if let Some(v) = o.autocrop_white_th {
        config.autocrop_white_th = v;
    }
    if let Some(v) = o.autocrop_shrink_limit {
        config.autocrop_shrink_limit = v;
    }
    if let Some(v) = o.autocrop_min_height_px {
        config.autocrop_min_height_px = v;
    }
    if let Some(v) = o.protect_far_edge_px {
        config.protect_far_edge_px = v;
    }
    if let Some(v) = o.near_edge_pad_px {
        config.near_edge_pad_px = v;
    }
    if o.refine_both_edges {
        config.refine_near_edge_only = false;
    }
    if o.no_smart_captions {
        config.smart_caption_detection = false;
    }
    if let Some(v) = o.layout_driven {
        config.layout_driven = v;
    }
    if o.no_adaptive_line_height {
        config.adaptive_line_height = false;
    }
    if let Some(v) = o.global_anchor {
        config.global_anchor = v;
    }
    if let Some(v) = o.global_anchor_margin {
        config.global_anchor_margin = Some(v);
    }
    if o.allow_continued {
        config.allow_continued = true;
    }
    if let Some(v) = o.anchor_mode {
        config.anchor_mode = v;
    }
    if o.no_prune {
        config.prune_images = false;
    }
    if let Some(v) = &o.force_above {
        config.force_above_ids = v.clone();
    }
    if let Some(v) = &o.force_below {
        config.force_below_ids = v.clone();
    }
    if let Some(v) = &o.force_table_above {
        config.force_table_above_ids = v.clone();
    }
    if let Some(v) = &o.force_table_below {
        config.force_table_below_ids = v.clone();
    }
    if let Some(v) = o.max_caption_words {
        config.max_caption_words = v;
    }
    if let Some(v) = o.preset {
        config.preset = v;
    }
    if o.csv {
        config.csv_manifest = true;
    }
    if o.no_run_log {
        config.run_log = false;
    }
    if o.debug_overlays {
        config.debug_overlays = true;
    }
}

/// Run the extraction and report the outcome.
pub fn run(pdf: &Path, out: &PathBuf, config: CropConfig) -> Result<()> {
    let summary = cropmark::extract(pdf, out, &config)
        .with_context(|| format!("failed to extract attachments from '{}'", pdf.display()))?;

    for record in &summary.records {
        println!(
            "{} {} (page {}) -> {}  [{}]",
            record.kind.label(),
            record.ident,
            record.page,
            record.file,
            record.stages_applied.join(", ")
        );
    }
    for uncertain in &summary.uncertain {
        eprintln!(
            "warning: {} {} skipped, best caption candidate scored {:.0}",
            uncertain.kind.label(),
            uncertain.ident.raw(),
            uncertain.best_score
        );
    }
    println!(
        "{} attachment(s) -> {} ({} warning(s), {} pruned)",
        summary.records.len(),
        summary.index_path.display(),
        summary.warnings,
        summary.pruned.len()
    );
    Ok(())
}
