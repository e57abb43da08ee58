//! Run orchestration.
//!
//! `extract` opens a PDF through pdfium and drives the full pipeline;
//! `run_pipeline` does everything after page harvesting and is the entry
//! point integration tests use with synthetic pages and rasters. The
//! stages run strictly in order: metrics probe, optional layout model,
//! caption index, direction vote, then per-caption anchoring, refinement,
//! rendering, and finally the atomic index commit followed by pruning.

use crate::anchor::{self, AnchorContext, CaptionNeighbors, VoteOutcome};
use crate::caption::{self, UncertainId};
use crate::config::{AnchorMode, CropConfig, LayoutDriven};
use crate::debug_viz::{self, StageRects};
use crate::error::Result;
use crate::geometry::Rect;
use crate::ident::AttachmentKind;
use crate::layout::LayoutModel;
use crate::metrics::{LineMetrics, Thresholds};
use crate::output::{self, naming, AttachmentRecord, NameAllocator, RecordLayout, RecordMeta};
use crate::pdf::document::{DocumentInfo, PdfiumBackend};
use crate::pdf::page::PageView;
use crate::pdf::preview::PagePreview;
use crate::pdf::PageRaster;
use crate::refine::{self, RefineContext, StageDecision};
use crate::runlog::RunLog;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Confidence multipliers by outcome.
const CONFIDENCE_REFINED: f32 = 1.0;
const CONFIDENCE_A_ONLY: f32 = 0.85;
const CONFIDENCE_BASELINE: f32 = 0.70;
const CONFIDENCE_EMPTY: f32 = 0.50;

/// Minimum crop height in output pixels; crops are widened to this floor.
const MIN_CROP_HEIGHT_PX: f32 = 60.0;

/// What a finished run produced.
#[derive(Debug)]
pub struct ExtractionSummary {
    pub records: Vec<AttachmentRecord>,
    pub uncertain: Vec<UncertainId>,
    pub warnings: u32,
    pub rejections: u32,
    pub index_path: PathBuf,
    pub pruned: Vec<String>,
}

/// Open a PDF and extract every figure and table attachment into `out_dir`.
pub fn extract(pdf_path: &Path, out_dir: &Path, config: &CropConfig) -> Result<ExtractionSummary> {
    let backend = PdfiumBackend::new()?;
    let doc = backend.open(pdf_path)?;

    let mut pages = Vec::with_capacity(doc.page_count() as usize);
    for number in 1..=doc.page_count() {
        pages.push(doc.harvest(number)?);
    }

    let info = doc.info().clone();
    run_pipeline(&info, &pages, &doc, out_dir, config)
}

/// Everything after page harvesting, against any raster source.
pub fn run_pipeline(
    doc: &DocumentInfo,
    pages: &[PageView],
    raster: &dyn PageRaster,
    out_dir: &Path,
    config: &CropConfig,
) -> Result<ExtractionSummary> {
    std::fs::create_dir_all(out_dir)?;
    let mut log = RunLog::create(out_dir, config.run_log)?;
    log.event(
        "info",
        "run_started",
        json!({
            "pdf": doc.name,
            "pages": doc.page_count,
            "preset": config.preset.name(),
            "anchor_mode": anchor_mode_name(config.anchor_mode),
        }),
    );

    let metrics = LineMetrics::probe(pages);
    let thresholds = Thresholds::resolve(config, &metrics);
    log.event(
        "info",
        "line_metrics",
        json!({
            "typical_line_height": metrics.typical_line_height,
            "columns": metrics.columns,
            "sampled_lines": metrics.sampled_lines,
        }),
    );

    let layout = match config.layout_driven {
        LayoutDriven::Off => None,
        LayoutDriven::On | LayoutDriven::Auto => {
            let model = LayoutModel::build(pages, &metrics);
            if model.is_none() {
                log.warning("layout_model_unavailable", json!({}));
            }
            model
        }
    };
    if let Some(model) = &layout
        && config.debug_overlays
        && let Err(e) = output::write_layout_model(out_dir, model)
    {
        warn!(error = %e, "failed to write layout model dump");
    }

    let previews: Vec<PagePreview> = pages
        .iter()
        .map(|page| match PagePreview::build(raster, page.number, config.autocrop_white_th) {
            Ok(preview) => preview,
            Err(e) => {
                log.warning("preview_render_failed", json!({"page": page.number, "error": e.to_string()}));
                PagePreview::blank()
            }
        })
        .collect();

    let candidates = caption::build_candidates(pages);
    let selection = caption::select(pages, candidates, config.allow_continued, config.smart_caption_detection);
    for uncertain in &selection.uncertain {
        log.warning(
            "uncertain_caption",
            json!({
                "kind": uncertain.kind.to_string(),
                "ident": uncertain.ident.raw(),
                "best_score": uncertain.best_score,
                "candidates": uncertain.candidates,
            }),
        );
    }
    if selection.captions.is_empty() {
        log.warning("no_captions_detected", json!({}));
    }

    let vote_for = |kind: AttachmentKind| -> VoteOutcome {
        match config.anchor_mode {
            AnchorMode::V2 => {
                anchor::vote::global_vote(kind, &selection.captions, pages, &previews, layout.as_ref(), config)
            }
            AnchorMode::V1 => VoteOutcome::Auto,
        }
    };
    let figure_vote = vote_for(AttachmentKind::Figure);
    let table_vote = vote_for(AttachmentKind::Table);
    log.event(
        "info",
        "global_anchor_vote",
        json!({"figures": figure_vote, "tables": table_vote}),
    );

    let mut allocator = NameAllocator::new();
    let mut keyed: Vec<((u32, u8, (u8, char, i32)), AttachmentRecord)> = Vec::new();

    for caption in &selection.captions {
        let Some(pos) = pages.iter().position(|p| p.number == caption.page) else {
            continue;
        };
        let page = &pages[pos];
        let preview = &previews[pos];
        let page_layout = layout.as_ref().and_then(|m| m.page(caption.page));
        let page_captions: Vec<Rect> = selection
            .captions
            .iter()
            .filter(|c| c.page == caption.page)
            .map(|c| c.rect)
            .collect();

        let global = match caption.kind {
            AttachmentKind::Figure => figure_vote,
            AttachmentKind::Table => table_vote,
        };
        let anchor_ctx = AnchorContext {
            page,
            preview,
            layout: page_layout,
            config,
            kind: caption.kind,
            neighbors: CaptionNeighbors::of(&caption.rect, &page_captions),
        };
        let choice = anchor::choose(&caption.rect, caption.ident.raw(), &anchor_ctx, global);

        let (mut final_rect, stages_applied, decision, stage_rects, trace_value) = if choice.empty {
            let rect = choice.baseline_rect.clamped(&page.rect);
            (
                rect,
                vec!["baseline-empty".to_string()],
                None,
                StageRects {
                    baseline: rect,
                    after_a: None,
                    after_b: None,
                    after_d: None,
                    final_rect: rect,
                },
                json!([]),
            )
        } else {
            let refine_ctx = RefineContext {
                page,
                preview,
                raster,
                layout: page_layout,
                thresholds: &thresholds,
                config,
                caption_rect: caption.rect,
                caption_text: &caption.text,
                side: choice.side,
                kind: caption.kind,
            };
            let outcome = refine::run(choice.baseline_rect, &refine_ctx);
            if outcome.decision != StageDecision::Refined {
                log.rejection(
                    "gate_fallback",
                    json!({
                        "kind": caption.kind.to_string(),
                        "ident": caption.ident.raw(),
                        "decision": outcome.decision,
                        "far_coverage": outcome.far_coverage,
                    }),
                );
            }
            let stage_rects = StageRects {
                baseline: choice.baseline_rect,
                after_a: trace_after(&outcome.trace, &["A3", "A2", "A-two-line", "A1", "A"]),
                after_b: trace_after(&outcome.trace, &["B"]),
                after_d: trace_after(&outcome.trace, &["D"]),
                final_rect: outcome.rect,
            };
            let trace_value = serde_json::to_value(&outcome.trace).unwrap_or_else(|_| json!([]));
            (
                outcome.rect.clamped(&page.rect),
                outcome.stages_applied,
                Some(outcome.decision),
                stage_rects,
                trace_value,
            )
        };

        // Degenerate-crop floor: widen to the minimum pixel height.
        let min_height_pt = MIN_CROP_HEIGHT_PX * 72.0 / config.dpi as f32;
        if final_rect.height() < min_height_pt {
            let center = (final_rect.y0 + final_rect.y1) / 2.0;
            final_rect = Rect::new(
                final_rect.x0,
                center - min_height_pt / 2.0,
                final_rect.x1,
                center + min_height_pt / 2.0,
            )
            .clamped(&page.rect);
        }

        let image = match raster.render(caption.page, config.dpi as f32, Some(final_rect)) {
            Ok(image) => image,
            Err(e) => {
                log.warning(
                    "final_render_failed",
                    json!({
                        "kind": caption.kind.to_string(),
                        "ident": caption.ident.raw(),
                        "page": caption.page,
                        "error": e.to_string(),
                    }),
                );
                continue;
            }
        };

        let slug = naming::slug(&caption.tail, config.max_caption_words);
        let base = naming::base_name(
            caption.kind,
            caption.ident.raw(),
            &slug,
            caption.continued.then_some(caption.page),
        );
        let (file, collided) = allocator.claim(&base);
        if collided {
            log.warning("naming_collision", json!({"file": file}));
        }
        output::write_png(out_dir, &file, &image)?;

        let debug_artifacts = if config.debug_overlays {
            let stem = file.trim_end_matches(".png");
            match debug_viz::write_overlay(out_dir, stem, raster, caption.page, &stage_rects) {
                Ok(artifacts) => Some(artifacts),
                Err(e) => {
                    log.warning("debug_overlay_failed", json!({"file": file, "error": e.to_string()}));
                    None
                }
            }
        } else {
            None
        };

        let forced = config.forced_above(caption.kind, caption.ident.raw())
            || config.forced_below(caption.kind, caption.ident.raw());
        let confidence_factor = match decision {
            Some(StageDecision::Refined) => CONFIDENCE_REFINED,
            Some(StageDecision::AOnly) => CONFIDENCE_A_ONLY,
            Some(StageDecision::Baseline) => CONFIDENCE_BASELINE,
            None => CONFIDENCE_EMPTY,
        };
        let confidence = ((caption.score / 100.0).clamp(0.0, 1.0) * confidence_factor * 100.0).round() / 100.0;

        let (px_w, px_h) = image.dimensions();
        let record = AttachmentRecord {
            kind: caption.kind,
            ident: caption.ident.raw().to_string(),
            page: caption.page,
            caption_text: caption.text.clone(),
            file: file.clone(),
            continued: caption.continued,
            meta: RecordMeta {
                pdf_name: doc.name.clone(),
                pdf_hash: doc.sha256.clone(),
                page_count: doc.page_count,
                extractor_version: crate::VERSION.to_string(),
                preset: config.preset.name().to_string(),
            },
            layout: RecordLayout {
                columns: metrics.columns,
                typical_line_height: metrics.typical_line_height,
            },
            anchor_mode: anchor_mode_name(config.anchor_mode).to_string(),
            side: choice.side.name().to_string(),
            global_anchor_used: !forced && global != VoteOutcome::Auto,
            stages_applied,
            confidence,
            bbox_pt: [final_rect.x0, final_rect.y0, final_rect.x1, final_rect.y1],
            dpi: config.dpi,
            pixmap_size_px: [px_w, px_h],
            debug_artifacts,
        };

        log.event(
            "info",
            "attachment_emitted",
            json!({
                "kind": caption.kind.to_string(),
                "ident": caption.ident.raw(),
                "page": caption.page,
                "file": file,
                "stages": record.stages_applied,
                "bbox_pt": record.bbox_pt,
                "caption_score": caption.score,
                "scan": &choice.scan_trace,
                "trace": trace_value,
            }),
        );

        keyed.push(((caption.page, caption.kind.rank(), caption.ident.sort_key()), record));
    }

    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    let records: Vec<AttachmentRecord> = keyed.into_iter().map(|(_, r)| r).collect();

    let index_path = output::write_index(out_dir, &records)?;
    if config.csv_manifest {
        output::write_manifest(out_dir, &records)?;
    }

    // Pruning only ever runs after a committed index.
    let pruned = if config.prune_images {
        let pruned = output::prune(out_dir, &records)?;
        for file in &pruned {
            log.event("info", "pruned_stale_file", json!({"file": file}));
        }
        pruned
    } else {
        Vec::new()
    };

    log.event("info", "run_finished", json!({"records": records.len()}));
    let (warnings, rejections) = log.finish();
    info!(records = records.len(), warnings, "extraction finished");

    Ok(ExtractionSummary {
        records,
        uncertain: selection.uncertain,
        warnings,
        rejections,
        index_path,
        pruned,
    })
}

fn anchor_mode_name(mode: AnchorMode) -> &'static str {
    match mode {
        AnchorMode::V1 => "v1",
        AnchorMode::V2 => "v2",
    }
}

/// The `after` rect of the first trace entry matching any of `phases`,
/// searched in the given priority order.
fn trace_after(trace: &[refine::PhaseTrace], phases: &[&str]) -> Option<Rect> {
    phases
        .iter()
        .find_map(|phase| trace.iter().find(|t| t.phase == *phase).map(|t| t.after))
}
