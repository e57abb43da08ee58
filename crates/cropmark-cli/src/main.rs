mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use commands::extract::ExtractOverrides;
use cropmark::{CropConfig, CropmarkError};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            ref pdf,
            ref out,
            dpi,
            clip_height,
            margin_x,
            caption_gap,
            ref scan_heights,
            scan_step,
            scan_dist_lambda,
            caption_mid_guard,
            no_text_trim,
            adjacent_th,
            far_text_th,
            far_side_min_dist,
            far_side_para_min_ratio,
            object_pad,
            object_min_area_ratio,
            object_merge_gap,
            no_autocrop,
            autocrop_pad_px,
            autocrop_white_th,
            autocrop_shrink_limit,
            autocrop_min_height_px,
            protect_far_edge_px,
            near_edge_pad_px,
            refine_both_edges,
            no_smart_captions,
            layout_driven,
            no_adaptive_line_height,
            global_anchor,
            global_anchor_margin,
            allow_continued,
            anchor_mode,
            no_prune,
            ref force_above,
            ref force_below,
            ref force_table_above,
            ref force_table_below,
            max_caption_words,
            preset,
            csv,
            no_run_log,
            debug_overlays,
        } => load_config(cli.config.as_deref(), pdf).and_then(|mut config| {
            let overrides = ExtractOverrides {
                dpi,
                clip_height,
                margin_x,
                caption_gap,
                scan_heights: scan_heights.clone(),
                scan_step,
                scan_dist_lambda,
                caption_mid_guard,
                no_text_trim,
                adjacent_th,
                far_text_th,
                far_side_min_dist,
                far_side_para_min_ratio,
                object_pad,
                object_min_area_ratio,
                object_merge_gap,
                no_autocrop,
                autocrop_pad_px,
                autocrop_white_th,
                autocrop_shrink_limit,
                autocrop_min_height_px,
                protect_far_edge_px,
                near_edge_pad_px,
                refine_both_edges,
                no_smart_captions,
                layout_driven: layout_driven.map(|v| v.to_config()),
                no_adaptive_line_height,
                global_anchor: global_anchor.map(|v| v.to_config()),
                global_anchor_margin,
                allow_continued,
                anchor_mode: anchor_mode.map(|v| v.to_config()),
                no_prune,
                force_above: force_above.clone(),
                force_below: force_below.clone(),
                force_table_above: force_table_above.clone(),
                force_table_below: force_table_below.clone(),
                max_caption_words,
                preset: preset.map(|v| v.to_config()),
                csv,
                no_run_log,
                debug_overlays,
            };
            commands::extract::apply_overrides(&mut config, &overrides);
            commands::extract::run(pdf, out, config)
        }),
        Commands::Captions { ref pdf, all } => commands::captions::run(pdf, all),
    };

    if let Err(error) = result {
        let kind = error
            .downcast_ref::<CropmarkError>()
            .map(CropmarkError::kind_name)
            .unwrap_or("Error");
        eprintln!("cropmark: {}: {:#}", kind, error);
        let code = match kind {
            "InputError" => 2,
            "IndexWriteError" => 3,
            _ => 1,
        };
        std::process::exit(code);
    }
}

/// Build the base config: file (explicit or discovered next to the PDF and
/// in the working directory), then environment variables.
fn load_config(explicit: Option<&std::path::Path>, pdf: &std::path::Path) -> anyhow::Result<CropConfig> {
    let pdf_dir = pdf.parent().map(|p| p.to_path_buf());
    let cwd = std::env::current_dir().ok();
    let mut search: Vec<&std::path::Path> = Vec::new();
    if let Some(dir) = pdf_dir.as_deref() {
        search.push(dir);
    }
    if let Some(dir) = cwd.as_deref() {
        search.push(dir);
    }

    let mut config = CropConfig::load(explicit, &search)?;
    config.apply_env()?;
    Ok(config)
}
