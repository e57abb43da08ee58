use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Extract figure and table attachments from research PDFs.
#[derive(Debug, Parser)]
#[command(name = "cropmark", about, version)]
pub struct Cli {
    /// Config file (defaults to cropmark.toml / cropmark.json discovery)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Extract cropped attachment PNGs and the JSON index
    Extract {
        /// Path to the PDF file
        #[arg(value_name = "PDF")]
        pdf: PathBuf,

        /// Output directory (created if missing)
        #[arg(short, long, value_name = "DIR")]
        out: PathBuf,

        /// Render resolution for the cropped PNGs
        #[arg(long)]
        dpi: Option<u32>,

        /// Candidate window height in points
        #[arg(long, value_name = "PT")]
        clip_height: Option<f32>,

        /// Horizontal page margin in points
        #[arg(long, value_name = "PT")]
        margin_x: Option<f32>,

        /// Gap between caption and window in points
        #[arg(long, value_name = "PT")]
        caption_gap: Option<f32>,

        /// Scan heights in points, comma-separated
        #[arg(long, value_name = "PT,PT,...", value_delimiter = ',')]
        scan_heights: Option<Vec<f32>>,

        /// Scan step in points
        #[arg(long, value_name = "PT")]
        scan_step: Option<f32>,

        /// Distance penalty weight in the scan score
        #[arg(long)]
        scan_dist_lambda: Option<f32>,

        /// Guard distance from the midpoint between captions, points
        #[arg(long, value_name = "PT")]
        caption_mid_guard: Option<f32>,

        /// Disable the text-trim phase
        #[arg(long)]
        no_text_trim: bool,

        /// Near-adjacent trim band in points (default: adaptive)
        #[arg(long, value_name = "PT")]
        adjacent_th: Option<f32>,

        /// Near-distant trim band in points (default: adaptive)
        #[arg(long, value_name = "PT")]
        far_text_th: Option<f32>,

        /// Far-side trim minimum distance in points (default: adaptive)
        #[arg(long, value_name = "PT")]
        far_side_min_dist: Option<f32>,

        /// Minimum paragraph coverage before the far side is trimmed
        #[arg(long)]
        far_side_para_min_ratio: Option<f32>,

        /// Object padding in points
        #[arg(long, value_name = "PT")]
        object_pad: Option<f32>,

        /// Minimum object area ratio (default: 0.012 figures, 0.005 tables)
        #[arg(long)]
        object_min_area_ratio: Option<f32>,

        /// Object merge gap in points
        #[arg(long, value_name = "PT")]
        object_merge_gap: Option<f32>,

        /// Disable the whitespace autocrop phase
        #[arg(long)]
        no_autocrop: bool,

        /// Autocrop padding in pixels
        #[arg(long, value_name = "PX")]
        autocrop_pad_px: Option<u32>,

        /// White threshold (0-255)
        #[arg(long)]
        autocrop_white_th: Option<u8>,

        /// Maximum area fraction the autocrop may remove
        #[arg(long)]
        autocrop_shrink_limit: Option<f32>,

        /// Minimum crop height in pixels
        #[arg(long, value_name = "PX")]
        autocrop_min_height_px: Option<u32>,

        /// Far-edge shrink budget in pixels
        #[arg(long, value_name = "PX")]
        protect_far_edge_px: Option<u32>,

        /// Near-edge pad-back after a rejected autocrop, pixels
        #[arg(long, value_name = "PX")]
        near_edge_pad_px: Option<u32>,

        /// Let the object alignment move both edges
        #[arg(long)]
        refine_both_edges: bool,

        /// Take the first caption candidate instead of scoring
        #[arg(long)]
        no_smart_captions: bool,

        /// Layout model usage
        #[arg(long, value_enum)]
        layout_driven: Option<LayoutDrivenArg>,

        /// Disable adaptive line-height thresholds
        #[arg(long)]
        no_adaptive_line_height: bool,

        /// Document-wide anchor direction vote
        #[arg(long, value_enum)]
        global_anchor: Option<GlobalAnchorArg>,

        /// Vote margin override
        #[arg(long)]
        global_anchor_margin: Option<f32>,

        /// Allow one caption per page for the same identifier
        #[arg(long)]
        allow_continued: bool,

        /// Anchor selection strategy
        #[arg(long, value_enum)]
        anchor_mode: Option<AnchorModeArg>,

        /// Keep stale Figure_*/Table_* files after the run
        #[arg(long)]
        no_prune: bool,

        /// Figure ids forced above the caption, comma-separated
        #[arg(long, value_name = "ID,ID,...", value_delimiter = ',')]
        force_above: Option<Vec<String>>,

        /// Figure ids forced below the caption, comma-separated
        #[arg(long, value_name = "ID,ID,...", value_delimiter = ',')]
        force_below: Option<Vec<String>>,

        /// Table ids forced above the caption, comma-separated
        #[arg(long, value_name = "ID,ID,...", value_delimiter = ',')]
        force_table_above: Option<Vec<String>>,

        /// Table ids forced below the caption, comma-separated
        #[arg(long, value_name = "ID,ID,...", value_delimiter = ',')]
        force_table_below: Option<Vec<String>>,

        /// Caption words used in the filename slug
        #[arg(long)]
        max_caption_words: Option<usize>,

        /// Option preset
        #[arg(long, value_enum)]
        preset: Option<PresetArg>,

        /// Also write a CSV manifest
        #[arg(long)]
        csv: bool,

        /// Skip writing run.log.jsonl
        #[arg(long)]
        no_run_log: bool,

        /// Write per-attachment stage overlays under <out>/debug/
        #[arg(long)]
        debug_overlays: bool,
    },

    /// List caption candidates with their score breakdowns as JSON
    Captions {
        /// Path to the PDF file
        #[arg(value_name = "PDF")]
        pdf: PathBuf,

        /// Include candidates below the acceptance threshold
        #[arg(long)]
        all: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum AnchorModeArg {
    V1,
    V2,
}

impl AnchorModeArg {
    pub fn to_config(self) -> cropmark::AnchorMode {
        match self {
            AnchorModeArg::V1 => cropmark::AnchorMode::V1,
            AnchorModeArg::V2 => cropmark::AnchorMode::V2,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LayoutDrivenArg {
    Auto,
    On,
    Off,
}

impl LayoutDrivenArg {
    pub fn to_config(self) -> cropmark::LayoutDriven {
        match self {
            LayoutDrivenArg::Auto => cropmark::LayoutDriven::Auto,
            LayoutDrivenArg::On => cropmark::LayoutDriven::On,
            LayoutDrivenArg::Off => cropmark::LayoutDriven::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum GlobalAnchorArg {
    Auto,
    Off,
}

impl GlobalAnchorArg {
    pub fn to_config(self) -> cropmark::GlobalAnchor {
        match self {
            GlobalAnchorArg::Auto => cropmark::GlobalAnchor::Auto,
            GlobalAnchorArg::Off => cropmark::GlobalAnchor::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum PresetArg {
    Robust,
    None,
}

impl PresetArg {
    pub fn to_config(self) -> cropmark::Preset {
        match self {
            PresetArg::Robust => cropmark::Preset::Robust,
            PresetArg::None => cropmark::Preset::None,
        }
    }
}
