//! Run configuration.
//!
//! `CropConfig` is an immutable record built once per run by merging, in
//! order: built-in defaults, an optional `cropmark.toml` / `cropmark.json`
//! file, `CROPMARK_*` environment variables, and finally CLI overrides
//! (applied by the caller). Adaptive line-height defaults are *not* stored
//! here; [`crate::metrics::Thresholds::resolve`] merges them at use sites,
//! so an explicit value always wins over the adaptive one and the adaptive
//! one wins over the compile-time fallback.
//!
//! The built record is passed by reference to every phase; no phase reads
//! process-wide state.

use crate::error::{CropmarkError, Result};
use crate::ident::AttachmentKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Anchor selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorMode {
    V1,
    V2,
}

/// Whether the layout model guides anchor scoring and far-side trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutDriven {
    Auto,
    On,
    Off,
}

/// Document-wide anchor direction voting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalAnchor {
    Auto,
    Off,
}

/// Named option bundles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    Robust,
    None,
}

impl FromStr for AnchorMode {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "v1" => Ok(AnchorMode::V1),
            "v2" => Ok(AnchorMode::V2),
            other => Err(format!("unknown anchor mode '{}', expected v1|v2", other)),
        }
    }
}

impl FromStr for LayoutDriven {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(LayoutDriven::Auto),
            "on" => Ok(LayoutDriven::On),
            "off" => Ok(LayoutDriven::Off),
            other => Err(format!("unknown layout mode '{}', expected auto|on|off", other)),
        }
    }
}

impl FromStr for GlobalAnchor {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(GlobalAnchor::Auto),
            "off" => Ok(GlobalAnchor::Off),
            other => Err(format!("unknown global anchor mode '{}', expected auto|off", other)),
        }
    }
}

impl FromStr for Preset {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.to_ascii_lowercase().as_str() {
            "robust" => Ok(Preset::Robust),
            "none" => Ok(Preset::None),
            other => Err(format!("unknown preset '{}', expected robust|none", other)),
        }
    }
}

impl Preset {
    pub fn name(&self) -> &'static str {
        match self {
            Preset::Robust => "robust",
            Preset::None => "none",
        }
    }
}

/// All recognized options with their documented defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CropConfig {
    /// Output render resolution for the cropped PNGs.
    pub dpi: u32,
    /// Height of the one-sided candidate window around a caption.
    pub clip_height_pt: f32,
    /// Horizontal margin stripped from both page edges.
    pub margin_x_pt: f32,
    /// Vertical gap kept between the caption and the window's near edge.
    pub caption_gap_pt: f32,

    /// Candidate window heights for the multi-scale scan.
    pub scan_heights: Vec<f32>,
    /// Step between intermediate scan heights.
    pub scan_step_pt: f32,
    /// Distance penalty weight in the scan score.
    pub scan_dist_lambda: f32,
    /// Guard distance kept from the midpoint between two captions.
    pub caption_mid_guard_pt: f32,

    /// Enable the text-trim refinement phase.
    pub text_trim: bool,
    /// Near-adjacent trim band; None = adaptive (2x line height), fallback 24.
    pub adjacent_th_pt: Option<f32>,
    /// Near-distant trim band; None = adaptive (10x line height), fallback 300.
    pub far_text_th_pt: Option<f32>,
    /// Far-side trim minimum distance; None = adaptive (8x line height), fallback 100.
    pub far_side_min_dist_pt: Option<f32>,
    /// Minimum paragraph coverage before the far side is trimmed.
    pub far_side_para_min_ratio: f32,

    /// Padding added around the object component in the alignment phase.
    pub object_pad_pt: f32,
    /// Minimum object area as a fraction of the window area; None = 0.012
    /// for figures, 0.005 for tables.
    pub object_min_area_ratio: Option<f32>,
    /// Gap under which neighboring objects merge into one component.
    pub object_merge_gap_pt: f32,

    /// Enable the whitespace autocrop phase.
    pub autocrop: bool,
    pub autocrop_pad_px: u32,
    /// Pixel values at or above this count as white.
    pub autocrop_white_th: u8,
    /// Reject the autocrop when it removes more than this area fraction.
    pub autocrop_shrink_limit: f32,
    pub autocrop_min_height_px: u32,
    /// The far edge never moves inward by more than this many pixels.
    pub protect_far_edge_px: u32,
    /// Pad-back applied to the near edge after a rejected autocrop.
    pub near_edge_pad_px: u32,
    /// Object alignment moves only the near edge.
    pub refine_near_edge_only: bool,

    /// Score captions and gate on the score; off takes the first candidate.
    pub smart_caption_detection: bool,
    pub layout_driven: LayoutDriven,
    /// Derive trim thresholds from the document's typical line height.
    pub adaptive_line_height: bool,
    pub global_anchor: GlobalAnchor,
    /// Vote margin; None = 0.02 for figures, 0.03 for tables.
    pub global_anchor_margin: Option<f32>,
    /// Allow one caption per page for the same identifier.
    pub allow_continued: bool,
    pub anchor_mode: AnchorMode,
    /// Delete stale Figure_*/Table_* files after a successful index commit.
    pub prune_images: bool,

    /// Identifiers whose window is forced above / below the caption.
    pub force_above_ids: Vec<String>,
    pub force_below_ids: Vec<String>,
    pub force_table_above_ids: Vec<String>,
    pub force_table_below_ids: Vec<String>,

    /// Caption words used in the output filename slug.
    pub max_caption_words: usize,
    pub preset: Preset,

    /// Emit a CSV manifest next to the index.
    pub csv_manifest: bool,
    /// Write run.log.jsonl into the output directory.
    pub run_log: bool,
    /// Write per-attachment stage overlays under <out>/debug/.
    pub debug_overlays: bool,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            dpi: 300,
            clip_height_pt: 650.0,
            margin_x_pt: 20.0,
            caption_gap_pt: 5.0,
            scan_heights: vec![180.0, 260.0, 340.0, 420.0, 500.0, 650.0],
            scan_step_pt: 14.0,
            scan_dist_lambda: 0.12,
            caption_mid_guard_pt: 6.0,
            text_trim: true,
            adjacent_th_pt: None,
            far_text_th_pt: None,
            far_side_min_dist_pt: None,
            far_side_para_min_ratio: 0.20,
            object_pad_pt: 8.0,
            object_min_area_ratio: None,
            object_merge_gap_pt: 6.0,
            autocrop: true,
            autocrop_pad_px: 30,
            autocrop_white_th: 250,
            autocrop_shrink_limit: 0.30,
            autocrop_min_height_px: 80,
            protect_far_edge_px: 14,
            near_edge_pad_px: 32,
            refine_near_edge_only: true,
            smart_caption_detection: true,
            layout_driven: LayoutDriven::On,
            adaptive_line_height: true,
            global_anchor: GlobalAnchor::Auto,
            global_anchor_margin: None,
            allow_continued: false,
            anchor_mode: AnchorMode::V2,
            prune_images: true,
            force_above_ids: Vec::new(),
            force_below_ids: Vec::new(),
            force_table_above_ids: Vec::new(),
            force_table_below_ids: Vec::new(),
            max_caption_words: 12,
            preset: Preset::Robust,
            csv_manifest: false,
            run_log: true,
            debug_overlays: false,
        }
    }
}

impl CropConfig {
    /// Load from a TOML file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        toml::from_str(&content)
            .map_err(|e| CropmarkError::config_with_source(format!("invalid config file {}", path.as_ref().display()), e))
    }

    /// Load from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&content)
            .map_err(|e| CropmarkError::config_with_source(format!("invalid config file {}", path.as_ref().display()), e))
    }

    /// Look for `cropmark.toml` / `cropmark.json` in the given directories,
    /// first hit wins.
    pub fn discover(dirs: &[&Path]) -> Option<PathBuf> {
        for dir in dirs {
            for name in ["cropmark.toml", "cropmark.json"] {
                let candidate = dir.join(name);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }
        None
    }

    /// Build the base config: defaults, then an explicit or discovered
    /// config file if present.
    pub fn load(explicit: Option<&Path>, search_dirs: &[&Path]) -> Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(search_dirs),
        };
        match path {
            Some(p) if p.extension().is_some_and(|e| e == "json") => Self::from_json_file(p),
            Some(p) => Self::from_toml_file(p),
            None => Ok(Self::default()),
        }
    }

    /// Overlay `CROPMARK_*` environment variables. Unknown variables with
    /// the prefix are rejected so typos do not silently fall back.
    pub fn apply_env(&mut self) -> Result<()> {
        for (key, value) in std::env::vars() {
            let Some(name) = key.strip_prefix("CROPMARK_") else {
                continue;
            };
            self.apply_env_var(name, &value)
                .map_err(|msg| CropmarkError::config(format!("{}={}: {}", key, value, msg)))?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, name: &str, value: &str) -> std::result::Result<(), String> {
        fn num<T: FromStr>(value: &str) -> std::result::Result<T, String>
        where
            T::Err: std::fmt::Display,
        {
            value.parse::<T>().map_err(|e| e.to_string())
        }
        fn flag(value: &str) -> std::result::Result<bool, String> {
            match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => Err(format!("expected a boolean, got '{}'", other)),
            }
        }
        fn id_list(value: &str) -> Vec<String> {
            value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }

        match name {
            "DPI" => self.dpi = num(value)?,
            "CLIP_HEIGHT_PT" => self.clip_height_pt = num(value)?,
            "MARGIN_X_PT" => self.margin_x_pt = num(value)?,
            "CAPTION_GAP_PT" => self.caption_gap_pt = num(value)?,
            "SCAN_HEIGHTS" => {
                let heights: std::result::Result<Vec<f32>, String> =
                    value.split(',').map(|s| num::<f32>(s.trim())).collect();
                let heights = heights?;
                if heights.is_empty() {
                    return Err("expected a comma-separated list of heights".to_string());
                }
                self.scan_heights = heights;
            }
            "SCAN_STEP_PT" => self.scan_step_pt = num(value)?,
            "SCAN_DIST_LAMBDA" => self.scan_dist_lambda = num(value)?,
            "CAPTION_MID_GUARD_PT" => self.caption_mid_guard_pt = num(value)?,
            "TEXT_TRIM" => self.text_trim = flag(value)?,
            "ADJACENT_TH_PT" => self.adjacent_th_pt = Some(num(value)?),
            "FAR_TEXT_TH_PT" => self.far_text_th_pt = Some(num(value)?),
            "FAR_SIDE_MIN_DIST_PT" => self.far_side_min_dist_pt = Some(num(value)?),
            "FAR_SIDE_PARA_MIN_RATIO" => self.far_side_para_min_ratio = num(value)?,
            "OBJECT_PAD_PT" => self.object_pad_pt = num(value)?,
            "OBJECT_MIN_AREA_RATIO" => self.object_min_area_ratio = Some(num(value)?),
            "OBJECT_MERGE_GAP_PT" => self.object_merge_gap_pt = num(value)?,
            "AUTOCROP" => self.autocrop = flag(value)?,
            "AUTOCROP_PAD_PX" => self.autocrop_pad_px = num(value)?,
            "AUTOCROP_WHITE_TH" => self.autocrop_white_th = num(value)?,
            "AUTOCROP_SHRINK_LIMIT" => self.autocrop_shrink_limit = num(value)?,
            "AUTOCROP_MIN_HEIGHT_PX" => self.autocrop_min_height_px = num(value)?,
            "PROTECT_FAR_EDGE_PX" => self.protect_far_edge_px = num(value)?,
            "NEAR_EDGE_PAD_PX" => self.near_edge_pad_px = num(value)?,
            "REFINE_NEAR_EDGE_ONLY" => self.refine_near_edge_only = flag(value)?,
            "SMART_CAPTION_DETECTION" => self.smart_caption_detection = flag(value)?,
            "LAYOUT_DRIVEN" => self.layout_driven = value.parse()?,
            "ADAPTIVE_LINE_HEIGHT" => self.adaptive_line_height = flag(value)?,
            "GLOBAL_ANCHOR" => self.global_anchor = value.parse()?,
            "GLOBAL_ANCHOR_MARGIN" => self.global_anchor_margin = Some(num(value)?),
            "ALLOW_CONTINUED" => self.allow_continued = flag(value)?,
            "ANCHOR_MODE" => self.anchor_mode = value.parse()?,
            "PRUNE_IMAGES" => self.prune_images = flag(value)?,
            "FORCE_ABOVE_IDS" => self.force_above_ids = id_list(value),
            "FORCE_BELOW_IDS" => self.force_below_ids = id_list(value),
            "FORCE_TABLE_ABOVE_IDS" => self.force_table_above_ids = id_list(value),
            "FORCE_TABLE_BELOW_IDS" => self.force_table_below_ids = id_list(value),
            "MAX_CAPTION_WORDS" => self.max_caption_words = num(value)?,
            "PRESET" => self.preset = value.parse()?,
            "CSV_MANIFEST" => self.csv_manifest = flag(value)?,
            "RUN_LOG" => self.run_log = flag(value)?,
            "DEBUG_OVERLAYS" => self.debug_overlays = flag(value)?,
            other => return Err(format!("unrecognized option CROPMARK_{}", other)),
        }
        Ok(())
    }

    /// Vote margin for the global direction vote.
    pub fn vote_margin(&self, kind: AttachmentKind) -> f32 {
        self.global_anchor_margin.unwrap_or(match kind {
            AttachmentKind::Figure => 0.02,
            AttachmentKind::Table => 0.03,
        })
    }

    /// Minimum object area ratio for the alignment phase.
    pub fn min_area_ratio(&self, kind: AttachmentKind) -> f32 {
        self.object_min_area_ratio.unwrap_or(match kind {
            AttachmentKind::Figure => 0.012,
            AttachmentKind::Table => 0.005,
        })
    }

    /// Forced direction lists for the given kind.
    pub fn forced_above(&self, kind: AttachmentKind, raw_ident: &str) -> bool {
        let list = match kind {
            AttachmentKind::Figure => &self.force_above_ids,
            AttachmentKind::Table => &self.force_table_above_ids,
        };
        list.iter().any(|id| id == raw_ident)
    }

    pub fn forced_below(&self, kind: AttachmentKind, raw_ident: &str) -> bool {
        let list = match kind {
            AttachmentKind::Figure => &self.force_below_ids,
            AttachmentKind::Table => &self.force_table_below_ids,
        };
        list.iter().any(|id| id == raw_ident)
    }

    /// The mid-band trim removes the whole band under the robust preset and
    /// only gap-linked runs otherwise.
    pub fn aggressive_mid_trim(&self) -> bool {
        self.preset == Preset::Robust
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let cfg = CropConfig::default();
        assert_eq!(cfg.dpi, 300);
        assert_eq!(cfg.clip_height_pt, 650.0);
        assert_eq!(cfg.margin_x_pt, 20.0);
        assert_eq!(cfg.caption_gap_pt, 5.0);
        assert_eq!(cfg.scan_step_pt, 14.0);
        assert_eq!(cfg.scan_dist_lambda, 0.12);
        assert_eq!(cfg.caption_mid_guard_pt, 6.0);
        assert!(cfg.text_trim);
        assert_eq!(cfg.far_side_para_min_ratio, 0.20);
        assert_eq!(cfg.object_pad_pt, 8.0);
        assert_eq!(cfg.object_merge_gap_pt, 6.0);
        assert!(cfg.autocrop);
        assert_eq!(cfg.autocrop_pad_px, 30);
        assert_eq!(cfg.autocrop_white_th, 250);
        assert_eq!(cfg.autocrop_shrink_limit, 0.30);
        assert_eq!(cfg.autocrop_min_height_px, 80);
        assert_eq!(cfg.protect_far_edge_px, 14);
        assert_eq!(cfg.near_edge_pad_px, 32);
        assert!(cfg.refine_near_edge_only);
        assert!(cfg.smart_caption_detection);
        assert!(cfg.adaptive_line_height);
        assert!(!cfg.allow_continued);
        assert_eq!(cfg.anchor_mode, AnchorMode::V2);
        assert!(cfg.prune_images);
        assert_eq!(cfg.max_caption_words, 12);
    }

    #[test]
    fn test_kind_dependent_defaults() {
        let cfg = CropConfig::default();
        assert_eq!(cfg.vote_margin(AttachmentKind::Figure), 0.02);
        assert_eq!(cfg.vote_margin(AttachmentKind::Table), 0.03);
        assert_eq!(cfg.min_area_ratio(AttachmentKind::Figure), 0.012);
        assert_eq!(cfg.min_area_ratio(AttachmentKind::Table), 0.005);
    }

    #[test]
    fn test_explicit_margin_overrides_kind_default() {
        let cfg = CropConfig {
            global_anchor_margin: Some(0.1),
            ..CropConfig::default()
        };
        assert_eq!(cfg.vote_margin(AttachmentKind::Figure), 0.1);
        assert_eq!(cfg.vote_margin(AttachmentKind::Table), 0.1);
    }

    #[test]
    fn test_env_var_scalar() {
        let mut cfg = CropConfig::default();
        cfg.apply_env_var("DPI", "150").unwrap();
        assert_eq!(cfg.dpi, 150);
    }

    #[test]
    fn test_env_var_bool_forms() {
        let mut cfg = CropConfig::default();
        cfg.apply_env_var("AUTOCROP", "off").unwrap();
        assert!(!cfg.autocrop);
        cfg.apply_env_var("AUTOCROP", "1").unwrap();
        assert!(cfg.autocrop);
    }

    #[test]
    fn test_env_var_id_lists() {
        let mut cfg = CropConfig::default();
        cfg.apply_env_var("FORCE_BELOW_IDS", "4, S1 ,A2").unwrap();
        assert_eq!(cfg.force_below_ids, vec!["4", "S1", "A2"]);
        assert!(cfg.forced_below(AttachmentKind::Figure, "4"));
        assert!(!cfg.forced_below(AttachmentKind::Table, "4"));
    }

    #[test]
    fn test_env_var_scan_heights() {
        let mut cfg = CropConfig::default();
        cfg.apply_env_var("SCAN_HEIGHTS", "100,200,300").unwrap();
        assert_eq!(cfg.scan_heights, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn test_env_var_unknown_rejected() {
        let mut cfg = CropConfig::default();
        assert!(cfg.apply_env_var("DIP", "300").is_err());
    }

    #[test]
    fn test_env_var_bad_value_rejected() {
        let mut cfg = CropConfig::default();
        assert!(cfg.apply_env_var("DPI", "many").is_err());
        assert!(cfg.apply_env_var("ANCHOR_MODE", "v3").is_err());
    }

    #[test]
    fn test_preset_parse_and_mid_trim_mode() {
        let mut cfg = CropConfig::default();
        assert!(cfg.aggressive_mid_trim());
        cfg.apply_env_var("PRESET", "none").unwrap();
        assert!(!cfg.aggressive_mid_trim());
    }

    #[test]
    fn test_toml_roundtrip_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cropmark.toml");
        std::fs::write(&path, "dpi = 144\ntext_trim = false\nanchor_mode = \"v1\"\n").unwrap();
        let cfg = CropConfig::from_toml_file(&path).unwrap();
        assert_eq!(cfg.dpi, 144);
        assert!(!cfg.text_trim);
        assert_eq!(cfg.anchor_mode, AnchorMode::V1);
        // Unspecified fields keep their defaults.
        assert_eq!(cfg.clip_height_pt, 650.0);
    }

    #[test]
    fn test_discover_prefers_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cropmark.toml"), "dpi = 72\n").unwrap();
        std::fs::write(dir.path().join("cropmark.json"), "{\"dpi\": 96}").unwrap();
        let found = CropConfig::discover(&[dir.path()]).unwrap();
        assert!(found.ends_with("cropmark.toml"));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = CropConfig::load(None, &[dir.path()]).unwrap();
        assert_eq!(cfg.dpi, 300);
    }
}
