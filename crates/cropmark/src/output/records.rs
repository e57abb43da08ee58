//! The attachment record: the output contract of a run.

use crate::ident::AttachmentKind;
use serde::{Deserialize, Serialize};

/// Facts about the source document repeated in every record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordMeta {
    pub pdf_name: String,
    pub pdf_hash: String,
    pub page_count: u32,
    pub extractor_version: String,
    pub preset: String,
}

/// Document layout facts relevant to interpreting the crop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RecordLayout {
    pub columns: u32,
    pub typical_line_height: f32,
}

/// One extracted attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub kind: AttachmentKind,
    pub ident: String,
    pub page: u32,
    pub caption_text: String,
    /// Path relative to the output directory.
    pub file: String,
    #[serde(default)]
    pub continued: bool,
    pub meta: RecordMeta,
    pub layout: RecordLayout,
    pub anchor_mode: String,
    pub side: String,
    pub global_anchor_used: bool,
    pub stages_applied: Vec<String>,
    pub confidence: f32,
    pub bbox_pt: [f32; 4],
    pub dpi: u32,
    pub pixmap_size_px: [u32; 2],
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub debug_artifacts: Option<Vec<String>>,
}

/// One CSV manifest line mirroring the record essentials.
pub fn csv_line(record: &AttachmentRecord) -> String {
    let caption = record
        .caption_text
        .replace('"', "\"\"")
        .replace(['\n', '\r'], " ");
    format!(
        "{},{},{},\"{}\",{},{}",
        record.kind, record.ident, record.page, caption, record.file, record.continued
    )
}

pub const CSV_HEADER: &str = "kind,ident,page,caption,file,continued";

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> AttachmentRecord {
        AttachmentRecord {
            kind: AttachmentKind::Figure,
            ident: "S1".to_string(),
            page: 3,
            caption_text: "Figure S1: A \"quoted\" caption\nwith a newline.".to_string(),
            file: "Figure_S1_A_quoted_caption.png".to_string(),
            continued: false,
            meta: RecordMeta {
                pdf_name: "paper.pdf".to_string(),
                pdf_hash: "ab".repeat(32),
                page_count: 12,
                extractor_version: "0.4.2".to_string(),
                preset: "robust".to_string(),
            },
            layout: RecordLayout {
                columns: 2,
                typical_line_height: 11.5,
            },
            anchor_mode: "v2".to_string(),
            side: "above".to_string(),
            global_anchor_used: false,
            stages_applied: vec!["baseline".to_string(), "A".to_string(), "B".to_string(), "D".to_string()],
            confidence: 0.72,
            bbox_pt: [64.8, 92.8, 547.2, 447.2],
            dpi: 300,
            pixmap_size_px: [2010, 1477],
            debug_artifacts: None,
        }
    }

    #[test]
    fn test_json_round_trip() {
        let rec = record();
        let json = serde_json::to_string_pretty(&rec).unwrap();
        assert!(json.contains("\"kind\": \"figure\""));
        assert!(!json.contains("debug_artifacts"));
        let back: AttachmentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ident, "S1");
        assert_eq!(back.stages_applied.len(), 4);
        assert_eq!(back.pixmap_size_px, [2010, 1477]);
    }

    #[test]
    fn test_csv_line_escapes() {
        let line = csv_line(&record());
        assert!(line.starts_with("figure,S1,3,\""));
        assert!(line.contains("\"\"quoted\"\""));
        assert!(!line.contains('\n'));
        assert!(line.ends_with(",Figure_S1_A_quoted_caption.png,false"));
    }
}
