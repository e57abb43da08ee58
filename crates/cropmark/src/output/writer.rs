//! Filesystem emission.
//!
//! Every artifact is written to a temp name in the target directory and
//! renamed into place, so a crashed run never leaves a half-written PNG or
//! index behind and the previous index survives until the new one commits.

use super::records::{csv_line, AttachmentRecord, CSV_HEADER};
use crate::error::{CropmarkError, Result};
use crate::layout::LayoutModel;
use image::RgbImage;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const INDEX_FILE: &str = "index.json";
pub const MANIFEST_FILE: &str = "manifest.csv";
pub const LAYOUT_MODEL_FILE: &str = "layout_model.json";

/// Encode a PNG and move it into place atomically.
pub fn write_png(out_dir: &Path, file_name: &str, image: &RgbImage) -> Result<PathBuf> {
    let mut tmp = NamedTempFile::new_in(out_dir)?;
    let mut bytes: Vec<u8> = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| CropmarkError::render(format!("PNG encode failed for {}: {}", file_name, e)))?;
    tmp.write_all(&bytes)?;

    let target = out_dir.join(file_name);
    tmp.persist(&target)
        .map_err(|e| CropmarkError::Io(e.error))?;
    Ok(target)
}

/// Commit the index: serialize, write to a temp name, rename. Failure
/// leaves any previous index untouched.
pub fn write_index(out_dir: &Path, records: &[AttachmentRecord]) -> Result<PathBuf> {
    let json = serde_json::to_vec_pretty(records)?;
    let mut tmp = NamedTempFile::new_in(out_dir)
        .map_err(|e| CropmarkError::index_write_with_source("cannot create temp index", e))?;
    tmp.write_all(&json)
        .and_then(|_| tmp.write_all(b"\n"))
        .map_err(|e| CropmarkError::index_write_with_source("cannot write temp index", e))?;

    let target = out_dir.join(INDEX_FILE);
    tmp.persist(&target)
        .map_err(|e| CropmarkError::index_write_with_source(format!("cannot rename index into {}", target.display()), e.error))?;
    Ok(target)
}

/// Optional CSV manifest mirroring the record essentials.
pub fn write_manifest(out_dir: &Path, records: &[AttachmentRecord]) -> Result<PathBuf> {
    let mut content = String::from(CSV_HEADER);
    content.push('\n');
    for record in records {
        content.push_str(&csv_line(record));
        content.push('\n');
    }
    let mut tmp = NamedTempFile::new_in(out_dir)?;
    tmp.write_all(content.as_bytes())?;
    let target = out_dir.join(MANIFEST_FILE);
    tmp.persist(&target).map_err(|e| CropmarkError::Io(e.error))?;
    Ok(target)
}

/// Dump the layout model for inspection.
pub fn write_layout_model(out_dir: &Path, model: &LayoutModel) -> Result<PathBuf> {
    let json = serde_json::to_vec_pretty(model)?;
    let mut tmp = NamedTempFile::new_in(out_dir)?;
    tmp.write_all(&json)?;
    let target = out_dir.join(LAYOUT_MODEL_FILE);
    tmp.persist(&target).map_err(|e| CropmarkError::Io(e.error))?;
    Ok(target)
}
