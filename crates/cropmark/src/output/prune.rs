//! Stale artifact pruning.
//!
//! After the index has committed, every `Figure_*` / `Table_*` PNG in the
//! output directory that no record references is stale and deleted. The
//! caller must not invoke this when the index write failed.

use super::records::AttachmentRecord;
use crate::error::Result;
use ahash::AHashSet;
use std::path::Path;
use tracing::{debug, warn};

/// Whether a directory entry looks like one of our attachment files.
fn is_attachment_file(name: &str) -> bool {
    (name.starts_with("Figure_") || name.starts_with("Table_")) && name.ends_with(".png")
}

/// Delete unreferenced attachment files; returns the deleted names.
pub fn prune(out_dir: &Path, records: &[AttachmentRecord]) -> Result<Vec<String>> {
    let referenced: AHashSet<&str> = records.iter().map(|r| r.file.as_str()).collect();
    let mut deleted = Vec::new();

    for entry in std::fs::read_dir(out_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if !is_attachment_file(&name) || referenced.contains(name.as_str()) {
            continue;
        }
        match std::fs::remove_file(entry.path()) {
            Ok(()) => {
                debug!(file = %name, "pruned stale attachment");
                deleted.push(name);
            }
            Err(e) => warn!(file = %name, error = %e, "failed to prune stale attachment"),
        }
    }

    deleted.sort();
    Ok(deleted)
}
