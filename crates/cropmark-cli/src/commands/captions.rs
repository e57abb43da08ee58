//! Captions command: show every caption candidate with its score breakdown.

use anyhow::{Context, Result};
use cropmark::caption::{self, MIN_CAPTION_SCORE};
use cropmark::pdf::PdfiumBackend;
use serde_json::json;
use std::path::Path;

/// Print caption candidates as a JSON array.
pub fn run(pdf: &Path, include_all: bool) -> Result<()> {
    let backend = PdfiumBackend::new().context("pdfium library unavailable")?;
    let doc = backend
        .open(pdf)
        .with_context(|| format!("failed to open '{}'", pdf.display()))?;

    let mut pages = Vec::with_capacity(doc.page_count() as usize);
    for number in 1..=doc.page_count() {
        pages.push(
            doc.harvest(number)
                .with_context(|| format!("failed to read page {}", number))?,
        );
    }

    let candidates = caption::build_candidates(&pages);
    let entries: Vec<_> = candidates
        .iter()
        .filter(|c| include_all || c.total_score >= MIN_CAPTION_SCORE)
        .map(|c| {
            json!({
                "kind": c.kind.to_string(),
                "ident": c.ident.raw(),
                "page": c.page,
                "text": c.text,
                "score": c.total_score,
                "breakdown": c.breakdown,
                "accepted": c.total_score >= MIN_CAPTION_SCORE,
                "continued_marker": c.continued_marker,
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}
