//! Attachment extraction for research PDFs.
//!
//! cropmark locates every figure and table caption in a paper, chooses a
//! candidate crop window around each caption, refines that window against
//! text runs, drawing objects, and whitespace, and emits cropped PNGs plus
//! a traceable JSON index. A tiered acceptance gate guards every
//! refinement: when the refined window loses too much of the baseline, the
//! run falls back to the text-trimmed window or the untouched baseline
//! instead of silently shipping a bad crop.
//!
//! # Pipeline
//!
//! ```text
//! PDF -> pages -> line metrics -> captions -> anchor -> A -> B -> D -> gate
//!                                                  |                    |
//!                                                  +--> global vote     +--> PNG + index + prune
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use cropmark::{extract, CropConfig};
//! use std::path::Path;
//!
//! # fn main() -> cropmark::Result<()> {
//! let config = CropConfig::default();
//! let summary = extract(Path::new("paper.pdf"), Path::new("out"), &config)?;
//! for record in &summary.records {
//!     println!("{} {} -> {}", record.kind, record.ident, record.file);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! The geometric pipeline works entirely in top-left-origin PDF points;
//! pixels appear only in the whitespace autocrop and the final render.
//! Everything outside `pdf::document` runs against plain data, so the full
//! pipeline is testable with synthesized pages.

pub mod anchor;
pub mod caption;
pub mod config;
pub mod debug_viz;
pub mod error;
pub mod extractor;
pub mod geometry;
pub mod ident;
pub mod layout;
pub mod metrics;
pub mod output;
pub mod pdf;
pub mod refine;
pub mod runlog;

pub use config::{AnchorMode, CropConfig, GlobalAnchor, LayoutDriven, Preset};
pub use error::{CropmarkError, Result};
pub use extractor::{extract, run_pipeline, ExtractionSummary};
pub use geometry::Rect;
pub use ident::{AttachmentKind, IdentTag, Identifier};
pub use output::AttachmentRecord;

/// Crate version recorded in every emitted index entry.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
