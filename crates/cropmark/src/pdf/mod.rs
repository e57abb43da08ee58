//! PDF backend: a narrow, read-only view of the document.
//!
//! `document.rs` is the only module that talks to pdfium; `page.rs` holds
//! the backend-independent page model and `preview.rs` the low-resolution
//! ink probe. Rendering goes through the [`PageRaster`] trait so the
//! refinement pipeline can run against synthetic rasters in tests.

pub mod document;
pub mod error;
pub mod page;
pub mod preview;

use crate::geometry::Rect;
use image::RgbImage;

pub use document::{DocumentInfo, LoadedDocument, PdfiumBackend};
pub use page::{ObjectKind, PageObject, PageView, TextBlock, TextLine, TextSpan};
pub use preview::PagePreview;

/// Renders page regions to pixels. `clip` is in top-left-origin points;
/// `None` renders the whole page.
pub trait PageRaster {
    fn render(&self, page: u32, dpi: f32, clip: Option<Rect>) -> error::Result<RgbImage>;
}
