//! pdfium-backed document adapter.
//!
//! The only module that touches pdfium. Opens a document, harvests each
//! page into a backend-independent [`PageView`], and implements
//! [`PageRaster`] by rendering the full page and cropping the requested
//! clip in pixel space.

use super::error::{PdfError, Result};
use super::page::{PageObject, PageView, TextSpan};
use super::PageRaster;
use crate::geometry::Rect;
use image::RgbImage;
use pdfium_render::prelude::*;
use sha2::{Digest, Sha256};
use std::path::Path;

const PDF_POINTS_PER_INCH: f32 = 72.0;
const DEFAULT_FONT_SIZE: f32 = 12.0;

/// Horizontal gap (in multiples of the font size) that breaks a span.
const SPAN_X_GAP_FACTOR: f32 = 1.2;

/// Vertical center drift (in multiples of the font size) that breaks a span.
const SPAN_Y_DRIFT_FACTOR: f32 = 0.6;

/// Immutable facts about the opened document.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    /// File name without directories.
    pub name: String,
    pub page_count: u32,
    /// Lowercase hex SHA-256 of the file bytes.
    pub sha256: String,
}

/// Process-wide pdfium binding. Create once, open documents from it.
pub struct PdfiumBackend {
    pdfium: Pdfium,
}

impl PdfiumBackend {
    /// Bind the pdfium library, preferring one next to the executable and
    /// falling back to the system library.
    pub fn new() -> Result<Self> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| PdfError::BackendUnavailable(e.to_string()))?;
        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Open a document, refusing encrypted and zero-page files.
    pub fn open<'a>(&'a self, path: &Path) -> Result<LoadedDocument<'a>> {
        let bytes = std::fs::read(path).map_err(|e| PdfError::InvalidPdf(format!("{}: {}", path.display(), e)))?;
        let sha256 = sha256_hex(&bytes);

        let path_str = path.to_string_lossy().into_owned();
        let doc = self
            .pdfium
            .load_pdf_from_file(path_str.as_str(), None)
            .map_err(|e| classify_open_error(&e.to_string()))?;

        let page_count = doc.pages().len() as u32;
        if page_count == 0 {
            return Err(PdfError::EmptyDocument);
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(LoadedDocument {
            doc,
            info: DocumentInfo {
                name,
                page_count,
                sha256,
            },
        })
    }
}

/// An open document plus its preflight facts.
pub struct LoadedDocument<'a> {
    doc: PdfDocument<'a>,
    info: DocumentInfo,
}

impl LoadedDocument<'_> {
    pub fn info(&self) -> &DocumentInfo {
        &self.info
    }

    pub fn page_count(&self) -> u32 {
        self.info.page_count
    }

    fn page(&self, number: u32) -> Result<PdfPage<'_>> {
        if number == 0 || number > self.info.page_count {
            return Err(PdfError::PageNotFound(number as usize));
        }
        self.doc
            .pages()
            .get((number - 1) as u16)
            .map_err(|_| PdfError::PageNotFound(number as usize))
    }

    /// Harvest one page into a backend-independent view. `number` is 1-based.
    pub fn harvest(&self, number: u32) -> Result<PageView> {
        let page = self.page(number)?;
        let page_w = page.width().value;
        let page_h = page.height().value;
        let rect = Rect::new(0.0, 0.0, page_w, page_h);

        let spans = harvest_spans(&page, page_h)?;
        let objects = harvest_objects(&page, page_h);

        Ok(PageView::assemble(number, rect, spans, objects))
    }
}

impl PageRaster for LoadedDocument<'_> {
    fn render(&self, page_number: u32, dpi: f32, clip: Option<Rect>) -> Result<RgbImage> {
        let page = self.page(page_number)?;
        let page_w = page.width().value;
        let page_h = page.height().value;
        let scale = dpi / PDF_POINTS_PER_INCH;

        if let Some(r) = clip
            && (r.width() < 1.0 || r.height() < 1.0)
        {
            return Err(PdfError::RenderingFailed(format!(
                "degenerate clip {:.1}x{:.1} pt on page {}",
                r.width(),
                r.height(),
                page_number
            )));
        }

        let config = PdfRenderConfig::new()
            .set_target_width(((page_w * scale) as i32).max(1))
            .set_target_height(((page_h * scale) as i32).max(1));

        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| PdfError::RenderingFailed(format!("page {}: {}", page_number, e)))?;
        let image = bitmap.as_image().into_rgb8();

        match clip {
            None => Ok(image),
            Some(r) => {
                let (x, y, w, h) = clip_to_pixels(&r, scale, image.width(), image.height())
                    .ok_or_else(|| PdfError::RenderingFailed(format!("clip outside page {}", page_number)))?;
                Ok(image::imageops::crop_imm(&image, x, y, w, h).to_image())
            }
        }
    }
}

/// Map an open failure message onto the password/invalid taxonomy.
fn classify_open_error(message: &str) -> PdfError {
    if message.contains("password") || message.contains("Password") {
        PdfError::PasswordRequired
    } else {
        PdfError::InvalidPdf(message.to_string())
    }
}

/// Convert a point-space clip to a clamped pixel region; None when the clip
/// falls entirely outside the rendered page.
fn clip_to_pixels(clip: &Rect, scale: f32, img_w: u32, img_h: u32) -> Option<(u32, u32, u32, u32)> {
    let x0 = ((clip.x0 * scale).floor().max(0.0) as u32).min(img_w);
    let y0 = ((clip.y0 * scale).floor().max(0.0) as u32).min(img_h);
    let x1 = ((clip.x1 * scale).ceil().max(0.0) as u32).min(img_w);
    let y1 = ((clip.y1 * scale).ceil().max(0.0) as u32).min(img_h);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}

/// Build text spans from pdfium characters. Characters are walked in page
/// order; a span breaks on whitespace, a font change, a horizontal jump, or
/// vertical drift off the current row.
fn harvest_spans(page: &PdfPage<'_>, page_h: f32) -> Result<Vec<TextSpan>> {
    let page_text = page
        .text()
        .map_err(|e| PdfError::TextExtractionFailed(format!("failed to get page text: {}", e)))?;

    let chars = page_text.chars();
    let char_count = chars.len();
    let mut spans: Vec<TextSpan> = Vec::new();
    let mut current: Option<TextSpan> = None;

    for i in 0..char_count {
        let Ok(ch) = chars.get(i) else {
            continue;
        };
        let Some(uc) = ch.unicode_char() else {
            continue;
        };
        let Ok(bounds) = ch.loose_bounds() else {
            continue;
        };

        // pdfium reports bottom-up coordinates; flip to top-left origin.
        let rect = Rect::new(
            bounds.left().value,
            page_h - bounds.top().value,
            bounds.right().value,
            page_h - bounds.bottom().value,
        );

        if uc.is_whitespace() || uc.is_control() {
            if let Some(span) = current.take() {
                spans.push(span);
            }
            continue;
        }

        let fs = ch.unscaled_font_size().value;
        let font_size = if fs > 0.0 { fs } else { DEFAULT_FONT_SIZE };
        let font_name = ch.font_name();
        let name_lower = font_name.to_lowercase();
        let bold_from_weight = ch
            .font_weight()
            .map(|w| {
                matches!(
                    w,
                    PdfFontWeight::Weight700Bold | PdfFontWeight::Weight800 | PdfFontWeight::Weight900
                )
            })
            .unwrap_or(false);
        let is_bold = bold_from_weight || name_lower.contains("bold");
        let is_italic = name_lower.contains("italic") || name_lower.contains("oblique");

        let breaks = match &current {
            None => false,
            Some(span) => {
                let span_center = (span.rect.y0 + span.rect.y1) / 2.0;
                let char_center = (rect.y0 + rect.y1) / 2.0;
                let x_gap = rect.x0 - span.rect.x1;
                (char_center - span_center).abs() > SPAN_Y_DRIFT_FACTOR * font_size
                    || x_gap > SPAN_X_GAP_FACTOR * font_size
                    || x_gap < -2.0 * font_size
                    || span.font_name != font_name
                    || (span.font_size - font_size).abs() > 0.1
            }
        };
        if breaks && let Some(span) = current.take() {
            spans.push(span);
        }

        match &mut current {
            Some(span) => {
                span.text.push(uc);
                span.rect = span.rect.union(&rect);
            }
            None => {
                current = Some(TextSpan {
                    text: uc.to_string(),
                    rect,
                    font_size,
                    font_name,
                    is_bold,
                    is_italic,
                });
            }
        }
    }
    if let Some(span) = current.take() {
        spans.push(span);
    }

    Ok(spans)
}

/// Harvest image and path objects with top-left-origin bboxes.
fn harvest_objects(page: &PdfPage<'_>, page_h: f32) -> Vec<PageObject> {
    let mut objects = Vec::new();
    for object in page.objects().iter() {
        let Ok(bounds) = object.bounds() else {
            continue;
        };
        let rect = Rect::new(
            bounds.left().value,
            page_h - bounds.top().value,
            bounds.right().value,
            page_h - bounds.bottom().value,
        );
        if rect.width() < 0.1 && rect.height() < 0.1 {
            continue;
        }
        match object.object_type() {
            PdfPageObjectType::Image => objects.push(PageObject::raster(rect)),
            PdfPageObjectType::Path | PdfPageObjectType::Shading => objects.push(PageObject::path(rect)),
            _ => {}
        }
    }
    objects
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{:02x}", byte));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hex_known_vector() {
        // SHA-256 of the empty string.
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_classify_open_error_password() {
        assert!(matches!(
            classify_open_error("PdfiumLibraryInternalError: password required"),
            PdfError::PasswordRequired
        ));
        assert!(matches!(classify_open_error("broken xref"), PdfError::InvalidPdf(_)));
    }

    #[test]
    fn test_clip_to_pixels_basic() {
        let clip = Rect::new(10.0, 20.0, 110.0, 120.0);
        let (x, y, w, h) = clip_to_pixels(&clip, 1.0, 612, 792).unwrap();
        assert_eq!((x, y, w, h), (10, 20, 100, 100));
    }

    #[test]
    fn test_clip_to_pixels_scaled_and_clamped() {
        let clip = Rect::new(-10.0, 700.0, 700.0, 900.0);
        let (x, y, w, h) = clip_to_pixels(&clip, 2.0, 1224, 1584).unwrap();
        assert_eq!(x, 0);
        assert_eq!(y, 1400);
        assert_eq!(w, 1224);
        assert_eq!(h, 184);
    }

    #[test]
    fn test_clip_to_pixels_outside_page() {
        let clip = Rect::new(700.0, 0.0, 800.0, 100.0);
        assert!(clip_to_pixels(&clip, 1.0, 612, 792).is_none());
    }
}
