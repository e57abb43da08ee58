use std::fmt;

#[derive(Debug, Clone)]
pub enum PdfError {
    BackendUnavailable(String),
    InvalidPdf(String),
    PasswordRequired,
    InvalidPassword,
    EmptyDocument,
    PageNotFound(usize),
    TextExtractionFailed(String),
    RenderingFailed(String),
}

impl fmt::Display for PdfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfError::BackendUnavailable(msg) => write!(f, "Pdfium library unavailable: {}", msg),
            PdfError::InvalidPdf(msg) => write!(f, "Invalid PDF: {}", msg),
            PdfError::PasswordRequired => write!(f, "PDF is password-protected"),
            PdfError::InvalidPassword => write!(f, "Invalid password provided"),
            PdfError::EmptyDocument => write!(f, "PDF has no pages"),
            PdfError::PageNotFound(page) => write!(f, "Page {} not found", page),
            PdfError::TextExtractionFailed(msg) => write!(f, "Text extraction failed: {}", msg),
            PdfError::RenderingFailed(msg) => write!(f, "Page rendering failed: {}", msg),
        }
    }
}

impl std::error::Error for PdfError {}

// NOTE: no From<std::io::Error> impl - IO errors must bubble up unchanged

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pdf_error() {
        let err = PdfError::InvalidPdf("corrupted header".to_string());
        assert_eq!(err.to_string(), "Invalid PDF: corrupted header");
    }

    #[test]
    fn test_password_required_error() {
        let err = PdfError::PasswordRequired;
        assert_eq!(err.to_string(), "PDF is password-protected");
    }

    #[test]
    fn test_empty_document_error() {
        let err = PdfError::EmptyDocument;
        assert_eq!(err.to_string(), "PDF has no pages");
    }

    #[test]
    fn test_page_not_found_error() {
        let err = PdfError::PageNotFound(7);
        assert_eq!(err.to_string(), "Page 7 not found");
    }

    #[test]
    fn test_rendering_failed_error() {
        let err = PdfError::RenderingFailed("degenerate clip".to_string());
        assert_eq!(err.to_string(), "Page rendering failed: degenerate clip");
    }

    #[test]
    fn test_error_clone() {
        let err1 = PdfError::PageNotFound(3);
        let err2 = err1.clone();
        assert_eq!(err1.to_string(), err2.to_string());
    }
}
