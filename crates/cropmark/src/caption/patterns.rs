//! Caption line patterns.
//!
//! A candidate caption is a line starting with a figure/table keyword and
//! an identifier. English and Chinese forms are recognized, including the
//! tight Chinese form with no whitespace (`图3`), detached supplementary
//! markers (`Figure S 1`), appendix ids (`Table A2`) and Roman numerals.

use crate::ident::{AttachmentKind, Identifier};
use once_cell::sync::Lazy;
use regex::Regex;

static FIGURE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<word>Extended Data|Supplementary)\s+)?(?:Figure|Fig\.?|图)\s*(?P<s>S\s*)?(?P<id>[A-Z]?\d+|[IVX]{1,4})(?:\s*[.:：，,]|\b)",
    )
    .expect("figure caption pattern")
});

static TABLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<word>Extended Data|Supplementary)\s+)?(?:Table|表)\s*(?P<s>S\s*)?(?P<id>[A-Z]?\d+|[IVX]{1,4})(?:\s*[.:：，,]|\b)",
    )
    .expect("table caption pattern")
});

static CONTINUED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(\s*continued\s*\)|（\s*续\s*）").expect("continued pattern"));

/// A parsed caption head on one line.
#[derive(Debug, Clone)]
pub struct CaptionMatch {
    pub kind: AttachmentKind,
    pub ident: Identifier,
    /// Text after the matched head, trimmed of leading separators.
    pub tail: String,
}

/// Try to read a caption head from the start of a line.
pub fn match_caption_line(text: &str) -> Option<CaptionMatch> {
    let trimmed = text.trim_start();
    for (re, kind) in [(&*FIGURE_RE, AttachmentKind::Figure), (&*TABLE_RE, AttachmentKind::Table)] {
        if let Some(caps) = re.captures(trimmed) {
            // Both the word prefix "Supplementary" and a detached S marker
            // make the identifier supplementary.
            let supplementary = caps.name("s").is_some()
                || caps.name("word").map(|w| w.as_str() == "Supplementary").unwrap_or(false);
            let body = caps.name("id")?.as_str();
            let Some(ident) = Identifier::parse(supplementary, body) else {
                continue;
            };
            let tail = trimmed[caps.get(0)?.end()..]
                .trim_start_matches([' ', '.', ':', ',', '：', '，'])
                .trim()
                .to_string();
            return Some(CaptionMatch { kind, ident, tail });
        }
    }
    None
}

/// Whether the text marks a continued caption.
pub fn is_continued(text: &str) -> bool {
    CONTINUED_RE.is_match(text)
}
