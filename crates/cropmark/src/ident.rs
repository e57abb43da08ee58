//! Attachment kinds and identifiers.
//!
//! Identifiers keep their textual form (`"S1"`, `"A3"`, `"IV"`) for
//! filenames and records, and carry a tagged variant for ordering. A
//! supplementary id is never conflated with its numeric part: `"S1"` and
//! `"1"` are distinct attachments.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// What kind of attachment a caption names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Figure,
    Table,
}

impl AttachmentKind {
    /// Filename prefix and display label.
    pub fn label(&self) -> &'static str {
        match self {
            AttachmentKind::Figure => "Figure",
            AttachmentKind::Table => "Table",
        }
    }

    /// Index ordering: figures sort before tables on the same page.
    pub fn rank(&self) -> u8 {
        match self {
            AttachmentKind::Figure => 0,
            AttachmentKind::Table => 1,
        }
    }
}

impl fmt::Display for AttachmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label().to_lowercase())
    }
}

/// Identifier scheme. Ordering: main numeric < appendix-letter < Roman <
/// supplementary < supplementary-appendix, then the natural numeric suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentTag {
    Numeric(i32),
    Appendix(char, i32),
    Roman(i32),
    Supplementary(i32),
    SupplementaryAppendix(char, i32),
}

impl IdentTag {
    fn scheme_rank(&self) -> u8 {
        match self {
            IdentTag::Numeric(_) => 0,
            IdentTag::Appendix(..) => 1,
            IdentTag::Roman(_) => 2,
            IdentTag::Supplementary(_) => 3,
            IdentTag::SupplementaryAppendix(..) => 4,
        }
    }

    fn letter(&self) -> char {
        match self {
            IdentTag::Appendix(c, _) | IdentTag::SupplementaryAppendix(c, _) => *c,
            _ => '\0',
        }
    }

    fn number(&self) -> i32 {
        match self {
            IdentTag::Numeric(n)
            | IdentTag::Appendix(_, n)
            | IdentTag::Roman(n)
            | IdentTag::Supplementary(n)
            | IdentTag::SupplementaryAppendix(_, n) => *n,
        }
    }
}

impl Ord for IdentTag {
    fn cmp(&self, other: &Self) -> Ordering {
        self.scheme_rank()
            .cmp(&other.scheme_rank())
            .then_with(|| self.letter().cmp(&other.letter()))
            .then_with(|| self.number().cmp(&other.number()))
    }
}

impl PartialOrd for IdentTag {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A caption identifier: the textual form as it appeared, plus its tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    raw: String,
    tag: IdentTag,
}

impl Identifier {
    /// Parse an identifier body, optionally marked as supplementary by a
    /// detached `S` prefix (`"Figure S 1"`). The body is `[A-Z]?\d+` or a
    /// Roman numeral I-X; a leading `S` followed by digits is supplementary.
    pub fn parse(supplementary: bool, body: &str) -> Option<Identifier> {
        let body: String = body.chars().filter(|c| !c.is_whitespace()).collect();
        if body.is_empty() {
            return None;
        }

        if let Some(n) = parse_roman(&body) {
            let raw = if supplementary { format!("S{}", body) } else { body };
            // Supplementary Roman ids are rare enough that the Roman scheme
            // keeps them; the textual form still records the S.
            return Some(Identifier {
                raw,
                tag: IdentTag::Roman(n),
            });
        }

        let mut chars = body.chars();
        let first = chars.next()?;

        if first.is_ascii_digit() {
            let n: i32 = body.parse().ok()?;
            let tag = if supplementary {
                IdentTag::Supplementary(n)
            } else {
                IdentTag::Numeric(n)
            };
            let raw = if supplementary { format!("S{}", n) } else { n.to_string() };
            return Some(Identifier { raw, tag });
        }

        if !first.is_ascii_uppercase() {
            return None;
        }
        let digits: String = chars.collect();
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        let n: i32 = digits.parse().ok()?;

        let tag = match (supplementary, first) {
            // "S1" with no detached prefix is supplementary, not appendix S.
            (false, 'S') => IdentTag::Supplementary(n),
            (false, c) => IdentTag::Appendix(c, n),
            (true, c) => IdentTag::SupplementaryAppendix(c, n),
        };
        let raw = match tag {
            IdentTag::Supplementary(n) => format!("S{}", n),
            IdentTag::SupplementaryAppendix(c, n) => format!("S{}{}", c, n),
            _ => body,
        };
        Some(Identifier { raw, tag })
    }

    /// The identifier exactly as it is written in records and filenames.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn tag(&self) -> IdentTag {
        self.tag
    }

    /// Stable ordering key: scheme rank, appendix letter, numeric suffix.
    pub fn sort_key(&self) -> (u8, char, i32) {
        (self.tag.scheme_rank(), self.tag.letter(), self.tag.number())
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.tag.cmp(&other.tag).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl Serialize for Identifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

fn parse_roman(s: &str) -> Option<i32> {
    const NUMERALS: [&str; 10] = ["I", "II", "III", "IV", "V", "VI", "VII", "VIII", "IX", "X"];
    NUMERALS.iter().position(|&r| r == s).map(|i| (i + 1) as i32)
}
