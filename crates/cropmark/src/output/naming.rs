//! Output file naming.
//!
//! `Figure_<ident>_<slug>.png` with the slug built from the first words of
//! the caption tail, reduced to an ASCII-safe set. Collisions get
//! deterministic `_1`, `_2` suffixes before the extension.

use crate::ident::AttachmentKind;
use ahash::AHashSet;

/// Longest slug kept after sanitisation.
const MAX_SLUG_CHARS: usize = 60;

/// Build a filename slug from the caption tail.
pub fn slug(tail: &str, max_words: usize) -> String {
    let words: Vec<String> = tail
        .split_whitespace()
        .take(max_words)
        .map(|w| {
            w.chars()
                .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|w| !w.is_empty())
        .collect();

    let mut joined = words.join("_");
    if joined.len() > MAX_SLUG_CHARS {
        joined.truncate(MAX_SLUG_CHARS);
        // Never end on a dangling separator.
        while joined.ends_with('_') {
            joined.pop();
        }
    }
    joined
}

/// Base name without extension or collision suffix.
pub fn base_name(kind: AttachmentKind, ident_raw: &str, slug: &str, continued_page: Option<u32>) -> String {
    let mut name = format!("{}_{}", kind.label(), ident_raw);
    if !slug.is_empty() {
        name.push('_');
        name.push_str(slug);
    }
    if let Some(page) = continued_page {
        name.push_str(&format!("_continued_p{}", page));
    }
    name
}

/// Hands out unique `<base>[_<k>].png` names for one run.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: AHashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a filename; collisions get `_1`, `_2`, ... before `.png`.
    /// Returns the claimed name and whether a suffix was needed.
    pub fn claim(&mut self, base: &str) -> (String, bool) {
        let plain = format!("{}.png", base);
        if self.used.insert(plain.clone()) {
            return (plain, false);
        }
        for k in 1.. {
            let candidate = format!("{}_{}.png", base, k);
            if self.used.insert(candidate.clone()) {
                return (candidate, true);
            }
        }
        unreachable!("suffix space exhausted")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slug_basic() {
        assert_eq!(slug("Overview of the system.", 12), "Overview_of_the_system");
    }

    #[test]
    fn test_slug_word_cap() {
        assert_eq!(slug("one two three four", 2), "one_two");
    }

    #[test]
    fn test_slug_strips_non_ascii() {
        assert_eq!(slug("loss (\u{03B5}=0.1) vs. epochs", 12), "loss_01_vs_epochs");
    }

    #[test]
    fn test_slug_empty_tail() {
        assert_eq!(slug("", 12), "");
        assert_eq!(slug("\u{7CFB}\u{7EDF}", 12), "");
    }

    #[test]
    fn test_slug_length_cap() {
        let long = "w".repeat(200);
        let s = slug(&long, 12);
        assert!(s.len() <= MAX_SLUG_CHARS);
        assert!(!s.ends_with('_'));
    }

    #[test]
    fn test_base_name_forms() {
        assert_eq!(
            base_name(AttachmentKind::Figure, "1", "Overview", None),
            "Figure_1_Overview"
        );
        assert_eq!(base_name(AttachmentKind::Table, "S1", "", None), "Table_S1");
        assert_eq!(
            base_name(AttachmentKind::Figure, "2", "More", Some(4)),
            "Figure_2_More_continued_p4"
        );
    }

    #[test]
    fn test_allocator_deterministic_suffixes() {
        let mut alloc = NameAllocator::new();
        let (a, collided_a) = alloc.claim("Figure_1_Overview");
        let (b, collided_b) = alloc.claim("Figure_1_Overview");
        let (c, _) = alloc.claim("Figure_1_Overview");
        assert_eq!(a, "Figure_1_Overview.png");
        assert!(!collided_a);
        assert_eq!(b, "Figure_1_Overview_1.png");
        assert!(collided_b);
        assert_eq!(c, "Figure_1_Overview_2.png");
    }
}
