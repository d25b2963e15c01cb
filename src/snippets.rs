//! Commentary lookup in a loaded annotations fragment
//!
//! Annotation pages are loosely structured: a marker line followed by a few
//! paragraphs, sometimes wrapped in larger blocks. A clicked phrase is matched
//! against the text of every paragraph-like block; the shortest block that
//! contains it is taken as the most specific entry.

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::dom::collapse_whitespace;

static CANDIDATE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("p, div, li, dd")
        .expect("BUG: hardcoded selector 'p, div, li, dd' is statically valid")
});

/// Blocks after the match that may continue the same annotation
const TRAILING_BLOCKS: usize = 3;

/// Shown when a chapter has no annotations at all
pub const NO_COMMENTARY_HTML: &str = "<p>No commentary found.</p>";

/// Lower-cased, whitespace-collapsed form used on both sides of a match
pub fn normalize_text(text: &str) -> String {
    collapse_whitespace(text).to_lowercase()
}

/// The annotations fragment of the displayed chapter
pub struct AnnotationsDocument {
    source: String,
    tree: Html,
}

impl AnnotationsDocument {
    /// Parse a notes fragment; blank fragments mean "no annotations"
    pub fn parse(notes_html: &str) -> Option<Self> {
        if notes_html.trim().is_empty() {
            return None;
        }
        Some(Self {
            source: notes_html.to_string(),
            tree: Html::parse_fragment(notes_html),
        })
    }

    /// The whole fragment as loaded
    pub fn html(&self) -> &str {
        &self.source
    }

    /// Markup of the most specific block containing `phrase`, followed by up
    /// to three sibling blocks (stopping at the first one without text).
    pub fn find_snippet(&self, phrase: &str) -> Option<String> {
        let needle = normalize_text(phrase);
        if needle.is_empty() {
            return None;
        }

        let mut best: Option<(usize, ElementRef)> = None;
        for block in self.tree.select(&CANDIDATE_SELECTOR) {
            let text = normalize_text(&block.text().collect::<String>());
            if !text.contains(&needle) {
                continue;
            }
            let length = text.chars().count();
            if best.as_ref().is_none_or(|(shortest, _)| length < *shortest) {
                best = Some((length, block));
            }
        }

        let Some((_, block)) = best else {
            let whole = normalize_text(&self.tree.root_element().text().collect::<String>());
            if whole.contains(&needle) {
                tracing::debug!(phrase, "phrase only occurs outside annotation blocks");
            }
            return None;
        };

        let mut snippet = block.html();
        let trailing = block
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take(TRAILING_BLOCKS);
        for sibling in trailing {
            if sibling.text().collect::<String>().trim().is_empty() {
                break;
            }
            snippet.push_str(&sibling.html());
        }
        Some(snippet)
    }
}

/// What the commentary overlay shows for a lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commentary {
    /// The matched block and its continuation
    Snippet(String),
    /// No block matched: the whole annotations fragment
    FullNotes(String),
    /// The chapter has no annotations
    Missing,
}

impl Commentary {
    pub fn into_html(self) -> String {
        match self {
            Commentary::Snippet(html) | Commentary::FullNotes(html) => html,
            Commentary::Missing => NO_COMMENTARY_HTML.to_string(),
        }
    }
}

/// Resolve a clicked phrase: snippet, else the full notes, else a placeholder
pub fn lookup_commentary(notes: Option<&AnnotationsDocument>, phrase: &str) -> Commentary {
    match notes {
        None => Commentary::Missing,
        Some(document) => match document.find_snippet(phrase) {
            Some(snippet) => Commentary::Snippet(snippet),
            None => Commentary::FullNotes(document.html().to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOTES: &str = "<div class=\"part\">\
        <p>12.03 Ardis Hall: the family seat, see also <i>Ardis</i> the Second.</p>\
        <p>Second paragraph of the Ardis note.</p>\
        <p>Third paragraph.</p>\
        <p>Fourth paragraph.</p>\
        <p>Fifth paragraph, never included.</p>\
        </div>";

    fn notes() -> AnnotationsDocument {
        AnnotationsDocument::parse(NOTES).unwrap()
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text("  Ardis\n\tHALL  "), "ardis hall");
    }

    #[test]
    fn test_shortest_containing_block_wins() {
        let doc = AnnotationsDocument::parse(
            "<div><p>orchids in the greenhouse</p><p>unrelated</p></div>",
        )
        .unwrap();
        let snippet = doc.find_snippet("Orchids").unwrap();
        assert!(snippet.starts_with("<p>orchids in the greenhouse</p>"));
        assert!(!snippet.starts_with("<div>"));
    }

    #[test]
    fn test_snippet_includes_three_trailing_blocks() {
        let snippet = notes().find_snippet("ardis   hall").unwrap();
        assert_eq!(
            snippet,
            "<p>12.03 Ardis Hall: the family seat, see also <i>Ardis</i> the Second.</p>\
             <p>Second paragraph of the Ardis note.</p>\
             <p>Third paragraph.</p>\
             <p>Fourth paragraph.</p>"
        );
    }

    #[test]
    fn test_trailing_blocks_stop_at_empty_sibling() {
        let doc = AnnotationsDocument::parse(
            "<p>3.05 Lucette: the younger sister.</p><p>More on Lucette.</p><p> </p><p>Other.</p>",
        )
        .unwrap();
        assert_eq!(
            doc.find_snippet("younger sister").unwrap(),
            "<p>3.05 Lucette: the younger sister.</p><p>More on Lucette.</p>"
        );
    }

    #[test]
    fn test_list_items_and_definitions_are_candidates() {
        let doc = AnnotationsDocument::parse(
            "<dl><dt>Antiterra</dt><dd>The twin planet of Terra.</dd></dl>",
        )
        .unwrap();
        assert_eq!(doc.find_snippet("twin planet").unwrap(), "<dd>The twin planet of Terra.</dd>");
    }

    #[test]
    fn test_phrase_outside_blocks_finds_nothing() {
        let doc = AnnotationsDocument::parse("<span>loose text</span><p>block</p>").unwrap();
        assert_eq!(doc.find_snippet("loose"), None);
    }

    #[test]
    fn test_empty_phrase_finds_nothing() {
        assert_eq!(notes().find_snippet("   "), None);
    }

    #[test]
    fn test_blank_notes_are_absent() {
        assert!(AnnotationsDocument::parse("  \n ").is_none());
    }

    #[test]
    fn test_lookup_fallbacks() {
        let doc = notes();
        assert!(matches!(
            lookup_commentary(Some(&doc), "Ardis Hall"),
            Commentary::Snippet(_)
        ));
        assert_eq!(
            lookup_commentary(Some(&doc), "Zembla"),
            Commentary::FullNotes(NOTES.to_string())
        );
        assert_eq!(lookup_commentary(None, "Zembla"), Commentary::Missing);
        assert_eq!(Commentary::Missing.into_html(), NO_COMMENTARY_HTML);
    }
}
