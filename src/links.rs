//! Anchor classification for rendered fragments
//!
//! Every anchor in a chapter (or commentary) fragment gets exactly one
//! disposition, decided by the first rule that matches:
//!
//! 1. annotation reference: empty href, `#...`, or an `adaNNann.htm` page
//! 2. chapter navigation: the href names a known chapter's source page
//! 3. source document: same-host absolute URL, or relative `.htm` href
//! 4. anything else, kept verbatim

use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use url::{ParseError, Url};

use crate::api_client::ChapterSummary;
use crate::dom::collapse_whitespace;

static ANCHOR_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("a").expect("BUG: hardcoded selector 'a' is statically valid")
});

static ANNOTATION_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^ada\d+ann\.htm$").expect("BUG: annotation filename regex is valid")
});

static HTM_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.htm([?#].*)?$").expect("BUG: .htm reference regex is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkDisposition {
    /// Look up commentary for `phrase` in the loaded annotations
    Annotation { phrase: String },
    /// Load another chapter
    Chapter { id: String },
    /// A page of the source edition, as an absolute URL
    SourceDocument { url: String },
    /// Any other link, untouched
    External { href: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLink {
    /// Anchor text, whitespace collapsed
    pub text: String,
    /// Raw `href` attribute (empty when absent)
    pub href: String,
    pub disposition: LinkDisposition,
}

impl ClassifiedLink {
    /// Label for link lists: the anchor text, or the href for empty anchors
    pub fn label(&self) -> &str {
        if self.text.is_empty() { &self.href } else { &self.text }
    }
}

/// Maps normalized source filenames (`ada12.htm`) to chapter ids
#[derive(Debug, Clone, Default)]
pub struct ChapterHrefIndex {
    by_filename: HashMap<String, String>,
}

impl ChapterHrefIndex {
    pub fn from_chapters(chapters: &[ChapterSummary]) -> Self {
        let by_filename = chapters
            .iter()
            .filter_map(|chapter| {
                let url = chapter.text_url.as_deref()?;
                Some((normalize_href(url)?, chapter.id.clone()))
            })
            .collect();
        Self { by_filename }
    }

    pub fn chapter_for(&self, filename: &str) -> Option<&str> {
        self.by_filename.get(filename).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_filename.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_filename.is_empty()
    }
}

/// Final path segment of `href`, lower-cased, without query or fragment.
///
/// `"ADA12.HTM?x=1#y"` becomes `"ada12.htm"`. Returns `None` when nothing
/// is left.
pub fn normalize_href(href: &str) -> Option<String> {
    let href = href.trim();
    let segment = match Url::parse(href) {
        Ok(url) => url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .map(str::to_string),
        Err(_) => {
            let without_suffix = href.split(['?', '#']).next().unwrap_or_default();
            without_suffix.rsplit('/').next().map(str::to_string)
        }
    }?;

    let filename = segment.to_lowercase();
    if filename.is_empty() { None } else { Some(filename) }
}

/// Classify one anchor by its `href` and text
pub fn classify_href(
    href: &str,
    text: &str,
    index: &ChapterHrefIndex,
    source_base: &Url,
) -> LinkDisposition {
    let trimmed = href.trim();
    let filename = normalize_href(trimmed);

    let is_annotation = trimmed.is_empty()
        || trimmed.starts_with('#')
        || filename
            .as_deref()
            .is_some_and(|name| ANNOTATION_FILE.is_match(name));
    if is_annotation {
        return LinkDisposition::Annotation {
            phrase: collapse_whitespace(text),
        };
    }

    if let Some(id) = filename.as_deref().and_then(|name| index.chapter_for(name)) {
        return LinkDisposition::Chapter { id: id.to_string() };
    }

    match Url::parse(trimmed) {
        Ok(url) if is_source_host(&url, source_base) => LinkDisposition::SourceDocument {
            url: url.to_string(),
        },
        Err(ParseError::RelativeUrlWithoutBase) if HTM_REFERENCE.is_match(trimmed) => {
            // protocol-relative hrefs can still name another host
            match source_base.join(trimmed) {
                Ok(url) if is_source_host(&url, source_base) => LinkDisposition::SourceDocument {
                    url: url.to_string(),
                },
                _ => LinkDisposition::External {
                    href: href.to_string(),
                },
            }
        }
        _ => LinkDisposition::External {
            href: href.to_string(),
        },
    }
}

fn is_source_host(url: &Url, source_base: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
        && url.host_str().is_some()
        && url.host_str() == source_base.host_str()
}

/// Classify every anchor of an HTML fragment, in document order
pub fn classify_links(
    fragment: &str,
    index: &ChapterHrefIndex,
    source_base: &Url,
) -> Vec<ClassifiedLink> {
    let document = Html::parse_fragment(fragment);
    document
        .select(&ANCHOR_SELECTOR)
        .map(|anchor| {
            let href = anchor.value().attr("href").unwrap_or_default().to_string();
            let text = collapse_whitespace(&anchor.text().collect::<String>());
            let disposition = classify_href(&href, &text, index, source_base);
            ClassifiedLink {
                text,
                href,
                disposition,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://www.ada.auckland.ac.nz/").unwrap()
    }

    fn index() -> ChapterHrefIndex {
        let chapter = |id: &str, file: &str| ChapterSummary {
            id: id.to_string(),
            title: id.to_string(),
            text_url: Some(format!("https://www.ada.auckland.ac.nz/{}", file)),
            notes_url: None,
        };
        ChapterHrefIndex::from_chapters(&[
            chapter("p1c2", "ada12.htm"),
            chapter("p2c1", "ada21.htm"),
            chapter("p4c1", "ada4.htm"),
        ])
    }

    fn classify(href: &str) -> LinkDisposition {
        classify_href(href, "  Lucette's\n hair ", &index(), &base())
    }

    #[test]
    fn test_normalize_href() {
        assert_eq!(normalize_href("ADA12.HTM?x=1#y").as_deref(), Some("ada12.htm"));
        assert_eq!(
            normalize_href("https://www.ada.auckland.ac.nz/ADA21.htm").as_deref(),
            Some("ada21.htm")
        );
        assert_eq!(normalize_href("../pages/Ada4.htm#top").as_deref(), Some("ada4.htm"));
        assert_eq!(normalize_href("https://host/dir/").as_deref(), None);
        assert_eq!(normalize_href("").as_deref(), None);
        assert_eq!(normalize_href("#").as_deref(), None);
    }

    #[test]
    fn test_index_built_from_text_urls() {
        let index = index();
        assert_eq!(index.len(), 3);
        assert_eq!(index.chapter_for("ada21.htm"), Some("p2c1"));
        assert_eq!(index.chapter_for("ada99.htm"), None);
    }

    #[test]
    fn test_annotation_references() {
        let expected = LinkDisposition::Annotation {
            phrase: "Lucette's hair".to_string(),
        };
        assert_eq!(classify(""), expected);
        assert_eq!(classify("#"), expected);
        assert_eq!(classify("#n12"), expected);
        assert_eq!(classify("ada12ann.htm"), expected);
        assert_eq!(classify("ADA12ANN.HTM#3.05"), expected);
        assert_eq!(classify("https://www.ada.auckland.ac.nz/ada12ann.htm"), expected);
    }

    #[test]
    fn test_chapter_navigation() {
        assert_eq!(
            classify("ADA12.HTM?x=1#y"),
            LinkDisposition::Chapter { id: "p1c2".into() }
        );
        assert_eq!(
            classify("https://www.ada.auckland.ac.nz/ADA21.htm"),
            LinkDisposition::Chapter { id: "p2c1".into() }
        );
    }

    #[test]
    fn test_source_documents() {
        assert_eq!(
            classify("boydintro.htm#p2"),
            LinkDisposition::SourceDocument {
                url: "https://www.ada.auckland.ac.nz/boydintro.htm#p2".into()
            }
        );
        assert_eq!(
            classify("https://www.ada.auckland.ac.nz/images/map.jpg"),
            LinkDisposition::SourceDocument {
                url: "https://www.ada.auckland.ac.nz/images/map.jpg".into()
            }
        );
    }

    #[test]
    fn test_protocol_relative_same_host_is_source() {
        assert_eq!(
            classify("//www.ada.auckland.ac.nz/boydintro.htm"),
            LinkDisposition::SourceDocument {
                url: "https://www.ada.auckland.ac.nz/boydintro.htm".into()
            }
        );
    }

    #[test]
    fn test_generic_links_kept_verbatim() {
        for href in [
            "https://en.wikipedia.org/wiki/Ada.htm",
            "pictures/map.jpg",
            "mailto:ada@example.org",
            "//evil.example/a.htm",
        ] {
            assert_eq!(
                classify(href),
                LinkDisposition::External { href: href.into() }
            );
        }
    }

    #[test]
    fn test_classify_links_in_fragment() {
        let links = classify_links(
            r##"<p>She wore <a href="#">black</a> and read
            <a href="ada21.htm">Part Two</a> or <a href="http://example.com/">elsewhere</a>.</p>"##,
            &index(),
            &base(),
        );
        assert_eq!(links.len(), 3);
        assert_eq!(
            links[0].disposition,
            LinkDisposition::Annotation { phrase: "black".into() }
        );
        assert_eq!(links[1].disposition, LinkDisposition::Chapter { id: "p2c1".into() });
        assert_eq!(links[2].label(), "elsewhere");
        assert!(matches!(links[2].disposition, LinkDisposition::External { .. }));
    }
}
