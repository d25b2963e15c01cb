//! Page normalization pipeline
//!
//! A fetched legacy page is reduced to a clean fragment by running a fixed
//! sequence of stages over its content root. The order is part of the
//! contract:
//!
//! 1. [`Stage::Clean`] drops styling first so later stages never touch
//!    markup that is about to be discarded.
//!    Post: no `<style>`/`<link>` elements, no `style` attributes.
//! 2. [`Stage::StripLineBreaks`] removes the source's manual `<br>`s.
//!    Pre: must run before flattening, which inserts its own breaks.
//!    Post: no `<br>` from the source remains.
//! 3. [`Stage::FlattenMarginTables`] rewrites two-column margin tables.
//!    Post: no margin-layout table remains.
//! 4. [`Stage::NormalizeImages`] makes image sources absolute and strips
//!    fixed sizing. Post: every resolvable `img[src]` is absolute.

use kuchiki::NodeRef;
use url::Url;

use crate::{clean, dom, images, margin_tables};

/// Preferred container of chapter text on the source pages
pub const TEXT_ROOT: &str = "#text";
/// Preferred container of annotations on the source pages
pub const NOTES_ROOT: &str = "#annotations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Clean,
    StripLineBreaks,
    FlattenMarginTables,
    NormalizeImages,
}

/// Stages in execution order
pub const STAGES: [Stage; 4] = [
    Stage::Clean,
    Stage::StripLineBreaks,
    Stage::FlattenMarginTables,
    Stage::NormalizeImages,
];

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Clean => "clean",
            Stage::StripLineBreaks => "strip-line-breaks",
            Stage::FlattenMarginTables => "flatten-margin-tables",
            Stage::NormalizeImages => "normalize-images",
        }
    }

    fn apply(self, root: &NodeRef, base: &Url) {
        match self {
            Stage::Clean => clean::strip_presentation(Some(root)),
            Stage::StripLineBreaks => clean::strip_line_breaks(root),
            Stage::FlattenMarginTables => {
                let flattened = margin_tables::flatten_margin_tables(root);
                tracing::trace!(flattened, "margin tables flattened");
            }
            Stage::NormalizeImages => images::normalize_images(root, base),
        }
    }
}

/// Result of normalizing one source page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedPage {
    /// Text of the page's `<title>`, whitespace collapsed
    pub title: Option<String>,
    /// Inner HTML of the normalized content root
    pub html: String,
}

/// Run every stage over `root`, in order
pub fn run_stages(root: &NodeRef, base: &Url) {
    for stage in STAGES {
        tracing::trace!(stage = stage.name(), "running stage");
        stage.apply(root, base);
    }
}

/// Parse `html`, locate its content root by `root_selector` (falling back to
/// `<body>`), normalize it and serialize the result. Relative image sources
/// resolve against `base`, the page's own URL.
pub fn normalize_page(html: &str, root_selector: &str, base: &Url) -> NormalizedPage {
    let document = dom::parse_page(html);
    let title = page_title(&document);
    let root = dom::locate_root(&document, root_selector);
    run_stages(&root, base);
    NormalizedPage {
        title,
        html: dom::inner_html(&root),
    }
}

fn page_title(document: &NodeRef) -> Option<String> {
    document
        .select_first("title")
        .ok()
        .map(|title| dom::collapse_whitespace(&title.as_node().text_contents()))
        .filter(|title| !title.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PAGE: &str = r#"<html><head><title> Ada  Online:
        Part 1 Chapter 2 </title><link rel="stylesheet" href="ada.css">
        <style>td { width: 10% }</style></head>
        <body><div id="nav"><a href="ada11.htm">prev</a></div>
        <div id="text" style="font-family: serif">
        <table width="100%">
        <tr><td style="color:grey">2.01</td><td>Ada<br>was twelve</td></tr>
        <tr><td></td><td>and Van fourteen</td></tr>
        </table>
        <img src="images/ardis.jpg" width="300" height="200">
        </div></body></html>"#;

    fn base() -> Url {
        Url::parse("https://www.ada.auckland.ac.nz/ada12.htm").unwrap()
    }

    #[test]
    fn test_stage_order() {
        let names: Vec<_> = STAGES.iter().map(|s| s.name()).collect();
        assert_eq!(
            names,
            ["clean", "strip-line-breaks", "flatten-margin-tables", "normalize-images"]
        );
    }

    #[test]
    fn test_normalize_page_end_to_end() {
        let page = normalize_page(PAGE, TEXT_ROOT, &base());
        assert_eq!(page.title.as_deref(), Some("Ada Online: Part 1 Chapter 2"));

        let html = &page.html;
        assert!(!html.contains("style"));
        assert!(!html.contains("<table"));
        assert!(!html.contains("prev"), "navigation outside #text is dropped");
        assert!(html.contains("2.01<br>Ada was twelve and Van fourteen"));
        assert!(html.contains(r#"src="https://www.ada.auckland.ac.nz/images/ardis.jpg""#));
        assert!(!html.contains("width="));
        assert!(!html.contains("height="));
    }

    #[test]
    fn test_only_flattener_breaks_remain() {
        let page = normalize_page(PAGE, TEXT_ROOT, &base());
        assert_eq!(page.html.matches("<br>").count(), 1);
    }

    #[test]
    fn test_missing_container_falls_back_to_body() {
        let page = normalize_page(
            "<html><body><p style='x'>Whole body</p></body></html>",
            NOTES_ROOT,
            &base(),
        );
        assert_eq!(page.html, "<p>Whole body</p>");
        assert_eq!(page.title, None);
    }
}
