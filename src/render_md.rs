//! Rendering normalized fragments as terminal text
//!
//! Fragments are converted to Markdown, which reads well in a terminal, then
//! link targets are dropped: links are listed and followed separately.

use html_to_markdown_rs::{
    convert,
    CodeBlockStyle,
    ConversionOptions,
    HeadingStyle,
    NewlineStyle,
};
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

static IMAGE_MD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"!\[([^\]]*)\]\([^)]*\)").expect("BUG: image markdown regex is valid")
});

static LINK_MD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("BUG: link markdown regex is valid")
});

static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\n{3,}").expect("BUG: blank line regex is valid")
});

/// Convert an HTML fragment into readable terminal text
pub fn fragment_to_text(html: &str) -> String {
    let mut options = ConversionOptions {
        heading_style: HeadingStyle::Atx,
        code_block_style: CodeBlockStyle::Backticks,
        newline_style: NewlineStyle::Spaces,
        list_indent_width: 2,
        bullets: "-".to_string(),
        strong_em_symbol: '*',
        escape_asterisks: false,
        escape_underscores: false,
        ..Default::default()
    };
    options.strip_tags = vec!["script".to_string(), "noscript".to_string()];

    let markdown = match convert(html, Some(options)) {
        Ok(markdown) => markdown,
        Err(e) => {
            tracing::warn!(error = %e, "markdown conversion failed, using plain text");
            plain_text(html)
        }
    };

    tidy(&markdown)
}

fn plain_text(html: &str) -> String {
    Html::parse_fragment(html)
        .root_element()
        .text()
        .collect::<String>()
}

fn tidy(markdown: &str) -> String {
    let text = IMAGE_MD.replace_all(markdown, "[image: $1]");
    let text = LINK_MD.replace_all(&text, "$1");
    let text: Vec<&str> = text.lines().map(str::trim_end).collect();
    BLANK_RUNS
        .replace_all(&text.join("\n"), "\n\n")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_render_as_their_text() {
        let text = fragment_to_text(r#"<p>Van met <a href="ada12ann.htm">Ada</a> at Ardis.</p>"#);
        assert!(text.contains("Van met Ada at Ardis."));
        assert!(!text.contains("ada12ann.htm"));
    }

    #[test]
    fn test_images_become_placeholders() {
        let text = fragment_to_text(r#"<p><img src="https://host/map.jpg" alt="Map"></p>"#);
        assert!(text.contains("[image: Map]"));
    }

    #[test]
    fn test_tidy_collapses_blank_runs() {
        assert_eq!(tidy("a  \n\n\n\nb\n"), "a\n\nb");
    }

    #[test]
    fn test_plain_text_fallback() {
        assert_eq!(plain_text("<p>one <b>two</b></p>"), "one two");
    }
}
