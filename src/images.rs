//! Image URL and sizing normalization

use kuchiki::NodeRef;
use url::Url;

use crate::dom;

/// Class carrying the responsive presentation of normalized images
pub const RESPONSIVE_IMAGE_CLASS: &str = "ada-responsive-img";

/// Stylesheet rule for [`RESPONSIVE_IMAGE_CLASS`]. Presentation travels as a
/// class so normalized fragments never carry inline `style` attributes.
pub const RESPONSIVE_IMAGE_CSS: &str =
    "img.ada-responsive-img { max-width: 100%; height: auto; display: block; margin: 0 auto; }\n";

/// Make every image `src` absolute against `base` and strip fixed sizing.
///
/// Already-absolute `http`/`https` sources are kept. A source that cannot be
/// resolved is left as it was. Sizing is stripped and the responsive class
/// applied whether or not the URL changed.
pub fn normalize_images(root: &NodeRef, base: &Url) {
    for img in dom::select_all(root, "img[src]") {
        if let Some(src) = dom::get_attr(&img, "src") {
            if let Some(absolute) = absolutize(&src, base) {
                dom::set_attr(&img, "src", &absolute);
            }
        }

        dom::remove_attr(&img, "width");
        dom::remove_attr(&img, "height");
        add_class(&img, RESPONSIVE_IMAGE_CLASS);
    }
}

/// Resolved form of `src`, or `None` when it should stay unchanged
fn absolutize(src: &str, base: &Url) -> Option<String> {
    if is_absolute_http(src) {
        return None;
    }
    match base.join(src.trim()) {
        Ok(resolved) => Some(resolved.to_string()),
        Err(e) => {
            tracing::debug!(src, error = %e, "leaving unresolvable image source");
            None
        }
    }
}

fn is_absolute_http(src: &str) -> bool {
    Url::parse(src.trim())
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false)
}

fn add_class(node: &NodeRef, class: &str) {
    let existing = dom::get_attr(node, "class").unwrap_or_default();
    if existing.split_whitespace().any(|c| c == class) {
        return;
    }
    let value = if existing.trim().is_empty() {
        class.to_string()
    } else {
        format!("{} {}", existing.trim(), class)
    };
    dom::set_attr(node, "class", &value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{get_attr, locate_root, parse_page, select_all};

    fn normalize(body: &str, base: &str) -> Vec<NodeRef> {
        let doc = parse_page(&format!("<body>{}</body>", body));
        let root = locate_root(&doc, "body");
        normalize_images(&root, &Url::parse(base).unwrap());
        select_all(&root, "img")
    }

    #[test]
    fn test_relative_source_resolved() {
        let imgs = normalize(
            r#"<img src="foo/bar.jpg" width="400" height="300">"#,
            "https://host/x/y.htm",
        );
        assert_eq!(get_attr(&imgs[0], "src").as_deref(), Some("https://host/x/foo/bar.jpg"));
        assert_eq!(get_attr(&imgs[0], "width"), None);
        assert_eq!(get_attr(&imgs[0], "height"), None);
    }

    #[test]
    fn test_absolute_source_unchanged() {
        let imgs = normalize(
            r#"<img src="http://cdn.example.org/a.png" width="10">"#,
            "https://host/x/y.htm",
        );
        assert_eq!(get_attr(&imgs[0], "src").as_deref(), Some("http://cdn.example.org/a.png"));
        assert_eq!(get_attr(&imgs[0], "width"), None);
        assert_eq!(get_attr(&imgs[0], "class").as_deref(), Some(RESPONSIVE_IMAGE_CLASS));
    }

    #[test]
    fn test_unresolvable_source_left_alone() {
        let imgs = normalize(r#"<img src="http://[bad/pic.jpg" height="5">"#, "https://host/");
        assert_eq!(get_attr(&imgs[0], "src").as_deref(), Some("http://[bad/pic.jpg"));
        assert_eq!(get_attr(&imgs[0], "height"), None);
    }

    #[test]
    fn test_existing_class_kept() {
        let imgs = normalize(r#"<img src="a.gif" class="plate">"#, "https://host/");
        assert_eq!(
            get_attr(&imgs[0], "class").as_deref(),
            Some("plate ada-responsive-img")
        );
    }

    #[test]
    fn test_no_style_attribute_added() {
        let imgs = normalize(r#"<img src="a.gif">"#, "https://host/");
        assert_eq!(get_attr(&imgs[0], "style"), None);
    }
}
