//! Document tree helpers
//!
//! The transform stages only need a handful of tree operations: parse a page,
//! find a root, query by selector, create elements, serialize children. They
//! are collected here on top of `kuchiki::NodeRef` so the stages read as tree
//! edits rather than parser plumbing.

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::NodeRef;
use kuchiki::traits::*;

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse a complete (possibly malformed) HTML page into a mutable tree
pub fn parse_page(html: &str) -> NodeRef {
    kuchiki::parse_html().one(html)
}

/// Locate the content root: the first match of `preferred`, falling back to
/// `<body>`, then to the document itself.
pub fn locate_root(document: &NodeRef, preferred: &str) -> NodeRef {
    document
        .select_first(preferred)
        .or_else(|_| document.select_first("body"))
        .map(|found| found.as_node().clone())
        .unwrap_or_else(|_| document.clone())
}

/// All elements under `root` (root included) matching `selector`, in document
/// order. Collected up front so callers can detach or replace freely.
pub fn select_all(root: &NodeRef, selector: &str) -> Vec<NodeRef> {
    match root.select(selector) {
        Ok(matches) => matches.map(|found| found.as_node().clone()).collect(),
        Err(()) => {
            tracing::error!(selector, "invalid selector");
            Vec::new()
        }
    }
}

/// Lower-case local tag name, or `None` for non-element nodes
pub fn tag_name(node: &NodeRef) -> Option<String> {
    node.as_element()
        .map(|element| element.name.local.to_ascii_lowercase().to_string())
}

pub fn is_tag(node: &NodeRef, tag: &str) -> bool {
    node.as_element().is_some_and(|element| {
        let local: &str = &element.name.local;
        local.eq_ignore_ascii_case(tag)
    })
}

/// Element children only, skipping text and comments
pub fn element_children(node: &NodeRef) -> Vec<NodeRef> {
    node.children()
        .filter(|child| child.as_element().is_some())
        .collect()
}

/// Create a detached HTML element with no attributes
pub fn new_element(tag: &str) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
        Vec::new(),
    )
}

/// Move every child of `from` to the end of `to`, keeping node identity
pub fn move_children(from: &NodeRef, to: &NodeRef) {
    let children: Vec<NodeRef> = from.children().collect();
    for child in children {
        to.append(child);
    }
}

pub fn get_attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()
        .and_then(|element| element.attributes.borrow().get(name).map(str::to_string))
}

pub fn set_attr(node: &NodeRef, name: &str, value: &str) {
    if let Some(element) = node.as_element() {
        element
            .attributes
            .borrow_mut()
            .insert(name, value.to_string());
    }
}

pub fn remove_attr(node: &NodeRef, name: &str) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().remove(name);
    }
}

/// Serialize the children of `node` (its inner HTML)
pub fn inner_html(node: &NodeRef) -> String {
    node.children().map(|child| child.to_string()).collect()
}

/// Collapse whitespace runs to single spaces and trim
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_root_prefers_container() {
        let doc = parse_page(r#"<body><div id="nav">x</div><div id="text"><p>hi</p></div></body>"#);
        let root = locate_root(&doc, "#text");
        assert_eq!(inner_html(&root), "<p>hi</p>");
    }

    #[test]
    fn test_locate_root_falls_back_to_body() {
        let doc = parse_page("<body><p>only body</p></body>");
        let root = locate_root(&doc, "#annotations");
        assert!(is_tag(&root, "body"));
        assert_eq!(inner_html(&root), "<p>only body</p>");
    }

    #[test]
    fn test_new_element_and_attrs() {
        let div = new_element("div");
        set_attr(&div, "class", "flow");
        assert_eq!(get_attr(&div, "class").as_deref(), Some("flow"));
        remove_attr(&div, "class");
        assert_eq!(div.to_string(), "<div></div>");
    }

    #[test]
    fn test_move_children_keeps_markup() {
        let doc = parse_page(r#"<body><a href="x.htm">link</a> tail</body>"#);
        let target = new_element("div");
        let body = locate_root(&doc, "body");
        move_children(&body, &target);
        assert!(inner_html(&target).contains(r#"<a href="x.htm">link</a>"#));
        assert_eq!(inner_html(&body), "");
    }

    #[test]
    fn test_tag_name_and_is_tag() {
        let doc = parse_page("<body><DIV>x</DIV>text</body>");
        let body = locate_root(&doc, "body");
        let children: Vec<NodeRef> = body.children().collect();
        assert_eq!(tag_name(&children[0]).as_deref(), Some("div"));
        assert!(is_tag(&children[0], "DIV"));
        assert!(is_tag(&children[0], "div"));
        assert_eq!(tag_name(&children[1]), None);
        assert!(!is_tag(&children[1], "div"));
        assert_eq!(element_children(&body).len(), 1);
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a \n\t b  c "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }
}
