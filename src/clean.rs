//! Legacy presentation stripping

use kuchiki::NodeRef;

use crate::dom;

/// Remove `<style>` and `<link>` elements and every `style` attribute.
///
/// Mutates the tree in place. A missing root is a no-op, and finding nothing
/// to remove is not an error.
pub fn strip_presentation(root: Option<&NodeRef>) {
    let Some(root) = root else {
        return;
    };

    for node in dom::select_all(root, "style, link") {
        node.detach();
    }

    for node in dom::select_all(root, "[style]") {
        dom::remove_attr(&node, "style");
    }
}

/// Replace each `<br>` with a single space so adjacent words stay apart
pub fn strip_line_breaks(root: &NodeRef) {
    for br in dom::select_all(root, "br") {
        br.insert_before(NodeRef::new_text(" "));
        br.detach();
    }
}
