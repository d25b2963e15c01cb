//! Margin-note table flattening
//!
//! The legacy edition lays annotated text out as a two-column table: a narrow
//! left cell carrying a margin marker (e.g. `3.05`) and a wide right cell with
//! the line of text. Those tables are rewritten into one flowing block where
//! each marker starts its own line and unmarked rows continue the previous one.
//!
//! Detection is conservative: a table is only rewritten when *every* row has
//! exactly two `<td>` cells. Anything else is genuine tabular content and is
//! left alone.

use kuchiki::NodeRef;

use crate::dom;

/// Class put on the block that replaces a flattened table
pub const FLOW_CLASS: &str = "margin-flow";

/// Flatten every margin-layout table under `root`. Returns how many tables
/// were rewritten.
pub fn flatten_margin_tables(root: &NodeRef) -> usize {
    let mut flattened = 0;
    for table in dom::select_all(root, "table") {
        if let Some(rows) = margin_rows(&table) {
            let block = build_flow_block(&rows);
            table.insert_before(block);
            table.detach();
            flattened += 1;
        }
    }
    flattened
}

/// `(marker, content)` cell pairs for a margin-layout table, or `None` when
/// the table does not qualify.
fn margin_rows(table: &NodeRef) -> Option<Vec<(NodeRef, NodeRef)>> {
    let rows = table_rows(table);
    if rows.is_empty() {
        return None;
    }

    let mut pairs = Vec::with_capacity(rows.len());
    for row in &rows {
        let cells: Vec<NodeRef> = dom::element_children(row)
            .into_iter()
            .filter(|child| matches!(dom::tag_name(child).as_deref(), Some("td" | "th")))
            .collect();
        match cells.as_slice() {
            [marker, content] if dom::is_tag(marker, "td") && dom::is_tag(content, "td") => {
                pairs.push((marker.clone(), content.clone()));
            }
            _ => return None,
        }
    }
    Some(pairs)
}

/// Rows owned by this table: direct `<tr>` children and those of its row
/// groups. Rows of nested tables are not included.
fn table_rows(table: &NodeRef) -> Vec<NodeRef> {
    let mut rows = Vec::new();
    for child in dom::element_children(table) {
        match dom::tag_name(&child).as_deref() {
            Some("tr") => rows.push(child),
            Some("thead" | "tbody" | "tfoot") => rows.extend(
                dom::element_children(&child)
                    .into_iter()
                    .filter(|row| dom::is_tag(row, "tr")),
            ),
            _ => {}
        }
    }
    rows
}

fn build_flow_block(rows: &[(NodeRef, NodeRef)]) -> NodeRef {
    let block = dom::new_element("div");
    dom::set_attr(&block, "class", FLOW_CLASS);

    for (index, (marker, content)) in rows.iter().enumerate() {
        let has_marker = !marker.text_contents().trim().is_empty();
        match (index, has_marker) {
            (0, true) => {
                dom::move_children(marker, &block);
                block.append(dom::new_element("br"));
            }
            (0, false) => {}
            (_, true) => {
                block.append(dom::new_element("br"));
                dom::move_children(marker, &block);
                block.append(dom::new_element("br"));
            }
            (_, false) => block.append(NodeRef::new_text(" ")),
        }
        dom::move_children(content, &block);
    }

    block
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, locate_root, parse_page};
    use pretty_assertions::assert_eq;

    fn flatten(body: &str) -> (String, usize) {
        let doc = parse_page(&format!("<body><div id=\"text\">{}</div></body>", body));
        let root = locate_root(&doc, "#text");
        let count = flatten_margin_tables(&root);
        (inner_html(&root), count)
    }

    #[test]
    fn test_markers_start_their_own_lines() {
        let (html, count) = flatten(
            "<table>\
             <tr><td>1.01</td><td>All happy families</td></tr>\
             <tr><td></td><td>are more or less dissimilar</td></tr>\
             <tr><td>1.02</td><td>all unhappy ones</td></tr>\
             </table>",
        );
        assert_eq!(count, 1);
        assert_eq!(
            html,
            "<div class=\"margin-flow\">1.01<br>All happy families are more or less dissimilar\
             <br>1.02<br>all unhappy ones</div>"
        );
    }

    #[test]
    fn test_first_row_without_marker() {
        let (html, _) = flatten(
            "<table><tr><td> </td><td>Opening</td></tr><tr><td>2.1</td><td>Next</td></tr></table>",
        );
        assert_eq!(html, "<div class=\"margin-flow\">Opening<br>2.1<br>Next</div>");
    }

    #[test]
    fn test_cell_markup_is_preserved() {
        let (html, _) = flatten(
            "<table><tr><td><a href=\"ada11ann.htm\">3.05</a></td>\
             <td>Ada's <i>orchids</i></td></tr></table>",
        );
        assert_eq!(
            html,
            "<div class=\"margin-flow\"><a href=\"ada11ann.htm\">3.05</a><br>Ada's <i>orchids</i></div>"
        );
    }

    #[test]
    fn test_irregular_tables_untouched() {
        let source = "<table><tbody><tr><td>a</td><td>b</td></tr>\
                      <tr><td>c</td><td>d</td><td>e</td></tr></tbody></table>";
        let (html, count) = flatten(source);
        assert_eq!(count, 0);
        assert_eq!(html, source);
    }

    #[test]
    fn test_header_cells_disqualify() {
        let source = "<table><tbody><tr><th>Year</th><td>1884</td></tr></tbody></table>";
        let (html, count) = flatten(source);
        assert_eq!(count, 0);
        assert_eq!(html, source);
    }

    #[test]
    fn test_empty_table_untouched() {
        let (html, count) = flatten("<table></table>");
        assert_eq!(count, 0);
        assert_eq!(html, "<table></table>");
    }

    #[test]
    fn test_flattening_is_idempotent_on_output() {
        let (first, _) = flatten(
            "<table><tr><td>4.1</td><td>Lucette</td></tr><tr><td></td><td>swam</td></tr></table>",
        );
        let (second, count) = flatten(&first);
        assert_eq!(count, 0);
        assert_eq!(first, second);
    }

    #[test]
    fn test_nested_margin_tables_all_flattened() {
        let (html, count) = flatten(
            "<table><tr><td>9.1</td><td>outer \
             <table><tr><td>9.2</td><td>inner</td></tr></table>\
             </td></tr></table>",
        );
        assert_eq!(count, 2);
        assert!(!html.contains("<table"));
        assert!(html.contains("9.2<br>inner"));
    }
}
