//! Structural pre-pass over the tree
//!
//! Stamps every element with its 1-based position among its parent's
//! element children (the `:nth-child` source), marks tables containing
//! spanned cells, and aligns the `class` attribute of list items and table
//! rows to the intersection of their class sets. Alignment collapses
//! per-row "alt" styling so that all rows of one listing share a selector;
//! spanned tables lose their cell indices so `:nth-child` selectors cannot
//! fragment cells that no longer line up column-wise.

use crate::dom::{Document, NodeId, INDEX_ATTR, TABLE_ATTR};

/// Runs the pre-pass over the whole document.
pub fn set_element_indices(doc: &mut Document) {
    let root = doc.root();
    annotate_subtree(doc, root);
}

fn annotate_subtree(doc: &mut Document, parent: NodeId) {
    let children: Vec<NodeId> = doc.element_children(parent).collect();
    for (i, el) in children.into_iter().enumerate() {
        doc.set_attr(el, INDEX_ATTR, &(i + 1).to_string());
        annotate_subtree(doc, el);
    }

    // the interesting work happens on the way out, when the subtree below
    // has already been annotated
    match doc.tag(parent) {
        Some("td") | Some("th") => {
            let spanned = doc.attr(parent, "colspan").map_or(false, |v| !v.is_empty())
                || doc.attr(parent, "rowspan").map_or(false, |v| !v.is_empty());
            if spanned {
                if let Some(table) = doc.ancestor_by_tag(parent, "table") {
                    doc.set_attr(table, TABLE_ATTR, "spanned");
                }
            }
        }
        Some("ul") | Some("ol") => align_classes(doc, parent, "li"),
        Some("tbody") | Some("thead") => align_classes(doc, parent, "tr"),
        Some("table") => {
            align_classes(doc, parent, "tr");
            if doc.attr(parent, TABLE_ATTR) == Some("spanned") {
                let cells: Vec<NodeId> = doc
                    .descendants(parent)
                    .filter(|d| matches!(doc.tag(*d), Some("td") | Some("th")))
                    .collect();
                for cell in cells {
                    doc.remove_attr(cell, INDEX_ATTR);
                }
            }
        }
        _ => {}
    }
}

/// Overwrites the `class` of every direct `target_tag` child of `parent`
/// with the intersection of all their class token sets. Token order follows
/// the first child so the result is deterministic.
fn align_classes(doc: &mut Document, parent: NodeId, target_tag: &str) {
    let targets: Vec<NodeId> = doc
        .element_children(parent)
        .filter(|c| doc.tag(*c) == Some(target_tag))
        .collect();
    let Some((&first, rest)) = targets.split_first() else {
        return;
    };

    let mut shared: Vec<&str> = Vec::new();
    for token in doc.attr(first, "class").unwrap_or("").split_whitespace() {
        if shared.contains(&token) {
            continue;
        }
        let everywhere = rest.iter().all(|sibling| {
            doc.attr(*sibling, "class")
                .unwrap_or("")
                .split_whitespace()
                .any(|t| t == token)
        });
        if everywhere {
            shared.push(token);
        }
    }
    let aligned = shared.join(" ");

    for target in targets.iter() {
        doc.set_attr(*target, "class", &aligned);
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::html::parse_document;

    #[test]
    fn test_index_stamping() {
        let mut doc = parse_document("<div><p>a</p><p>b</p><span>c</span></div>").unwrap();
        set_element_indices(&mut doc);
        let div = doc.descendants_by_tag(doc.root(), "div").next().unwrap();
        let indices: Vec<&str> = doc
            .element_children(div)
            .filter_map(|c| doc.attr(c, INDEX_ATTR))
            .collect();
        assert_eq!(indices, vec!["1", "2", "3"]);
        // the root itself carries no index
        assert_eq!(doc.attr(doc.root(), INDEX_ATTR), None);
    }

    #[test]
    fn test_class_alignment_on_lists() {
        let mut doc = parse_document(concat!(
            "<ul>",
            "<li class=\"item first\">a</li>",
            "<li class=\"item alt\">b</li>",
            "<li class=\"item\">c</li>",
            "</ul>",
        ))
        .unwrap();
        set_element_indices(&mut doc);
        let ul = doc.descendants_by_tag(doc.root(), "ul").next().unwrap();
        for li in doc.element_children(ul).collect::<Vec<_>>() {
            assert_eq!(doc.attr(li, "class"), Some("item"));
        }
    }

    #[test]
    fn test_empty_intersection_clears_classes() {
        let mut doc = parse_document("<ul><li class=\"a\">x</li><li class=\"b\">y</li></ul>")
            .unwrap();
        set_element_indices(&mut doc);
        let ul = doc.descendants_by_tag(doc.root(), "ul").next().unwrap();
        for li in doc.element_children(ul).collect::<Vec<_>>() {
            assert_eq!(doc.attr(li, "class"), Some(""));
        }
    }

    #[test]
    fn test_row_alignment_under_tbody() {
        let mut doc = parse_document(concat!(
            "<table><tbody>",
            "<tr class=\"row odd\"><td>1</td></tr>",
            "<tr class=\"row even\"><td>2</td></tr>",
            "</tbody></table>",
        ))
        .unwrap();
        set_element_indices(&mut doc);
        for tr in doc
            .descendants_by_tag(doc.root(), "tr")
            .collect::<Vec<_>>()
        {
            assert_eq!(doc.attr(tr, "class"), Some("row"));
        }
    }

    #[test]
    fn test_spanned_table_drops_cell_indices() {
        let mut doc = parse_document(concat!(
            "<table>",
            "<tr><td>a</td><td>b</td></tr>",
            "<tr><td colspan=\"2\">wide</td></tr>",
            "</table>",
        ))
        .unwrap();
        set_element_indices(&mut doc);
        let table = doc.descendants_by_tag(doc.root(), "table").next().unwrap();
        assert_eq!(doc.attr(table, TABLE_ATTR), Some("spanned"));
        for td in doc
            .descendants_by_tag(doc.root(), "td")
            .collect::<Vec<_>>()
        {
            assert_eq!(doc.attr(td, INDEX_ATTR), None);
        }
        // rows keep their indices, only cells lose them
        for tr in doc
            .descendants_by_tag(doc.root(), "tr")
            .collect::<Vec<_>>()
        {
            assert!(doc.attr(tr, INDEX_ATTR).is_some());
        }
    }

    #[test]
    fn test_unspanned_table_keeps_cell_indices() {
        let mut doc = parse_document("<table><tr><td>a</td><td>b</td></tr></table>").unwrap();
        set_element_indices(&mut doc);
        let tds: Vec<&str> = doc
            .descendants_by_tag(doc.root(), "td")
            .collect::<Vec<_>>()
            .into_iter()
            .filter_map(|td| doc.attr(td, INDEX_ATTR))
            .collect();
        assert_eq!(tds, vec!["1", "2"]);
    }
}
