//! Context-based grouping and selector-path aggregation
//!
//! The walk gives every anchor a context id (`cbg_id`): anchors under the
//! same grouping container share one, all headers collapse onto a single id
//! so a list of `<h2>` links still reads as one group, and an `<li>` that
//! wraps exactly one anchor is registered so its text can upgrade the
//! anchor's title. Afterwards every qualifying anchor becomes an
//! [`Entry`] and each prefix (length ≥ 3) of each of its candidate selector
//! chains is collected into a [`Path`].

use crate::dom::{Document, NodeId, UID_ATTR};
use crate::entry::Entry;
use crate::url::LINK_RE;
use crate::{FastHashMap, FastHashSet};
use std::collections::BTreeSet;

/// Selector prefixes shorter than this never identify a useful region.
const MIN_PATH_SEGMENTS: usize = 3;

/// A selector chain together with the entries it collects.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_serialization", derive(serde::Serialize))]
pub struct Path {
    /// Segments, outermost first (`["html", "body", "ul.posts", …]`).
    pub path: Vec<String>,
    /// `'>'`-joined segments; identity for deduplication.
    pub key: String,
    /// Indices into the builder's entry list, in insertion order. An entry
    /// appears at most once.
    pub entries: Vec<usize>,
    fingerprint: BTreeSet<u64>,
}

impl Path {
    fn new(path: Vec<String>) -> Self {
        let key = Self::key_from(&path);
        Path {
            path,
            key,
            entries: Vec::new(),
            fingerprint: BTreeSet::new(),
        }
    }

    pub fn key_from(path: &[String]) -> String {
        path.join(">")
    }

    /// The set of anchor UIDs attached to this path. Paths with equal
    /// fingerprints describe the same region and merge into one group.
    pub fn fingerprint(&self) -> &BTreeSet<u64> {
        &self.fingerprint
    }

    fn add_entry(&mut self, entry_index: usize, uid: u64) {
        if self.fingerprint.insert(uid) {
            self.entries.push(entry_index);
        }
    }
}

#[derive(Copy, Clone, PartialEq)]
enum TagType {
    Anchor,
    Header,
    Group,
    Wrapper,
}

fn tag_type(tag: &str) -> Option<TagType> {
    match tag {
        "a" => Some(TagType::Anchor),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => Some(TagType::Header),
        "ul" | "ol" | "dl" | "table" | "footer" | "header" | "main" | "nav" => {
            Some(TagType::Group)
        }
        "li" => Some(TagType::Wrapper),
        _ => None,
    }
}

/// Runs the context walk over a document and aggregates every anchor's
/// candidate selector prefixes into paths.
pub struct PathBuilder {
    /// All qualifying anchors, in document order.
    pub entries: Vec<Entry>,
    /// All distinct selector prefixes, in insertion order.
    pub paths: Vec<Path>,
    path_index: FastHashMap<String, usize>,
    cbg_map: FastHashMap<u64, usize>,
    wrappers: FastHashMap<u64, NodeId>,
    element_uid: u64,
    prev_id: usize,
    header_id: usize,
    current_id: usize,
    anchor_count: usize,
    last_anchor: Option<u64>,
}

impl PathBuilder {
    /// Walks the document and returns the aggregated paths. Stamps
    /// `_fd_uid_` on every element and strips duplicated `id` attributes
    /// beforehand (ids that occur twice cannot identify anything).
    pub fn build(doc: &mut Document) -> PathBuilder {
        let mut builder = PathBuilder {
            entries: Vec::new(),
            paths: Vec::new(),
            path_index: FastHashMap::default(),
            cbg_map: FastHashMap::default(),
            wrappers: FastHashMap::default(),
            element_uid: 1,
            prev_id: 0,
            header_id: 0,
            current_id: 0,
            anchor_count: 0,
            last_anchor: None,
        };
        builder.header_id = builder.new_id();
        builder.current_id = builder.new_id();

        builder.remove_duplicated_ids(doc);
        // TODO: nested <a> tags should collapse into the outer anchor
        let root = doc.root();
        builder.context_based_grouping(doc, root);
        builder.collect_entries(doc);
        builder
    }

    fn new_id(&mut self) -> usize {
        self.prev_id += 1;
        self.prev_id
    }

    fn remove_duplicated_ids(&mut self, doc: &mut Document) {
        let elements: Vec<NodeId> = doc
            .subtree(doc.root())
            .filter(|n| doc.is_element(*n))
            .collect();
        let mut seen: FastHashSet<String> = FastHashSet::default();
        for el in elements {
            let id_attr = doc.attr(el, "id").unwrap_or("").trim().to_string();
            if !id_attr.is_empty() && seen.contains(&id_attr) {
                doc.remove_attr(el, "id");
            }
            seen.insert(id_attr);
        }
    }

    fn context_based_grouping(&mut self, doc: &mut Document, parent: NodeId) {
        let children: Vec<NodeId> = doc.element_children(parent).collect();
        for el in children {
            let uid = self.element_uid;
            self.element_uid += 1;
            doc.set_attr(el, UID_ATTR, &uid.to_string());

            match doc.tag(el).and_then(tag_type) {
                Some(TagType::Anchor) => {
                    self.cbg_map.insert(uid, self.current_id);
                    self.anchor_count += 1;
                    self.last_anchor = Some(uid);
                    self.context_based_grouping(doc, el);
                }
                Some(TagType::Wrapper) => {
                    let outer = self.anchor_count;
                    self.anchor_count = 0;
                    self.last_anchor = None;
                    self.context_based_grouping(doc, el);
                    if self.anchor_count == 1 {
                        if let Some(last) = self.last_anchor {
                            self.wrappers.insert(last, el);
                        }
                    }
                    self.anchor_count += outer;
                    self.last_anchor = None;
                }
                Some(TagType::Header) => {
                    self.current_id = self.header_id;
                    self.context_based_grouping(doc, el);
                    self.current_id = self.new_id();
                }
                Some(TagType::Group) => {
                    self.current_id = self.new_id();
                    self.context_based_grouping(doc, el);
                    self.current_id = self.new_id();
                }
                None => {
                    self.context_based_grouping(doc, el);
                }
            }
        }
    }

    fn collect_entries(&mut self, doc: &Document) {
        // anchors discovered outside the walk all share one fallback id
        let default_id = self.new_id();
        let anchors: Vec<NodeId> = doc
            .descendants_by_tag(doc.root(), "a")
            .filter(|a| LINK_RE.is_match(doc.attr(*a, "href").unwrap_or("")))
            .collect();

        for anchor in anchors {
            let uid = element_uid(doc, anchor);
            let cbg_id = self.cbg_map.get(&uid).copied().unwrap_or(default_id);
            let wrapper = self.wrappers.get(&uid).copied();
            let entry = Entry::new(doc, anchor, cbg_id, wrapper);
            let entry_index = self.entries.len();
            let candidate_paths = entry.paths.clone();
            self.entries.push(entry);
            for path in candidate_paths {
                self.add_path(path, entry_index, uid);
            }
        }

        log::debug!(
            "aggregated {} entries into {} paths",
            self.entries.len(),
            self.paths.len()
        );
    }

    fn add_path(&mut self, path: Vec<String>, entry_index: usize, uid: u64) {
        for i in MIN_PATH_SEGMENTS..=path.len() {
            let prefix = &path[..i];
            let key = Path::key_from(prefix);
            let path_index = match self.path_index.get(&key) {
                Some(&existing) => existing,
                None => {
                    let new_index = self.paths.len();
                    self.paths.push(Path::new(prefix.to_vec()));
                    self.path_index.insert(key, new_index);
                    new_index
                }
            };
            self.paths[path_index].add_entry(entry_index, uid);
        }
    }
}

/// Parsed `_fd_uid_` of an element; elements the walk never reached share 0.
pub(crate) fn element_uid(doc: &Document, id: NodeId) -> u64 {
    doc.attr(id, UID_ATTR)
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::annotate::set_element_indices;
    use crate::dom::Document;
    use crate::html::parse_document;

    fn build(html: &str) -> (Document, PathBuilder) {
        let mut doc = parse_document(html).unwrap();
        set_element_indices(&mut doc);
        let builder = PathBuilder::build(&mut doc);
        (doc, builder)
    }

    const LIST: &str = concat!(
        "<ul class=\"posts\">",
        "<li><a href=\"https://example.com/a\">First article</a></li>",
        "<li><a href=\"https://example.com/b\">Second article</a></li>",
        "<li><a href=\"https://example.com/c\">Third article</a></li>",
        "</ul>",
    );

    #[test]
    fn test_anchors_in_one_list_share_a_cbg_id() {
        let (_, builder) = build(LIST);
        assert_eq!(builder.entries.len(), 3);
        let ids: FastHashSet<usize> = builder.entries.iter().map(|e| e.cbg_id).collect();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_grouping_tags_open_new_scopes() {
        let (_, builder) = build(concat!(
            "<ul><li><a href=\"https://example.com/a\">First article</a></li></ul>",
            "<ul><li><a href=\"https://example.com/b\">Second article</a></li></ul>",
        ));
        assert_eq!(builder.entries.len(), 2);
        assert_ne!(builder.entries[0].cbg_id, builder.entries[1].cbg_id);
    }

    #[test]
    fn test_headers_collapse_to_one_id() {
        let (_, builder) = build(concat!(
            "<h2><a href=\"https://example.com/a\">First article</a></h2>",
            "<p>some text between them</p>",
            "<h2><a href=\"https://example.com/b\">Second article</a></h2>",
        ));
        assert_eq!(builder.entries.len(), 2);
        assert_eq!(builder.entries[0].cbg_id, builder.entries[1].cbg_id);
    }

    #[test]
    fn test_wrapper_registered_for_single_anchor_items() {
        let (doc, builder) = build(LIST);
        // every li wraps exactly one anchor
        assert_eq!(builder.wrappers.len(), 3);
        for (_, li) in builder.wrappers.iter() {
            assert_eq!(doc.tag(*li), Some("li"));
        }
    }

    #[test]
    fn test_wrapper_not_registered_for_multi_anchor_items() {
        let (_, builder) = build(concat!(
            "<ul><li>",
            "<a href=\"https://example.com/a\">First article</a>",
            "<a href=\"https://example.com/b\">Second article</a>",
            "</li></ul>",
        ));
        assert_eq!(builder.entries.len(), 2);
        assert!(builder.wrappers.is_empty());
    }

    #[test]
    fn test_non_http_anchors_are_skipped() {
        let (_, builder) = build(concat!(
            "<ul>",
            "<li><a href=\"/relative\">Relative link</a></li>",
            "<li><a href=\"mailto:a@example.com\">Mail me</a></li>",
            "<li><a href=\"https://example.com/a\">First article</a></li>",
            "<li><a>No href at all</a></li>",
            "</ul>",
        ));
        assert_eq!(builder.entries.len(), 1);
        assert_eq!(builder.entries[0].url, "https://example.com/a");
    }

    #[test]
    fn test_paths_group_all_three_entries() {
        let (_, builder) = build(LIST);
        let key = "html>body>ul.posts>li>a";
        let path = builder
            .paths
            .iter()
            .find(|p| p.key == key)
            .expect("path for the full chain");
        assert_eq!(path.entries.len(), 3);
        assert_eq!(path.fingerprint().len(), 3);
        // the shorter prefix exists as well and carries the same entries
        let prefix = builder
            .paths
            .iter()
            .find(|p| p.key == "html>body>ul.posts")
            .expect("prefix path");
        assert_eq!(prefix.fingerprint(), path.fingerprint());
    }

    #[test]
    fn test_no_paths_shorter_than_three_segments() {
        let (_, builder) = build(LIST);
        assert!(builder.paths.iter().all(|p| p.path.len() >= 3));
    }

    #[test]
    fn test_duplicated_ids_are_stripped() {
        let (doc, _) = build(concat!(
            "<div id=\"box\"><a href=\"https://example.com/a\">First article</a></div>",
            "<div id=\"box\"><a href=\"https://example.com/b\">Second article</a></div>",
        ));
        let divs: Vec<NodeId> = doc.descendants_by_tag(doc.root(), "div").collect();
        assert_eq!(doc.attr(divs[0], "id"), Some("box"));
        assert_eq!(doc.attr(divs[1], "id"), None);
    }

    #[test]
    fn test_every_element_is_stamped() {
        let (doc, _) = build(LIST);
        for el in doc.descendants(doc.root()).filter(|n| doc.is_element(*n)) {
            assert!(doc.attr(el, UID_ATTR).is_some());
        }
    }
}
