//! Arena-based storage for the parsed HTML tree
//!
//! The detector only ever sees this view of a document: node ids into a
//! hierarchy vec plus a parallel payload vec. Cloning a `Document` preserves
//! node ids, which the body-removal filter relies on to carry node identity
//! between its working copy and the real document.

use core::fmt;
use core::num::NonZeroUsize;

/// Reserved attribute namespace. Attributes starting with this prefix are
/// written by detection runs and must not be used by callers.
pub const SCRATCH_PREFIX: &str = "_fd_";
/// Per-element UID stamped during the context grouping walk.
pub const UID_ATTR: &str = "_fd_uid_";
/// 1-based position among the parent's element children.
pub const INDEX_ATTR: &str = "_fd_index_";
/// Marker set on tables that contain spanned cells.
pub const TABLE_ATTR: &str = "_fd_table_";

/// Node identifier inside a `Document` arena.
///
/// `NonZeroUsize` so that `Option<NodeId>` takes no extra space.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde_serialization", derive(serde::Serialize))]
pub struct NodeId {
    index: NonZeroUsize,
}

impl NodeId {
    #[inline(always)]
    pub fn new(value: usize) -> Self {
        NodeId {
            // safe because value + 1 is never zero
            index: unsafe { NonZeroUsize::new_unchecked(value + 1) },
        }
    }

    #[inline(always)]
    pub fn index(&self) -> usize {
        self.index.get() - 1
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Hierarchy record of a single node. All links are optional; a detached
/// node has no parent and no siblings but keeps its children.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
}

/// The links of all nodes in document order of creation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct NodeHierarchy {
    pub internal: Vec<Node>,
}

impl NodeHierarchy {
    #[inline]
    pub fn len(&self) -> usize {
        self.internal.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty()
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.internal.get(id.index())
    }
}

impl core::ops::Index<NodeId> for NodeHierarchy {
    type Output = Node;
    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.internal[id.index()]
    }
}

impl core::ops::IndexMut<NodeId> for NodeHierarchy {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.internal[id.index()]
    }
}

/// Payload storage parallel to the `NodeHierarchy`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDataContainer<T> {
    pub internal: Vec<T>,
}

impl<T> Default for NodeDataContainer<T> {
    #[inline]
    fn default() -> Self {
        NodeDataContainer {
            internal: Vec::new(),
        }
    }
}

impl<T> core::ops::Index<NodeId> for NodeDataContainer<T> {
    type Output = T;
    #[inline]
    fn index(&self, id: NodeId) -> &T {
        &self.internal[id.index()]
    }
}

impl<T> core::ops::IndexMut<NodeId> for NodeDataContainer<T> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.internal[id.index()]
    }
}

/// One `name="value"` pair. Attribute order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Element payload: lowercased tag plus attributes in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub tag: String,
    pub attributes: Vec<Attribute>,
}

impl ElementData {
    pub fn new<S: Into<String>>(tag: S) -> Self {
        ElementData {
            tag: tag.into(),
            attributes: Vec::new(),
        }
    }
}

/// Payload of a node: an element or a run of character data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeData {
    Element(ElementData),
    Text(String),
}

impl NodeData {
    #[inline]
    pub fn is_element(&self) -> bool {
        matches!(self, NodeData::Element(_))
    }

    #[inline]
    pub fn as_element(&self) -> Option<&ElementData> {
        match self {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut ElementData> {
        match self {
            NodeData::Element(e) => Some(e),
            NodeData::Text(_) => None,
        }
    }
}

/// A parsed HTML document: hierarchy + payloads + designated root element.
///
/// The arena is append-only: detaching a subtree only rewires links, the
/// nodes stay in place, so node ids handed out earlier remain valid (and
/// identical across clones).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub hierarchy: NodeHierarchy,
    pub data: NodeDataContainer<NodeData>,
    root: NodeId,
}

impl Document {
    /// Creates a document consisting of a single root element.
    pub fn with_root<S: Into<String>>(tag: S) -> Self {
        let mut doc = Document {
            hierarchy: NodeHierarchy::default(),
            data: NodeDataContainer::default(),
            root: NodeId::new(0),
        };
        let root = doc.push(NodeData::Element(ElementData::new(tag)));
        doc.root = root;
        doc
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Number of nodes ever created in this arena (including detached ones).
    #[inline]
    pub fn node_count(&self) -> usize {
        self.hierarchy.len()
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId::new(self.hierarchy.len());
        self.hierarchy.internal.push(Node::default());
        self.data.internal.push(data);
        id
    }

    /// Creates a new detached element node.
    pub fn create_element<S: Into<String>>(&mut self, tag: S) -> NodeId {
        self.push(NodeData::Element(ElementData::new(tag)))
    }

    /// Creates a new detached text node.
    pub fn create_text<S: Into<String>>(&mut self, text: S) -> NodeId {
        self.push(NodeData::Text(text.into()))
    }

    // -- payload accessors ---------------------------------------------------

    /// Lowercased tag name, `None` for text nodes.
    #[inline]
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        self.data[id].as_element().map(|e| e.tag.as_str())
    }

    #[inline]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.data[id].is_element()
    }

    pub fn set_tag<S: Into<String>>(&mut self, id: NodeId, tag: S) {
        if let Some(e) = self.data[id].as_element_mut() {
            e.tag = tag.into();
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.data[id]
            .as_element()?
            .attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(e) = self.data[id].as_element_mut() else {
            return;
        };
        match e.attributes.iter_mut().find(|a| a.name == name) {
            Some(a) => a.value = value.to_string(),
            None => e.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(e) = self.data[id].as_element_mut() {
            e.attributes.retain(|a| a.name != name);
        }
    }

    // -- structure mutation --------------------------------------------------

    /// Appends `child` as the last child of `parent`. The child must be
    /// detached.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let last = self.hierarchy[parent].last_child;
        self.hierarchy[child].parent = Some(parent);
        self.hierarchy[child].previous_sibling = last;
        self.hierarchy[child].next_sibling = None;
        match last {
            Some(last) => self.hierarchy[last].next_sibling = Some(child),
            None => self.hierarchy[parent].first_child = Some(child),
        }
        self.hierarchy[parent].last_child = Some(child);
    }

    /// Inserts the detached node `new` directly before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, new: NodeId) {
        let parent = self.hierarchy[sibling].parent;
        let prev = self.hierarchy[sibling].previous_sibling;
        self.hierarchy[new].parent = parent;
        self.hierarchy[new].previous_sibling = prev;
        self.hierarchy[new].next_sibling = Some(sibling);
        self.hierarchy[sibling].previous_sibling = Some(new);
        match prev {
            Some(prev) => self.hierarchy[prev].next_sibling = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.hierarchy[parent].first_child = Some(new);
                }
            }
        }
    }

    /// Inserts the detached node `new` directly after `sibling`.
    pub fn insert_after(&mut self, sibling: NodeId, new: NodeId) {
        let parent = self.hierarchy[sibling].parent;
        let next = self.hierarchy[sibling].next_sibling;
        self.hierarchy[new].parent = parent;
        self.hierarchy[new].previous_sibling = Some(sibling);
        self.hierarchy[new].next_sibling = next;
        self.hierarchy[sibling].next_sibling = Some(new);
        match next {
            Some(next) => self.hierarchy[next].previous_sibling = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.hierarchy[parent].last_child = Some(new);
                }
            }
        }
    }

    /// Unlinks a node (and implicitly its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        let Node {
            parent,
            previous_sibling,
            next_sibling,
            ..
        } = self.hierarchy[id];
        match previous_sibling {
            Some(prev) => self.hierarchy[prev].next_sibling = next_sibling,
            None => {
                if let Some(parent) = parent {
                    self.hierarchy[parent].first_child = next_sibling;
                }
            }
        }
        match next_sibling {
            Some(next) => self.hierarchy[next].previous_sibling = previous_sibling,
            None => {
                if let Some(parent) = parent {
                    self.hierarchy[parent].last_child = previous_sibling;
                }
            }
        }
        self.hierarchy[id].parent = None;
        self.hierarchy[id].previous_sibling = None;
        self.hierarchy[id].next_sibling = None;
    }

    /// Whether the node is still reachable from the document root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.hierarchy[current].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    // -- iteration -----------------------------------------------------------

    /// All child nodes (elements and text) in document order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            hierarchy: &self.hierarchy,
            next: self.hierarchy[id].first_child,
        }
    }

    /// Element children only, in document order.
    pub fn element_children<'a>(&'a self, id: NodeId) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id).filter(move |c| self.is_element(*c))
    }

    /// Pre-order traversal of the subtree rooted at `id`, including `id`.
    pub fn subtree(&self, id: NodeId) -> Subtree<'_> {
        Subtree {
            hierarchy: &self.hierarchy,
            start: id,
            next: Some(id),
        }
    }

    /// Pre-order traversal of the descendants of `id`, excluding `id`.
    pub fn descendants<'a>(&'a self, id: NodeId) -> impl Iterator<Item = NodeId> + 'a {
        self.subtree(id).skip(1)
    }

    /// Descendant elements with the given tag, in document order.
    pub fn descendants_by_tag<'a>(
        &'a self,
        id: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.descendants(id)
            .filter(move |d| self.tag(*d) == Some(tag))
    }

    /// Ancestor chain from the parent up to the root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            hierarchy: &self.hierarchy,
            next: self.hierarchy[id].parent,
        }
    }

    /// Nearest ancestor with the given tag.
    pub fn ancestor_by_tag(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        self.ancestors(id).find(|a| self.tag(*a) == Some(tag))
    }

    /// Concatenated character data of the subtree, in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.subtree(id) {
            if let NodeData::Text(t) = &self.data[node] {
                out.push_str(t);
            }
        }
        out
    }
}

pub struct Children<'a> {
    hierarchy: &'a NodeHierarchy,
    next: Option<NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.hierarchy[current].next_sibling;
        Some(current)
    }
}

pub struct Ancestors<'a> {
    hierarchy: &'a NodeHierarchy,
    next: Option<NodeId>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.hierarchy[current].parent;
        Some(current)
    }
}

pub struct Subtree<'a> {
    hierarchy: &'a NodeHierarchy,
    start: NodeId,
    next: Option<NodeId>,
}

impl<'a> Iterator for Subtree<'a> {
    type Item = NodeId;
    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        // descend first, then move right, then climb until a right turn
        // is possible or the traversal root is reached
        self.next = if let Some(child) = self.hierarchy[current].first_child {
            Some(child)
        } else {
            let mut node = current;
            loop {
                if node == self.start {
                    break None;
                }
                if let Some(sibling) = self.hierarchy[node].next_sibling {
                    break Some(sibling);
                }
                match self.hierarchy[node].parent {
                    Some(parent) => node = parent,
                    None => break None,
                }
            }
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn sample() -> (Document, NodeId, NodeId, NodeId) {
        // <html><body><ul><li>one</li><li>two</li></ul></body></html>
        let mut doc = Document::with_root("html");
        let body = doc.create_element("body");
        doc.append_child(doc.root(), body);
        let ul = doc.create_element("ul");
        doc.append_child(body, ul);
        for text in ["one", "two"] {
            let li = doc.create_element("li");
            doc.append_child(ul, li);
            let t = doc.create_text(text);
            doc.append_child(li, t);
        }
        let first_li = doc.element_children(ul).next().unwrap();
        (doc, body, ul, first_li)
    }

    #[test]
    fn test_tree_construction() {
        let (doc, body, ul, first_li) = sample();
        assert_eq!(doc.tag(doc.root()), Some("html"));
        assert_eq!(doc.tag(body), Some("body"));
        assert_eq!(doc.element_children(ul).count(), 2);
        assert_eq!(doc.text_content(ul), "onetwo");
        assert_eq!(doc.text_content(first_li), "one");
        assert_eq!(
            doc.ancestors(first_li).collect::<Vec<_>>(),
            vec![ul, body, doc.root()]
        );
    }

    #[test]
    fn test_descendants_by_tag() {
        let (doc, _, ul, _) = sample();
        assert_eq!(doc.descendants_by_tag(doc.root(), "li").count(), 2);
        assert_eq!(doc.descendants_by_tag(ul, "li").count(), 2);
        assert_eq!(doc.descendants_by_tag(ul, "table").count(), 0);
        assert_eq!(doc.ancestor_by_tag(ul, "html"), Some(doc.root()));
    }

    #[test]
    fn test_attributes() {
        let (mut doc, _, ul, _) = sample();
        assert_eq!(doc.attr(ul, "class"), None);
        doc.set_attr(ul, "class", "posts");
        assert_eq!(doc.attr(ul, "class"), Some("posts"));
        doc.set_attr(ul, "class", "posts wide");
        assert_eq!(doc.attr(ul, "class"), Some("posts wide"));
        doc.remove_attr(ul, "class");
        assert_eq!(doc.attr(ul, "class"), None);
    }

    #[test]
    fn test_detach() {
        let (mut doc, _, ul, first_li) = sample();
        doc.detach(first_li);
        assert_eq!(doc.element_children(ul).count(), 1);
        assert_eq!(doc.text_content(ul), "two");
        assert!(!doc.is_attached(first_li));
        // the detached subtree keeps its own structure
        assert_eq!(doc.text_content(first_li), "one");
    }

    #[test]
    fn test_insert_before_and_after() {
        let (mut doc, _, ul, first_li) = sample();
        let zero = doc.create_element("li");
        doc.insert_before(first_li, zero);
        let half = doc.create_element("li");
        doc.insert_after(first_li, half);
        let lis = doc.element_children(ul).collect::<Vec<_>>();
        assert_eq!(lis.len(), 4);
        assert_eq!(lis[0], zero);
        assert_eq!(lis[1], first_li);
        assert_eq!(lis[2], half);
    }

    #[test]
    fn test_clone_preserves_node_ids() {
        let (doc, _, ul, first_li) = sample();
        let copy = doc.clone();
        assert_eq!(copy.tag(ul), Some("ul"));
        assert_eq!(copy.text_content(first_li), "one");
    }
}
