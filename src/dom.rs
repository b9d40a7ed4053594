//! The DocBook syntax tree: an arena of typed nodes with ordered
//! children, plus the lookup and link-editing primitives the
//! reorganizer and formatter are built on.

use std::convert::TryInto;
use std::fmt;
use std::io;
use std::io::Write;
use std::iter;
use std::num::NonZeroU32;

#[doc(no_inline)]
pub use tendril::StrTendril;

mod meta;
mod node_ref;
pub mod xml;

#[cfg(test)]
mod tests;

pub use meta::{Attr, AttrData, AttrKey, AttrVal, ElementKind, NodeClass, Resolved};
pub use node_ref::NodeRef;

/// A container for a tree of DocBook elements, text, and entity escapes.
///
/// This uses a simple vector of `Node`s and indexes for parent/child and
/// sibling ordering. Attributes are stored as separately allocated
/// vectors for each element. A single document is limited to 4 billion
/// (2^32 - 1) total nodes.
///
/// All `Document` instances, even logically "empty" ones as freshly
/// constructed, contain a synthetic document node at the fixed
/// `DOCUMENT_NODE_ID` that serves as a container for the `root_element`
/// if present. The document also carries the sticky parse outcome flags
/// that drive the process exit code.
pub struct Document {
    nodes: Vec<Node>,
    errors: bool,
    warnings: bool,
    closed: bool,
}

/// A `Node` identifier, as u32 index into a `Document`s `Node` vector.
///
/// Should only be used with the `Document` it was obtained from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct NodeId(NonZeroU32);

/// A typed node (element, text, or escape) within a `Document`.
#[derive(Debug)]
pub struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) prev_sibling: Option<NodeId>,
    pub(crate) next_sibling: Option<NodeId>,
    pub(crate) first_child: Option<NodeId>,
    pub(crate) last_child: Option<NodeId>,
    /// A newline preceded this node in the input.
    pub(crate) line: bool,
    /// Whitespace preceded this node in the input.
    pub(crate) spc: bool,
    pub(crate) data: NodeData,
}

#[derive(Clone, Debug)]
pub enum NodeData {
    /// The synthetic document container node.
    Document,
    Elem(Element),
    Text(StrTendril),
    /// A pre-translated troff escape for an entity reference.
    Escape(StrTendril),
}

/// A DocBook element with its resolved kind and attributes.
#[derive(Clone, Debug)]
pub struct Element {
    pub kind: ElementKind,
    pub attrs: Vec<Attr>,
}

/// Core implementation.
impl Document {
    /// The constant `NodeId` for the document node of all `Document`s.
    pub const DOCUMENT_NODE_ID: NodeId = NodeId(
        unsafe { NonZeroU32::new_unchecked(1) }
    );

    /// Construct a new `Document` with the single empty document node.
    pub fn new() -> Self {
        Document {
            nodes: vec![
                Node::new(NodeData::Document), // dummy padding, index 0
                Node::new(NodeData::Document)  // the real root, index 1
            ],
            errors: false,
            warnings: false,
            closed: false,
        }
    }

    /// True if a parse error was recorded for this document.
    pub fn has_errors(&self) -> bool {
        self.errors
    }

    /// True if a parse warning was recorded for this document.
    pub fn has_warnings(&self) -> bool {
        self.warnings
    }

    /// True if the document element was properly closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub(crate) fn set_error(&mut self) {
        self.errors = true;
    }

    pub(crate) fn set_warning(&mut self) {
        self.warnings = true;
    }

    pub(crate) fn set_closed(&mut self) {
        self.closed = true;
    }

    /// Return the root element `NodeId` for this Document, or None if
    /// there is no such qualified element.
    ///
    /// A node is a root element if it is an element and a direct child
    /// of the document node, with no other element or text sibling.
    pub fn root_element(&self) -> Option<NodeId> {
        let document_node = &self[Document::DOCUMENT_NODE_ID];
        debug_assert!(match document_node.data {
            NodeData::Document => true,
            _ => false
        });
        debug_assert!(document_node.parent.is_none());
        debug_assert!(document_node.next_sibling.is_none());
        debug_assert!(document_node.prev_sibling.is_none());
        let mut root = None;
        for child in self.children(Document::DOCUMENT_NODE_ID) {
            match &self[child].data {
                NodeData::Document => {
                    panic!("document child of document");
                }
                NodeData::Text(_) | NodeData::Escape(_) => {
                    root = None;
                    break;
                }
                NodeData::Elem(_) => {
                    if root.is_none() {
                        root = Some(child);
                    } else {
                        root = None; // Only one accepted
                        break;
                    }
                }
            }
        }
        root
    }

    /// True if the node is a direct child of the document node.
    pub fn is_root(&self, id: NodeId) -> bool {
        self[id].parent == Some(Document::DOCUMENT_NODE_ID)
    }

    pub(crate) fn push_node(&mut self, node: Node) -> NodeId {
        let next_index = self.nodes.len()
            .try_into()
            .expect("Document (u32) node index overflow");
        debug_assert!(next_index > 1);
        self.nodes.push(node);
        NodeId(unsafe { NonZeroU32::new_unchecked(next_index) })
    }

    pub(crate) fn detach(&mut self, node: NodeId) {
        let (parent, prev_sibling, next_sibling) = {
            let node = &mut self[node];
            (
                node.parent.take(),
                node.prev_sibling.take(),
                node.next_sibling.take(),
            )
        };

        if let Some(next_sibling) = next_sibling {
            self[next_sibling].prev_sibling = prev_sibling
        } else if let Some(parent) = parent {
            self[parent].last_child = prev_sibling;
        }

        if let Some(prev_sibling) = prev_sibling {
            self[prev_sibling].next_sibling = next_sibling;
        } else if let Some(parent) = parent {
            self[parent].first_child = next_sibling;
        }
    }

    /// Append node as new last child of parent, and return its new ID.
    pub fn append_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = self.push_node(node);
        self.append(parent, id);
        id
    }

    pub(crate) fn append(&mut self, parent: NodeId, new_child: NodeId) {
        self.detach(new_child);
        self[new_child].parent = Some(parent);
        if let Some(last_child) = self[parent].last_child.take() {
            self[new_child].prev_sibling = Some(last_child);
            debug_assert!(self[last_child].next_sibling.is_none());
            self[last_child].next_sibling = Some(new_child);
        } else {
            debug_assert!(self[parent].first_child.is_none());
            self[parent].first_child = Some(new_child);
        }
        self[parent].last_child = Some(new_child);
    }

    /// Insert node before the given sibling and return its new ID.
    pub fn insert_before_sibling(&mut self, sibling: NodeId, node: Node)
        -> NodeId
    {
        let id = self.push_node(node);
        self.insert_before(sibling, id);
        id
    }

    pub(crate) fn insert_before(&mut self, sibling: NodeId, new_sibling: NodeId) {
        self.detach(new_sibling);
        self[new_sibling].parent = self[sibling].parent;
        self[new_sibling].next_sibling = Some(sibling);
        if let Some(prev_sibling) = self[sibling].prev_sibling.take() {
            self[new_sibling].prev_sibling = Some(prev_sibling);
            debug_assert_eq!(
                self[prev_sibling].next_sibling,
                Some(sibling)
            );
            self[prev_sibling].next_sibling = Some(new_sibling);
        } else if let Some(parent) = self[sibling].parent {
            debug_assert_eq!(self[parent].first_child, Some(sibling));
            self[parent].first_child = Some(new_sibling);
        }
        self[sibling].prev_sibling = Some(new_sibling);
    }

    /// Make the node the new first child of parent.
    pub(crate) fn prepend(&mut self, parent: NodeId, new_child: NodeId) {
        if let Some(first) = self[parent].first_child {
            self.insert_before(first, new_child);
        } else {
            self.append(parent, new_child);
        }
    }

    /// Return all descendant text content (character data) of the given
    /// node ID.
    ///
    /// If node is a text or escape node, return that text. If this is
    /// an element node or the document node, return the concatenation
    /// of all text descendants, in tree order. May return `None`.
    pub fn text(&self, id: NodeId) -> Option<StrTendril> {
        if let Some(t) = self[id].text_str() {
            return Some(t.clone());
        }
        let mut next = Vec::new();
        push_if(&mut next, self[id].first_child);
        let mut text: Option<StrTendril> = None;
        while let Some(id) = next.pop() {
            let node = &self[id];
            if let Some(t) = node.text_str() {
                match &mut text {
                    None => text = Some(t.clone()),
                    Some(text) => text.push_tendril(t),
                }
                push_if(&mut next, node.next_sibling);
            } else {
                push_if(&mut next, node.next_sibling);
                push_if(&mut next, node.first_child);
            }
        }
        text
    }

    /// Return an iterator over this node's direct children.
    ///
    /// Will be empty if the node can not or does not have children.
    pub fn children<'a>(&'a self, node: NodeId)
        -> impl Iterator<Item = NodeId> + 'a
    {
        iter::successors(
            self[node].first_child,
            move |&node| self[node].next_sibling
        )
    }

    /// Return an iterator over the specified node and all its ancestors,
    /// terminating at the document node.
    pub fn node_and_ancestors<'a>(&'a self, node: NodeId)
        -> impl Iterator<Item = NodeId> + 'a
    {
        iter::successors(Some(node), move |&node| self[node].parent)
    }

    /// Return an iterator over all nodes, starting with the document
    /// node, and including all descendants in tree order.
    pub fn nodes<'a>(&'a self) -> impl Iterator<Item = NodeId> + 'a {
        iter::successors(
            Some(Document::DOCUMENT_NODE_ID),
            move |&node| self.next_in_tree_order(node)
        )
    }

    fn next_in_tree_order(&self, node: NodeId) -> Option<NodeId> {
        self[node].first_child.or_else(|| {
            self.node_and_ancestors(node)
                .find_map(|ancestor| self[ancestor].next_sibling)
        })
    }

    /// Depth-first search for the first node of the given kind, the
    /// start node included.
    pub fn find_first(&self, id: NodeId, kind: ElementKind) -> Option<NodeId> {
        if self[id].is_kind(kind) {
            return Some(id);
        }
        NodeRef::new(self, id)
            .find(|n| n.is_kind(kind))
            .map(|n| n.id())
    }

    /// Like `find_first`, but also take the node out of the tree.
    pub fn take_first(&mut self, id: NodeId, kind: ElementKind)
        -> Option<NodeId>
    {
        let found = self.find_first(id, kind);
        if let Some(nc) = found {
            if self[nc].parent.is_some() {
                self.detach(nc);
            }
        }
        found
    }

    /// Detach and discard all children of the given node.
    pub fn remove_children(&mut self, id: NodeId) {
        while let Some(child) = self[id].first_child {
            self.detach(child);
        }
    }
}

/// The indented parse tree dump (`-T tree` output).
impl Document {
    /// Write one node per line: indentation, a flag character (`*` when
    /// a newline preceded the node, a space when other whitespace did,
    /// `-` otherwise), the element name, any text, and any attributes.
    pub fn write_tree<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if let Some(root) = self.root_element() {
            self.write_tree_node(root, 0, out)?;
        }
        Ok(())
    }

    fn write_tree_node<W: Write>(&self, id: NodeId, indent: usize,
        out: &mut W) -> io::Result<()>
    {
        let n = &self[id];
        let flag = if n.line { '*' } else if n.spc { ' ' } else { '-' };
        write!(out, "{:indent$}{}{}", "", flag, n.name(), indent = indent)?;
        if let Some(t) = n.text_str() {
            write!(out, " {}", t)?;
        }
        if let Some(elem) = n.as_element() {
            for a in &elem.attrs {
                write!(out, " {}='{}'", a.key.name(), a.value.as_str())?;
            }
        }
        out.write_all(b"\n")?;
        for nc in self.children(id) {
            self.write_tree_node(nc, indent + 2, out)?;
        }
        Ok(())
    }
}

impl Default for Document {
    fn default() -> Document {
        Document::new()
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.nodes[1..]).finish()
    }
}

impl std::ops::Index<NodeId> for Document {
    type Output = Node;

    #[inline]
    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0.get() as usize]
    }
}

impl std::ops::IndexMut<NodeId> for Document {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0.get() as usize]
    }
}

impl Element {
    /// Return the enumerated value of an attribute, if present with one.
    pub fn attr_val(&self, key: AttrKey) -> Option<AttrVal> {
        self.attrs.iter().find(|a| a.key == key).and_then(|a| {
            match a.value {
                AttrData::Val(v) => Some(v),
                _ => None,
            }
        })
    }

    /// Return an attribute value as a string, enumerated or raw.
    ///
    /// Attributes recorded without any value are reported as absent.
    pub fn attr_str(&self, key: AttrKey) -> Option<&str> {
        self.attrs.iter().find(|a| a.key == key).and_then(|a| {
            match &a.value {
                AttrData::Unset => None,
                AttrData::Val(v) => Some(v.name()),
                AttrData::Raw(s) => Some(s.as_ref()),
            }
        })
    }
}

impl Node {
    /// Construct a new element node of the given kind.
    pub fn new_elem(kind: ElementKind) -> Node {
        Node::new(NodeData::Elem(Element { kind, attrs: vec![] }))
    }

    /// Construct a new text node.
    pub fn new_text<T>(text: T) -> Node
        where T: Into<StrTendril>
    {
        Node::new(NodeData::Text(text.into()))
    }

    /// Construct a new escape node carrying a troff escape sequence.
    pub fn new_escape<T>(text: T) -> Node
        where T: Into<StrTendril>
    {
        Node::new(NodeData::Escape(text.into()))
    }

    /// Return `Element` if this is an element.
    pub fn as_element(&self) -> Option<&Element> {
        match self.data {
            NodeData::Elem(ref data) => Some(data),
            _ => None,
        }
    }

    /// Return mutable `Element` reference if this is an element.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self.data {
            NodeData::Elem(ref mut data) => Some(data),
            _ => None,
        }
    }

    /// Return the string payload of a text or escape node.
    pub fn text_str(&self) -> Option<&StrTendril> {
        match self.data {
            NodeData::Text(ref t) | NodeData::Escape(ref t) => Some(t),
            _ => None,
        }
    }

    /// Return mutable text if this is a text node (not an escape).
    pub fn as_text_mut(&mut self) -> Option<&mut StrTendril> {
        match self.data {
            NodeData::Text(ref mut t) => Some(t),
            _ => None,
        }
    }

    /// True for text nodes (escapes excluded).
    pub fn is_text(&self) -> bool {
        match self.data {
            NodeData::Text(_) => true,
            _ => false,
        }
    }

    /// Return the element kind, if this is an element.
    pub fn kind(&self) -> Option<ElementKind> {
        self.as_element().map(|e| e.kind)
    }

    /// True if this node is an element of the given kind.
    pub fn is_kind(&self, kind: ElementKind) -> bool {
        self.kind() == Some(kind)
    }

    /// How the output of this node behaves with respect to mdoc(7)
    /// structure.
    pub fn class(&self) -> NodeClass {
        match self.data {
            NodeData::Document => NodeClass::Trans,
            NodeData::Text(_) | NodeData::Escape(_) => NodeClass::Text,
            NodeData::Elem(ref e) => e.kind.class(),
        }
    }

    /// The name used in the tree dump.
    pub fn name(&self) -> &'static str {
        match self.data {
            NodeData::Document => "[DOCUMENT]",
            NodeData::Text(_) => "(t)",
            NodeData::Escape(_) => "(e)",
            NodeData::Elem(ref e) => e.kind.name(),
        }
    }

    /// True if a newline preceded this node in the input.
    pub fn line(&self) -> bool {
        self.line
    }

    /// True if whitespace preceded this node in the input.
    pub fn spc(&self) -> bool {
        self.spc
    }

    /// Return the enumerated value of an attribute, if this is an
    /// element carrying one.
    pub fn attr_val(&self, key: AttrKey) -> Option<AttrVal> {
        self.as_element().and_then(|e| e.attr_val(key))
    }

    /// Return an attribute value string, if this is an element carrying
    /// the attribute with a value.
    pub fn attr_str(&self, key: AttrKey) -> Option<&str> {
        self.as_element().and_then(|e| e.attr_str(key))
    }

    fn new(data: NodeData) -> Self {
        Node {
            parent: None,
            prev_sibling: None,
            next_sibling: None,
            first_child: None,
            last_child: None,
            line: false,
            spc: false,
            data,
        }
    }
}

impl Clone for Node {
    fn clone(&self) -> Self {
        let mut n = Node::new(self.data.clone());
        n.line = self.line;
        n.spc = self.spc;
        n
    }
}

pub(crate) fn push_if(stack: &mut Vec<NodeId>, id: Option<NodeId>) {
    if let Some(id) = id {
        stack.push(id);
    }
}
