use std::fmt;
use std::iter;
use std::ops::Deref;

use crate::dom::{push_if, Document, Node, NodeId, StrTendril};

/// A `Node` within `Document` lifetime reference.
///
/// This provides convenient but necessarily read-only access; all
/// mutation goes through [`Document`] and ids.
#[derive(Copy, Clone)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId
}

impl<'a> NodeRef<'a> {
    #[inline]
    pub fn new(doc: &'a Document, id: NodeId) -> Self {
        NodeRef { doc, id }
    }

    /// Return the associated `NodeId`.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Return an iterator over this node's direct children.
    pub fn children(&'a self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        iter::successors(
            self.for_some_node(self.first_child),
            move |nref| self.for_some_node(nref.next_sibling)
        )
    }

    /// Find the first direct child matching the predicate.
    pub fn find_child<P>(&'a self, predicate: P) -> Option<NodeRef<'a>>
        where P: FnMut(&NodeRef<'a>) -> bool
    {
        self.children().find(predicate)
    }

    /// Find the first descendant matching the predicate.
    ///
    /// When a node fails the predicate, its children are scanned,
    /// depth-first and in document order, in search of the first match.
    pub fn find<P>(&'a self, predicate: P) -> Option<NodeRef<'a>>
        where P: FnMut(&NodeRef<'a>) -> bool + 'a
    {
        Selector::new(self.doc, self.first_child, predicate).next()
    }

    /// Return any next sibling node or None.
    pub fn next_sibling(&'a self) -> Option<NodeRef<'a>> {
        self.for_some_node(self.next_sibling)
    }

    /// Return all descendant text content (character data) of this
    /// node.
    pub fn text(&'a self) -> Option<StrTendril> {
        self.doc.text(self.id)
    }

    #[inline]
    fn for_some_node(&'a self, id: Option<NodeId>) -> Option<NodeRef<'a>> {
        if let Some(id) = id {
            Some(NodeRef::new(self.doc, id))
        } else {
            None
        }
    }
}

impl<'a> Deref for NodeRef<'a> {
    type Target = Node;

    #[inline]
    fn deref(&self) -> &Node {
        &self.doc[self.id]
    }
}

/// Equivalence is defined for `NodeRef`s if and only if they reference
/// the _same_ `Document` (by identity) and with equal `NodeId`s.
impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeRef({:p}, {:?})", self.doc, self.id)
    }
}

/// The depth-first search iterator behind [`NodeRef::find`].
struct Selector<'a, P> {
    doc: &'a Document,
    next: Vec<NodeId>,
    predicate: P,
}

impl<'a, P> Selector<'a, P> {
    fn new(doc: &'a Document, first: Option<NodeId>, predicate: P)
        -> Selector<'a, P>
    {
        let next = if let Some(id) = first {
            vec![id]
        } else {
            vec![]
        };

        Selector { doc, next, predicate }
    }
}

impl<'a, P> Iterator for Selector<'a, P>
    where P: FnMut(&NodeRef<'a>) -> bool + 'a
{
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.next.pop() {
            let node = NodeRef::new(self.doc, id);
            if (self.predicate)(&node) {
                push_if(&mut self.next, node.next_sibling);
                return Some(node);
            } else {
                push_if(&mut self.next, node.next_sibling);
                push_if(&mut self.next, node.first_child);
            }
        }
        None
    }
}

/// `NodeRef` convenience accessors.
impl Document {
    /// Return the (single, always present) document node as a
    /// `NodeRef`.
    pub fn document_node_ref(&self) -> NodeRef<'_> {
        NodeRef::new(self, Document::DOCUMENT_NODE_ID)
    }

    /// Return the root element `NodeRef` for this `Document`, or
    /// `None` if there is no such qualified element.
    pub fn root_element_ref(&self) -> Option<NodeRef<'_>> {
        self.root_element().map(|r| NodeRef::new(self, r))
    }
}
