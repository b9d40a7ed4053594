#![warn(rust_2018_idioms)]

//! Conversion of DocBook XML manual pages to mdoc(7) source.
//!
//! The pipeline has three stages: the lenient streaming XML reader in
//! [`xml`] builds a [`Document`] tree, [`reorganize`] rewrites it into a
//! mdoc-shaped skeleton, and [`mdoc`] walks the result and emits mdoc
//! source.

// Default parse buffer size
const PARSE_BUFFER_SIZE: usize = 4 * 1024;

mod dom;
pub use dom::{
    xml,
    Attr, AttrData, AttrKey, AttrVal,
    Document, Element, ElementKind, Node, NodeClass, NodeData, NodeId,
    NodeRef, Resolved,
};

mod reorg;
pub use reorg::reorganize;

pub mod mdoc;

pub mod logger;
