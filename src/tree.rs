//! Mapping between arbitrary XML documents and the generic value tree.
//!
//! The reader folds a flat token stream into nested maps using a
//! depth-indexed element stack; text, CDATA, comments and attributes are
//! carried under `^`-prefixed special keys so that the serializer in
//! [`crate::write`] can reproduce the document.

pub mod reader;
pub(crate) mod stack;

pub use reader::{
    read_document, read_document_validated, read_tree, ReadOptions, SaxIterator,
};
