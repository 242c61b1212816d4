//! saxtree - Streaming XML to value-tree mapping and XML-RPC codec
//!
//! # Quick Start
//!
//! ```
//! use saxtree::{parse_xml, Value};
//! # fn main() -> Result<(), saxtree::Error> {
//! let tree = parse_xml("<a><b>1</b><b>2</b></a>")?;
//! let first = tree
//!     .as_map()
//!     .and_then(|m| m.get("a"))
//!     .and_then(|a| a.as_map())
//!     .and_then(|a| a.get("b"))
//!     .and_then(|b| b.as_str())
//!     .unwrap_or_default();
//! assert_eq!(first, "1");
//! # Ok(())
//! # }
//! ```
//!
//! Repeated sibling element names are kept apart with `name^2`, `name^3`
//! key suffixes by [`parse_xml`], or collapsed into lists by
//! [`parse_xml_as_data`]. Text, CDATA, comments and attributes travel
//! under `^`-prefixed keys so [`make_xml`] can reproduce the document.
//!
//! The XML-RPC side lives in [`rpc`]:
//!
//! ```
//! use saxtree::rpc;
//! # fn main() -> Result<(), saxtree::Error> {
//! let call = rpc::decode_call(
//!     "<methodCall><methodName>ping</methodName></methodCall>",
//! )?;
//! assert_eq!(call.method, "ping");
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

pub mod error;
pub use error::{Error, ErrorKind, Result};

pub mod value;
pub use value::{List, Map, Value};

pub mod token;
pub use token::{NodeKind, Step, TokenSource, XmlTokens, XmlValidator};

pub mod tree;
pub use tree::{read_document, read_document_validated, read_tree, ReadOptions, SaxIterator};

pub mod write;
pub use write::{write_document, write_document_with_root, write_fragment, WriteOptions};

pub mod rpc;
pub use rpc::{MethodCall, MethodResponse};

/// Parse XML keeping document order (`name^N` keys for duplicates)
pub fn parse_xml(xml: &str) -> Result<Value> {
    read_document(xml, &ReadOptions::default())
}

/// Parse XML collapsing repeated sibling names into lists
pub fn parse_xml_as_data(xml: &str) -> Result<Value> {
    read_document(xml, &ReadOptions::as_data())
}

/// Serialize a single-root map back to an XML document
pub fn make_xml(value: &Value) -> Result<String> {
    write_document(value, &WriteOptions::default())
}

/// Serialize a value to an XML document with an explicit root element
pub fn make_xml_with_root(root: &str, value: &Value) -> Result<String> {
    write_document_with_root(root, value, &WriteOptions::default())
}
