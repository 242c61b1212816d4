//! Generic XML to value-tree reader
//!
//! Drives a [`TokenSource`] and an element stack to map arbitrary XML into
//! the [`Value`] model, with the `^value^`/`^cdata^`/`^comment^`/
//! `^attributes^` key conventions described in the crate docs.

use crate::error::{Error, ErrorKind, Result};
use crate::token::{NodeKind, Step, TokenSource, XmlTokens, XmlValidator};
use crate::tree::stack::ElementStack;
use crate::value::Value;

/// Options controlling the XML data mapping
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Keep repeated sibling names as distinct `name^N` keys instead of
    /// collapsing them into a list
    pub preserve_order: bool,
    /// Capture comments under `^comment^` keys
    pub add_comments: bool,
    /// Strip namespace prefixes from element names
    pub strip_ns_prefixes: bool,
    /// Drop elements that map to no value at all
    pub ignore_empty_elements: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            preserve_order: true,
            add_comments: false,
            strip_ns_prefixes: false,
            ignore_empty_elements: false,
        }
    }
}

impl ReadOptions {
    /// The data-oriented variant: repeated sibling names collapse into lists
    pub fn as_data() -> Self {
        Self {
            preserve_order: false,
            ..Self::default()
        }
    }
}

/// Map the token stream into a value tree, starting from the source's
/// current position
pub fn read_tree<S: TokenSource>(source: &mut S, options: &ReadOptions) -> Result<Value> {
    match source.advance()? {
        Step::Done => Err(Error::new(ErrorKind::EmptyDocument)),
        Step::Token => {
            let tree = fold(source, options, 0, true)?;
            if tree.is_nothing() {
                Err(Error::new(ErrorKind::EmptyDocument))
            } else {
                Ok(tree)
            }
        }
    }
}

/// Parse an XML document into a value tree
pub fn read_document(xml: &str, options: &ReadOptions) -> Result<Value> {
    let mut source = XmlTokens::new(xml);
    read_tree(&mut source, options)
}

/// Run the external validator over the document text, then parse it
pub fn read_document_validated(
    xml: &str,
    validator: &dyn XmlValidator,
    options: &ReadOptions,
) -> Result<Value> {
    validator.validate(xml)?;
    read_document(xml, options)
}

/// Fold tokens into a tree until end of input, or until the source's depth
/// drops below `min_depth` (used to materialize a single sub-element
/// without consuming the rest of the document). With `has_token` the
/// source's current token is consumed before advancing.
fn fold<S: TokenSource>(
    source: &mut S,
    options: &ReadOptions,
    min_depth: i32,
    mut has_token: bool,
) -> Result<Value> {
    let mut stack = ElementStack::new(options.preserve_order, options.ignore_empty_elements);
    loop {
        if !has_token {
            match source.advance()? {
                Step::Done => break,
                Step::Token => {}
            }
            if min_depth > 0 && source.depth() < min_depth {
                break;
            }
        }
        has_token = false;
        match source.kind() {
            NodeKind::ElementStart => {
                let name = if options.strip_ns_prefixes {
                    source.local_name()
                } else {
                    source.name()
                }
                .to_string();
                stack.check_depth(source.depth());
                stack.push_element(name, source.depth());
                if source.has_attributes() {
                    stack.set_attributes(source.attributes());
                }
            }
            NodeKind::Text => {
                if source.is_whitespace() {
                    continue;
                }
                stack.check_depth(source.depth());
                stack.add_text(source.text());
            }
            NodeKind::CData => {
                stack.check_depth(source.depth());
                stack.add_cdata(source.text());
            }
            NodeKind::Comment => {
                if options.add_comments {
                    stack.check_depth(source.depth());
                    stack.add_comment(source.text());
                }
            }
            // close tags are handled by the depth check on the next token
            NodeKind::ElementEnd => {}
        }
    }
    Ok(stack.finish())
}

/// Streaming iterator yielding the mapped value of every element with a
/// given name, materializing one element subtree at a time
#[derive(Debug)]
pub struct SaxIterator<'a> {
    source: XmlTokens<'a>,
    element: String,
    options: ReadOptions,
    has_token: bool,
}

impl<'a> SaxIterator<'a> {
    pub fn new(xml: &'a str, element: &str) -> Self {
        Self::with_options(xml, element, ReadOptions::default())
    }

    pub fn with_options(xml: &'a str, element: &str, options: ReadOptions) -> Self {
        Self {
            source: XmlTokens::new(xml),
            element: element.to_string(),
            options,
            has_token: false,
        }
    }

    /// Advance to the next matching element and return its mapped value
    pub fn next_element(&mut self) -> Result<Option<Value>> {
        loop {
            if !self.has_token {
                match self.source.advance()? {
                    Step::Done => return Ok(None),
                    Step::Token => {}
                }
            }
            self.has_token = false;
            if self.source.kind() != NodeKind::ElementStart
                || self.source.local_name() != self.element
            {
                continue;
            }
            let key = if self.options.strip_ns_prefixes {
                self.source.local_name()
            } else {
                self.source.name()
            }
            .to_string();
            let min_depth = self.source.depth() + 1;
            let tree = fold(&mut self.source, &self.options, min_depth, true)?;
            // fold stopped on a token it did not consume; revisit it
            self.has_token = true;
            if let Value::Map(mut map) = tree {
                return Ok(map.remove(&key));
            }
        }
    }
}

impl Iterator for SaxIterator<'_> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_element().transpose()
    }
}
