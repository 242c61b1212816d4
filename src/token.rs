//! Pull-style XML token source
//!
//! The readers in this crate consume a flat, depth-annotated token stream
//! through the [`TokenSource`] capability rather than a DOM. [`XmlTokens`]
//! is the concrete source backed by quick-xml's event reader; it adds the
//! depth accounting the readers rely on and surfaces self-closing elements
//! as an element-start followed by a synthetic element-end at the same
//! depth, so consumers only ever see one shape of element.

use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::{Error, Result};

/// Node classification of the current token
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    ElementStart,
    ElementEnd,
    Text,
    CData,
    Comment,
}

/// Outcome of advancing the token source
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// A token is available through the accessors
    Token,
    /// End of input
    Done,
}

/// Capability interface over a pull-style XML tokenizer
pub trait TokenSource {
    /// Move to the next token, skipping non-content markup
    fn advance(&mut self) -> Result<Step>;
    /// Nesting depth of the current token (root element is depth 0)
    fn depth(&self) -> i32;
    /// Kind of the current token
    fn kind(&self) -> NodeKind;
    /// Qualified name of the current element token
    fn name(&self) -> &str;
    /// Name with any namespace prefix stripped
    fn local_name(&self) -> &str;
    /// Decoded text of the current text/CDATA/comment token
    fn text(&self) -> &str;
    fn has_attributes(&self) -> bool;
    /// Attributes of the current element-start token, in document order
    fn attributes(&self) -> &[(String, String)];
    /// True for a text token consisting only of whitespace
    fn is_whitespace(&self) -> bool;
}

/// External document validator capability (e.g. an XSD or RelaxNG engine)
pub trait XmlValidator {
    fn validate(&self, xml: &str) -> Result<()>;
}

#[derive(Debug)]
struct Current {
    kind: NodeKind,
    depth: i32,
    name: String,
    text: String,
    attrs: Vec<(String, String)>,
}

impl Current {
    fn element(kind: NodeKind, depth: i32, name: String, attrs: Vec<(String, String)>) -> Self {
        Self {
            kind,
            depth,
            name,
            text: String::new(),
            attrs,
        }
    }

    fn content(kind: NodeKind, depth: i32, text: String) -> Self {
        Self {
            kind,
            depth,
            name: String::new(),
            text,
            attrs: Vec::new(),
        }
    }
}

/// Token source over an in-memory XML document, backed by quick-xml
#[derive(Debug)]
pub struct XmlTokens<'a> {
    reader: Reader<&'a [u8]>,
    current: Option<Current>,
    /// Depth the next element-start would open at
    open_depth: i32,
    /// Close tag to synthesize after a self-closing element
    pending_end: Option<String>,
}

impl<'a> XmlTokens<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            reader: Reader::from_str(input),
            current: None,
            open_depth: 0,
            pending_end: None,
        }
    }

    fn collect_attrs(
        &self,
        e: &quick_xml::events::BytesStart<'_>,
    ) -> Result<Vec<(String, String)>> {
        let mut attrs = Vec::new();
        for attr in e.attributes() {
            let attr =
                attr.map_err(|err| Error::tokenizer(self.reader.buffer_position(), err))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| Error::tokenizer(self.reader.buffer_position(), err))?
                .into_owned();
            attrs.push((key, value));
        }
        Ok(attrs)
    }

    fn element_name(e: &quick_xml::events::BytesStart<'_>) -> String {
        String::from_utf8_lossy(e.name().as_ref()).into_owned()
    }
}

impl TokenSource for XmlTokens<'_> {
    fn advance(&mut self) -> Result<Step> {
        if let Some(name) = self.pending_end.take() {
            self.open_depth -= 1;
            self.current = Some(Current::element(
                NodeKind::ElementEnd,
                self.open_depth,
                name,
                Vec::new(),
            ));
            return Ok(Step::Token);
        }

        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = Self::element_name(&e);
                    let attrs = self.collect_attrs(&e)?;
                    let depth = self.open_depth;
                    self.open_depth += 1;
                    self.current =
                        Some(Current::element(NodeKind::ElementStart, depth, name, attrs));
                    return Ok(Step::Token);
                }
                Ok(Event::Empty(e)) => {
                    let name = Self::element_name(&e);
                    let attrs = self.collect_attrs(&e)?;
                    let depth = self.open_depth;
                    self.open_depth += 1;
                    self.pending_end = Some(name.clone());
                    self.current =
                        Some(Current::element(NodeKind::ElementStart, depth, name, attrs));
                    return Ok(Step::Token);
                }
                Ok(Event::End(e)) => {
                    self.open_depth -= 1;
                    self.current = Some(Current::element(
                        NodeKind::ElementEnd,
                        self.open_depth,
                        String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                        Vec::new(),
                    ));
                    return Ok(Step::Token);
                }
                Ok(Event::Text(e)) => {
                    let text = e
                        .unescape()
                        .map_err(|err| Error::tokenizer(self.reader.buffer_position(), err))?
                        .into_owned();
                    if text.is_empty() {
                        continue;
                    }
                    self.current = Some(Current::content(NodeKind::Text, self.open_depth, text));
                    return Ok(Step::Token);
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                    self.current = Some(Current::content(NodeKind::CData, self.open_depth, text));
                    return Ok(Step::Token);
                }
                Ok(Event::Comment(e)) => {
                    let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                    self.current = Some(Current::content(NodeKind::Comment, self.open_depth, text));
                    return Ok(Step::Token);
                }
                Ok(Event::Decl(_) | Event::PI(_) | Event::DocType(_)) => continue,
                Ok(Event::Eof) => {
                    self.current = None;
                    return Ok(Step::Done);
                }
                Err(e) => {
                    return Err(Error::tokenizer(self.reader.error_position(), e));
                }
            }
        }
    }

    fn depth(&self) -> i32 {
        self.current.as_ref().map_or(0, |c| c.depth)
    }

    fn kind(&self) -> NodeKind {
        self.current
            .as_ref()
            .map_or(NodeKind::Text, |c| c.kind)
    }

    fn name(&self) -> &str {
        self.current.as_ref().map_or("", |c| c.name.as_str())
    }

    fn local_name(&self) -> &str {
        let name = self.name();
        name.split(':').next_back().unwrap_or(name)
    }

    fn text(&self) -> &str {
        self.current.as_ref().map_or("", |c| c.text.as_str())
    }

    fn has_attributes(&self) -> bool {
        self.current.as_ref().is_some_and(|c| !c.attrs.is_empty())
    }

    fn attributes(&self) -> &[(String, String)] {
        self.current.as_ref().map_or(&[], |c| c.attrs.as_slice())
    }

    fn is_whitespace(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|c| c.kind == NodeKind::Text && c.text.chars().all(char::is_whitespace))
    }
}
