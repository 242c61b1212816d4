//! Value-tree to XML serializer
//!
//! Inverse of [`crate::tree::read_document`]: maps use the same special-key
//! conventions (`^attributes^`, `^value{N}^`, `^cdata{N}^`, `^comment{N}^`,
//! `name^N` duplicate suffixes) so a tree produced by the reader serializes
//! back to an equivalent document.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, ErrorKind, Result};
use crate::value::{format_datetime, Map, Value};

/// Options controlling XML output
#[derive(Debug, Clone)]
pub struct WriteOptions {
    /// Indent child elements with newlines and two spaces per level
    pub format: bool,
    /// Encoding label written into the document prolog
    pub encoding: String,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            format: false,
            encoding: "UTF-8".to_string(),
        }
    }
}

impl WriteOptions {
    pub fn formatted() -> Self {
        Self {
            format: true,
            ..Self::default()
        }
    }
}

/// Serialize a whole document; `value` must be a map with exactly one
/// user-visible (non-`^`-prefixed) key, which becomes the root element
pub fn write_document(value: &Value, options: &WriteOptions) -> Result<String> {
    let Some(map) = value.as_map() else {
        return Err(Error::with_message(
            ErrorKind::MultipleRootKeys,
            "top-level value must be a map with one key".to_string(),
        ));
    };
    let mut user_keys = map.iter().filter(|(k, _)| !k.starts_with('^'));
    let (Some((root, content)), None) = (user_keys.next(), user_keys.next()) else {
        return Err(Error::new(ErrorKind::MultipleRootKeys));
    };
    write_document_with_root(root, content, options)
}

/// Serialize every user-visible key of a map as an element, without a
/// document prolog; useful for embedding into a larger document
pub fn write_fragment(value: &Value, options: &WriteOptions) -> Result<String> {
    let Some(map) = value.as_map() else {
        return Err(Error::new(ErrorKind::Unencodable {
            what: "non-map value as XML fragment",
        }));
    };
    let mut writer = Writer::new(options.format);
    let mut first = true;
    for (key, content) in map.iter().filter(|(k, _)| !k.starts_with('^')) {
        if !first && options.format {
            writer.out.push('\n');
        }
        first = false;
        writer.emit_element(key, content, 0)?;
    }
    Ok(writer.out)
}

/// Serialize a whole document using `root` as the root element name
pub fn write_document_with_root(
    root: &str,
    value: &Value,
    options: &WriteOptions,
) -> Result<String> {
    let mut writer = Writer::new(options.format);
    writer.out.push_str("<?xml version=\"1.0\" encoding=\"");
    writer.out.push_str(&options.encoding);
    writer.out.push_str("\"?>");
    if options.format {
        writer.out.push('\n');
    }
    writer.emit_element(root, value, 0)?;
    Ok(writer.out)
}

struct Writer {
    out: String,
    format: bool,
}

impl Writer {
    fn new(format: bool) -> Self {
        Self {
            out: String::new(),
            format,
        }
    }

    fn indent(&mut self, level: usize) {
        self.out.push('\n');
        for _ in 0..level * 2 {
            self.out.push(' ');
        }
    }

    fn emit_element(&mut self, key: &str, value: &Value, level: usize) -> Result<()> {
        let tag = element_tag(key);
        validate_tag(tag)?;
        if let Some(list) = value.as_list() {
            // a list repeats the whole element once per entry
            if list.is_empty() {
                self.out.push('<');
                self.out.push_str(tag);
                self.out.push_str("/>");
                return Ok(());
            }
            for (i, entry) in list.iter().enumerate() {
                if i > 0 && self.format {
                    self.indent(level);
                }
                self.emit_single(tag, entry, level)?;
            }
            return Ok(());
        }
        self.emit_single(tag, value, level)
    }

    fn emit_single(&mut self, tag: &str, value: &Value, level: usize) -> Result<()> {
        self.out.push('<');
        self.out.push_str(tag);
        if let Some(attrs) = value
            .as_map()
            .and_then(|m| m.get("^attributes^"))
            .and_then(Value::as_map)
        {
            for (name, attr) in attrs {
                self.out.push(' ');
                self.out.push_str(name);
                self.out.push_str("=\"");
                let text = scalar_text(attr)?;
                self.out.push_str(&escape_xml(&text));
                self.out.push('"');
            }
        }
        match value {
            Value::Nothing => {
                self.out.push_str("/>");
            }
            Value::Map(map) => {
                if !has_content(map) {
                    self.out.push_str("/>");
                    return Ok(());
                }
                self.out.push('>');
                // with text fragments present the content is mixed and the
                // indentation would change its meaning
                let mixed = map
                    .iter()
                    .any(|(k, v)| k.starts_with("^value") && !v.is_nothing());
                let child_format = self.format && !mixed;
                self.emit_map_contents(map, level, child_format)?;
                if child_format {
                    self.indent(level);
                }
                self.out.push_str("</");
                self.out.push_str(tag);
                self.out.push('>');
            }
            _ => {
                self.out.push('>');
                let text = scalar_text(value)?;
                self.out.push_str(&escape_xml(&text));
                self.out.push_str("</");
                self.out.push_str(tag);
                self.out.push('>');
            }
        }
        Ok(())
    }

    fn emit_map_contents(&mut self, map: &Map, level: usize, child_format: bool) -> Result<()> {
        let saved = self.format;
        self.format = child_format;
        let result = self.emit_map_contents_inner(map, level);
        self.format = saved;
        result
    }

    fn emit_map_contents_inner(&mut self, map: &Map, level: usize) -> Result<()> {
        for (key, value) in map {
            if key == "^attributes^" {
                continue;
            }
            if key.starts_with("^value") {
                if value.is_nothing() {
                    continue;
                }
                let text = scalar_text(value)?;
                self.out.push_str(&escape_xml(&text));
            } else if key.starts_with("^cdata") {
                let text = scalar_text(value)?;
                if text.contains("]]>") {
                    return Err(Error::new(ErrorKind::CdataTerminator));
                }
                if self.format {
                    self.indent(level + 1);
                }
                self.out.push_str("<![CDATA[");
                self.out.push_str(&text);
                self.out.push_str("]]>");
            } else if key.starts_with("^comment") {
                let text = scalar_text(value)?;
                if self.format {
                    self.indent(level + 1);
                }
                self.out.push_str("<!--");
                self.out.push_str(&text);
                self.out.push_str("-->");
            } else {
                if self.format {
                    self.indent(level + 1);
                }
                self.emit_element(key, value, level + 1)?;
            }
        }
        Ok(())
    }
}

/// Strip a `^N` duplicate suffix from a map key to recover the tag name
fn element_tag(key: &str) -> &str {
    if let Some(pos) = key.rfind('^') {
        let digits = &key[pos + 1..];
        if pos > 0 && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
            return &key[..pos];
        }
    }
    key
}

fn validate_tag(tag: &str) -> Result<()> {
    if tag.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::InvalidKey {
            key: tag.to_string(),
        }))
    }
}

/// True if any map entry produces element content (anything other than the
/// attribute map and unset text placeholders)
fn has_content(map: &Map) -> bool {
    map.iter().any(|(key, value)| {
        key != "^attributes^" && !(key.starts_with("^value") && value.is_nothing())
    })
}

/// Stringify a scalar leaf for element or attribute content
fn scalar_text(value: &Value) -> Result<String> {
    match value {
        Value::Nothing => Ok(String::new()),
        Value::Bool(b) => Ok(if *b { "1" } else { "0" }.to_string()),
        Value::Int(i) => Ok(i.to_string()),
        Value::Float(f) => Ok(f.to_string()),
        Value::String(s) => Ok(s.clone()),
        Value::DateTime(dt) => Ok(format_datetime(*dt)),
        Value::Binary(b) => Ok(STANDARD.encode(b)),
        Value::List(_) | Value::Map(_) => Err(Error::new(ErrorKind::Unencodable {
            what: "container value in text position",
        })),
    }
}

/// Entity-escape text for element or attribute content
pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
