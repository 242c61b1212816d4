//! XML-RPC wire encoder
//!
//! Produces the same tag vocabulary the decoder accepts. Integers outside
//! the 32-bit wire range are serialized as `<string>` so strict peers can
//! still consume them; booleans are written as `0`/`1`, dates in the
//! compact `YYYYMMDDTHH:MM:SS` form.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, ErrorKind, Result};
use crate::value::{format_datetime_xmlrpc, List, Map, Value};
use crate::write::{escape_xml, WriteOptions};

/// Largest magnitude serialized as `<i4>`; beyond it integers go out as
/// `<string>`
const I4_RANGE: i64 = 2_147_483_647;

/// Serialize one value as a bare typed element (no `<value>` wrapper)
pub fn encode_value(value: &Value, options: &WriteOptions) -> Result<String> {
    let mut w = RpcWriter::new(options.format);
    w.emit_typed(value, 0)?;
    Ok(w.out)
}

/// Serialize a `methodCall` document
pub fn encode_call(method: &str, params: &[Value], options: &WriteOptions) -> Result<String> {
    let mut w = RpcWriter::new(options.format);
    w.prolog(&options.encoding);
    w.line(0, "<methodCall>");
    w.line_start(1);
    w.out.push_str("<methodName>");
    w.out.push_str(&escape_xml(method));
    w.out.push_str("</methodName>");
    w.newline();
    if params.is_empty() {
        w.line(1, "<params/>");
    } else {
        w.line(1, "<params>");
        for param in params {
            w.line(2, "<param>");
            w.emit_value(param, 3)?;
            w.line(2, "</param>");
        }
        w.line(1, "</params>");
    }
    w.out.push_str("</methodCall>");
    Ok(w.out)
}

/// Serialize a `methodResponse` document with an optional result value
pub fn encode_response(value: Option<&Value>, options: &WriteOptions) -> Result<String> {
    let mut w = RpcWriter::new(options.format);
    w.prolog(&options.encoding);
    w.line(0, "<methodResponse>");
    match value {
        None => w.line(1, "<params/>"),
        Some(value) => {
            w.line(1, "<params>");
            w.line(2, "<param>");
            w.emit_value(value, 3)?;
            w.line(2, "</param>");
            w.line(1, "</params>");
        }
    }
    w.out.push_str("</methodResponse>");
    Ok(w.out)
}

/// Serialize a `fault` response from a code and a message
pub fn encode_fault(code: i64, message: &str, options: &WriteOptions) -> Result<String> {
    let mut fault = Map::new();
    fault.insert("faultCode", Value::Int(code));
    fault.insert("faultString", Value::String(message.to_string()));

    let mut w = RpcWriter::new(options.format);
    w.prolog(&options.encoding);
    w.line(0, "<methodResponse>");
    w.line(1, "<fault>");
    w.emit_value(&Value::Map(fault), 2)?;
    w.line(1, "</fault>");
    w.out.push_str("</methodResponse>");
    Ok(w.out)
}

struct RpcWriter {
    out: String,
    format: bool,
}

impl RpcWriter {
    fn new(format: bool) -> Self {
        Self {
            out: String::new(),
            format,
        }
    }

    fn prolog(&mut self, encoding: &str) {
        self.out.push_str("<?xml version=\"1.0\" encoding=\"");
        self.out.push_str(encoding);
        self.out.push_str("\"?>");
        self.newline();
    }

    fn newline(&mut self) {
        if self.format {
            self.out.push('\n');
        }
    }

    fn line_start(&mut self, level: usize) {
        if self.format {
            for _ in 0..level * 2 {
                self.out.push(' ');
            }
        }
    }

    fn line(&mut self, level: usize, text: &str) {
        self.line_start(level);
        self.out.push_str(text);
        self.newline();
    }

    fn emit_value(&mut self, value: &Value, level: usize) -> Result<()> {
        if value.is_nothing() {
            self.line(level, "<value/>");
            return Ok(());
        }
        match value {
            Value::Map(_) | Value::List(_) => {
                self.line(level, "<value>");
                self.emit_typed(value, level + 1)?;
                self.line(level, "</value>");
            }
            _ => {
                self.line_start(level);
                self.out.push_str("<value>");
                self.emit_typed(value, level)?;
                self.out.push_str("</value>");
                self.newline();
            }
        }
        Ok(())
    }

    fn emit_typed(&mut self, value: &Value, level: usize) -> Result<()> {
        match value {
            Value::Nothing => Err(Error::new(ErrorKind::Unencodable {
                what: "no value for XML-RPC type element",
            })),
            Value::Bool(b) => {
                self.out.push_str(if *b {
                    "<boolean>1</boolean>"
                } else {
                    "<boolean>0</boolean>"
                });
                Ok(())
            }
            Value::Int(i) => {
                if (-I4_RANGE..=I4_RANGE).contains(i) {
                    self.out.push_str(&format!("<i4>{i}</i4>"));
                } else {
                    self.out.push_str(&format!("<string>{i}</string>"));
                }
                Ok(())
            }
            Value::Float(f) => {
                self.out.push_str(&format!("<double>{f}</double>"));
                Ok(())
            }
            Value::String(s) => {
                self.out.push_str("<string>");
                self.out.push_str(&escape_xml(s));
                self.out.push_str("</string>");
                Ok(())
            }
            Value::DateTime(dt) => {
                self.out.push_str("<dateTime.iso8601>");
                self.out.push_str(&format_datetime_xmlrpc(*dt));
                self.out.push_str("</dateTime.iso8601>");
                Ok(())
            }
            Value::Binary(b) => {
                self.out.push_str("<base64>");
                self.out.push_str(&STANDARD.encode(b));
                self.out.push_str("</base64>");
                Ok(())
            }
            Value::Map(map) => self.emit_struct(map, level),
            Value::List(list) => self.emit_array(list, level),
        }
    }

    fn emit_struct(&mut self, map: &Map, level: usize) -> Result<()> {
        self.line(level, "<struct>");
        for (member, value) in map {
            if member.is_empty() {
                return Err(Error::new(ErrorKind::EmptyMemberName));
            }
            self.line(level + 1, "<member>");
            self.line_start(level + 2);
            self.out.push_str("<name>");
            self.out.push_str(&escape_xml(member));
            self.out.push_str("</name>");
            self.newline();
            self.emit_value(value, level + 2)?;
            self.line(level + 1, "</member>");
        }
        self.line_start(level);
        self.out.push_str("</struct>");
        self.newline();
        Ok(())
    }

    fn emit_array(&mut self, list: &List, level: usize) -> Result<()> {
        self.line(level, "<array>");
        if list.is_empty() {
            self.line(level + 1, "<data/>");
        } else {
            self.line(level + 1, "<data>");
            for value in list {
                self.emit_value(value, level + 2)?;
            }
            self.line(level + 1, "</data>");
        }
        self.line_start(level);
        self.out.push_str("</array>");
        self.newline();
        Ok(())
    }
}
