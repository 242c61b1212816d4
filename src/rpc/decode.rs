//! XML-RPC recursive-descent decoder
//!
//! Every required tag is checked exactly; a mismatch aborts the parse with
//! the expected and found names. Empty type elements are not errors: each
//! type maps to a documented zero value (`<string/>` is `""`, `<int/>` is
//! `0`, `<struct/>` an empty map, and so on). Integers are accepted with
//! the full 64-bit range even though the wire format nominally limits
//! `<i4>` to 32 bits.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::{Error, ErrorKind, Result};
use crate::rpc::{MethodCall, MethodResponse};
use crate::token::{NodeKind, Step, TokenSource, XmlTokens};
use crate::value::{parse_datetime, List, Map, Value, EPOCH};

/// Parse an XML-RPC `methodCall` document
pub fn decode_call(xml: &str) -> Result<MethodCall> {
    let mut d = Decoder::new(xml);
    d.expect_open("methodCall")?;
    d.expect_open("methodName")?;
    d.next_keep_ws("method name")?;
    if d.source.kind() != NodeKind::Text {
        return Err(d.mismatch_here("method name text"));
    }
    let method = d.source.text().to_string();
    d.expect_close("methodName")?;
    d.next("'params' element or 'methodCall' close")?;
    match d.source.kind() {
        NodeKind::ElementEnd => Ok(MethodCall {
            method,
            params: Vec::new(),
        }),
        NodeKind::ElementStart => {
            d.check_open("params")?;
            let params = d.parse_params()?;
            d.expect_close("methodCall")?;
            Ok(MethodCall { method, params })
        }
        _ => Err(d.mismatch_here("params")),
    }
}

/// Parse an XML-RPC `methodResponse` document
pub fn decode_response(xml: &str) -> Result<MethodResponse> {
    let mut d = Decoder::new(xml);
    d.expect_open("methodResponse")?;
    d.next("'params' or 'fault' element")?;
    if d.source.kind() != NodeKind::ElementStart {
        return Err(d.mismatch_here("'params' or 'fault'"));
    }
    match d.source.name() {
        "params" => {
            let mut params = d.parse_params()?;
            if params.len() > 1 {
                return Err(Error::mismatch(
                    "at most one param element",
                    format!("{} param elements", params.len()),
                    2,
                ));
            }
            d.expect_close("methodResponse")?;
            Ok(MethodResponse::Success(params.pop()))
        }
        "fault" => {
            d.expect_open("value")?;
            let value = d.parse_value_body()?;
            d.expect_close("fault")?;
            d.expect_close("methodResponse")?;
            Ok(MethodResponse::Fault(value))
        }
        _ => Err(d.mismatch_here("'params' or 'fault'")),
    }
}

/// Parse a single XML-RPC value, with or without its `<value>` wrapper
pub fn decode_value(xml: &str) -> Result<Value> {
    let mut d = Decoder::new(xml);
    d.next("XML-RPC value")?;
    if d.source.kind() != NodeKind::ElementStart {
        return Err(d.mismatch_here("XML-RPC value element"));
    }
    if d.source.name() == "value" {
        d.parse_value_body()
    } else {
        d.parse_typed()
    }
}

struct Decoder<'a> {
    source: XmlTokens<'a>,
}

impl<'a> Decoder<'a> {
    fn new(xml: &'a str) -> Self {
        Self {
            source: XmlTokens::new(xml),
        }
    }

    /// Advance past comments to the next token, failing at end of input
    fn next_keep_ws(&mut self, expecting: &str) -> Result<()> {
        loop {
            match self.source.advance()? {
                Step::Done => {
                    return Err(Error::mismatch(expecting, "end of input", self.source.depth()));
                }
                Step::Token => {}
            }
            if self.source.kind() != NodeKind::Comment {
                return Ok(());
            }
        }
    }

    /// Advance past comments and whitespace to the next token
    fn next(&mut self, expecting: &str) -> Result<()> {
        loop {
            self.next_keep_ws(expecting)?;
            if !self.source.is_whitespace() {
                return Ok(());
            }
        }
    }

    fn found(&self) -> String {
        match self.source.kind() {
            NodeKind::ElementStart => format!("element '{}'", self.source.name()),
            NodeKind::ElementEnd => format!("close of element '{}'", self.source.name()),
            NodeKind::Text => "text".to_string(),
            NodeKind::CData => "CDATA".to_string(),
            NodeKind::Comment => "comment".to_string(),
        }
    }

    fn mismatch_here(&self, expected: &str) -> Error {
        Error::mismatch(expected, self.found(), self.source.depth())
    }

    fn check_open(&self, tag: &str) -> Result<()> {
        if self.source.kind() == NodeKind::ElementStart && self.source.name() == tag {
            Ok(())
        } else {
            Err(self.mismatch_here(tag))
        }
    }

    fn expect_open(&mut self, tag: &str) -> Result<()> {
        self.next(tag)?;
        self.check_open(tag)
    }

    fn expect_close(&mut self, tag: &str) -> Result<()> {
        self.next(tag)?;
        if self.source.kind() == NodeKind::ElementEnd && self.source.name() == tag {
            Ok(())
        } else {
            Err(self.mismatch_here(tag))
        }
    }

    /// Parse `<params>`: the current token is its open tag; consumes
    /// through the close tag
    fn parse_params(&mut self) -> Result<Vec<Value>> {
        let mut params = Vec::new();
        self.next("'param' element or 'params' close")?;
        loop {
            match self.source.kind() {
                NodeKind::ElementEnd => return Ok(params),
                NodeKind::ElementStart => {
                    self.check_open("param")?;
                    self.next("'value' element or 'param' close")?;
                    match self.source.kind() {
                        // an empty param carries no value
                        NodeKind::ElementEnd => params.push(Value::Nothing),
                        NodeKind::ElementStart => {
                            self.check_open("value")?;
                            params.push(self.parse_value_body()?);
                            self.expect_close("param")?;
                        }
                        _ => return Err(self.mismatch_here("value")),
                    }
                    self.next("'param' element or 'params' close")?;
                }
                _ => return Err(self.mismatch_here("param")),
            }
        }
    }

    /// Parse the content of a `<value>` element whose open tag is the
    /// current token; consumes through the close tag
    fn parse_value_body(&mut self) -> Result<Value> {
        self.next("XML-RPC value content")?;
        match self.source.kind() {
            NodeKind::ElementEnd => Ok(Value::Nothing),
            // untyped content defaults to string
            NodeKind::Text | NodeKind::CData => {
                let text = self.source.text().to_string();
                self.expect_close("value")?;
                Ok(Value::String(text))
            }
            NodeKind::ElementStart => {
                let value = self.parse_typed()?;
                self.expect_close("value")?;
                Ok(value)
            }
            NodeKind::Comment => Err(self.mismatch_here("XML-RPC value content")),
        }
    }

    /// Parse a typed element whose open tag is the current token
    fn parse_typed(&mut self) -> Result<Value> {
        let name = self.source.name().to_string();
        let depth = self.source.depth();
        if name == "string" {
            self.next_keep_ws("string content")?;
        } else {
            self.next("XML-RPC type content")?;
        }
        if self.source.kind() == NodeKind::ElementEnd && self.source.depth() == depth {
            return zero_value(&name, depth);
        }
        match name.as_str() {
            "string" => self.finish_scalar(&name, |text| Ok(Value::String(text.to_string()))),
            "i4" | "int" | "ex:i1" | "ex:i2" | "ex:i8" => {
                self.finish_scalar(&name, |text| Ok(Value::Int(parse_int_prefix(text))))
            }
            "boolean" => {
                self.finish_scalar(&name, |text| Ok(Value::Bool(parse_int_prefix(text) != 0)))
            }
            "double" | "ex:float" => self.finish_scalar(&name, |text| {
                Ok(Value::Float(text.trim().parse().unwrap_or(0.0)))
            }),
            "dateTime.iso8601" | "ex:dateTime" => {
                self.finish_scalar(&name, |text| parse_datetime(text).map(Value::DateTime))
            }
            "base64" => self.finish_scalar(&name, |text| {
                STANDARD.decode(text.trim()).map(Value::Binary).map_err(|e| {
                    Error::with_message(
                        ErrorKind::InvalidScalar { what: "base64" },
                        format!("cannot decode base64 value: {e}"),
                    )
                })
            }),
            "struct" => self.parse_struct(),
            "array" => self.parse_array(),
            _ => Err(Error::new(ErrorKind::UnknownType { name, depth })),
        }
    }

    /// The current token holds a scalar's text; convert it and consume the
    /// close tag
    fn finish_scalar<F>(&mut self, tag: &str, convert: F) -> Result<Value>
    where
        F: FnOnce(&str) -> Result<Value>,
    {
        if !matches!(self.source.kind(), NodeKind::Text | NodeKind::CData) {
            return Err(self.mismatch_here("text content"));
        }
        let value = convert(self.source.text())?;
        self.expect_close(tag)?;
        Ok(value)
    }

    /// Parse `<struct>` members; the current token is the first token
    /// after the open tag
    fn parse_struct(&mut self) -> Result<Value> {
        let mut map = Map::new();
        loop {
            match self.source.kind() {
                NodeKind::ElementEnd => return Ok(Value::Map(map)),
                NodeKind::ElementStart => {}
                _ => return Err(self.mismatch_here("member")),
            }
            self.check_open("member")?;
            self.expect_open("name")?;
            self.next_keep_ws("member name")?;
            if !matches!(self.source.kind(), NodeKind::Text | NodeKind::CData) {
                return Err(Error::new(ErrorKind::EmptyMemberName));
            }
            let member = self.source.text().to_string();
            self.expect_close("name")?;
            self.expect_open("value")?;
            let value = self.parse_value_body()?;
            self.expect_close("member")?;
            map.insert(member, value);
            self.next("'member' element or 'struct' close")?;
        }
    }

    /// Parse `<array><data>`; the current token is the first token after
    /// the array open tag
    fn parse_array(&mut self) -> Result<Value> {
        let mut list = List::new();
        self.check_open("data")?;
        self.next("'value' element or 'data' close")?;
        loop {
            match self.source.kind() {
                NodeKind::ElementEnd => break,
                NodeKind::ElementStart => {
                    self.check_open("value")?;
                    list.push(self.parse_value_body()?);
                    self.next("'value' element or 'data' close")?;
                }
                _ => return Err(self.mismatch_here("value")),
            }
        }
        self.expect_close("array")?;
        Ok(Value::List(list))
    }
}

/// Leading-prefix integer parse in the manner of `strtoll`: ignores
/// trailing garbage and yields 0 when no digits are present
fn parse_int_prefix(text: &str) -> i64 {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut i = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == start {
        return 0;
    }
    text.get(..i).map_or(0, |digits| {
        digits.parse().unwrap_or_else(|_| {
            if digits.starts_with('-') {
                i64::MIN
            } else {
                i64::MAX
            }
        })
    })
}

/// Zero value assigned to an empty typed element
fn zero_value(name: &str, depth: i32) -> Result<Value> {
    match name {
        "string" => Ok(Value::String(String::new())),
        "i4" | "int" | "ex:i1" | "ex:i2" | "ex:i8" => Ok(Value::Int(0)),
        "boolean" => Ok(Value::Bool(false)),
        "struct" => Ok(Value::Map(Map::new())),
        "array" => Ok(Value::List(List::new())),
        "double" | "ex:float" => Ok(Value::Float(0.0)),
        "dateTime.iso8601" | "ex:dateTime" => Ok(Value::DateTime(EPOCH)),
        "base64" => Ok(Value::Binary(Vec::new())),
        "ex:nil" => Ok(Value::Nothing),
        _ => Err(Error::new(ErrorKind::UnknownType {
            name: name.to_string(),
            depth,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_types() -> Result<()> {
        assert_eq!(decode_value("<i4>25</i4>")?, Value::Int(25));
        assert_eq!(decode_value("<int>-3</int>")?, Value::Int(-3));
        assert_eq!(
            decode_value("<ex:i8>9000000000</ex:i8>")?,
            Value::Int(9_000_000_000)
        );
        assert_eq!(decode_value("<boolean>1</boolean>")?, Value::Bool(true));
        assert_eq!(decode_value("<boolean>0</boolean>")?, Value::Bool(false));
        assert_eq!(decode_value("<double>-1.5</double>")?, Value::Float(-1.5));
        assert_eq!(
            decode_value("<string>hi &amp; bye</string>")?,
            Value::String("hi & bye".to_string())
        );
        assert_eq!(
            decode_value("<base64>AQID</base64>")?,
            Value::Binary(vec![1, 2, 3])
        );
        assert_eq!(
            decode_value("<dateTime.iso8601>19980717T14:08:55</dateTime.iso8601>")?,
            Value::DateTime(time::macros::datetime!(1998-07-17 14:08:55))
        );
        Ok(())
    }

    #[test]
    fn test_untyped_value_is_string() -> Result<()> {
        assert_eq!(
            decode_value("<value>plain</value>")?,
            Value::String("plain".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_empty_elements_take_zero_values() -> Result<()> {
        assert_eq!(decode_value("<string/>")?, Value::String(String::new()));
        assert_eq!(decode_value("<i4/>")?, Value::Int(0));
        assert_eq!(decode_value("<boolean/>")?, Value::Bool(false));
        assert_eq!(decode_value("<double/>")?, Value::Float(0.0));
        assert_eq!(decode_value("<struct/>")?, Value::Map(Map::new()));
        assert_eq!(decode_value("<array/>")?, Value::List(List::new()));
        assert_eq!(decode_value("<base64/>")?, Value::Binary(Vec::new()));
        assert_eq!(
            decode_value("<dateTime.iso8601/>")?,
            Value::DateTime(EPOCH)
        );
        assert_eq!(decode_value("<value/>")?, Value::Nothing);
        Ok(())
    }

    #[test]
    fn test_string_keeps_whitespace() -> Result<()> {
        assert_eq!(
            decode_value("<string> padded </string>")?,
            Value::String(" padded ".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_permissive_number_parsing() -> Result<()> {
        assert_eq!(decode_value("<i4>42abc</i4>")?, Value::Int(42));
        assert_eq!(decode_value("<i4>abc</i4>")?, Value::Int(0));
        assert_eq!(decode_value("<boolean>2</boolean>")?, Value::Bool(true));
        Ok(())
    }

    #[test]
    fn test_array() -> Result<()> {
        let xml = "<value><array><data>\
                   <value><i4>1</i4></value>\
                   <value><i4>2</i4></value>\
                   </data></array></value>";
        assert_eq!(
            decode_value(xml)?,
            Value::from(vec![Value::Int(1), Value::Int(2)])
        );
        Ok(())
    }

    #[test]
    fn test_struct() -> Result<()> {
        let xml = "<value><struct>\
                   <member><name>a</name><value><i4>1</i4></value></member>\
                   <member><name>b</name><value><string>x</string></value></member>\
                   </struct></value>";
        let mut expected = Map::new();
        expected.insert("a", Value::Int(1));
        expected.insert("b", Value::String("x".to_string()));
        assert_eq!(decode_value(xml)?, Value::Map(expected));
        Ok(())
    }

    #[test]
    fn test_empty_member_name_is_rejected() {
        let xml = "<value><struct>\
                   <member><name></name><value><i4>1</i4></value></member>\
                   </struct></value>";
        assert_eq!(
            decode_value(xml).map_err(|e| e.kind().clone()),
            Err(ErrorKind::EmptyMemberName)
        );
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let err = decode_value("<value><i128>1</i128></value>");
        assert!(matches!(
            err.map_err(|e| e.kind().clone()),
            Err(ErrorKind::UnknownType { .. })
        ));
    }

    #[test]
    fn test_mismatched_tag_cites_both_names() {
        let xml = "<value><array><rows></rows></array></value>";
        let err = decode_value(xml).map_err(|e| e.message().to_string());
        let msg = err.expect_err("mismatch expected");
        assert!(msg.contains("data"), "message was: {msg}");
        assert!(msg.contains("rows"), "message was: {msg}");
    }

    #[test]
    fn test_decode_call() -> Result<()> {
        let xml = "<?xml version=\"1.0\"?><methodCall>\
                   <methodName>math.sum</methodName>\
                   <params>\
                   <param><value><i4>3</i4></value></param>\
                   <param><value><i4>4</i4></value></param>\
                   </params></methodCall>";
        let call = decode_call(xml)?;
        assert_eq!(call.method, "math.sum");
        assert_eq!(call.params, vec![Value::Int(3), Value::Int(4)]);
        Ok(())
    }

    #[test]
    fn test_decode_call_without_params() -> Result<()> {
        let call = decode_call("<methodCall><methodName>ping</methodName></methodCall>")?;
        assert_eq!(call.method, "ping");
        assert!(call.params.is_empty());

        let call = decode_call("<methodCall><methodName>ping</methodName><params/></methodCall>")?;
        assert!(call.params.is_empty());
        Ok(())
    }

    #[test]
    fn test_decode_response_success() -> Result<()> {
        let xml = "<methodResponse><params><param>\
                   <value><string>ok</string></value>\
                   </param></params></methodResponse>";
        assert_eq!(
            decode_response(xml)?,
            MethodResponse::Success(Some(Value::String("ok".to_string())))
        );
        assert_eq!(
            decode_response("<methodResponse><params/></methodResponse>")?,
            MethodResponse::Success(None)
        );
        Ok(())
    }

    #[test]
    fn test_decode_response_fault() -> Result<()> {
        let xml = "<methodResponse><fault><value><struct>\
                   <member><name>faultCode</name><value><int>4</int></value></member>\
                   <member><name>faultString</name><value><string>too many</string></value></member>\
                   </struct></value></fault></methodResponse>";
        let MethodResponse::Fault(fault) = decode_response(xml)? else {
            panic!("expected fault");
        };
        let fault = fault.as_map().expect("fault struct");
        assert_eq!(fault.get("faultCode"), Some(&Value::Int(4)));
        assert_eq!(
            fault.get("faultString"),
            Some(&Value::String("too many".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_response_expects_params_or_fault() {
        let err = decode_response("<methodResponse><result/></methodResponse>");
        assert!(matches!(
            err.map_err(|e| e.kind().clone()),
            Err(ErrorKind::StructuralMismatch { .. })
        ));
    }

    #[test]
    fn test_whitespace_insensitive() -> Result<()> {
        let xml = "<methodCall>\n  <methodName>go</methodName>\n  <params>\n    \
                   <param>\n      <value><i4>1</i4></value>\n    </param>\n  </params>\n\
                   </methodCall>";
        let call = decode_call(xml)?;
        assert_eq!(call.params, vec![Value::Int(1)]);
        Ok(())
    }
}
