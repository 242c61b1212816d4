//! Tree value model shared by the XML data mapping and the XML-RPC codec

use indexmap::map::{IntoIter, Iter, Keys, Values};
use indexmap::IndexMap;
use std::ops::Index;
use time::macros::{datetime, format_description};
use time::PrimitiveDateTime;

use crate::error::{Error, ErrorKind, Result};

/// A parsed XML or XML-RPC value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// No value (empty element, empty XML-RPC `<value/>`)
    #[default]
    Nothing,
    /// Boolean value
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    String(String),
    /// Date/time without offset
    DateTime(PrimitiveDateTime),
    /// Binary blob (XML-RPC `<base64>`)
    Binary(Vec<u8>),
    /// Ordered sequence of values
    List(List),
    /// Ordered mapping from key to value (insertion order significant)
    Map(Map),
}

impl Value {
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Nothing)
    }

    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Self::List(_))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<PrimitiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Self::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut List> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut Map> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Replace this value with `Nothing` and return the previous contents
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<PrimitiveDateTime> for Value {
    fn from(value: PrimitiveDateTime) -> Self {
        Self::DateTime(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Binary(value)
    }
}

impl From<List> for Value {
    fn from(value: List) -> Self {
        Self::List(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Self::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Self::List(List(values))
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self::Map(Map(map))
    }
}

/// An order-preserving map of string keys to values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Map(pub(crate) IndexMap<String, Value>);

impl Map {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.0.get_mut(key)
    }

    /// Inserts a key-value pair, returning the previous value if the key existed
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a key while preserving the order of the remaining entries
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.shift_remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The most recently inserted key, if any
    pub fn last_key(&self) -> Option<&str> {
        self.0.last().map(|(k, _)| k.as_str())
    }

    pub fn keys(&self) -> Keys<'_, String, Value> {
        self.0.keys()
    }

    pub fn values(&self) -> Values<'_, String, Value> {
        self.0.values()
    }

    pub fn iter(&self) -> Iter<'_, String, Value> {
        self.0.iter()
    }
}

impl Index<&str> for Map {
    type Output = Value;

    #[allow(clippy::indexing_slicing)]
    fn index(&self, key: &str) -> &Self::Output {
        &self.0[key]
    }
}

impl<'a> IntoIterator for &'a Map {
    type Item = (&'a String, &'a Value);
    type IntoIter = Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for Map {
    type Item = (String, Value);
    type IntoIter = IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<IndexMap<String, Value>> for Map {
    fn from(map: IndexMap<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for Map {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(IndexMap::from_iter(iter))
    }
}

/// An ordered list of values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct List(pub(crate) Vec<Value>);

impl List {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Value> {
        self.0.get_mut(index)
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.0.push(value.into());
    }

    pub fn pop(&mut self) -> Option<Value> {
        self.0.pop()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.0.iter()
    }
}

impl Index<usize> for List {
    type Output = Value;

    #[allow(clippy::indexing_slicing)]
    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl IntoIterator for List {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl From<Vec<Value>> for List {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(Vec::from_iter(iter))
    }
}

/// The zero value for dates: the Unix epoch
pub const EPOCH: PrimitiveDateTime = datetime!(1970-01-01 00:00:00);

/// Format a date/time in the document-canonical `YYYY-MM-DDTHH:MM:SS` form
pub fn format_datetime(dt: PrimitiveDateTime) -> String {
    let desc = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    dt.format(desc)
        .unwrap_or_else(|_| "1970-01-01T00:00:00".to_string())
}

/// Format a date/time in the compact XML-RPC `YYYYMMDDTHH:MM:SS` form
pub fn format_datetime_xmlrpc(dt: PrimitiveDateTime) -> String {
    let desc = format_description!("[year][month][day]T[hour]:[minute]:[second]");
    dt.format(desc)
        .unwrap_or_else(|_| "19700101T00:00:00".to_string())
}

/// Parse a date/time from the forms produced by XML-RPC peers: compact
/// `19980717T14:08:55`, dashed `1998-07-17T14:08:55`, or a bare date
pub fn parse_datetime(text: &str) -> Result<PrimitiveDateTime> {
    let text = text.trim();
    let compact = format_description!("[year][month][day]T[hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(text, compact) {
        return Ok(dt);
    }
    let dashed = format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");
    if let Ok(dt) = PrimitiveDateTime::parse(text, dashed) {
        return Ok(dt);
    }
    let date_only = format_description!("[year][month][day]");
    if let Ok(date) = time::Date::parse(text, date_only) {
        return Ok(PrimitiveDateTime::new(date, time::Time::MIDNIGHT));
    }
    Err(Error::with_message(
        ErrorKind::InvalidScalar { what: "dateTime" },
        format!("cannot parse date/time value '{text}'"),
    ))
}
