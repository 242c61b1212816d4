//! Depth-indexed element stack
//!
//! Converts a flat, depth-annotated token stream into nested containers.
//! There is no explicit close-tag action: before each new token is applied,
//! [`ElementStack::check_depth`] unwinds every frame opened at or below the
//! token's depth, attaching each finished value into its parent container.
//! A sentinel frame at depth -1 holds the eventual root value.

use crate::value::{List, Map, Value};

/// Where a finished frame value lands in its parent container
#[derive(Debug)]
enum Slot {
    /// Map entry under the given key
    Key(String),
    /// Entry of a list stored under `key` in the parent map
    ListEntry { key: String, index: usize },
}

#[derive(Debug)]
struct Frame {
    depth: i32,
    slot: Slot,
    value: Value,
    /// Text fragments attached so far, drives `^value{N}^` naming
    vcount: u32,
    cdcount: u32,
    ccount: u32,
}

impl Frame {
    fn new(depth: i32, slot: Slot) -> Self {
        Self {
            depth,
            slot,
            value: Value::Nothing,
            vcount: 0,
            cdcount: 0,
            ccount: 0,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ElementStack {
    /// Sentinel holding the root value, never popped
    root: Frame,
    frames: Vec<Frame>,
    preserve_order: bool,
    ignore_empty: bool,
}

impl ElementStack {
    pub(crate) fn new(preserve_order: bool, ignore_empty: bool) -> Self {
        Self {
            root: Frame::new(-1, Slot::Key(String::new())),
            frames: Vec::new(),
            preserve_order,
            ignore_empty,
        }
    }

    fn top_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().unwrap_or(&mut self.root)
    }

    fn value_key(n: u32) -> String {
        if n == 0 {
            "^value^".to_string()
        } else {
            format!("^value{n}^")
        }
    }

    fn cdata_key(n: u32) -> String {
        if n == 0 {
            "^cdata^".to_string()
        } else {
            format!("^cdata{n}^")
        }
    }

    fn comment_key(n: u32) -> String {
        if n == 0 {
            "^comment^".to_string()
        } else {
            format!("^comment{n}^")
        }
    }

    /// Turn the frame value into a map, moving any scalar already stored
    /// there under the next `^value{N}^` key
    fn promote_to_map(frame: &mut Frame) {
        if frame.value.is_map() {
            return;
        }
        let mut map = Map::new();
        if !frame.value.is_nothing() {
            let old = frame.value.take();
            map.insert(Self::value_key(frame.vcount), old);
            frame.vcount += 1;
        }
        frame.value = Value::Map(map);
    }

    /// Unwind every frame opened at or below `depth`
    pub(crate) fn check_depth(&mut self, depth: i32) {
        while self.frames.last().is_some_and(|f| f.depth >= depth) {
            self.pop_attach();
        }
    }

    fn pop_attach(&mut self) {
        let Some(frame) = self.frames.pop() else {
            return;
        };
        let discard = self.ignore_empty && frame.value.is_nothing();
        let parent = self.top_mut();
        match frame.slot {
            Slot::Key(key) => {
                if let Some(map) = parent.value.as_map_mut() {
                    if discard {
                        map.remove(&key);
                    } else {
                        map.insert(key, frame.value);
                    }
                }
            }
            Slot::ListEntry { key, index } => {
                let list = parent
                    .value
                    .as_map_mut()
                    .and_then(|m| m.get_mut(&key))
                    .and_then(Value::as_list_mut);
                if let Some(list) = list {
                    if discard && index + 1 == list.len() {
                        list.pop();
                    } else if let Some(entry) = list.get_mut(index) {
                        *entry = frame.value;
                    }
                }
            }
        }
    }

    /// Open a new frame for an element named `name` at `depth`; the caller
    /// has already unwound the stack to that depth
    pub(crate) fn push_element(&mut self, name: String, depth: i32) {
        let preserve = self.preserve_order;
        let top = self.top_mut();
        Self::promote_to_map(top);
        let Some(map) = top.value.as_map_mut() else {
            return;
        };
        let slot = if !map.contains_key(&name) {
            map.insert(name.clone(), Value::Nothing);
            Slot::Key(name)
        } else if preserve {
            // repeated sibling name, rewrite to the first free suffixed key
            let mut c = 2;
            let mut key = format!("{name}^{c}");
            while map.contains_key(&key) {
                c += 1;
                key = format!("{name}^{c}");
            }
            map.insert(key.clone(), Value::Nothing);
            Slot::Key(key)
        } else {
            // collapse mode: repeats merge into a list at the first position
            let Some(entry) = map.get_mut(&name) else {
                return;
            };
            if let Some(list) = entry.as_list_mut() {
                list.push(Value::Nothing);
                let index = list.len() - 1;
                Slot::ListEntry { key: name, index }
            } else {
                let first = entry.take();
                *entry = Value::List(List(vec![first, Value::Nothing]));
                Slot::ListEntry {
                    key: name,
                    index: 1,
                }
            }
        };
        self.frames.push(Frame::new(depth, slot));
    }

    /// Attach the attribute map to the element frame just pushed
    pub(crate) fn set_attributes(&mut self, attrs: &[(String, String)]) {
        let mut attr_map = Map::new();
        for (key, value) in attrs {
            attr_map.insert(key.clone(), Value::String(value.clone()));
        }
        let mut map = Map::new();
        map.insert("^attributes^".to_string(), Value::Map(attr_map));
        self.top_mut().value = Value::Map(map);
    }

    pub(crate) fn add_text(&mut self, text: &str) {
        let top = self.top_mut();
        if top.value.is_nothing() {
            top.value = Value::String(text.to_string());
            return;
        }
        Self::promote_to_map(top);
        let key = Self::value_key(top.vcount);
        top.vcount += 1;
        if let Some(map) = top.value.as_map_mut() {
            map.insert(key, Value::String(text.to_string()));
        }
    }

    pub(crate) fn add_cdata(&mut self, text: &str) {
        let top = self.top_mut();
        Self::promote_to_map(top);
        let key = Self::cdata_key(top.cdcount);
        top.cdcount += 1;
        if let Some(map) = top.value.as_map_mut() {
            map.insert(key, Value::String(text.to_string()));
        }
    }

    pub(crate) fn add_comment(&mut self, text: &str) {
        let top = self.top_mut();
        Self::promote_to_map(top);
        let key = Self::comment_key(top.ccount);
        top.ccount += 1;
        if let Some(map) = top.value.as_map_mut() {
            map.insert(key, Value::String(text.to_string()));
        }
    }

    /// Unwind everything still open and hand back the root value
    pub(crate) fn finish(mut self) -> Value {
        while !self.frames.is_empty() {
            self.pop_attach();
        }
        self.root.value
    }
}
