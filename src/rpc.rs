//! XML-RPC wire codec
//!
//! A recursive-descent decoder and a symmetric encoder for the XML-RPC
//! grammar (`methodCall`, `methodResponse`, `struct`, `array` and the
//! scalar type tags). Unlike the generic mapping in [`crate::tree`], the
//! vocabulary here is fixed: maps correspond only to `<struct>`, lists
//! only to `<array>`, and no special keys are used.

pub mod decode;
pub mod encode;

pub use decode::{decode_call, decode_response, decode_value};
pub use encode::{encode_call, encode_fault, encode_response, encode_value};

use crate::value::Value;

/// A decoded `methodCall` envelope
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub method: String,
    pub params: Vec<Value>,
}

/// A decoded `methodResponse` envelope
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    /// A `params` response with its single optional value
    Success(Option<Value>),
    /// A `fault` response carrying the fault struct
    Fault(Value),
}
