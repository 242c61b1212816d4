//! Error types for saxtree

use std::fmt;
use thiserror::Error;

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed XML at the lexical level, reported by the underlying
    /// tokenizer together with the byte offset where it gave up
    Tokenizer { offset: u64 },
    /// The input contained no root element
    EmptyDocument,
    /// A required structural position held the wrong tag or node
    StructuralMismatch {
        expected: String,
        found: String,
        depth: i32,
    },
    /// XML-RPC type tag outside the known vocabulary
    UnknownType { name: String, depth: i32 },
    /// A scalar's text content could not be interpreted
    InvalidScalar { what: &'static str },
    /// A `<member>` in an XML-RPC struct carried no name text
    EmptyMemberName,
    /// Single-root serialization requires exactly one non-special top-level key
    MultipleRootKeys,
    /// A map key is not usable as an XML element name
    InvalidKey { key: String },
    /// CDATA content contains the literal `]]>` terminator
    CdataTerminator,
    /// The value kind has no XML-RPC representation
    Unencodable { what: &'static str },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tokenizer { offset } => write!(f, "XML parse error at byte {offset}"),
            Self::EmptyDocument => write!(f, "no root element in input"),
            Self::StructuralMismatch {
                expected,
                found,
                depth,
            } => write!(
                f,
                "expecting {expected}, got {found} at depth {depth}"
            ),
            Self::UnknownType { name, depth } => {
                write!(f, "unknown XML-RPC type '{name}' at depth {depth}")
            }
            Self::InvalidScalar { what } => write!(f, "invalid {what} value"),
            Self::EmptyMemberName => write!(f, "empty member name in struct"),
            Self::MultipleRootKeys => {
                write!(f, "document serialization requires exactly one top-level key")
            }
            Self::InvalidKey { key } => {
                write!(f, "key \"{key}\" is not a valid XML element name")
            }
            Self::CdataTerminator => {
                write!(f, "CDATA text contains illegal ']]>' sequence")
            }
            Self::Unencodable { what } => {
                write!(f, "cannot serialize {what} to XML-RPC")
            }
        }
    }
}

/// Main error type for saxtree
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        let message = kind.to_string();
        Self { kind, message }
    }

    pub fn with_message(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wrap a tokenizer-level failure with its byte offset
    pub fn tokenizer(offset: u64, detail: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::Tokenizer { offset },
            message: format!("XML parse error at byte {offset}: {detail}"),
        }
    }

    /// Structural mismatch citing the expected and actual node
    pub fn mismatch(expected: impl Into<String>, found: impl Into<String>, depth: i32) -> Self {
        Self::new(ErrorKind::StructuralMismatch {
            expected: expected.into(),
            found: found.into(),
            depth,
        })
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Result type alias for saxtree
pub type Result<T> = std::result::Result<T, Error>;
