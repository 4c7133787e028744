//! xoly Parser
//!
//! Builds a node tree from the scanner's token stream. Whether a tag owns a
//! body is not known syntactically; the builder asks a [`TagTable`] (the
//! renderer's handler registry) for every tag name it meets.

pub mod ast;
pub mod parser;

pub use ast::{Interpolation, Node, TagNode, Template};
pub use parser::Parser;

use xoly_lexer::LexerError;

/// Default cap on tag nesting accepted by the builder.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// What the tree builder needs to know about a registered tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo<'a> {
    /// Canonical name stored on the node.
    pub name: &'a str,
    pub has_body: bool,
}

/// Tag lookup consulted while building the tree.
///
/// `None` means the tag is unknown and its source is kept as text.
pub trait TagTable {
    fn lookup(&self, name: &str) -> Option<TagInfo<'_>>;
}

/// Parser error with position information.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Scan(#[from] LexerError),

    #[error("Malformed attribute in <{tag}> at line {line}, column {column}: {message}")]
    MalformedAttribute {
        tag: String,
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Unbalanced tag at line {line}, column {column}: expected </{expected}>, found </{found}>")]
    UnbalancedTag {
        expected: String,
        found: String,
        line: usize,
        column: usize,
    },

    #[error("Unexpected closing tag </{name}> at line {line}, column {column}")]
    UnexpectedClose {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("Unclosed tag <{name}> opened at line {line}, column {column}")]
    UnclosedTag {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("<{name}> at line {line}, column {column} nests deeper than {limit} tags")]
    TooDeep {
        name: String,
        limit: usize,
        line: usize,
        column: usize,
    },
}

impl ParseError {
    /// Source line of the error.
    pub fn line(&self) -> usize {
        match self {
            ParseError::Scan(e) => e.line,
            ParseError::MalformedAttribute { line, .. }
            | ParseError::UnbalancedTag { line, .. }
            | ParseError::UnexpectedClose { line, .. }
            | ParseError::UnclosedTag { line, .. }
            | ParseError::TooDeep { line, .. } => *line,
        }
    }
}
