//! xoly Lexer
//!
//! Tokenizes template source into a flat stream of text runs, tags and
//! `#expr#` interpolations. Comments (`<!--- ... --->`) are stripped before
//! anything else sees them.
//!
//! Also hosts the attribute parser used on the raw text of opening tags.
//!
//! # Example
//!
//! ```
//! use xoly_lexer::{Scanner, TokenKind};
//!
//! let tokens = Scanner::tokenize("hi <cfoutput>#name#</cfoutput>").unwrap();
//! assert_eq!(tokens.len(), 4);
//! assert_eq!(tokens[2].kind, TokenKind::Interpolation("name".into()));
//! ```

pub mod attributes;
pub mod scanner;
pub mod token;

pub use attributes::{parse_attributes, AttributeError, AttributeMap};
pub use scanner::{ScanState, Scanner};
pub use token::{Span, Token, TokenKind};

/// Lexer error with position information.
///
/// Raised for malformed sentinel sequences: an unterminated comment or a
/// tag whose closing `>` never arrives.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("Scan error at line {line}, column {column}: {message}")]
pub struct LexerError {
    pub message: String,
    pub line: usize,
    pub column: usize,
}
