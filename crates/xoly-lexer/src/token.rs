/// A position in source text, tracking line and column for error reporting.
///
/// `start` and `end` are character offsets into the template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }
}

/// Token classification for template source.
///
/// Data-carrying variants embed their value directly. Comments never reach
/// this level: the scanner strips them before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A run of literal characters.
    Text(String),

    /// `<name attrs>` or `<name attrs/>`. The name is lowercased; the
    /// attribute text is kept raw for the attribute parser.
    TagOpen {
        name: String,
        attributes: String,
        self_closing: bool,
    },

    /// `</name>`, name lowercased.
    TagClose(String),

    /// `#expr#`, carrying the text between the delimiters.
    Interpolation(String),
}

/// A token produced by the scanner.
///
/// `lexeme` is the exact source text the token was read from, so that
/// tags nobody claims can be passed through to the output untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub lexeme: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, lexeme: String) -> Self {
        Self { kind, span, lexeme }
    }
}

/// Opening marker of a template comment.
pub const COMMENT_OPEN: &str = "<!---";

/// Closing marker of a template comment.
pub const COMMENT_CLOSE: &str = "--->";
