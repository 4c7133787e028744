//! Tree builder.
//!
//! Consumes tokens from `xoly-lexer` and assembles a `Template`. Nesting is
//! tracked on an explicit stack of open tags rather than the call stack.
//! Depth is still capped: the finished tree is walked and dropped
//! recursively, so anything deeper than `max_depth` is rejected here.

use crate::ast::{Interpolation, Node, TagNode, Template};
use crate::{ParseError, TagTable, DEFAULT_MAX_DEPTH};
use xoly_lexer::{parse_attributes, LexerError, Scanner, Span, Token, TokenKind};

/// A body tag waiting for its closing tag.
struct Frame {
    tag: TagNode,
    children: Vec<Node>,
}

/// Template tree builder.
pub struct Parser<'t, T: TagTable + ?Sized> {
    table: &'t T,
    stack: Vec<Frame>,
    root: Vec<Node>,
    max_depth: usize,
}

impl<'t, T: TagTable + ?Sized> Parser<'t, T> {
    /// Create a new builder that resolves tags through `table`.
    pub fn new(table: &'t T) -> Self {
        Self {
            table,
            stack: Vec::new(),
            root: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    /// Reject templates whose body tags nest deeper than `max_depth`.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Scan and build `source` in one pass.
    pub fn parse(source: &str, table: &'t T) -> Result<Template, ParseError> {
        Parser::new(table).parse_str(source)
    }

    /// Scan and build `source` with this builder's settings.
    pub fn parse_str(self, source: &str) -> Result<Template, ParseError> {
        self.build(Scanner::new(source))
    }

    /// Build a tree from a (possibly lazy) token stream.
    ///
    /// Stops at the first scan error; no partial tree is returned.
    pub fn build<I>(mut self, tokens: I) -> Result<Template, ParseError>
    where
        I: IntoIterator<Item = Result<Token, LexerError>>,
    {
        for token in tokens {
            self.accept(token?)?;
        }

        if let Some(frame) = self.stack.last() {
            return Err(ParseError::UnclosedTag {
                name: frame.tag.name.clone(),
                line: frame.tag.span.line,
                column: frame.tag.span.column,
            });
        }

        Ok(Template { nodes: self.root })
    }

    fn accept(&mut self, token: Token) -> Result<(), ParseError> {
        let Token { kind, span, lexeme } = token;
        let table = self.table;

        match kind {
            TokenKind::Text(text) => self.push_text(&text),
            TokenKind::Interpolation(expression) => {
                self.current().push(Node::Interpolation(Interpolation { expression, span }));
            }
            TokenKind::TagOpen {
                name,
                attributes,
                self_closing,
            } => {
                let Some(info) = table.lookup(&name) else {
                    tracing::trace!(tag = %name, line = span.line, "unknown tag kept as text");
                    self.push_foreign_tag(&lexeme, span);
                    return Ok(());
                };

                let parsed =
                    parse_attributes(&attributes).map_err(|e| ParseError::MalformedAttribute {
                        tag: name.clone(),
                        message: e.message,
                        line: span.line,
                        column: span.column,
                    })?;

                let mut tag = TagNode {
                    name: info.name.to_string(),
                    attributes: parsed,
                    raw_attributes: attributes,
                    body: None,
                    span,
                };

                if !info.has_body {
                    self.current().push(Node::Tag(tag));
                } else if self_closing {
                    tag.body = Some(Vec::new());
                    self.current().push(Node::Tag(tag));
                } else {
                    if self.stack.len() >= self.max_depth {
                        return Err(ParseError::TooDeep {
                            name: tag.name,
                            limit: self.max_depth,
                            line: span.line,
                            column: span.column,
                        });
                    }
                    self.stack.push(Frame {
                        tag,
                        children: Vec::new(),
                    });
                }
            }
            TokenKind::TagClose(name) => {
                let Some(info) = table.lookup(&name) else {
                    self.push_text(&lexeme);
                    return Ok(());
                };

                if !info.has_body {
                    tracing::trace!(tag = %name, line = span.line, "closing tag of bodyless tag dropped");
                    return Ok(());
                }

                match self.stack.pop() {
                    Some(mut frame) if frame.tag.name == info.name => {
                        frame.tag.body = Some(frame.children);
                        self.current().push(Node::Tag(frame.tag));
                    }
                    Some(frame) => {
                        return Err(ParseError::UnbalancedTag {
                            expected: frame.tag.name,
                            found: name,
                            line: span.line,
                            column: span.column,
                        });
                    }
                    None => {
                        return Err(ParseError::UnexpectedClose {
                            name,
                            line: span.line,
                            column: span.column,
                        });
                    }
                }
            }
        }

        Ok(())
    }

    /// Child list of the innermost open tag, or the root.
    fn current(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    /// Source of an unknown tag, kept as text. `#name#` pairs inside it
    /// still become interpolations so `<a href="#url#">` works in output.
    fn push_foreign_tag(&mut self, lexeme: &str, span: Span) {
        let mut rest = lexeme;
        while let Some(open) = rest.find('#') {
            let after = &rest[open + 1..];
            match after.find(['#', '<', '>', '\n']) {
                Some(close) if after[close..].starts_with('#') => {
                    self.push_text(&rest[..open]);
                    self.current().push(Node::Interpolation(Interpolation {
                        expression: after[..close].to_string(),
                        span,
                    }));
                    rest = &after[close + 1..];
                }
                _ => {
                    self.push_text(&rest[..=open]);
                    rest = after;
                }
            }
        }
        self.push_text(rest);
    }

    /// Append text, merging with a preceding text node.
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let nodes = self.current();
        if let Some(Node::Text(prev)) = nodes.last_mut() {
            prev.push_str(text);
        } else {
            nodes.push(Node::Text(text.to_string()));
        }
    }
}
