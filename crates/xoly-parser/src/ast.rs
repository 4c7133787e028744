//! Node tree for parsed templates.
//!
//! The tree is immutable once built. Renderers borrow it read-only, so one
//! `Template` can be rendered any number of times, from any number of threads.

use xoly_lexer::{AttributeMap, Span};

/// A parsed template: the root sequence of nodes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub nodes: Vec<Node>,
}

/// A node in the template tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Literal text, including tags nobody registered.
    Text(String),

    /// A `#expr#` reference.
    Interpolation(Interpolation),

    /// A registered tag.
    Tag(TagNode),
}

impl Node {
    /// Whitespace-only text.
    pub fn is_blank(&self) -> bool {
        matches!(self, Node::Text(t) if t.trim().is_empty())
    }

    pub fn as_tag(&self) -> Option<&TagNode> {
        match self {
            Node::Tag(tag) => Some(tag),
            _ => None,
        }
    }
}

/// An interpolation and where it appeared.
#[derive(Debug, Clone, PartialEq)]
pub struct Interpolation {
    pub expression: String,
    pub span: Span,
}

impl Interpolation {
    /// The source text, delimiters included.
    pub fn source(&self) -> String {
        format!("#{}#", self.expression)
    }
}

/// A tag claimed by a handler.
///
/// `body` is `Some` exactly when the handler declares a body; a
/// self-closing body tag gets an empty one.
#[derive(Debug, Clone, PartialEq)]
pub struct TagNode {
    /// Canonical (registered) tag name.
    pub name: String,
    pub attributes: AttributeMap,
    /// Attribute text as written, for tags that take a raw expression.
    pub raw_attributes: String,
    pub body: Option<Vec<Node>>,
    /// Position of the opening tag.
    pub span: Span,
}

impl TagNode {
    /// Children, or an empty slice for bodyless tags.
    pub fn children(&self) -> &[Node] {
        self.body.as_deref().unwrap_or(&[])
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }
}
