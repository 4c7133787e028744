//! xoly Render
//!
//! Evaluates parsed templates against a mutable variable scope.
//!
//! ```text
//! source → Engine::parse() → Template → Engine::render(&mut Scope) → String
//! ```
//!
//! A `Template` is immutable and can be rendered any number of times with
//! different scopes. The scope passed to `render` is updated in place with
//! every binding made by `set`, `param`, `loop` and `savecontent`.
//!
//! # Example
//!
//! ```
//! use xoly_render::{Engine, Scope};
//!
//! let engine = Engine::new();
//! let template = engine.parse("hello <cfoutput>#who#</cfoutput>").unwrap();
//! let mut scope = Scope::from_iter([("who", "world")]);
//! assert_eq!(engine.render(&template, &mut scope).unwrap(), "hello world");
//! ```

pub mod condition;
pub mod handler;
pub mod loader;
pub mod renderer;
pub mod scope;
pub mod tags;
pub mod value;

pub use handler::{Branch, Flow, Registry, TagHandler};
pub use loader::{LoadError, MemoryLoader, NoLoader, TemplateLoader};
pub use renderer::Renderer;
pub use scope::Scope;
pub use value::Value;
pub use xoly_parser::{Node, ParseError, TagNode, Template};

use std::sync::OnceLock;
use xoly_parser::Parser;

/// Render-time error. Rendering is all-or-nothing: on error no output is
/// returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RenderError {
    #[error("Missing required parameter '{name}' at line {line}")]
    MissingRequiredParam { name: String, line: usize },

    #[error("Parameter '{name}' at line {line} is not of type {expected}")]
    InvalidParamType {
        name: String,
        expected: String,
        line: usize,
    },

    #[error("Loop at line {line} exceeded the limit of {limit} iterations")]
    LoopLimitExceeded { limit: usize, line: usize },

    #[error("Cannot resolve include '{path}': {reason}")]
    IncludeResolution { path: String, reason: String },

    #[error("Cannot parse include '{path}': {source}")]
    IncludeParse { path: String, source: ParseError },

    #[error("Include depth limit of {limit} exceeded at '{path}'")]
    IncludeDepthExceeded { path: String, limit: usize },

    #[error("<{tag}> at line {line} requires attribute '{attribute}'")]
    MissingAttribute {
        tag: String,
        attribute: String,
        line: usize,
    },

    #[error("Invalid value '{value}' for attribute '{attribute}' of <{tag}> at line {line}: {reason}")]
    InvalidAttribute {
        tag: String,
        attribute: String,
        value: String,
        reason: String,
        line: usize,
    },

    #[error("Invalid condition at line {line}: {message}")]
    Condition { message: String, line: usize },

    #[error("Undefined variable '{name}' at line {line}")]
    UndefinedVariable { name: String, line: usize },

    #[error("<{tag}> at line {line} is only allowed {context}")]
    Misplaced {
        tag: String,
        context: String,
        line: usize,
    },

    #[error("Tags nest deeper than {limit} levels at line {line}")]
    TooDeep { limit: usize, line: usize },

    #[error("<cfbreak> used outside of a loop")]
    BreakOutsideLoop,

    #[error("Aborted: {message}")]
    Aborted { message: String },

    #[error("No handler registered for <{name}>")]
    UnknownTag { name: String },

    /// Raised by custom handlers.
    #[error("<{tag}> failed: {message}")]
    Handler { tag: String, message: String },
}

/// Either half of the parse-then-render pipeline failed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Limits applied while rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Maximum iterations of a single `loop` tag.
    pub loop_limit: usize,
    /// Maximum nesting of `include`.
    pub max_include_depth: usize,
    /// Maximum nesting of body tags, checked when parsing and again while
    /// rendering (includes add to the depth of the tag that includes them).
    pub max_depth: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            loop_limit: 100_000,
            max_include_depth: 16,
            max_depth: xoly_parser::DEFAULT_MAX_DEPTH,
        }
    }
}

/// Tag registry, template loader and options: everything a render needs
/// besides the template and the scope.
pub struct Engine {
    registry: Registry,
    loader: Box<dyn TemplateLoader>,
    options: RenderOptions,
}

impl Engine {
    /// Built-in tags, no loader, default options.
    pub fn new() -> Self {
        Self::with_options(RenderOptions::default())
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self {
            registry: Registry::with_builtins(),
            loader: Box::new(NoLoader),
            options,
        }
    }

    pub fn with_loader(mut self, loader: impl TemplateLoader + 'static) -> Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// For registering custom handlers. Templates parsed before a change
    /// keep the tag resolution they were parsed with.
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    pub fn loader(&self) -> &dyn TemplateLoader {
        self.loader.as_ref()
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Parse template source against this engine's tags.
    pub fn parse(&self, source: &str) -> Result<Template, ParseError> {
        Parser::new(&self.registry)
            .with_max_depth(self.options.max_depth)
            .parse_str(source)
    }

    /// Render a parsed template, updating `scope` in place.
    ///
    /// `abort` ends the render early and still succeeds with the output
    /// produced so far.
    pub fn render(&self, template: &Template, scope: &mut Scope) -> Result<String, RenderError> {
        let mut out = String::new();
        let mut renderer = Renderer::new(self, scope);

        match renderer.render_nodes(&template.nodes, &mut out)? {
            Flow::Continue => {}
            Flow::Abort => tracing::debug!(bytes = out.len(), "render aborted"),
            Flow::BreakLoop => return Err(RenderError::BreakOutsideLoop),
        }

        Ok(out)
    }

    /// Parse and render in one step.
    pub fn render_str(&self, source: &str, scope: &mut Scope) -> Result<String, Error> {
        let template = self.parse(source)?;
        Ok(self.render(&template, scope)?)
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

fn default_engine() -> &'static Engine {
    static ENGINE: OnceLock<Engine> = OnceLock::new();
    ENGINE.get_or_init(Engine::new)
}

/// Parse with the built-in tags.
pub fn parse(source: &str) -> Result<Template, ParseError> {
    default_engine().parse(source)
}

/// Render with the built-in tags and no include loader.
pub fn render(template: &Template, scope: &mut Scope) -> Result<String, RenderError> {
    default_engine().render(template, scope)
}

/// Parse and render with the built-in tags and no include loader.
pub fn render_str(source: &str, scope: &mut Scope) -> Result<String, Error> {
    default_engine().render_str(source, scope)
}
