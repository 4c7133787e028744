//! Evaluation engine.
//!
//! Walks a parsed tree depth-first, threading the single mutable scope and
//! dispatching every tag node through its handler:
//!
//! ```text
//! Enter → RenderChildren(0..n) → Exit
//! ```
//!
//! Control flow travels back up as a [`Flow`] value; every caller decides
//! explicitly whether to keep going.

use crate::condition::{self, ConditionError};
use crate::handler::{Branch, Flow, TagHandler};
use crate::scope::Scope;
use crate::value::Value;
use crate::{Engine, RenderError, RenderOptions};
use xoly_parser::{Interpolation, Node, TagNode};

/// State of one render invocation.
pub struct Renderer<'a> {
    engine: &'a Engine,
    scope: &'a mut Scope,
    interpolate: bool,
    include_depth: usize,
    depth: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(engine: &'a Engine, scope: &'a mut Scope) -> Self {
        Self {
            engine,
            scope,
            interpolate: false,
            include_depth: 0,
            depth: 0,
        }
    }

    pub fn scope(&self) -> &Scope {
        &*self.scope
    }

    pub fn scope_mut(&mut self) -> &mut Scope {
        &mut *self.scope
    }

    pub fn options(&self) -> &RenderOptions {
        self.engine.options()
    }

    /// Whether `#expr#` is currently substituted.
    pub fn interpolating(&self) -> bool {
        self.interpolate
    }

    // =========================================================================
    // Tree walk
    // =========================================================================

    /// Render a sibling sequence into `out`.
    ///
    /// Tracks `if`/`elseif`/`else` chains: once a branch has run, later
    /// branches of the same chain are skipped without invoking any hook.
    /// Whitespace-only text between branches does not break the chain.
    pub fn render_nodes(&mut self, nodes: &[Node], out: &mut String) -> Result<Flow, RenderError> {
        // Some(taken) while inside an if/elseif chain
        let mut chain: Option<bool> = None;

        for node in nodes {
            match node {
                Node::Text(text) => {
                    out.push_str(text);
                    if !node.is_blank() {
                        chain = None;
                    }
                }
                Node::Interpolation(interp) => {
                    self.interpolation(interp, out);
                    chain = None;
                }
                Node::Tag(tag) => {
                    let handler = self.handler(tag)?;
                    let branch = handler.branch();

                    if let Some(Branch::ElseIf | Branch::Else) = branch {
                        let Some(taken) = chain else {
                            return Err(RenderError::Misplaced {
                                tag: tag.name.clone(),
                                context: "after <cfif> or <cfelseif>".into(),
                                line: tag.span.line,
                            });
                        };
                        if taken {
                            if branch == Some(Branch::Else) {
                                chain = None;
                            }
                            continue;
                        }
                    }

                    let (flow, ran) = self.render_tag(handler, tag, out)?;
                    chain = match branch {
                        Some(Branch::If | Branch::ElseIf) => Some(ran),
                        _ => None,
                    };
                    if flow != Flow::Continue {
                        return Ok(flow);
                    }
                }
            }
        }

        Ok(Flow::Continue)
    }

    /// Run one tag through its handler. Returns the flow and whether the
    /// guard let the tag run.
    ///
    /// Body tags are counted across includes and capped at
    /// `RenderOptions::max_depth`, since the walk recurses once per level.
    fn render_tag(
        &mut self,
        handler: &dyn TagHandler,
        tag: &TagNode,
        out: &mut String,
    ) -> Result<(Flow, bool), RenderError> {
        if tag.body.is_none() {
            return self.run_hooks(handler, tag, out);
        }

        let limit = self.options().max_depth;
        if self.depth >= limit {
            return Err(RenderError::TooDeep {
                limit,
                line: tag.span.line,
            });
        }

        self.depth += 1;
        let result = self.run_hooks(handler, tag, out);
        self.depth -= 1;
        result
    }

    fn run_hooks(
        &mut self,
        handler: &dyn TagHandler,
        tag: &TagNode,
        out: &mut String,
    ) -> Result<(Flow, bool), RenderError> {
        if !handler.guard(tag, self)? {
            return Ok((Flow::Continue, false));
        }

        handler.on_enter(tag, self)?;

        let saved = self.interpolate;
        if let Some(enabled) = handler.interpolation() {
            self.interpolate = enabled;
        }
        let mut body = String::new();
        let flow = handler.on_render_body(tag, self, &mut body);
        self.interpolate = saved;
        let flow = flow?;

        if flow == Flow::Continue {
            let rendered = handler.on_exit(tag, self, body)?;
            out.push_str(&rendered);
        } else {
            // The tag never exited; its partial output passes through as is.
            out.push_str(&body);
        }

        Ok((flow, true))
    }

    fn handler(&self, tag: &TagNode) -> Result<&'a dyn TagHandler, RenderError> {
        let engine = self.engine;
        engine
            .registry()
            .get(&tag.name)
            .ok_or_else(|| RenderError::UnknownTag {
                name: tag.name.clone(),
            })
    }

    fn interpolation(&self, interp: &Interpolation, out: &mut String) {
        if !self.interpolate {
            out.push_str(&interp.source());
            return;
        }

        let name = interp.expression.trim();
        if name.is_empty() {
            out.push('#');
            return;
        }
        match self.scope.get(name) {
            Some(value) => out.push_str(&value.to_string()),
            None => tracing::debug!(variable = name, line = interp.span.line, "unbound variable rendered empty"),
        }
    }

    // =========================================================================
    // Includes
    // =========================================================================

    /// Load, parse and render another template inline, against this scope.
    ///
    /// The included template starts outside any `output` context.
    pub fn render_include(&mut self, path: &str, out: &mut String) -> Result<Flow, RenderError> {
        let limit = self.options().max_include_depth;
        if self.include_depth >= limit {
            return Err(RenderError::IncludeDepthExceeded {
                path: path.to_string(),
                limit,
            });
        }

        let engine = self.engine;
        let source = engine
            .loader()
            .load(path)
            .map_err(|e| RenderError::IncludeResolution {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        let template = engine.parse(&source).map_err(|e| RenderError::IncludeParse {
            path: path.to_string(),
            source: e,
        })?;
        tracing::debug!(path, depth = self.include_depth + 1, "including template");

        let saved = self.interpolate;
        self.interpolate = false;
        self.include_depth += 1;
        let flow = self.render_nodes(&template.nodes, out);
        self.include_depth -= 1;
        self.interpolate = saved;
        flow
    }

    // =========================================================================
    // Helpers for handlers
    // =========================================================================

    /// Expanded value of an attribute, if present.
    pub fn attr(&self, tag: &TagNode, name: &str) -> Option<Value> {
        tag.attr(name).map(|raw| self.scope.expand(raw))
    }

    /// Expanded text of an attribute, if present.
    pub fn attr_str(&self, tag: &TagNode, name: &str) -> Option<String> {
        tag.attr(name).map(|raw| self.scope.expand_str(raw))
    }

    /// Expanded text of a required attribute.
    pub fn require_attr(&self, tag: &TagNode, name: &str) -> Result<String, RenderError> {
        self.attr_str(tag, name)
            .ok_or_else(|| RenderError::MissingAttribute {
                tag: tag.name.clone(),
                attribute: name.to_string(),
                line: tag.span.line,
            })
    }

    /// Evaluate a condition on behalf of `tag`.
    pub fn condition(&self, tag: &TagNode, source: &str) -> Result<bool, RenderError> {
        condition::evaluate(source, self.scope()).map_err(|e| match e {
            ConditionError::Undefined(name) => RenderError::UndefinedVariable {
                name,
                line: tag.span.line,
            },
            ConditionError::Syntax(message) => RenderError::Condition {
                message,
                line: tag.span.line,
            },
        })
    }
}
