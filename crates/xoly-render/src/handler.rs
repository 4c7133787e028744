//! Tag handler protocol and registry.
//!
//! Every tag the engine understands is a [`TagHandler`] registered under a
//! canonical name. The tree builder asks the registry whether a tag owns a
//! body; the renderer drives the lifecycle hooks:
//!
//! ```text
//! guard → on_enter → on_render_body → on_exit
//! ```
//!
//! A handler overrides only the hooks it needs. The defaults make a tag
//! transparent: its body renders as if the tag were not there.

use crate::renderer::Renderer;
use crate::tags;
use crate::RenderError;
use indexmap::IndexMap;
use xoly_parser::{TagInfo, TagNode, TagTable};

/// Control-flow signal returned up the render call chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep rendering siblings.
    Continue,
    /// Stop the nearest enclosing loop after the current iteration's
    /// partial output.
    BreakLoop,
    /// Stop the whole render, keeping what has been emitted so far.
    Abort,
}

/// Position of a tag in an `if`/`elseif`/`else` chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    If,
    ElseIf,
    Else,
}

/// Behaviour bound to a tag name.
pub trait TagHandler: Send + Sync {
    /// Whether the tag owns a body up to a matching closing tag.
    fn has_body(&self) -> bool;

    /// Whether an unregistered spelling (such as `if` for `cfif`) refers to
    /// this handler. `name` is lowercased.
    fn matches_bare_tag(&self, _name: &str) -> bool {
        false
    }

    /// Chain membership; the renderer skips `ElseIf`/`Else` branches once an
    /// earlier branch of the chain has run.
    fn branch(&self) -> Option<Branch> {
        None
    }

    /// Interpolation state for the body: `Some(true)` turns `#expr#`
    /// substitution on, `None` inherits the enclosing state.
    fn interpolation(&self) -> Option<bool> {
        None
    }

    /// Whether the tag runs at all. A `false` guard skips every other hook
    /// and emits nothing.
    fn guard(&self, _tag: &TagNode, _r: &mut Renderer<'_>) -> Result<bool, RenderError> {
        Ok(true)
    }

    fn on_enter(&self, _tag: &TagNode, _r: &mut Renderer<'_>) -> Result<(), RenderError> {
        Ok(())
    }

    /// Render the body into `out`. Defaults to a depth-first walk.
    fn on_render_body(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        out: &mut String,
    ) -> Result<Flow, RenderError> {
        r.render_nodes(tag.children(), out)
    }

    /// Post-process the rendered body. Only called when the body finished
    /// with [`Flow::Continue`].
    fn on_exit(
        &self,
        _tag: &TagNode,
        _r: &mut Renderer<'_>,
        rendered: String,
    ) -> Result<String, RenderError> {
        Ok(rendered)
    }
}

/// Tag name → handler mapping.
#[derive(Default)]
pub struct Registry {
    handlers: IndexMap<String, Box<dyn TagHandler>>,
}

impl Registry {
    /// An empty registry: every tag is unknown and passes through as text.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in tags.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        tags::register_builtins(&mut registry);
        registry
    }

    /// Register `handler` under `name` (case-insensitive), replacing any
    /// previous handler of that name.
    pub fn register(&mut self, name: &str, handler: impl TagHandler + 'static) {
        self.handlers
            .insert(name.to_ascii_lowercase(), Box::new(handler));
    }

    /// Handler registered under the canonical `name`.
    pub fn get(&self, name: &str) -> Option<&dyn TagHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    /// Resolve a tag name as written: an exact canonical match first, then
    /// the first handler (in registration order) that claims the bare name.
    ///
    /// Bare names shadow HTML and SVG elements of the same name: `<param>`
    /// inside `<object>`, `<output>` and SVG `<set>` all resolve to built-ins.
    /// Templates that emit those elements need a registry without these
    /// handlers.
    pub fn resolve(&self, name: &str) -> Option<(&str, &dyn TagHandler)> {
        let name = name.to_ascii_lowercase();
        if let Some((key, handler)) = self.handlers.get_key_value(&name) {
            return Some((key.as_str(), handler.as_ref()));
        }
        self.handlers
            .iter()
            .find(|(_, handler)| handler.matches_bare_tag(&name))
            .map(|(key, handler)| (key.as_str(), handler.as_ref()))
    }

    /// Canonical names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl TagTable for Registry {
    fn lookup(&self, name: &str) -> Option<TagInfo<'_>> {
        self.resolve(name).map(|(name, handler)| TagInfo {
            name,
            has_body: handler.has_body(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Shout;

    impl TagHandler for Shout {
        fn has_body(&self) -> bool {
            true
        }

        fn matches_bare_tag(&self, name: &str) -> bool {
            name == "yell"
        }
    }

    #[test]
    fn test_empty_registry_knows_nothing() {
        assert!(Registry::new().lookup("cfif").is_none());
    }

    #[test]
    fn test_builtins_registered() {
        let registry = Registry::with_builtins();
        for name in [
            "cfoutput", "cfif", "cfelseif", "cfelse", "cfloop", "cfswitch", "cfcase",
            "cfdefault", "cfparam", "cfset", "cfsavecontent", "cfinclude", "cfbreak",
            "cfabort", "cfdump",
        ] {
            assert!(registry.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_lookup_reports_body_flag() {
        let registry = Registry::with_builtins();
        assert_eq!(
            registry.lookup("cfif"),
            Some(TagInfo {
                name: "cfif",
                has_body: true
            })
        );
        assert_eq!(registry.lookup("cfset").map(|i| i.has_body), Some(false));
    }

    #[test]
    fn test_bare_names_resolve() {
        let registry = Registry::with_builtins();
        assert_eq!(registry.lookup("if").map(|i| i.name), Some("cfif"));
        assert_eq!(registry.lookup("PARAM").map(|i| i.name), Some("cfparam"));
        assert_eq!(registry.lookup("defaultcase").map(|i| i.name), Some("cfdefault"));
        assert!(registry.lookup("div").is_none());
    }

    #[test]
    fn test_custom_handler() {
        let mut registry = Registry::new();
        registry.register("CFSHOUT", Shout);
        assert_eq!(registry.lookup("cfshout").map(|i| i.name), Some("cfshout"));
        assert_eq!(registry.lookup("yell").map(|i| i.name), Some("cfshout"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["cfshout"]);
    }
}
