use crate::handler::{Flow, TagHandler};
use crate::renderer::Renderer;
use crate::RenderError;
use xoly_parser::TagNode;

/// `<cfbreak>`: leaves the nearest enclosing loop.
pub struct Break;

impl TagHandler for Break {
    fn has_body(&self) -> bool {
        false
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "break"
    }

    fn on_render_body(
        &self,
        _tag: &TagNode,
        _r: &mut Renderer<'_>,
        _out: &mut String,
    ) -> Result<Flow, RenderError> {
        Ok(Flow::BreakLoop)
    }
}

/// `<cfabort>`: stops the render, keeping the output produced so far.
/// With `showerror="..."` the render fails with that message instead.
pub struct Abort;

impl TagHandler for Abort {
    fn has_body(&self) -> bool {
        false
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "abort"
    }

    fn on_render_body(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        _out: &mut String,
    ) -> Result<Flow, RenderError> {
        if let Some(message) = r.attr_str(tag, "showerror") {
            return Err(RenderError::Aborted { message });
        }
        tracing::debug!(line = tag.span.line, "abort requested");
        Ok(Flow::Abort)
    }
}

#[cfg(test)]
mod tests {
    use crate::{render_str, Error, RenderError, Scope};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_abort_keeps_partial_output() {
        let out = render_str("before<cfabort>after", &mut Scope::new()).unwrap();
        assert_eq!(out, "before");
    }

    #[test]
    fn test_abort_inside_nested_tags() {
        let out = render_str(
            "a<cfoutput>b<cfif true>c<cfabort>d</cfif>e</cfoutput>f",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "abc");
    }

    #[test]
    fn test_abort_stops_loop() {
        let out = render_str(
            "<cfloop from=1 to=5 index=i><cfoutput>#i#</cfoutput><cfif i eq 2><cfabort></cfif></cfloop>done",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "12");
    }

    #[test]
    fn test_abort_with_error() {
        let mut scope = Scope::from_iter([("why", "bad input")]);
        let err = render_str("x<cfabort showerror=\"#why#\">", &mut scope).unwrap_err();
        assert_eq!(
            err,
            Error::Render(RenderError::Aborted {
                message: "bad input".into()
            })
        );
    }

    #[test]
    fn test_break_outside_loop() {
        let err = render_str("a<cfif true><cfbreak></cfif>b", &mut Scope::new()).unwrap_err();
        assert_eq!(err, Error::Render(RenderError::BreakOutsideLoop));
    }

    #[test]
    fn test_bare_spellings() {
        let out = render_str("<loop from=1 to=3>x<break></loop>", &mut Scope::new()).unwrap();
        assert_eq!(out, "x");
    }
}
