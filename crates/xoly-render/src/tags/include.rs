use crate::handler::{Flow, TagHandler};
use crate::renderer::Renderer;
use crate::RenderError;
use xoly_parser::TagNode;

/// `<cfinclude template="...">` (or `path="..."`): renders another
/// template inline against the current scope.
pub struct Include;

impl TagHandler for Include {
    fn has_body(&self) -> bool {
        false
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "include"
    }

    fn on_render_body(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        out: &mut String,
    ) -> Result<Flow, RenderError> {
        let path = match r.attr_str(tag, "template") {
            Some(path) => path,
            None => r.require_attr(tag, "path").map_err(|_| RenderError::MissingAttribute {
                tag: tag.name.clone(),
                attribute: "template".into(),
                line: tag.span.line,
            })?,
        };
        r.render_include(&path, out)
    }
}
