use crate::handler::TagHandler;
use crate::renderer::Renderer;
use crate::RenderError;
use xoly_parser::TagNode;

/// `<cfoutput>`: turns on `#expr#` substitution for its body.
pub struct Output;

impl TagHandler for Output {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "output"
    }

    fn interpolation(&self) -> Option<bool> {
        Some(true)
    }
}

/// `<cfdump>`: debug helper. Its body always interpolates, whatever the
/// enclosing context; a `var` attribute appends the structure of a value.
pub struct Dump;

impl TagHandler for Dump {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "dump"
    }

    fn interpolation(&self) -> Option<bool> {
        Some(true)
    }

    fn on_exit(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        mut rendered: String,
    ) -> Result<String, RenderError> {
        if let Some(value) = r.attr(tag, "var") {
            rendered.push_str(&value.describe());
        }
        Ok(rendered)
    }
}
