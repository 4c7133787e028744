use crate::handler::{Branch, TagHandler};
use crate::renderer::Renderer;
use crate::RenderError;
use xoly_parser::TagNode;

/// The `condition` attribute, or the raw attribute text (`<cfif x gt 1>`).
fn test(tag: &TagNode, r: &Renderer<'_>) -> Result<bool, RenderError> {
    let source = tag.attr("condition").unwrap_or(tag.raw_attributes.as_str());
    r.condition(tag, source)
}

/// `<cfif>`: renders its body only when the condition holds.
pub struct If;

impl TagHandler for If {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "if"
    }

    fn branch(&self) -> Option<Branch> {
        Some(Branch::If)
    }

    fn guard(&self, tag: &TagNode, r: &mut Renderer<'_>) -> Result<bool, RenderError> {
        test(tag, r)
    }
}

/// `<cfelseif>`: a sibling following `<cfif>` or another `<cfelseif>`.
pub struct ElseIf;

impl TagHandler for ElseIf {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "elseif"
    }

    fn branch(&self) -> Option<Branch> {
        Some(Branch::ElseIf)
    }

    fn guard(&self, tag: &TagNode, r: &mut Renderer<'_>) -> Result<bool, RenderError> {
        test(tag, r)
    }
}

/// `<cfelse>`: runs when no earlier branch of the chain did.
pub struct Else;

impl TagHandler for Else {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "else"
    }

    fn branch(&self) -> Option<Branch> {
        Some(Branch::Else)
    }
}
