use crate::handler::{Flow, TagHandler};
use crate::renderer::Renderer;
use crate::RenderError;
use xoly_parser::TagNode;

/// `<cfswitch expression="...">`: renders the first immediate `<cfcase>`
/// child whose `value` equals the expanded expression, or else the
/// `<cfdefault>` child. Other children are ignored.
pub struct Switch;

impl TagHandler for Switch {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "switch"
    }

    fn on_render_body(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        out: &mut String,
    ) -> Result<Flow, RenderError> {
        let expression = r.require_attr(tag, "expression")?;
        let mut fallback = None;

        for child in tag.children().iter().filter_map(|n| n.as_tag()) {
            match child.name.as_str() {
                "cfcase" => {
                    let value = r.require_attr(child, "value")?;
                    let delimiters = child.attr("delimiters").unwrap_or(",");
                    let matched = value
                        .split(|c: char| delimiters.contains(c))
                        .any(|alternative| alternative.trim() == expression);
                    if matched {
                        tracing::trace!(expression = %expression, line = child.span.line, "case matched");
                        return r.render_nodes(child.children(), out);
                    }
                }
                "cfdefault" => {
                    fallback.get_or_insert(child);
                }
                _ => {}
            }
        }

        match fallback {
            Some(default) => r.render_nodes(default.children(), out),
            None => Ok(Flow::Continue),
        }
    }
}

fn misplaced(tag: &TagNode) -> RenderError {
    RenderError::Misplaced {
        tag: tag.name.clone(),
        context: "directly inside <cfswitch>".into(),
        line: tag.span.line,
    }
}

/// `<cfcase value="...">`. Only meaningful as a child of `<cfswitch>`,
/// which renders it directly.
pub struct Case;

impl TagHandler for Case {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "case"
    }

    fn on_enter(&self, tag: &TagNode, _r: &mut Renderer<'_>) -> Result<(), RenderError> {
        Err(misplaced(tag))
    }
}

/// `<cfdefault>`, also spelled `<cfdefaultcase>`.
pub struct DefaultCase;

impl TagHandler for DefaultCase {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        matches!(name, "default" | "defaultcase" | "cfdefaultcase")
    }

    fn on_enter(&self, tag: &TagNode, _r: &mut Renderer<'_>) -> Result<(), RenderError> {
        Err(misplaced(tag))
    }
}

#[cfg(test)]
mod tests {
    use crate::{render_str, Error, RenderError, Scope};
    use pretty_assertions::assert_eq;

    fn render(source: &str, scope: &mut Scope) -> Result<String, Error> {
        render_str(source, scope)
    }

    const SWITCH: &str = "<cfswitch expression=\"#v#\"><cfcase value=\"a\">X</cfcase><cfdefault>Y</cfdefault></cfswitch>";

    #[test]
    fn test_matching_case() {
        let mut scope = Scope::from_iter([("v", "a")]);
        assert_eq!(render(SWITCH, &mut scope).unwrap(), "X");
    }

    #[test]
    fn test_default_when_nothing_matches() {
        let mut scope = Scope::from_iter([("v", "b")]);
        assert_eq!(render(SWITCH, &mut scope).unwrap(), "Y");
    }

    #[test]
    fn test_literal_expression() {
        let out = render(
            "<cfswitch expression=\"a\"><cfcase value=\"a\">X</cfcase><cfdefault>Y</cfdefault></cfswitch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "X");
    }

    #[test]
    fn test_no_match_no_default() {
        let out = render(
            "<cfswitch expression=\"z\"><cfcase value=\"a\">X</cfcase></cfswitch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_first_match_wins() {
        let out = render(
            "<cfswitch expression=\"a\"><cfcase value=\"a\">1</cfcase><cfcase value=\"a\">2</cfcase></cfswitch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "1");
    }

    #[test]
    fn test_default_position_does_not_matter() {
        let out = render(
            "<cfswitch expression=\"b\"><cfdefault>D</cfdefault><cfcase value=\"b\">B</cfcase></cfswitch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "B");
    }

    #[test]
    fn test_case_alternatives() {
        let source = "<cfswitch expression=\"#v#\"><cfcase value=\"x, y\">XY</cfcase><cfcase value=\"p|q\" delimiters=\"|\">PQ</cfcase></cfswitch>";
        let mut scope = Scope::from_iter([("v", "y")]);
        assert_eq!(render(source, &mut scope).unwrap(), "XY");
        scope.set("v", "q");
        assert_eq!(render(source, &mut scope).unwrap(), "PQ");
    }

    #[test]
    fn test_comparison_is_exact() {
        let out = render(
            "<cfswitch expression=\"A\"><cfcase value=\"a\">X</cfcase></cfswitch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "");
    }

    #[test]
    fn test_text_between_cases_is_ignored() {
        let out = render(
            "<cfswitch expression=\"a\">\n  junk\n  <cfcase value=\"a\">X</cfcase>\n</cfswitch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "X");
    }

    #[test]
    fn test_bare_names() {
        let out = render(
            "<switch expression=\"b\"><case value=\"a\">X</case><defaultcase>Y</defaultcase></switch>",
            &mut Scope::new(),
        )
        .unwrap();
        assert_eq!(out, "Y");
    }

    #[test]
    fn test_missing_expression() {
        let err = render("<cfswitch><cfcase value=\"a\">X</cfcase></cfswitch>", &mut Scope::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::MissingAttribute { .. })));
    }

    #[test]
    fn test_case_outside_switch() {
        let err = render("<cfcase value=\"a\">X</cfcase>", &mut Scope::new()).unwrap_err();
        assert_eq!(
            err,
            Error::Render(RenderError::Misplaced {
                tag: "cfcase".into(),
                context: "directly inside <cfswitch>".into(),
                line: 1,
            })
        );
    }

    #[test]
    fn test_default_outside_switch() {
        let err = render("<cfdefault>Y</cfdefault>", &mut Scope::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::Misplaced { .. })));
    }
}
