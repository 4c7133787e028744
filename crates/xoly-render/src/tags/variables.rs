use crate::handler::{Flow, TagHandler};
use crate::renderer::Renderer;
use crate::value::Value;
use crate::RenderError;
use xoly_parser::TagNode;

/// `<cfparam name="x" default="..." type="...">`: declares a variable,
/// binding the default when it is not set yet.
pub struct Param;

impl TagHandler for Param {
    fn has_body(&self) -> bool {
        false
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "param"
    }

    fn on_enter(&self, tag: &TagNode, r: &mut Renderer<'_>) -> Result<(), RenderError> {
        let name = r.require_attr(tag, "name")?;

        if !r.scope().contains(&name) {
            let Some(default) = r.attr(tag, "default") else {
                return Err(RenderError::MissingRequiredParam {
                    name,
                    line: tag.span.line,
                });
            };
            tracing::trace!(param = %name, "default applied");
            r.scope_mut().set(&name, default);
        }

        let Some(expected) = tag.attr("type") else {
            return Ok(());
        };
        let expected = expected.to_ascii_lowercase();
        let value = r.scope().get(&name).cloned().unwrap_or(Value::Null);

        let valid = match expected.as_str() {
            "any" => true,
            "string" => matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_)),
            "numeric" => value.as_number().is_some(),
            "boolean" => is_boolean(&value),
            _ => {
                return Err(RenderError::InvalidAttribute {
                    tag: tag.name.clone(),
                    attribute: "type".into(),
                    value: expected,
                    reason: "expected any, string, numeric or boolean".into(),
                    line: tag.span.line,
                });
            }
        };

        if !valid {
            return Err(RenderError::InvalidParamType {
                name,
                expected,
                line: tag.span.line,
            });
        }
        Ok(())
    }
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) | Value::Number(_) => true,
        Value::String(s) => {
            matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "false" | "yes" | "no")
                || s.trim().parse::<f64>().is_ok()
        }
        _ => false,
    }
}

/// `<cfset>`: either `name="x" value="..."`, or any number of
/// `var="value"` pairs bound in attribute order. The two forms do not mix.
pub struct Set;

impl TagHandler for Set {
    fn has_body(&self) -> bool {
        false
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "set"
    }

    fn on_enter(&self, tag: &TagNode, r: &mut Renderer<'_>) -> Result<(), RenderError> {
        if tag.attributes.is_empty() {
            return Err(RenderError::MissingAttribute {
                tag: tag.name.clone(),
                attribute: "name".into(),
                line: tag.span.line,
            });
        }

        if let (Some(name), Some(value)) = (r.attr_str(tag, "name"), r.attr(tag, "value")) {
            let extra = tag
                .attributes
                .iter()
                .find(|(key, _)| !matches!(*key, "name" | "value"));
            if let Some((attribute, raw)) = extra {
                return Err(RenderError::InvalidAttribute {
                    tag: tag.name.clone(),
                    attribute: attribute.to_string(),
                    value: raw.to_string(),
                    reason: "cannot be combined with name and value".into(),
                    line: tag.span.line,
                });
            }
            r.scope_mut().set(&name, value);
            return Ok(());
        }

        for (name, raw) in tag.attributes.iter() {
            let value = r.scope().expand(raw);
            r.scope_mut().set(name, value);
        }
        Ok(())
    }
}

/// `<cfsavecontent variable="x">`: renders its body into `x` instead of
/// the output.
pub struct SaveContent;

impl TagHandler for SaveContent {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "savecontent"
    }

    fn on_render_body(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        _out: &mut String,
    ) -> Result<Flow, RenderError> {
        let variable = r.require_attr(tag, "variable")?;

        let mut captured = String::new();
        let flow = r.render_nodes(tag.children(), &mut captured)?;
        if flow == Flow::Abort {
            return Ok(flow);
        }

        r.scope_mut().set(&variable, captured);
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use crate::{render_str, Error, RenderError, Scope, Value};
    use pretty_assertions::assert_eq;

    fn render(source: &str, scope: &mut Scope) -> Result<String, Error> {
        render_str(source, scope)
    }

    // =========================================================================
    // param
    // =========================================================================

    #[test]
    fn test_param_default_applies() {
        let mut scope = Scope::new();
        render("<cfparam name=\"x\" default=\"1\">", &mut scope).unwrap();
        assert_eq!(scope.get("x"), Some(&Value::from("1")));
    }

    #[test]
    fn test_param_keeps_existing_binding() {
        let mut scope = Scope::from_iter([("x", "5")]);
        render("<cfparam name=\"x\" default=\"1\">", &mut scope).unwrap();
        assert_eq!(scope.get("x"), Some(&Value::from("5")));
    }

    #[test]
    fn test_param_then_output() {
        let mut scope = Scope::new();
        let out = render(
            "<cfparam name=\"x\" default=\"1\"><cfoutput>#x#</cfoutput>",
            &mut scope,
        )
        .unwrap();
        assert_eq!(out, "1");
    }

    #[test]
    fn test_param_required() {
        let err = render("\n<cfparam name=\"x\">", &mut Scope::new()).unwrap_err();
        assert_eq!(
            err,
            Error::Render(RenderError::MissingRequiredParam {
                name: "x".into(),
                line: 2,
            })
        );
    }

    #[test]
    fn test_param_required_satisfied_by_scope() {
        let mut scope = Scope::from_iter([("x", 1i64)]);
        assert!(render("<cfparam name=\"x\">", &mut scope).is_ok());
    }

    #[test]
    fn test_param_default_from_variable() {
        let mut scope = Scope::from_iter([("items", Value::from(vec!["a", "b"]))]);
        render("<cfparam name=\"copy\" default=\"#items#\">", &mut scope).unwrap();
        assert_eq!(scope.get("copy"), scope.get("items"));
    }

    #[test]
    fn test_param_type_validation() {
        let mut scope = Scope::new();
        assert!(render("<cfparam name=\"n\" default=\"42\" type=\"numeric\">", &mut scope).is_ok());
        assert!(render("<cfparam name=\"b\" default=\"yes\" type=\"boolean\">", &mut scope).is_ok());
        assert!(render("<cfparam name=\"s\" default=\"hi\" type=\"string\">", &mut scope).is_ok());

        let err = render("<cfparam name=\"s\" type=\"numeric\">", &mut scope).unwrap_err();
        assert_eq!(
            err,
            Error::Render(RenderError::InvalidParamType {
                name: "s".into(),
                expected: "numeric".into(),
                line: 1,
            })
        );
    }

    #[test]
    fn test_param_unknown_type() {
        let err = render("<cfparam name=\"s\" default=\"1\" type=\"date\">", &mut Scope::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::InvalidAttribute { .. })));
    }

    // =========================================================================
    // set
    // =========================================================================

    #[test]
    fn test_set_pairs() {
        let mut scope = Scope::new();
        render("<cfset a=\"1\" b = \"two\">", &mut scope).unwrap();
        assert_eq!(scope.get("a"), Some(&Value::from("1")));
        assert_eq!(scope.get("b"), Some(&Value::from("two")));
    }

    #[test]
    fn test_set_name_value_form() {
        let mut scope = Scope::from_iter([("who", "world")]);
        render("<cfset name=\"greeting\" value=\"hello #who#\">", &mut scope).unwrap();
        assert_eq!(scope.get("greeting"), Some(&Value::from("hello world")));
        assert!(!scope.contains("name"));
    }

    #[test]
    fn test_set_name_value_rejects_extra_attributes() {
        let mut scope = Scope::new();
        let err = render("<cfset name=\"x\" value=\"1\" other=\"2\">", &mut scope).unwrap_err();
        assert_eq!(
            err,
            Error::Render(RenderError::InvalidAttribute {
                tag: "cfset".into(),
                attribute: "other".into(),
                value: "2".into(),
                reason: "cannot be combined with name and value".into(),
                line: 1,
            })
        );
        assert!(scope.is_empty());
    }

    #[test]
    fn test_set_name_alone_is_a_pair() {
        let mut scope = Scope::new();
        render("<cfset name=\"x\">", &mut scope).unwrap();
        assert_eq!(scope.get("name"), Some(&Value::from("x")));
    }

    #[test]
    fn test_bare_param_claims_html_param() {
        // Bare spellings win over same-named HTML elements.
        let err = render(
            "<object><param name=\"autoplay\" value=\"true\"></object>",
            &mut Scope::new(),
        )
        .unwrap_err();
        assert_eq!(
            err,
            Error::Render(RenderError::MissingRequiredParam {
                name: "autoplay".into(),
                line: 1,
            })
        );

        let mut scope = Scope::new();
        let out = render(
            "<object><param name=\"autoplay\" default=\"true\"></object>",
            &mut scope,
        )
        .unwrap();
        assert_eq!(out, "<object></object>");
        assert_eq!(scope.get("autoplay"), Some(&Value::from("true")));
    }

    #[test]
    fn test_set_overwrites_and_keeps_lists() {
        let mut scope = Scope::from_iter([("x", Value::from("old")), ("l", Value::from(vec![1i64, 2]))]);
        render("<cfset x=\"#l#\">", &mut scope).unwrap();
        assert_eq!(scope.get("x"), Some(&Value::from(vec![1i64, 2])));
    }

    #[test]
    fn test_set_is_visible_after_loop() {
        let mut scope = Scope::new();
        let out = render(
            "<cfloop from=1 to=2 index=i><cfset last=\"#i#\"></cfloop><cfoutput>#last#</cfoutput>",
            &mut scope,
        )
        .unwrap();
        assert_eq!(out, "2");
    }

    #[test]
    fn test_set_without_attributes() {
        let err = render("<cfset>", &mut Scope::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::MissingAttribute { .. })));
    }

    // =========================================================================
    // savecontent
    // =========================================================================

    #[test]
    fn test_savecontent_captures() {
        let mut scope = Scope::from_iter([("who", "world")]);
        let out = render(
            "a<cfsavecontent variable=\"c\"><cfoutput>hi #who#</cfoutput></cfsavecontent>b",
            &mut scope,
        )
        .unwrap();
        assert_eq!(out, "ab");
        assert_eq!(scope.get("c"), Some(&Value::from("hi world")));
    }

    #[test]
    fn test_savecontent_then_output() {
        let mut scope = Scope::new();
        let out = render(
            "<cfsavecontent variable=\"c\">x</cfsavecontent><cfoutput>[#c#]</cfoutput>",
            &mut scope,
        )
        .unwrap();
        assert_eq!(out, "[x]");
    }

    #[test]
    fn test_savecontent_discarded_on_abort() {
        let mut scope = Scope::new();
        let out = render(
            "a<cfsavecontent variable=\"c\">x<cfabort></cfsavecontent>b",
            &mut scope,
        )
        .unwrap();
        assert_eq!(out, "a");
        assert!(!scope.contains("c"));
    }

    #[test]
    fn test_savecontent_requires_variable() {
        let err = render("<cfsavecontent>x</cfsavecontent>", &mut Scope::new()).unwrap_err();
        assert!(matches!(err, Error::Render(RenderError::MissingAttribute { .. })));
    }
}
