use crate::handler::{Flow, TagHandler};
use crate::renderer::Renderer;
use crate::value::Value;
use crate::RenderError;
use xoly_parser::TagNode;

/// `<cfloop>`: repeats its body.
///
/// Forms, checked in order:
/// - `condition="..."` while the condition holds
/// - `from`/`to`/`step` over an inclusive numeric range
/// - `list="..."` over a delimited string (`delimiters`, default `,`) or a list value
/// - `array="#var#"` over a list value
///
/// `index` receives the element, or the 1-based position when `item` is
/// also given. Every form is capped at `RenderOptions::loop_limit`
/// iterations.
pub struct Loop;

impl TagHandler for Loop {
    fn has_body(&self) -> bool {
        true
    }

    fn matches_bare_tag(&self, name: &str) -> bool {
        name == "loop"
    }

    fn on_render_body(
        &self,
        tag: &TagNode,
        r: &mut Renderer<'_>,
        out: &mut String,
    ) -> Result<Flow, RenderError> {
        let limit = r.options().loop_limit;

        if let Some(condition) = tag.attr("condition") {
            let mut iterations = 0usize;
            while r.condition(tag, condition)? {
                iterations += 1;
                if iterations > limit {
                    return Err(limit_exceeded(tag, limit));
                }
                match r.render_nodes(tag.children(), out)? {
                    Flow::Continue => {}
                    Flow::BreakLoop => break,
                    Flow::Abort => return Ok(Flow::Abort),
                }
            }
            tracing::debug!(iterations, line = tag.span.line, "condition loop finished");
            return Ok(Flow::Continue);
        }

        let items = items(tag, r, limit)?;
        let item_var = tag.attr("item");
        let index_var = tag.attr("index");

        for (i, element) in items.into_iter().enumerate() {
            match (item_var, index_var) {
                (Some(item), index) => {
                    r.scope_mut().set(item, element);
                    if let Some(index) = index {
                        r.scope_mut().set(index, Value::from((i + 1) as i64));
                    }
                }
                (None, Some(index)) => {
                    r.scope_mut().set(index, element);
                }
                (None, None) => {}
            }

            match r.render_nodes(tag.children(), out)? {
                Flow::Continue => {}
                Flow::BreakLoop => break,
                Flow::Abort => return Ok(Flow::Abort),
            }
        }

        Ok(Flow::Continue)
    }
}

/// Elements for the non-conditional forms.
fn items(tag: &TagNode, r: &Renderer<'_>, limit: usize) -> Result<Vec<Value>, RenderError> {
    let items = if tag.attributes.contains("from") || tag.attributes.contains("to") {
        let from = number(tag, r, "from")?;
        let to = number(tag, r, "to")?;
        let step = match tag.attributes.contains("step") {
            true => number(tag, r, "step")?,
            false => 1.0,
        };
        if step == 0.0 {
            return Err(invalid(tag, "step", "0", "step must not be zero"));
        }

        let span = ((to - from) / step).floor();
        if span < 0.0 {
            return Ok(Vec::new());
        }
        if span + 1.0 > limit as f64 {
            return Err(limit_exceeded(tag, limit));
        }
        (0..=span as usize)
            .map(|i| Value::Number(from + i as f64 * step))
            .collect()
    } else if let Some(list) = r.attr(tag, "list") {
        match list {
            Value::List(items) => items,
            other => {
                let delimiters = tag.attr("delimiters").unwrap_or(",");
                other
                    .to_string()
                    .split(|c: char| delimiters.contains(c))
                    .filter(|s| !s.is_empty())
                    .map(Value::from)
                    .collect()
            }
        }
    } else if let Some(array) = r.attr(tag, "array") {
        match array {
            Value::List(items) => items,
            other => {
                return Err(invalid(tag, "array", &other.to_string(), "not a list value"));
            }
        }
    } else {
        return Err(RenderError::MissingAttribute {
            tag: tag.name.clone(),
            attribute: "condition, from/to, list or array".into(),
            line: tag.span.line,
        });
    };

    if items.len() > limit {
        return Err(limit_exceeded(tag, limit));
    }
    Ok(items)
}

fn number(tag: &TagNode, r: &Renderer<'_>, name: &str) -> Result<f64, RenderError> {
    let raw = r.require_attr(tag, name)?;
    match raw.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(invalid(tag, name, &raw, "expected a finite number")),
    }
}

fn invalid(tag: &TagNode, attribute: &str, value: &str, reason: &str) -> RenderError {
    RenderError::InvalidAttribute {
        tag: tag.name.clone(),
        attribute: attribute.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
        line: tag.span.line,
    }
}

fn limit_exceeded(tag: &TagNode, limit: usize) -> RenderError {
    RenderError::LoopLimitExceeded {
        limit,
        line: tag.span.line,
    }
}
