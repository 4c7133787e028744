//! Runtime values bound in a render scope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value bound to a variable.
///
/// Templates mostly deal in strings; numbers, booleans and lists exist so
/// that a host can pass structured data in and `loop` can iterate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
}

impl Value {
    /// Truthiness as conditions see it.
    ///
    /// `"yes"`/`"true"` and non-zero numbers (or numeric strings) are true;
    /// `"no"`/`"false"`, zero and the empty string are false. Any other
    /// non-empty string is true.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::List(items) => !items.is_empty(),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "" | "false" | "no" => false,
                "true" | "yes" => true,
                other => other.parse::<f64>().map(|n| n != 0.0).unwrap_or(true),
            },
        }
    }

    /// Numeric reading of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Readable structural form used by `dump`.
    pub fn describe(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::String(s) => format!("\"{s}\""),
            Value::List(items) => {
                let inner: Vec<String> = items.iter().map(Value::describe).collect();
                format!("[{}]", inner.join(", "))
            }
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

/// Integral numbers print without a fraction.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(3.0).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(-4i64).to_string(), "-4");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from(vec!["a", "b"]).to_string(), "a,b");
    }

    #[test]
    fn test_truthiness() {
        assert!(Value::from("yes").is_truthy());
        assert!(Value::from("TRUE").is_truthy());
        assert!(Value::from("anything").is_truthy());
        assert!(Value::from("2").is_truthy());
        assert!(!Value::from("no").is_truthy());
        assert!(!Value::from("0").is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Null.is_truthy());
        assert!(!Value::List(vec![]).is_truthy());
        assert!(Value::from(0.5).is_truthy());
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::from(" 42 ").as_number(), Some(42.0));
        assert_eq!(Value::from("x").as_number(), None);
        assert_eq!(Value::from(true).as_number(), None);
    }

    #[test]
    fn test_describe() {
        let v = Value::from(vec![Value::from("a"), Value::from(1i64), Value::Null]);
        assert_eq!(v.describe(), "[\"a\", 1, null]");
    }

    #[test]
    fn test_json_shapes() {
        let v: Value = serde_json::from_str("[1, \"two\", true, null]").unwrap();
        assert_eq!(
            v,
            Value::List(vec![
                Value::Number(1.0),
                Value::String("two".into()),
                Value::Bool(true),
                Value::Null,
            ])
        );
        assert_eq!(serde_json::to_string(&Value::from("x")).unwrap(), "\"x\"");
    }
}
