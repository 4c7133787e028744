//! The variable scope threaded through one render.
//!
//! There is exactly one scope per render call, shared by every tag: a
//! `set` inside a loop body is visible after the loop, and a `param` in an
//! included template is visible to the includer.

use crate::value::Value;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Case-insensitive, insertion-ordered variable bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "IndexMap<String, Value>", into = "IndexMap<String, Value>")]
pub struct Scope {
    vars: IndexMap<String, Value>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(&name.to_ascii_lowercase())
    }

    /// Bind `name`, returning the previous value.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Option<Value> {
        self.vars.insert(name.to_ascii_lowercase(), value.into())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.vars.shift_remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Bindings in insertion order; names are lowercased.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Expand an attribute value against the scope.
    ///
    /// A value that is exactly one `#name#` reference yields the bound value
    /// itself, so lists pass through `set` and `loop` intact. Anything else
    /// is treated as text with `#name#` references substituted.
    pub fn expand(&self, text: &str) -> Value {
        if let Some(name) = sole_reference(text) {
            return self.get(name).cloned().unwrap_or(Value::String(String::new()));
        }
        Value::String(self.expand_str(text))
    }

    /// Substitute `#name#` references in `text`. `##` is a literal `#`, an
    /// unmatched `#` is kept, and unbound names expand to nothing.
    pub fn expand_str(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find('#') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('#') {
                Some(0) => {
                    out.push('#');
                    rest = &after[1..];
                }
                Some(close) => {
                    if let Some(value) = self.get(after[..close].trim()) {
                        out.push_str(&value.to_string());
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('#');
                    rest = after;
                }
            }
        }

        out.push_str(rest);
        out
    }
}

/// `name` when `text` is exactly `#name#`.
fn sole_reference(text: &str) -> Option<&str> {
    let inner = text.strip_prefix('#')?.strip_suffix('#')?;
    if inner.is_empty() || inner.contains('#') {
        return None;
    }
    Some(inner.trim())
}

impl From<IndexMap<String, Value>> for Scope {
    fn from(map: IndexMap<String, Value>) -> Self {
        map.into_iter().collect()
    }
}

impl From<Scope> for IndexMap<String, Value> {
    fn from(scope: Scope) -> Self {
        scope.vars
    }
}

impl<K: AsRef<str>, V: Into<Value>> FromIterator<(K, V)> for Scope {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut scope = Scope::new();
        for (k, v) in iter {
            scope.set(k.as_ref(), v);
        }
        scope
    }
}
