//! Attribute parser for opening-tag text.
//!
//! Turns `name="value" other='x' flag` into an ordered, case-insensitive
//! map. Quoted values escape their own quote by doubling it (`"say ""hi"""`).

use indexmap::IndexMap;

/// An unterminated quoted value in a tag's attribute text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct AttributeError {
    pub message: String,
    /// Character offset of the opening quote within the attribute text.
    pub offset: usize,
}

/// Attributes of a tag, keyed by lowercased name, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeMap {
    entries: IndexMap<String, String>,
}

impl AttributeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value. A repeated name keeps its first position and takes the
    /// new value.
    pub fn insert(&mut self, name: &str, value: impl Into<String>) -> Option<String> {
        self.entries.insert(name.to_ascii_lowercase(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AttributeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttributeMap::new();
        for (k, v) in iter {
            map.insert(k.as_ref(), v);
        }
        map
    }
}

/// Parse the attribute text of an opening tag (everything after the name).
///
/// Characters that cannot start an attribute are skipped, so raw expressions
/// such as `x gt 1` parse into flags rather than failing. Stray quoted
/// strings are consumed whole and must still be terminated.
pub fn parse_attributes(text: &str) -> Result<AttributeMap, AttributeError> {
    let chars: Vec<char> = text.chars().collect();
    let mut map = AttributeMap::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            let (_, next) = read_quoted(&chars, i)?;
            i = next;
            continue;
        }
        if !c.is_ascii_alphabetic() {
            i += 1;
            continue;
        }

        let start = i;
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        let name: String = chars[start..i].iter().collect();

        let mut j = skip_whitespace(&chars, i);
        if chars.get(j) != Some(&'=') {
            map.insert(&name, "");
            continue;
        }
        j = skip_whitespace(&chars, j + 1);

        let value = match chars.get(j) {
            Some('"') | Some('\'') => {
                let (value, next) = read_quoted(&chars, j)?;
                i = next;
                value
            }
            _ => {
                let start = j;
                while j < chars.len() && !chars[j].is_whitespace() {
                    j += 1;
                }
                i = j;
                chars[start..j].iter().collect()
            }
        };
        map.insert(&name, value);
    }

    Ok(map)
}

/// Read a quoted value starting at the quote at `start`. Returns the value
/// and the offset just past the closing quote.
fn read_quoted(chars: &[char], start: usize) -> Result<(String, usize), AttributeError> {
    let quote = chars[start];
    let mut value = String::new();
    let mut i = start + 1;

    loop {
        match chars.get(i) {
            None => {
                return Err(AttributeError {
                    message: format!("Unterminated {quote} quote"),
                    offset: start,
                })
            }
            Some(&c) if c == quote => {
                if chars.get(i + 1) == Some(&quote) {
                    value.push(quote);
                    i += 2;
                } else {
                    return Ok((value, i + 1));
                }
            }
            Some(&c) => {
                value.push(c);
                i += 1;
            }
        }
    }
}

fn skip_whitespace(chars: &[char], mut i: usize) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    i
}
