//! Error code to display-message lookup.

use std::collections::HashMap;

use serde_json::Value;

/// Failure to resolve an error code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    #[error("no text resource registered for '{code}'")]
    NotFound { code: String },
}

/// Resolves an error code to a display template such as `"Product {0} already exists"`.
pub trait ResourceProvider: Send + Sync {
    /// # Errors
    /// Returns `ResourceError::NotFound` when the code is unknown.
    fn resolve(&self, code: &str) -> Result<String, ResourceError>;
}

/// Map-backed provider, loaded from JSON and extended with overrides.
#[derive(Debug, Clone, Default)]
pub struct StaticResourceProvider {
    entries: HashMap<String, String>,
}

impl StaticResourceProvider {
    #[must_use]
    pub fn new(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Parse a flat JSON object of `code -> template`.
    ///
    /// # Errors
    /// Returns an error if `json` is not an object of strings.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).map(Self::new)
    }

    /// Add or replace entries; later values win.
    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.entries
            .extend(overrides.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ResourceProvider for StaticResourceProvider {
    fn resolve(&self, code: &str) -> Result<String, ResourceError> {
        self.entries
            .get(code)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound {
                code: code.to_owned(),
            })
    }
}

/// Positional substitution of `{0}`, `{1}`, ... in `template`.
///
/// `{{` and `}}` produce literal braces. A placeholder without a matching
/// parameter, or one that isn't a plain index, is kept verbatim.
#[must_use]
pub fn format_template(template: &str, params: &[Value]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();

    while let Some((start, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let rest = &template[start + 1..];
                let Some(end) = rest.find('}') else {
                    out.push_str(&template[start..]);
                    break;
                };
                let token = &rest[..end];
                match token.parse::<usize>().ok().and_then(|i| params.get(i)) {
                    Some(value) => push_value(&mut out, value),
                    None => out.push_str(&template[start..=start + 1 + end]),
                }
                // Skip the token and the closing brace.
                for _ in 0..=token.chars().count() {
                    chars.next();
                }
            }
            other => out.push(other),
        }
    }

    out
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Null => {}
        other => out.push_str(&other.to_string()),
    }
}
