//! `{{variable}}` templating for URLs, headers, params and bodies.
//!
//! Variables resolve through an ordered list of [`VariableSource`]s; the first source that
//! knows a name wins. Unknown names are left in place verbatim so that a later layer (or the
//! user, looking at the sent request) can see what was not substituted.

mod path;

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

pub use path::lookup_path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Var(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    /// The variable name when the template is exactly one placeholder and nothing else.
    pub fn single_var(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [Segment::Var(name)] => Some(name),
            _ => None,
        }
    }
}

pub fn parse_template(input: &str) -> Result<Template, TemplateError> {
    let mut segments = Vec::new();
    let mut rest = input;

    while let Some(start) = rest.find("{{") {
        let (literal, after_open) = rest.split_at(start);
        let after_open = &after_open[2..];
        let Some(end) = after_open.find("}}") else {
            return Err(TemplateError::Unclosed {
                offset: input.len() - rest.len() + start,
            });
        };
        let name = after_open[..end].trim();
        if name.is_empty() {
            return Err(TemplateError::EmptyName);
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal.to_string()));
        }
        segments.push(Segment::Var(name.to_string()));
        rest = &after_open[end + 2..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest.to_string()));
    }
    Ok(Template { segments })
}

pub trait VariableSource: Send + Sync {
    fn lookup(&self, name: &str) -> Option<JsonValue>;
}

impl VariableSource for BTreeMap<String, String> {
    fn lookup(&self, name: &str) -> Option<JsonValue> {
        self.get(name).cloned().map(JsonValue::String)
    }
}

/// Ordered variable lookup, highest priority first.
#[derive(Default)]
pub struct VariableScope<'a> {
    sources: Vec<&'a dyn VariableSource>,
}

impl<'a> VariableScope<'a> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    /// Append a source with lower priority than every source already added.
    pub fn with(mut self, source: &'a dyn VariableSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<JsonValue> {
        self.sources.iter().find_map(|s| s.lookup(name))
    }

    pub fn render(&self, input: &str) -> Result<String, TemplateError> {
        if !input.contains("{{") {
            return Ok(input.to_string());
        }
        let template = parse_template(input)?;
        let mut out = String::with_capacity(input.len());
        for seg in &template.segments {
            match seg {
                Segment::Literal(s) => out.push_str(s),
                Segment::Var(name) => match self.lookup(name) {
                    Some(v) => out.push_str(&value_to_string(&v)),
                    None => {
                        out.push_str("{{");
                        out.push_str(name);
                        out.push_str("}}");
                    }
                },
            }
        }
        Ok(out)
    }

    /// Render every string inside a JSON value.
    ///
    /// A string that is exactly one placeholder is replaced by the variable's JSON value, so
    /// `"{{login.response.body.id}}"` can become a number rather than its string form.
    pub fn render_json(&self, value: &JsonValue) -> Result<JsonValue, TemplateError> {
        match value {
            JsonValue::String(s) => {
                if !s.contains("{{") {
                    return Ok(value.clone());
                }
                let template = parse_template(s)?;
                if let Some(name) = template.single_var() {
                    if let Some(v) = self.lookup(name) {
                        return Ok(v);
                    }
                }
                Ok(JsonValue::String(self.render(s)?))
            }
            JsonValue::Array(arr) => arr
                .iter()
                .map(|v| self.render_json(v))
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array),
            JsonValue::Object(map) => {
                let mut out = serde_json::Map::with_capacity(map.len());
                for (k, v) in map {
                    out.insert(self.render(k)?, self.render_json(v)?);
                }
                Ok(JsonValue::Object(out))
            }
            other => Ok(other.clone()),
        }
    }
}

pub fn value_to_string(v: &JsonValue) -> String {
    match v {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed placeholder at offset {offset} (missing '}}}}')")]
    Unclosed { offset: usize },
    #[error("empty placeholder '{{{{}}}}'")]
    EmptyName,
}
