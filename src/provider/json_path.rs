//! Path expressions for pulling a value out of a JSON response
//!
//! An expression is a template: `{...}` actions hold JSONPath queries and
//! everything outside an action is literal text. For example `{$.data.value}`
//! selects a single field while `{.items[*].count}` selects every `count` in
//! the `items` array. Each action (and each run of literal text) produces one
//! match-set when the extractor is applied to a document.
//!
//! Dot fields follow the kubectl dialect: a name runs until one of
//! `. , [ ] $ @ { }` or whitespace, and `\.` escapes a dot within a name. So
//! `{.data.error-rate}` and `{.labels.app\.kubernetes\.io/name}` are accepted
//! and rewritten to bracket notation before compiling.

use crate::Result;
use crate::metric::WebMetric;
use core::iter::Peekable;
use core::str::Chars;
use ohno::{app_err, bail};
use serde_json::Value;
use serde_json_path::JsonPath;

/// Expression used when a metric does not specify one; selects the whole document.
pub const DEFAULT_EXPRESSION: &str = "{$}";

#[derive(Debug, Clone)]
enum Segment {
    Text(String),
    Query(JsonPath),
}

/// A compiled, immutable path expression.
#[derive(Debug, Clone)]
pub struct PathExtractor {
    expression: String,
    segments: Vec<Segment>,
}

impl PathExtractor {
    /// Compile `expression`, falling back to [`DEFAULT_EXPRESSION`] when it is empty
    pub fn parse(expression: &str) -> Result<Self> {
        let expression = if expression.is_empty() { DEFAULT_EXPRESSION } else { expression };
        let segments = parse_template(expression).map_err(|e| app_err!("parsing JSONPath '{expression}': {e}"))?;

        Ok(Self {
            expression: expression.to_string(),
            segments,
        })
    }

    /// Compile the path expression of a web metric
    pub fn from_metric(web: &WebMetric) -> Result<Self> {
        Self::parse(web.json_path.as_deref().unwrap_or_default())
    }

    #[must_use]
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Apply the expression to a parsed document.
    ///
    /// Returns one match-set per template segment, in template order. A query
    /// that matches nothing yields an empty match-set.
    #[must_use]
    pub fn find_results(&self, data: &Value) -> Vec<Vec<Value>> {
        self.segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => vec![Value::String(text.clone())],
                Segment::Query(path) => path.query(data).all().into_iter().cloned().collect(),
            })
            .collect()
    }
}

fn parse_template(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '{' {
            text.push(c);
            continue;
        }

        if !text.is_empty() {
            segments.push(Segment::Text(core::mem::take(&mut text)));
        }

        let mut action = String::new();
        let mut quote = None;
        let mut closed = false;
        for c in chars.by_ref() {
            match (quote, c) {
                (None, '}') => {
                    closed = true;
                    break;
                }
                (None, '{') => bail!("unexpected '{{' inside action"),
                (None, '\'' | '"') => quote = Some(c),
                (Some(q), _) if q == c => quote = None,
                _ => {}
            }
            action.push(c);
        }

        if !closed {
            bail!("unclosed action");
        }

        segments.push(compile_action(action.trim())?);
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }

    Ok(segments)
}

fn compile_action(action: &str) -> Result<Segment> {
    if let Some(literal) = quoted_literal(action) {
        return Ok(Segment::Text(literal.to_string()));
    }

    let query = match action.chars().next() {
        None => bail!("empty action"),
        Some('$') => action.to_string(),
        Some('@') => action.replacen('@', "$", 1),
        Some('.' | '[') => format!("${action}"),
        Some(_) => bail!("unsupported action '{action}'"),
    };

    JsonPath::parse(&bracket_fields(&query))
        .map(Segment::Query)
        .map_err(|e| app_err!("invalid query '{action}': {e}"))
}

/// Rewrite dot fields that are not valid JSONPath shorthand into bracket notation.
///
/// Only fields outside brackets are touched; filter expressions are kept as written.
fn bracket_fields(query: &str) -> String {
    let mut out = String::with_capacity(query.len());
    let mut chars = query.chars().peekable();
    let mut depth = 0_usize;
    let mut quote = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == q {
                quote = None;
            }
            continue;
        }

        match c {
            '\'' | '"' => quote = Some(c),
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' if depth == 0 => {
                let descendant = chars.next_if_eq(&'.').is_some();
                let name = field_name(&mut chars);
                if name.is_empty() || name == "*" || is_shorthand(&name) {
                    out.push_str(if descendant { ".." } else { "." });
                    out.push_str(&name);
                } else {
                    if descendant {
                        out.push_str("..");
                    }
                    out.push_str("['");
                    out.push_str(&name.replace('\\', "\\\\").replace('\'', "\\'"));
                    out.push_str("']");
                }
                continue;
            }
            _ => {}
        }

        out.push(c);
    }

    out
}

fn field_name(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        match c {
            '.' | ',' | '[' | ']' | '$' | '@' | '{' | '}' => break,
            c if c.is_whitespace() => break,
            '\\' => {
                let _ = chars.next();
                if let Some(escaped) = chars.next() {
                    name.push(escaped);
                }
            }
            _ => {
                name.push(c);
                let _ = chars.next();
            }
        }
    }
    name
}

/// Whether `name` can follow a dot in RFC 9535 JSONPath
fn is_shorthand(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || !c.is_ascii())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || !c.is_ascii())
}

fn quoted_literal(action: &str) -> Option<&str> {
    ['\'', '"']
        .into_iter()
        .find_map(|q| action.strip_prefix(q).and_then(|rest| rest.strip_suffix(q)))
}
