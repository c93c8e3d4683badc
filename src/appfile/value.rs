//! Setting values
//!
//! A value is either a literal string or a deferred computation. Deferred
//! values are evaluated once, after every scope has been merged, so they can
//! read other settings' final values or the environment at query time.

use std::fmt;
use std::sync::{Arc, OnceLock};

use regex_lite::Regex;

use crate::error::{ResolveError, TemplateError};
use crate::resolve::Lookup;

/// Signature of a caller-supplied deferred computation
pub type DeferredFn = dyn Fn(&mut Lookup<'_>) -> Result<String, ResolveError> + Send + Sync;

/// A setting value as declared in a scope
#[derive(Debug, Clone)]
pub enum Value {
    /// Plain string
    Literal(String),
    /// Computed at resolution time
    Deferred(Deferred),
}

/// A value computed lazily at resolution time
#[derive(Clone)]
pub enum Deferred {
    /// Read an environment variable, falling back to `default`
    Env {
        name: String,
        default: Option<String>,
    },

    /// Interpolate `${setting}` and `${env:NAME}` placeholders
    Template(Template),

    /// Caller-supplied closure
    Func(Arc<DeferredFn>),
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deferred::Env { name, default } => f
                .debug_struct("Env")
                .field("name", name)
                .field("default", default)
                .finish(),
            Deferred::Template(template) => f.debug_tuple("Template").field(&template.source).finish(),
            Deferred::Func(_) => f.write_str("Func(..)"),
        }
    }
}

impl Value {
    pub fn literal(value: impl Into<String>) -> Self {
        Value::Literal(value.into())
    }

    /// Environment variable that must be set at resolution time
    pub fn env(name: impl Into<String>) -> Self {
        Value::Deferred(Deferred::Env {
            name: name.into(),
            default: None,
        })
    }

    /// Environment variable with a fallback
    pub fn env_or(name: impl Into<String>, default: impl Into<String>) -> Self {
        Value::Deferred(Deferred::Env {
            name: name.into(),
            default: Some(default.into()),
        })
    }

    pub fn template(source: &str) -> Result<Self, TemplateError> {
        Ok(Value::Deferred(Deferred::Template(Template::parse(source)?)))
    }

    /// Wrap a closure; it receives a [`Lookup`] for reading other settings.
    pub fn func<F>(f: F) -> Self
    where
        F: Fn(&mut Lookup<'_>) -> Result<String, ResolveError> + Send + Sync + 'static,
    {
        Value::Deferred(Deferred::Func(Arc::new(f)))
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, Value::Deferred(_))
    }

    /// The literal string, if this value is not deferred
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Value::Literal(s) => Some(s),
            Value::Deferred(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Literal(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Literal(value)
    }
}

impl From<Deferred> for Value {
    fn from(value: Deferred) -> Self {
        Value::Deferred(value)
    }
}

/// One piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Setting(String),
    Env(String),
}

/// A string with `${setting}` / `${env:NAME}` placeholders, parsed up front
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*)\}").expect("placeholder pattern is valid"))
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in placeholder_re().captures_iter(source) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            push_text(&mut segments, source, last, whole.start())?;

            let name = inner.as_str().trim();
            if name.is_empty() {
                return Err(TemplateError::Empty(whole.start()));
            }
            let segment = match name.strip_prefix("env:") {
                Some(var) if is_identifier(var) => Segment::Env(var.to_string()),
                None if is_identifier(name) => Segment::Setting(name.to_string()),
                _ => return Err(TemplateError::InvalidName(name.to_string())),
            };
            segments.push(segment);
            last = whole.end();
        }
        push_text(&mut segments, source, last, source.len())?;

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the settings this template reads
    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Setting(name) => Some(name.as_str()),
            _ => None,
        })
    }

    pub(crate) fn render(&self, lookup: &mut Lookup<'_>) -> Result<String, ResolveError> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Setting(name) => out.push_str(&lookup.get(name)?),
                Segment::Env(var) => out.push_str(&lookup.env(var)?),
            }
        }
        Ok(out)
    }
}

// Text between placeholders must not contain a dangling `${`.
fn push_text(
    segments: &mut Vec<Segment>,
    source: &str,
    start: usize,
    end: usize,
) -> Result<(), TemplateError> {
    let text = &source[start..end];
    if let Some(offset) = text.find("${") {
        return Err(TemplateError::Unterminated(start + offset));
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text.to_string()));
    }
    Ok(())
}
