//! The closed set of values a function can consume or produce.
//!
//! Every value wraps exactly one underlying datum. A value's kind never
//! changes after construction; *adaptation* produces a new value of a
//! different kind, and *destructuring* splits an iterable-capable value into
//! a fixed number of components. Input-capable values evaluate to themselves,
//! which lets literals and nested call results compose uniformly in argument
//! position; output-capable values convert to tree nodes in [`output`].

pub mod expression;
pub mod factory;
pub mod output;

use crate::ast::{self, MarkdownContent, Node};
use crate::error::{Result, Span, VellumError};
use crate::function::lambda::Lambda;
use std::collections::BTreeMap;
use std::fmt;
use vellum_types::ScopeId;

/// A number, normalized to an integer representation when the value is
/// integral.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Builds a number, collapsing integral floats to integers.
    pub fn from_f64(value: f64) -> Self {
        if value.fract() == 0.0 && value.is_finite() && value.abs() < i64::MAX as f64 {
            Number::Int(value as i64)
        } else {
            Number::Float(value)
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(*i),
            Number::Float(_) => None,
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// A numeric range `start..end`, either end possibly open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl Range {
    pub fn new(start: Option<i64>, end: Option<i64>) -> Self {
        Self { start, end }
    }

    pub fn closed(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is_right_open(&self) -> bool {
        self.end.is_none()
    }

    /// Materializes the range as an ordered collection of numbers.
    ///
    /// An open left end starts at 1. An open right end cannot be iterated.
    pub fn to_collection(&self) -> Result<Vec<Value>> {
        let end = self.end.ok_or_else(|| VellumError::IllegalRawValue {
            raw: self.to_string(),
            message: "cannot iterate a right-open range".to_string(),
        })?;
        let start = self.start.unwrap_or(1);
        Ok((start..=end)
            .map(|n| Value::Number(Number::Int(n)))
            .collect())
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(start) = self.start {
            write!(f, "{}", start)?;
        }
        write!(f, "..")?;
        if let Some(end) = self.end {
            write!(f, "{}", end)?;
        }
        Ok(())
    }
}

/// A two-element value, itself iterable and destructurable.
#[derive(Debug, Clone, PartialEq)]
pub struct Pair {
    pub first: Value,
    pub second: Value,
}

/// What a dynamic value holds: raw unparsed call-site text, or an opaque
/// already-produced result.
#[derive(Debug, Clone, PartialEq)]
pub enum DynamicContent {
    Raw(String),
    Value(Box<Value>),
}

/// An untyped placeholder whose concrete type is determined at its point of
/// use. Carries the scope it was produced in, so references inside it resolve
/// where the value was authored, not where it is consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicValue {
    pub content: DynamicContent,
    pub scope: Option<ScopeId>,
}

impl DynamicValue {
    pub fn raw(text: impl Into<String>, scope: Option<ScopeId>) -> Self {
        Self {
            content: DynamicContent::Raw(text.into()),
            scope,
        }
    }

    pub fn wrapped(value: Value, scope: Option<ScopeId>) -> Self {
        Self {
            content: DynamicContent::Value(Box::new(value)),
            scope,
        }
    }

    /// The string rendition of the held content.
    pub fn display(&self) -> String {
        match &self.content {
            DynamicContent::Raw(s) => s.clone(),
            DynamicContent::Value(v) => v.to_display_string(),
        }
    }
}

/// A typed, immutable value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Void,
    String(String),
    Number(Number),
    Boolean(bool),
    /// A named enum constant, stored lowercase.
    Enum(String),
    Range(Range),
    /// List semantics: order preserved, duplicates allowed.
    Ordered(Vec<Value>),
    /// Set semantics: duplicates collapsed, order insignificant.
    Unordered(Vec<Value>),
    /// General fallback for heterogeneous iterable output.
    Collection(Vec<Value>),
    Pair(Box<Pair>),
    /// String-keyed mutable mapping; insertion order is irrelevant.
    Dictionary(BTreeMap<String, Value>),
    Lambda(Lambda),
    Node(Box<Node>),
    Markdown(MarkdownContent),
    Dynamic(DynamicValue),
}

/// Kind tag of a [`Value`], used in diagnostics and type checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    None,
    Void,
    String,
    Number,
    Boolean,
    Enum,
    Range,
    Ordered,
    Unordered,
    Collection,
    Pair,
    Dictionary,
    Lambda,
    Node,
    Markdown,
    Dynamic,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::None => "none",
            ValueKind::Void => "void",
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Enum => "enum",
            ValueKind::Range => "range",
            ValueKind::Ordered => "ordered collection",
            ValueKind::Unordered => "unordered collection",
            ValueKind::Collection => "collection",
            ValueKind::Pair => "pair",
            ValueKind::Dictionary => "dictionary",
            ValueKind::Lambda => "lambda",
            ValueKind::Node => "node",
            ValueKind::Markdown => "markdown content",
            ValueKind::Dynamic => "dynamic",
        };
        write!(f, "{}", name)
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::None => ValueKind::None,
            Value::Void => ValueKind::Void,
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Enum(_) => ValueKind::Enum,
            Value::Range(_) => ValueKind::Range,
            Value::Ordered(_) => ValueKind::Ordered,
            Value::Unordered(_) => ValueKind::Unordered,
            Value::Collection(_) => ValueKind::Collection,
            Value::Pair(_) => ValueKind::Pair,
            Value::Dictionary(_) => ValueKind::Dictionary,
            Value::Lambda(_) => ValueKind::Lambda,
            Value::Node(_) => ValueKind::Node,
            Value::Markdown(_) => ValueKind::Markdown,
            Value::Dynamic(_) => ValueKind::Dynamic,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Builds an unordered collection, collapsing duplicates.
    pub fn unordered(elements: Vec<Value>) -> Value {
        let mut unique: Vec<Value> = Vec::new();
        for element in elements {
            if !unique.contains(&element) {
                unique.push(element);
            }
        }
        Value::Unordered(unique)
    }

    pub fn pair(first: Value, second: Value) -> Value {
        Value::Pair(Box::new(Pair { first, second }))
    }

    /// The string rendition of the wrapped datum.
    pub fn to_display_string(&self) -> String {
        match self {
            Value::None => "none".to_string(),
            Value::Void => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Enum(name) => name.clone(),
            Value::Range(r) => r.to_string(),
            Value::Ordered(items) | Value::Unordered(items) | Value::Collection(items) => {
                let parts: Vec<String> = items.iter().map(Value::to_display_string).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Pair(pair) => format!(
                "({}, {})",
                pair.first.to_display_string(),
                pair.second.to_display_string()
            ),
            Value::Dictionary(entries) => {
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.to_display_string()))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Lambda(_) => "<lambda>".to_string(),
            Value::Node(node) => ast::to_plain_text(std::slice::from_ref(node.as_ref())),
            Value::Markdown(content) => ast::to_plain_text(&content.children),
            Value::Dynamic(dynamic) => dynamic.display(),
        }
    }

    /// Peels dynamic wrappers off an already-produced result.
    pub fn unwrap_dynamic(&self) -> &Value {
        match self {
            Value::Dynamic(DynamicValue {
                content: DynamicContent::Value(inner),
                ..
            }) => inner.unwrap_dynamic(),
            _ => self,
        }
    }

    /// Attempts to reinterpret this value as a different, compatible kind.
    ///
    /// A dictionary adapts to a general collection of `(key, value)` pairs.
    /// Returns `None` when the value declares no adaptation.
    pub fn adapt(&self) -> Option<Value> {
        match self {
            Value::Dictionary(entries) => Some(Value::Collection(
                entries
                    .iter()
                    .map(|(k, v)| Value::pair(Value::String(k.clone()), v.clone()))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// The elements of an iterable-capable value, in iteration order.
    pub fn iter_elements(&self) -> Option<Vec<Value>> {
        match self {
            Value::Ordered(items) | Value::Unordered(items) | Value::Collection(items) => {
                Some(items.clone())
            }
            Value::Pair(pair) => Some(vec![pair.first.clone(), pair.second.clone()]),
            Value::Range(range) => range.to_collection().ok(),
            Value::Dictionary(_) => self.adapt().and_then(|v| v.iter_elements()),
            _ => None,
        }
    }

    /// Splits an iterable-capable value into exactly `count` components.
    pub fn destructure(&self, count: usize) -> Result<Vec<Value>> {
        let components = self.iter_elements().ok_or_else(|| VellumError::Runtime {
            span: Span::default(),
            name: "destructure".to_string(),
            message: format!("a {} value cannot be destructured", self.kind()),
        })?;
        if components.len() < count {
            return Err(VellumError::Runtime {
                span: Span::default(),
                name: "destructure".to_string(),
                message: format!(
                    "cannot destructure {} components out of {}",
                    count,
                    components.len()
                ),
            });
        }
        Ok(components.into_iter().take(count).collect())
    }
}
