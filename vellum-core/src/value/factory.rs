//! Type-directed construction of values from raw text.
//!
//! This is the conversion table used by the argument binder and by the
//! built-in functions: numeral text becomes a number, `x..y` becomes a range,
//! a markdown list becomes a collection or a dictionary, `a b: body` becomes
//! a lambda, and anything else round-trips through expression evaluation or
//! re-entrant markdown parsing.

use crate::ast::{MarkdownContent, Node};
use crate::context::Context;
use crate::error::{Result, VellumError};
use crate::expand::CallExpander;
use crate::function::call::{CallArgument, CallSite};
use crate::function::lambda::{Lambda, LambdaParameter};
use crate::parser;
use crate::value::expression::{self, Expression};
use crate::value::{DynamicValue, Number, Range, Value};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use vellum_types::{ContentKind, ScopeId, Span};

/// Prefix that forces a raw argument to be parsed as a lambda.
pub const FORCE_LAMBDA_PREFIX: &str = "@lambda ";

/// Suffix that marks a lambda parameter as optional.
const OPTIONAL_PARAMETER_SUFFIX: char = '?';

static RANGE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)?\.\.(\d+)?$").unwrap());
static LAMBDA_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*((?:\w+\??[ \t]*)+):").unwrap());

pub fn string(raw: impl Into<String>) -> Value {
    Value::String(raw.into())
}

/// Parses numeral text, preferring the integer representation.
pub fn number(raw: &str) -> Result<Value> {
    let trimmed = raw.trim();
    if let Ok(int) = trimmed.parse::<i64>() {
        return Ok(Value::Number(Number::Int(int)));
    }
    trimmed
        .parse::<f64>()
        .map(|float| Value::Number(Number::from_f64(float)))
        .map_err(|_| VellumError::IllegalRawValue {
            raw: raw.to_string(),
            message: "not a numeric value".to_string(),
        })
}

/// `true`/`yes` and `false`/`no`, case-insensitive.
pub fn boolean(raw: &str) -> Result<Value> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" => Ok(Value::Boolean(true)),
        "false" | "no" => Ok(Value::Boolean(false)),
        _ => Err(VellumError::IllegalRawValue {
            raw: raw.to_string(),
            message: "not a valid boolean value".to_string(),
        }),
    }
}

/// Matches an enum constant by name, ignoring case and underscores.
pub fn enum_constant(raw: &str, choices: &[String]) -> Result<Value> {
    let normalized = raw.trim().to_lowercase().replace('_', "");
    choices
        .iter()
        .find(|choice| choice.to_lowercase().replace('_', "") == normalized)
        .map(|choice| Value::Enum(choice.clone()))
        .ok_or_else(|| VellumError::IllegalRawValue {
            raw: raw.to_string(),
            message: format!("no such constant (expected one of: {})", choices.join(", ")),
        })
}

/// `x..y`, either end optionally open.
pub fn range(raw: &str) -> Result<Range> {
    let captures =
        RANGE_REGEX
            .captures(raw.trim())
            .ok_or_else(|| VellumError::IllegalRawValue {
                raw: raw.to_string(),
                message: "invalid range".to_string(),
            })?;
    let bound = |index: usize| {
        captures
            .get(index)
            .map(|m| m.as_str().parse::<i64>().ok())
            .flatten()
    };
    Ok(Range::new(bound(1), bound(2)))
}

/// Parses a lambda from `a b?: body` syntax; a missing header means no
/// explicit parameters.
pub fn lambda(raw: &str, scope: ScopeId) -> Lambda {
    let raw = raw.strip_prefix(FORCE_LAMBDA_PREFIX).unwrap_or(raw);

    match LAMBDA_HEADER.captures(raw) {
        Some(captures) => {
            let header = captures.get(1).unwrap();
            let parameters = header
                .as_str()
                .split_whitespace()
                .map(|name| match name.strip_suffix(OPTIONAL_PARAMETER_SUFFIX) {
                    Some(name) => LambdaParameter::optional(name),
                    None => LambdaParameter::new(name),
                })
                .collect();
            // The body is what follows the delimiter.
            let body = raw[captures.get(0).unwrap().end()..].trim_start();
            Lambda::new(scope, parameters, body)
        }
        None => Lambda::new(scope, Vec::new(), raw),
    }
}

/// Parses raw text as markdown content, optionally expanding the call sites
/// it registers. With expansion disabled, registered calls are allocated but
/// never enqueued.
pub fn markdown(
    raw: &str,
    ctx: &mut Context,
    scope: ScopeId,
    kind: ContentKind,
    expand: bool,
) -> Result<MarkdownContent> {
    let parse = |ctx: &mut Context| match kind {
        ContentKind::Block => parser::parse_source(raw, ctx, scope),
        ContentKind::Inline => parser::parse_inlines(raw, ctx, scope),
    };

    let children = if expand {
        let children = parse(ctx)?;
        CallExpander::new(ctx).expand_scope(scope)?;
        children
    } else {
        ctx.lock_enqueuing(parse)?
    };

    Ok(MarkdownContent { children, kind })
}

/// Extracts an ordered collection from markdown content whose single
/// significant child is a list. Item text stays dynamic, so elements adapt
/// to any type at the point of use.
pub fn markdown_to_iterable(ctx: &Context, content: &MarkdownContent) -> Option<Value> {
    let list = single_list(&content.children)?;
    let items = match list {
        Node::UnorderedList { items } | Node::OrderedList { items, .. } => items,
        _ => return None,
    };

    Some(Value::Ordered(
        items
            .iter()
            .map(|item| {
                Value::Dynamic(DynamicValue::raw(
                    ctx.plain_text(&item.children).trim().to_string(),
                    None,
                ))
            })
            .collect(),
    ))
}

/// Extracts a dictionary from markdown content whose single significant
/// child is a list of `key: value` items; a nested list under an item
/// becomes a nested dictionary.
pub fn markdown_to_dictionary(ctx: &mut Context, content: &MarkdownContent) -> Option<Value> {
    let list = single_list(&content.children)?.clone();
    let items = match &list {
        Node::UnorderedList { items } | Node::OrderedList { items, .. } => items.clone(),
        _ => return None,
    };

    let mut entries = BTreeMap::new();
    for item in &items {
        let nested = item.children.iter().find_map(|child| match child {
            Node::UnorderedList { .. } | Node::OrderedList { .. } => Some(child.clone()),
            _ => None,
        });
        let text = ctx.plain_text(
            &item
                .children
                .iter()
                .filter(|c| !matches!(c, Node::UnorderedList { .. } | Node::OrderedList { .. }))
                .cloned()
                .collect::<Vec<_>>(),
        );
        let text = text.trim();

        match nested {
            Some(list_node) => {
                let key = text.trim_end_matches(':').trim().to_string();
                let nested_content = MarkdownContent::block(vec![list_node]);
                let value = markdown_to_dictionary(ctx, &nested_content)?;
                entries.insert(key, value);
            }
            None => {
                let (key, value) = text.split_once(':')?;
                entries.insert(
                    key.trim().to_string(),
                    Value::Dynamic(DynamicValue::raw(value.trim().to_string(), None)),
                );
            }
        }
    }

    Some(Value::Dictionary(entries))
}

fn single_list(children: &[Node]) -> Option<&Node> {
    let mut lists = children
        .iter()
        .filter(|node| !matches!(node, Node::Blank));
    let first = lists.next()?;
    if lists.next().is_some() {
        return None;
    }
    match first {
        Node::UnorderedList { .. } | Node::OrderedList { .. } => Some(first),
        Node::Group(inner) => single_list(inner),
        _ => None,
    }
}

/// Produces an iterable value from raw text: a range, an already-iterable
/// expression result, an adapted dictionary, or a markdown list.
pub fn iterable(raw: &str, ctx: &mut Context, scope: ScopeId) -> Result<Value> {
    if let Ok(parsed) = range(raw) {
        return Ok(Value::Ordered(parsed.to_collection()?));
    }

    if let Some(expr) = expression(raw, scope)? {
        let value = expression::eval(&expr, ctx)?;
        let value = value.unwrap_dynamic().clone();
        match &value {
            Value::Ordered(_) | Value::Unordered(_) | Value::Collection(_) | Value::Pair(_) => {
                return Ok(value)
            }
            Value::Range(range) => return Ok(Value::Ordered(range.to_collection()?)),
            Value::Dictionary(_) => return Ok(value.adapt().expect("dictionary adapts")),
            Value::Markdown(content) => {
                if let Some(iterable) = markdown_to_iterable(ctx, content) {
                    return Ok(iterable);
                }
            }
            _ => {}
        }
    }

    // A markdown list is a valid iterable.
    let content = markdown(raw, ctx, scope, ContentKind::Block, true)?;
    markdown_to_iterable(ctx, &content).ok_or_else(|| VellumError::IllegalRawValue {
        raw: raw.to_string(),
        message: "not a suitable iterable".to_string(),
    })
}

/// Produces a dictionary value from raw markdown list text.
pub fn dictionary(raw: &str, ctx: &mut Context, scope: ScopeId) -> Result<Value> {
    if let Some(expr) = expression(raw, scope)? {
        let value = expression::eval(&expr, ctx)?;
        if let Value::Dictionary(_) = value.unwrap_dynamic() {
            return Ok(value.unwrap_dynamic().clone());
        }
    }
    let content = markdown(raw, ctx, scope, ContentKind::Block, true)?;
    markdown_to_dictionary(ctx, &content).ok_or_else(|| VellumError::IllegalRawValue {
        raw: raw.to_string(),
        message: "not a dictionary (the content must be a markdown list)".to_string(),
    })
}

/// Tokenizes a raw argument into an expression of literal text and nested
/// calls, or `None` when the content is block markdown and should fall back
/// to re-entrant parsing.
pub fn expression(raw: &str, scope: ScopeId) -> Result<Option<Expression>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Some(Expression::Value(Value::Dynamic(DynamicValue::raw(
            "",
            Some(scope),
        )))));
    }

    if let Some(rest) = raw.strip_prefix(FORCE_LAMBDA_PREFIX) {
        return Ok(Some(Expression::Value(Value::Lambda(lambda(rest, scope)))));
    }

    // A lone block call (possibly with an indented body argument) is a valid
    // single-component expression, e.g. a `.dictionary` literal.
    if trimmed.starts_with('.') {
        if let Some(call) = parser::walk_call(trimmed, true) {
            if trimmed[call.consumed..].trim().is_empty() {
                return Ok(Some(Expression::Call(Box::new(site_from_walked(
                    &call, scope,
                )))));
            }
        }
    }

    if raw.contains('\n') || starts_with_block_marker(trimmed) {
        return Ok(None);
    }

    let mut components: Vec<Expression> = Vec::new();
    let mut literal = String::new();
    let mut pos = 0;

    let flush = |literal: &mut String, components: &mut Vec<Expression>| {
        if !literal.is_empty() {
            components.push(Expression::Value(Value::Dynamic(DynamicValue::raw(
                std::mem::take(literal),
                Some(scope),
            ))));
        }
    };

    while pos < raw.len() {
        let rest = &raw[pos..];
        // A dot only begins a call at the start or after a non-word
        // character, so `2.5` stays a number literal and `2..4` a range.
        let call_position = raw[..pos]
            .chars()
            .last()
            .map(|c| !c.is_alphanumeric() && c != '.')
            .unwrap_or(true);
        if rest.starts_with('.') && call_position {
            if let Some(call) = parser::walk_call(rest, false) {
                flush(&mut literal, &mut components);
                components.push(Expression::Call(Box::new(site_from_walked(&call, scope))));
                pos += call.consumed;
                continue;
            }
        }
        if rest.starts_with('\\') && rest.len() > 1 {
            let mut chars = rest.char_indices().skip(1);
            if let Some((index, c)) = chars.next() {
                literal.push(c);
                pos += index + c.len_utf8();
                continue;
            }
        }
        let c = rest.chars().next().expect("non-empty rest");
        literal.push(c);
        pos += c.len_utf8();
    }
    flush(&mut literal, &mut components);

    Ok(match components.len() {
        0 => None,
        1 => Some(components.into_iter().next().unwrap()),
        _ => Some(Expression::Composed(components)),
    })
}

/// Builds a transient (never-enqueued) call site from a walked call.
fn site_from_walked(call: &parser::WalkedCall, scope: ScopeId) -> CallSite {
    let mut arguments: Vec<CallArgument> = call
        .arguments
        .iter()
        .map(|argument| CallArgument {
            name: argument.name.clone(),
            value: argument.value.clone(),
            body: false,
        })
        .collect();
    if let Some(body) = &call.body {
        arguments.push(CallArgument::body(body.clone()));
    }
    CallSite::new(
        call.name.clone(),
        arguments,
        scope,
        Span::new(0, call.consumed),
        ContentKind::Inline,
    )
}

fn starts_with_block_marker(trimmed: &str) -> bool {
    trimmed.starts_with('#')
        || trimmed.starts_with("```")
        || trimmed.starts_with('>')
        || trimmed.starts_with("- ")
        || trimmed.starts_with("* ")
        || trimmed.starts_with("---")
}

/// Evaluates raw text: as an expression when it tokenizes to one, otherwise
/// as re-entrant block markdown.
pub fn eval(raw: &str, ctx: &mut Context, scope: ScopeId) -> Result<Value> {
    match expression(raw, scope)? {
        Some(expr) => expression::eval(&expr, ctx),
        None => Ok(Value::Markdown(markdown(
            raw,
            ctx,
            scope,
            ContentKind::Block,
            true,
        )?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_parsing() {
        assert_eq!(number("42").unwrap(), Value::Number(Number::Int(42)));
        assert_eq!(number("2.5").unwrap(), Value::Number(Number::Float(2.5)));
        assert_eq!(number("3.0").unwrap(), Value::Number(Number::Int(3)));
        assert!(number("abc").is_err());
    }

    #[test]
    fn test_boolean_parsing() {
        assert_eq!(boolean("yes").unwrap(), Value::Boolean(true));
        assert_eq!(boolean("FALSE").unwrap(), Value::Boolean(false));
        assert!(boolean("maybe").is_err());
    }

    #[test]
    fn test_enum_matching_is_case_insensitive() {
        let choices = vec!["center".to_string(), "spacebetween".to_string()];
        assert_eq!(
            enum_constant("Center", &choices).unwrap(),
            Value::Enum("center".into())
        );
        assert_eq!(
            enum_constant("space_between", &choices).unwrap(),
            Value::Enum("spacebetween".into())
        );
        assert!(enum_constant("left", &choices).is_err());
    }

    #[test]
    fn test_range_parsing() {
        assert_eq!(range("2..5").unwrap(), Range::closed(2, 5));
        assert_eq!(range("..5").unwrap(), Range::new(None, Some(5)));
        assert_eq!(range("2..").unwrap(), Range::new(Some(2), None));
        assert!(range("2...5").is_err());
        assert!(range("two..five").is_err());
    }

    #[test]
    fn test_lambda_header_parsing() {
        let lambda = lambda("from to?: **Hello .to** from .from", ScopeId::ROOT);
        assert_eq!(lambda.parameters.len(), 2);
        assert_eq!(lambda.parameters[0].name, "from");
        assert!(!lambda.parameters[0].optional);
        assert_eq!(lambda.parameters[1].name, "to");
        assert!(lambda.parameters[1].optional);
        assert!(
            matches!(&lambda.body, crate::function::lambda::LambdaBody::Source(s) if s == "**Hello .to** from .from")
        );
    }

    #[test]
    fn test_lambda_without_header() {
        let lambda = lambda("plain content", ScopeId::ROOT);
        assert!(lambda.parameters.is_empty());
    }

    #[test]
    fn test_expression_splits_text_and_calls() {
        let expr = expression("2 + 2 is .sum {2} {2}", ScopeId::ROOT)
            .unwrap()
            .unwrap();
        match expr {
            Expression::Composed(parts) => {
                assert_eq!(parts.len(), 2);
                assert!(matches!(&parts[0], Expression::Value(_)));
                assert!(
                    matches!(&parts[1], Expression::Call(site) if site.name == "sum")
                );
            }
            other => panic!("expected composed expression, got {:?}", other),
        }
    }

    #[test]
    fn test_expression_falls_back_on_block_markdown() {
        assert!(expression("- A\n- B", ScopeId::ROOT).unwrap().is_none());
        assert!(expression("# Heading", ScopeId::ROOT)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_forced_lambda() {
        let expr = expression("@lambda item: .item", ScopeId::ROOT)
            .unwrap()
            .unwrap();
        assert!(matches!(expr, Expression::Value(Value::Lambda(_))));
    }

    #[test]
    fn test_markdown_to_iterable() {
        let mut ctx = Context::new();
        let content = markdown("- A\n- B\n- C\n", &mut ctx, ScopeId::ROOT, ContentKind::Block, true)
            .unwrap();
        let value = markdown_to_iterable(&ctx, &content).unwrap();
        let elements = value.iter_elements().unwrap();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0].to_display_string(), "A");
    }

    #[test]
    fn test_markdown_to_dictionary_nested() {
        let mut ctx = Context::new();
        let content = markdown(
            "- a: 1\n- b\n  - ba: 2\n  - bb: 3\n",
            &mut ctx,
            ScopeId::ROOT,
            ContentKind::Block,
            true,
        )
        .unwrap();
        let value = markdown_to_dictionary(&mut ctx, &content).unwrap();
        match value {
            Value::Dictionary(entries) => {
                assert_eq!(entries["a"].to_display_string(), "1");
                match &entries["b"] {
                    Value::Dictionary(nested) => {
                        assert_eq!(nested["ba"].to_display_string(), "2");
                        assert_eq!(nested["bb"].to_display_string(), "3");
                    }
                    other => panic!("expected nested dictionary, got {:?}", other),
                }
            }
            other => panic!("expected dictionary, got {:?}", other),
        }
    }

    #[test]
    fn test_iterable_from_range_text() {
        let mut ctx = Context::new();
        let value = iterable("2..4", &mut ctx, ScopeId::ROOT).unwrap();
        assert_eq!(value.iter_elements().unwrap().len(), 3);
    }

    #[test]
    fn test_iterable_rejects_right_open_range() {
        let mut ctx = Context::new();
        assert!(iterable("2..", &mut ctx, ScopeId::ROOT).is_err());
    }
}
