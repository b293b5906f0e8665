//! Conversion of function output values into tree nodes.
//!
//! The same value maps to different node shapes depending on whether the
//! call site sits in block or inline position: raw text re-enters the block
//! or inline parser accordingly, and the expansion engine wraps stray inline
//! output into a paragraph when splicing into block position.

use crate::ast::{ListItem, Node};
use crate::context::Context;
use crate::error::{Result, Span, VellumError};
use crate::value::{factory, DynamicContent, Value};
use vellum_types::{ContentKind, ScopeId};

/// Maps a function output value to a node ready for splicing.
pub fn to_node(
    value: &Value,
    kind: ContentKind,
    ctx: &mut Context,
    scope: ScopeId,
) -> Result<Node> {
    match value {
        // Void and none produce no visible output.
        Value::None | Value::Void => Ok(Node::Blank),

        Value::Node(node) => Ok((**node).clone()),
        Value::Markdown(content) => Ok(Node::Group(content.children.clone())),

        Value::String(_) | Value::Number(_) | Value::Boolean(_) | Value::Enum(_) | Value::Range(_) => {
            parse_raw(&value.to_display_string(), kind, ctx, scope)
        }

        Value::Dynamic(dynamic) => {
            let scope = dynamic.scope.unwrap_or(scope);
            match &dynamic.content {
                DynamicContent::Value(inner) => to_node(inner, kind, ctx, scope),
                DynamicContent::Raw(raw) => parse_raw(raw, kind, ctx, scope),
            }
        }

        Value::Ordered(items) => Ok(Node::OrderedList {
            start: 1,
            items: list_items(items, kind, ctx, scope)?,
        }),
        Value::Unordered(items) => Ok(Node::UnorderedList {
            items: list_items(items, kind, ctx, scope)?,
        }),
        // A general collection is just a group of its items' outputs.
        Value::Collection(items) => Ok(Node::Group(
            items
                .iter()
                .map(|item| to_node(item, kind, ctx, scope))
                .collect::<Result<Vec<_>>>()?,
        )),

        // A pair displays as an ordered collection of its two elements.
        Value::Pair(pair) => to_node(
            &Value::Ordered(vec![pair.first.clone(), pair.second.clone()]),
            kind,
            ctx,
            scope,
        ),

        // A dictionary displays as a key-value table.
        Value::Dictionary(entries) => {
            let rows = entries
                .iter()
                .map(|(key, value)| {
                    Ok(vec![
                        vec![Node::text(key.clone())],
                        vec![to_node(value, ContentKind::Inline, ctx, scope)?],
                    ])
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Node::Table {
                header: vec![vec![Node::text("Key")], vec![Node::text("Value")]],
                rows,
            })
        }

        Value::Lambda(_) => Err(VellumError::Runtime {
            span: Span::default(),
            name: "output".to_string(),
            message: "a lambda is not a valid output value".to_string(),
        }),
    }
}

fn list_items(
    items: &[Value],
    kind: ContentKind,
    ctx: &mut Context,
    scope: ScopeId,
) -> Result<Vec<ListItem>> {
    items
        .iter()
        .map(|item| Ok(ListItem::new(vec![to_node(item, kind, ctx, scope)?])))
        .collect()
}

/// Re-enters raw text into the parser, expanding any nested calls at once.
fn parse_raw(raw: &str, kind: ContentKind, ctx: &mut Context, scope: ScopeId) -> Result<Node> {
    let content = factory::markdown(raw, ctx, scope, kind, true)?;
    Ok(Node::Group(content.children))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    #[test]
    fn test_void_is_invisible() {
        let mut ctx = Context::new();
        let node = to_node(&Value::Void, ContentKind::Block, &mut ctx, ScopeId::ROOT).unwrap();
        assert_eq!(node, Node::Blank);
    }

    #[test]
    fn test_string_parses_as_markdown() {
        let mut ctx = Context::new();
        let node = to_node(
            &Value::String("plain *em*".into()),
            ContentKind::Inline,
            &mut ctx,
            ScopeId::ROOT,
        )
        .unwrap();
        assert_eq!(
            node,
            Node::Group(vec![
                Node::text("plain "),
                Node::Emphasis(vec![Node::text("em")])
            ])
        );
    }

    #[test]
    fn test_ordered_collection_becomes_a_list() {
        let mut ctx = Context::new();
        let value = Value::Ordered(vec![
            Value::Number(Number::Int(1)),
            Value::Number(Number::Int(2)),
        ]);
        let node = to_node(&value, ContentKind::Block, &mut ctx, ScopeId::ROOT).unwrap();
        assert!(matches!(node, Node::OrderedList { items, .. } if items.len() == 2));
    }

    #[test]
    fn test_dictionary_becomes_a_table() {
        let mut ctx = Context::new();
        let mut entries = std::collections::BTreeMap::new();
        entries.insert("x".to_string(), Value::Number(Number::Int(1)));
        let node = to_node(
            &Value::Dictionary(entries),
            ContentKind::Block,
            &mut ctx,
            ScopeId::ROOT,
        )
        .unwrap();
        assert!(matches!(node, Node::Table { rows, .. } if rows.len() == 1));
    }

    #[test]
    fn test_lambda_is_not_an_output() {
        let mut ctx = Context::new();
        let lambda = crate::function::lambda::Lambda::new(ScopeId::ROOT, vec![], "x");
        let result = to_node(
            &Value::Lambda(lambda),
            ContentKind::Block,
            &mut ctx,
            ScopeId::ROOT,
        );
        assert!(result.is_err());
    }
}
