//! Expressions: what a raw argument string evaluates to.
//!
//! An argument like `2 + 2 is .sum {2} {2}` is tokenized into components —
//! literal text and nested calls — which evaluate independently and are then
//! appended left to right. Nested calls execute eagerly and are never
//! enqueued for tree expansion.

use crate::ast::Node;
use crate::context::Context;
use crate::error::Result;
use crate::function::call::{self, CallSite};
use crate::value::{DynamicValue, Value};

/// A lazily-evaluated argument expression.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A literal or pre-parsed value; evaluates to itself.
    Value(Value),
    /// A nested call, resolved against its owning scope when evaluated.
    Call(Box<CallSite>),
    /// Two or more components joined by appending.
    Composed(Vec<Expression>),
}

/// Evaluates an expression to a value.
pub fn eval(expression: &Expression, ctx: &mut Context) -> Result<Value> {
    match expression {
        Expression::Value(value) => Ok(value.clone()),
        Expression::Call(site) => call::execute_site(ctx, site),
        Expression::Composed(parts) => {
            let mut iter = parts.iter();
            let mut accumulator = match iter.next() {
                Some(part) => eval(part, ctx)?,
                None => return Ok(Value::Dynamic(DynamicValue::raw("", None))),
            };
            for part in iter {
                let next = eval(part, ctx)?;
                accumulator = append(accumulator, next);
            }
            Ok(accumulator)
        }
    }
}

/// Joins two evaluated components.
///
/// Booleans combine with logical AND, collections append the new element,
/// markdown content appends as nodes; everything else concatenates as text.
pub fn append(left: Value, right: Value) -> Value {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Value::Boolean(a && b),
        (Value::Ordered(mut items), other) => {
            items.push(other);
            Value::Ordered(items)
        }
        (Value::Unordered(mut items), other) => {
            items.push(other);
            Value::unordered(items)
        }
        (Value::Collection(mut items), other) => {
            items.push(other);
            Value::Collection(items)
        }
        (Value::Markdown(mut content), other) => {
            match other {
                Value::Markdown(more) => content.children.extend(more.children),
                other => content
                    .children
                    .push(Node::Text(other.to_display_string())),
            }
            Value::Markdown(content)
        }
        (Value::Dynamic(dynamic), other) => {
            let joined = format!("{}{}", dynamic.display(), other.to_display_string());
            Value::Dynamic(DynamicValue::raw(joined, dynamic.scope))
        }
        (left, right) => Value::String(format!(
            "{}{}",
            left.to_display_string(),
            right.to_display_string()
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    #[test]
    fn test_append_strings() {
        let result = append(
            Value::String("three plus two is ".into()),
            Value::Number(Number::Int(5)),
        );
        assert_eq!(result, Value::String("three plus two is 5".into()));
    }

    #[test]
    fn test_append_booleans_is_conjunction() {
        assert_eq!(
            append(Value::Boolean(true), Value::Boolean(false)),
            Value::Boolean(false)
        );
        assert_eq!(
            append(Value::Boolean(true), Value::Boolean(true)),
            Value::Boolean(true)
        );
        // A non-boolean on the right degrades to concatenation.
        assert_eq!(
            append(Value::Boolean(true), Value::String("abc".into())),
            Value::String("trueabc".into())
        );
    }

    #[test]
    fn test_append_to_collection() {
        let result = append(
            Value::Ordered(vec![Value::String("a".into())]),
            Value::String("b".into()),
        );
        assert_eq!(
            result,
            Value::Ordered(vec![Value::String("a".into()), Value::String("b".into())])
        );
    }

    #[test]
    fn test_append_dynamic_stays_dynamic() {
        let result = append(
            Value::Dynamic(DynamicValue::raw("N: ", None)),
            Value::Number(Number::Int(2)),
        );
        assert_eq!(result, Value::Dynamic(DynamicValue::raw("N: 2", None)));
    }
}
