//! Argument binding: matching raw call-site arguments to parameters.
//!
//! Positional arguments bind to the next unbound regular parameter, named
//! arguments bind by parameter name, a body argument binds to the trailing
//! parameter. Once a named argument is seen, following arguments must be
//! named too. Dynamic argument values are coerced to the parameter's declared
//! type via the factory conversion table; adaptation is attempted as a
//! fallback before giving up.

use crate::context::Context;
use crate::error::{Result, VellumError};
use crate::function::call::{Invocation, ResolvedCall};
use crate::function::{ParamType, Parameter};
use crate::value::{factory, DynamicContent, DynamicValue, Value};
use std::collections::HashMap;
use vellum_types::ContentKind;

/// Produces the authoritative name→value mapping for a resolved call, or
/// fails with an arity or type error naming the offending parameter.
pub fn bind(ctx: &mut Context, call: &ResolvedCall) -> Result<Invocation> {
    let function = &call.function;
    let regular: Vec<&Parameter> = function.regular_parameters().collect();

    let mut bindings: HashMap<String, Value> = HashMap::new();
    let mut encountered_named = false;
    let mut positional_index = 0usize;

    let arity_error = |message: String| VellumError::ArityMismatch {
        span: call.span,
        name: function.name.clone(),
        message,
    };

    for argument in &call.arguments {
        // A body argument always belongs to the trailing parameter.
        let parameter: &Parameter = if argument.body {
            regular
                .last()
                .copied()
                .ok_or_else(|| arity_error("function takes no arguments".to_string()))?
        } else if let Some(name) = &argument.name {
            encountered_named = true;
            regular
                .iter()
                .find(|p| &p.name == name)
                .copied()
                .ok_or_else(|| arity_error(format!("unknown parameter '{}'", name)))?
        } else if !encountered_named {
            let parameter = regular.get(positional_index).copied().ok_or_else(|| {
                arity_error(format!(
                    "too many arguments: expected at most {}",
                    regular.len()
                ))
            })?;
            positional_index += 1;
            parameter
        } else {
            return Err(arity_error(
                "unnamed argument cannot appear after a named one".to_string(),
            ));
        };

        if bindings.contains_key(&parameter.name) {
            return Err(arity_error(format!(
                "parameter '{}' is bound twice",
                parameter.name
            )));
        }

        // Body arguments stay deferred; inline arguments are evaluated
        // eagerly, resolving any nested calls they contain.
        let value = if argument.body {
            Value::Dynamic(DynamicValue::raw(argument.value.clone(), Some(call.scope)))
        } else {
            factory::eval(&argument.value, ctx, call.scope)?
        };

        let value = coerce(ctx, call, parameter, value)?;
        bindings.insert(parameter.name.clone(), value);
    }

    // Injected parameters are supplied by the engine, never by callers.
    for parameter in function.parameters.iter().filter(|p| p.injected) {
        debug_assert!(matches!(parameter.ty, ParamType::Context));
    }

    // Every mandatory parameter must have received a value by now.
    for parameter in &regular {
        if !bindings.contains_key(&parameter.name) {
            if parameter.optional {
                bindings.insert(parameter.name.clone(), Value::None);
            } else {
                return Err(arity_error(format!(
                    "missing mandatory parameter '{}'",
                    parameter.name
                )));
            }
        }
    }

    Ok(Invocation::new(
        function.name.clone(),
        call.scope,
        call.span,
        bindings,
    ))
}

/// Converts a bound value to its parameter's declared type.
fn coerce(
    ctx: &mut Context,
    call: &ResolvedCall,
    parameter: &Parameter,
    value: Value,
) -> Result<Value> {
    let mismatch = |found: &Value| VellumError::TypeMismatch {
        span: call.span,
        name: call.function.name.clone(),
        parameter: parameter.name.clone(),
        expected: parameter.ty.to_string(),
        found: found.kind().to_string(),
    };

    // Dynamic-typed parameters keep the argument undetermined; anything
    // already typed is wrapped so the callee can defer its interpretation.
    if parameter.ty == ParamType::Any {
        return Ok(match value {
            Value::Dynamic(_) => value,
            other => Value::Dynamic(DynamicValue::wrapped(other, Some(call.scope))),
        });
    }

    // `none` is accepted for optional parameters.
    if value.is_none() && parameter.optional {
        return Ok(Value::None);
    }

    let value = match value {
        Value::Dynamic(dynamic) => convert_dynamic(ctx, call, parameter, dynamic)?,
        other => other,
    };

    if type_matches(&parameter.ty, &value) {
        return Ok(value);
    }

    // Values coerce to string automatically.
    if parameter.ty == ParamType::String {
        return Ok(Value::String(value.to_display_string()));
    }

    // Markdown-backed interpretations of typed values (e.g. a variable whose
    // evaluated content is a markdown list).
    match &parameter.ty {
        ParamType::Iterable => {
            if let Some(iterable) = iterable_from_value(ctx, &value)? {
                return Ok(iterable);
            }
        }
        ParamType::Dictionary => {
            if let Value::Markdown(content) = &value {
                if let Some(dictionary) = factory::markdown_to_dictionary(ctx, content) {
                    return Ok(dictionary);
                }
            }
        }
        _ => {}
    }

    // Adaptation as a binding fallback.
    if let Some(adapted) = value.adapt() {
        if type_matches(&parameter.ty, &adapted) {
            return Ok(adapted);
        }
    }

    Err(mismatch(&value))
}

/// Type-directed conversion of a dynamic value to a parameter's static type.
fn convert_dynamic(
    ctx: &mut Context,
    call: &ResolvedCall,
    parameter: &Parameter,
    dynamic: DynamicValue,
) -> Result<Value> {
    let scope = dynamic.scope.unwrap_or(call.scope);

    // An already-produced result matching the target type needs no parsing.
    if let DynamicContent::Value(inner) = &dynamic.content {
        if type_matches(&parameter.ty, inner) {
            return Ok((**inner).clone());
        }
    }

    let raw = dynamic.display();
    let conversion_error = |e: VellumError| match e {
        VellumError::IllegalRawValue { raw, message } => VellumError::TypeMismatch {
            span: call.span,
            name: call.function.name.clone(),
            parameter: parameter.name.clone(),
            expected: parameter.ty.to_string(),
            found: format!("'{}' ({})", raw, message),
        },
        other => other,
    };

    let value = match &parameter.ty {
        ParamType::String => Value::String(raw),
        ParamType::Number => factory::number(&raw).map_err(conversion_error)?,
        ParamType::Boolean => factory::boolean(&raw).map_err(conversion_error)?,
        ParamType::Enum(choices) => {
            factory::enum_constant(&raw, choices).map_err(conversion_error)?
        }
        ParamType::Range => Value::Range(factory::range(&raw).map_err(conversion_error)?),
        ParamType::Iterable => {
            // An inner value may already be iterable (e.g. a wrapped
            // collection handed through a lambda parameter).
            if let DynamicContent::Value(inner) = &dynamic.content {
                match iterable_from_value(ctx, inner)? {
                    Some(value) => return Ok(value),
                    None => {}
                }
            }
            factory::iterable(&raw, ctx, scope).map_err(conversion_error)?
        }
        ParamType::Dictionary => {
            if let DynamicContent::Value(inner) = &dynamic.content {
                if let Value::Markdown(content) = &**inner {
                    if let Some(dict) = factory::markdown_to_dictionary(ctx, content) {
                        return Ok(dict);
                    }
                }
            }
            factory::dictionary(&raw, ctx, scope).map_err(conversion_error)?
        }
        ParamType::Lambda => Value::Lambda(factory::lambda(&raw, scope)),
        ParamType::Content => Value::Markdown(factory::markdown(
            &raw,
            ctx,
            scope,
            ContentKind::Block,
            true,
        )?),
        ParamType::InlineContent => Value::Markdown(factory::markdown(
            &raw,
            ctx,
            scope,
            ContentKind::Inline,
            true,
        )?),
        ParamType::Any | ParamType::Context => Value::Dynamic(dynamic.clone()),
    };

    Ok(value)
}

/// Iterable interpretations of an already-typed value.
fn iterable_from_value(ctx: &mut Context, value: &Value) -> Result<Option<Value>> {
    Ok(match value {
        Value::Ordered(_) | Value::Unordered(_) | Value::Collection(_) | Value::Pair(_) => {
            Some(value.clone())
        }
        Value::Range(range) => Some(Value::Ordered(range.to_collection()?)),
        Value::Dictionary(_) => value.adapt(),
        Value::Markdown(content) => factory::markdown_to_iterable(ctx, content),
        _ => None,
    })
}

/// Whether a value's kind literally satisfies a declared parameter type.
fn type_matches(ty: &ParamType, value: &Value) -> bool {
    match ty {
        ParamType::Any => true,
        ParamType::String => matches!(value, Value::String(_)),
        ParamType::Number => matches!(value, Value::Number(_)),
        ParamType::Boolean => matches!(value, Value::Boolean(_)),
        ParamType::Enum(_) => matches!(value, Value::Enum(_)),
        ParamType::Range => matches!(value, Value::Range(_)),
        ParamType::Iterable => value.iter_elements().is_some(),
        ParamType::Dictionary => matches!(value, Value::Dictionary(_)),
        ParamType::Lambda => matches!(value, Value::Lambda(_)),
        ParamType::Content | ParamType::InlineContent => {
            matches!(value, Value::Markdown(_) | Value::Node(_))
        }
        ParamType::Context => false,
    }
}
