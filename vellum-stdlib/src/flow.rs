//! Control flow and declaration statements.
//!
//! Conditionals evaluate their body lambda only when the condition holds and
//! produce a void value otherwise, so they work both for layout and for
//! logic. `.foreach` maps its body over an iterable, concatenating the
//! per-iteration outputs into one collection. `.function` and `.var` install
//! new entries in the declaring scope's local library set.

use crate::CUSTOM_LIBRARY_PREFIX;
use tracing::debug;
use vellum_core::value::factory;
use vellum_core::{
    Context, Function, Lambda, Library, Node, ParamType, Parameter, Result, Value,
};
use vellum_types::ScopeId;

/// The `flow` library.
pub fn library() -> Library {
    Library::new(
        "flow",
        vec![
            if_function(),
            ifnot_function(),
            foreach_function(),
            repeat_function(),
            function_function(),
            var_function(),
            let_function(),
            node_function(),
        ],
    )
}

/// `.if {condition} body` — evaluates the body only if the condition holds.
///
/// ```text
/// .var {needapples} {yes}
///
/// .if {.needapples}
///     I need apples.
/// ```
fn if_function() -> Function {
    Function::native(
        "if",
        vec![
            Parameter::new("condition", ParamType::Boolean),
            Parameter::new("body", ParamType::Lambda).body(),
        ],
        |ctx, invocation| {
            let body = invocation.lambda("body")?;
            match invocation.boolean("condition")? {
                true => body.invoke(ctx, vec![]),
                false => Ok(Value::Void),
            }
        },
    )
}

/// `.ifnot {condition} body` — the logical complement of `.if`.
fn ifnot_function() -> Function {
    Function::native(
        "ifnot",
        vec![
            Parameter::new("condition", ParamType::Boolean),
            Parameter::new("body", ParamType::Lambda).body(),
        ],
        |ctx, invocation| {
            let body = invocation.lambda("body")?;
            match invocation.boolean("condition")? {
                false => body.invoke(ctx, vec![]),
                true => Ok(Value::Void),
            }
        },
    )
}

/// `.foreach {iterable} body` — repeats the body for each element.
///
/// The current element binds to the body's explicit parameter, or to `.1` in
/// implicit form. Destructurable elements (pairs, dictionary entries) spread
/// across multiple parameters:
///
/// ```text
/// .foreach {.x}
///     key value:
///     **.key** has value **.value**
/// ```
///
/// The output is the collection of per-iteration outputs, so `.foreach` used
/// as a value behaves like `map`.
fn foreach_function() -> Function {
    Function::native(
        "foreach",
        vec![
            Parameter::new("iterable", ParamType::Iterable),
            Parameter::new("body", ParamType::Lambda).body(),
        ],
        |ctx, invocation| {
            let elements = invocation.iterable("iterable")?;
            let body = invocation.lambda("body")?;
            let mut outputs = Vec::new();
            for element in elements {
                outputs.push(body.invoke(ctx, vec![element])?);
            }
            Ok(Value::Collection(outputs))
        },
    )
}

/// `.repeat {times} body` — shorthand for iterating `1..times`.
fn repeat_function() -> Function {
    Function::native(
        "repeat",
        vec![
            Parameter::new("times", ParamType::Number),
            Parameter::new("body", ParamType::Lambda).body(),
        ],
        |ctx, invocation| {
            let times = invocation
                .number("times")?
                .as_i64()
                .ok_or_else(|| invocation.error("repetition count must be an integer"))?;
            let body = invocation.lambda("body")?;
            let mut outputs = Vec::new();
            for index in 1..=times {
                outputs.push(body.invoke(ctx, vec![Value::Number(index.into())])?);
            }
            Ok(Value::Collection(outputs))
        },
    )
}

/// `.function {name} body` — defines a custom function in the current scope.
///
/// The body's explicit lambda parameters become the function's parameters:
///
/// ```text
/// .function {greet}
///     from to:
///     **Hello .to** from .from
///
/// .greet {John} to:{world}
/// ```
fn function_function() -> Function {
    Function::native(
        "function",
        vec![
            Parameter::context("context"),
            Parameter::new("name", ParamType::String),
            Parameter::new("body", ParamType::Lambda).body(),
        ],
        |ctx, invocation| {
            let name = invocation.string("name")?;
            let body = invocation.lambda("body")?;
            define_function(ctx, invocation.scope, &name, body);
            Ok(Value::Void)
        },
    )
}

/// Installs a lambda-backed function into a scope's local library set.
pub(crate) fn define_function(ctx: &mut Context, scope: ScopeId, name: &str, body: Lambda) {
    let parameters = body
        .parameters
        .iter()
        .map(|parameter| {
            let declared = Parameter::new(parameter.name.as_str(), ParamType::Any);
            if parameter.optional {
                declared.optional()
            } else {
                declared
            }
        })
        .collect();

    debug!(name, scope = scope.as_u32(), "defining custom function");
    let function = Function::from_lambda(name, parameters, body);
    let library_name = format!("{}{}", CUSTOM_LIBRARY_PREFIX, name);
    // Redeclaration within the same scope replaces the previous definition.
    ctx.remove_library(scope, &library_name);
    ctx.register_library(scope, Library::new(library_name, vec![function]));
}

/// `.var {name} {value}` — defines a variable or reassigns an existing one.
///
/// A variable is a zero-parameter getter that doubles as a one-parameter
/// setter: `.myvar` reads it, `.myvar {42}` reassigns it. Reassignment from a
/// nested scope walks the chain upward so the topmost declaring scope keeps
/// ownership.
fn var_function() -> Function {
    Function::native(
        "var",
        vec![
            Parameter::context("context"),
            Parameter::new("name", ParamType::String),
            Parameter::new("value", ParamType::Any),
        ],
        |ctx, invocation| {
            let name = invocation.string("name")?;
            let value = invocation
                .value("value")
                .cloned()
                .unwrap_or(Value::None);
            define_variable(ctx, invocation.scope, &name, value)?;
            Ok(Value::Void)
        },
    )
}

fn define_variable(ctx: &mut Context, scope: ScopeId, name: &str, value: Value) -> Result<()> {
    let library_name = format!("{}{}", CUSTOM_LIBRARY_PREFIX, name);

    // Scan ancestors for an existing declaration. Every stale declaration is
    // removed; the topmost one keeps ownership of the variable.
    let mut owner: Option<ScopeId> = None;
    let mut current = ctx.parent(scope);
    while let Some(id) = current {
        if ctx.remove_library(id, &library_name) {
            owner = Some(id);
        }
        current = ctx.parent(id);
    }
    let target = match owner {
        Some(id) => id,
        None => {
            ctx.remove_library(scope, &library_name);
            scope
        }
    };

    // The value may contain calls; it is evaluated once, at declaration.
    let raw = match &value {
        Value::Dynamic(dynamic) => dynamic.display(),
        other => other.to_display_string(),
    };
    let evaluated = factory::eval(&raw, ctx, target)?;
    debug!(name, scope = target.as_u32(), "defining variable");

    let getter_value = evaluated;
    let variable_name = name.to_string();
    let accessor = Function::closure(
        name,
        vec![Parameter::new("value", ParamType::Any).optional()],
        move |ctx, invocation| match invocation.value("value") {
            None | Some(Value::None) => Ok(getter_value.clone()),
            Some(new_value) => {
                let new_value = new_value.clone();
                define_variable(ctx, invocation.scope, &variable_name, new_value)?;
                Ok(Value::Void)
            }
        },
    );

    ctx.register_library(target, Library::new(library_name, vec![accessor]));
    Ok(())
}

/// `.let {value} body` — binds a value for the duration of the body only.
fn let_function() -> Function {
    Function::native(
        "let",
        vec![
            Parameter::new("value", ParamType::Any),
            Parameter::new("body", ParamType::Lambda).body(),
        ],
        |ctx, invocation| {
            let value = invocation
                .value("value")
                .cloned()
                .unwrap_or(Value::None);
            let body = invocation.lambda("body")?;
            body.invoke(ctx, vec![value])
        },
    )
}

/// `.node` — an invisible node, forcing markdown evaluation of the
/// surrounding expression.
fn node_function() -> Function {
    Function::native("node", vec![], |_, _| Ok(Value::Node(Box::new(Node::Blank))))
}
