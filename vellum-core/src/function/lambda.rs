//! Deferred computations with lexical scoping.
//!
//! A [`Lambda`] wraps a body (raw source text, or an already-known value)
//! together with the scope it was defined in. Invoking it forks the defining
//! scope (not the caller's), installs its parameters there as zero-argument
//! functions and evaluates the body fresh, so `.param` references go through
//! the regular call machinery and closures capture their definition
//! environment.

use crate::context::Context;
use crate::error::{Result, VellumError};
use crate::function::{Function, Library};
use crate::value::{factory, DynamicValue, Value};
use vellum_types::ScopeId;

/// Name of the transient library holding a lambda invocation's arguments.
pub const LAMBDA_PARAMETERS_LIBRARY: &str = "__lambda-parameters__";

/// A declared lambda parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParameter {
    pub name: String,
    pub optional: bool,
}

impl LambdaParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// The body of a lambda.
#[derive(Debug, Clone, PartialEq)]
pub enum LambdaBody {
    /// Unparsed source, evaluated fresh on each invocation.
    Source(String),
    /// A literal value already known at definition time.
    Value(Box<Value>),
}

/// An action block with a declared (possibly empty) parameter list.
///
/// When no explicit parameters are declared, arguments are implicitly named
/// `1`, `2`, … in the invocation scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    /// The scope this lambda was defined in.
    pub scope: ScopeId,
    pub parameters: Vec<LambdaParameter>,
    pub body: LambdaBody,
}

impl Lambda {
    pub fn new(scope: ScopeId, parameters: Vec<LambdaParameter>, source: impl Into<String>) -> Self {
        Self {
            scope,
            parameters,
            body: LambdaBody::Source(source.into()),
        }
    }

    pub fn constant(scope: ScopeId, value: Value) -> Self {
        Self {
            scope,
            parameters: Vec::new(),
            body: LambdaBody::Value(Box::new(value)),
        }
    }

    /// The number of mandatory explicit parameters.
    fn mandatory_count(&self) -> usize {
        self.parameters.iter().filter(|p| !p.optional).count()
    }

    /// Invokes the lambda with the given arguments.
    ///
    /// If the lambda declares more than one explicit parameter and a single
    /// destructurable argument is supplied, the argument is destructured into
    /// one component per parameter (e.g. a dictionary entry into key and
    /// value).
    pub fn invoke(&self, ctx: &mut Context, arguments: Vec<Value>) -> Result<Value> {
        self.invoke_inner(ctx, arguments, true)
    }

    fn invoke_inner(
        &self,
        ctx: &mut Context,
        arguments: Vec<Value>,
        allow_destructuring: bool,
    ) -> Result<Value> {
        if allow_destructuring && self.parameters.len() > 1 && arguments.len() == 1 {
            if let Ok(components) = arguments[0].destructure(self.parameters.len()) {
                return self.invoke_inner(ctx, components, false);
            }
        }

        // Implicit parameters (.1, .2, ...) accept any argument count.
        if !self.parameters.is_empty()
            && (arguments.len() < self.mandatory_count() || arguments.len() > self.parameters.len())
        {
            return Err(VellumError::LambdaArityMismatch {
                expected: self.parameters.len(),
                got: arguments.len(),
            });
        }

        // Remaining optional parameters are filled with `none`.
        let mut actual = arguments;
        while actual.len() < self.parameters.len() {
            actual.push(Value::None);
        }

        let scope = ctx.fork(self.scope);
        ctx.register_library(scope, self.parameters_library(scope, &actual));

        match &self.body {
            LambdaBody::Value(value) => Ok((**value).clone()),
            LambdaBody::Source(source) => factory::eval(source, ctx, scope),
        }
    }

    /// Builds the library exposing this invocation's arguments as
    /// zero-argument functions.
    fn parameters_library(&self, scope: ScopeId, arguments: &[Value]) -> Library {
        let functions = arguments
            .iter()
            .enumerate()
            .map(|(index, argument)| {
                let name = self
                    .parameters
                    .get(index)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| (index + 1).to_string());
                let value = argument.clone();
                Function::closure(name, Vec::new(), move |_ctx, _invocation| {
                    Ok(Value::Dynamic(DynamicValue::wrapped(
                        value.clone(),
                        Some(scope),
                    )))
                })
            })
            .collect();

        Library::new(LAMBDA_PARAMETERS_LIBRARY, functions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Number;

    #[test]
    fn test_constant_lambda_ignores_scope_machinery() {
        let mut ctx = Context::new();
        let lambda = Lambda::constant(ScopeId::ROOT, Value::Number(Number::Int(7)));
        let result = lambda.invoke(&mut ctx, vec![]).unwrap();
        assert_eq!(result, Value::Number(Number::Int(7)));
    }

    #[test]
    fn test_explicit_arity_is_exact() {
        let mut ctx = Context::new();
        let lambda = Lambda::new(
            ScopeId::ROOT,
            vec![LambdaParameter::new("a"), LambdaParameter::new("b")],
            ".a",
        );
        let err = lambda
            .invoke(&mut ctx, vec![Value::Boolean(true)])
            .unwrap_err();
        assert!(matches!(
            err,
            VellumError::LambdaArityMismatch {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_optional_parameters_fill_with_none() {
        let mut ctx = Context::new();
        let lambda = Lambda::new(
            ScopeId::ROOT,
            vec![
                LambdaParameter::new("a"),
                LambdaParameter::optional("b"),
            ],
            ".b",
        );
        // One argument satisfies the single mandatory parameter; `.b`
        // resolves to the `none` filler.
        let result = lambda
            .invoke(&mut ctx, vec![Value::String("x".into())])
            .unwrap();
        assert_eq!(result.to_display_string(), "none");
    }

    #[test]
    fn test_pair_destructures_across_parameters() {
        let mut ctx = Context::new();
        let lambda = Lambda::new(
            ScopeId::ROOT,
            vec![LambdaParameter::new("k"), LambdaParameter::new("v")],
            ".k=.v",
        );
        let pair = Value::pair(Value::String("a".into()), Value::Number(Number::Int(1)));
        let result = lambda.invoke(&mut ctx, vec![pair]).unwrap();
        assert_eq!(result.to_display_string(), "a=1");
    }
}
