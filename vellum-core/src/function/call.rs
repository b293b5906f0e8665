//! Call sites and their transient resolved form.
//!
//! A [`CallSite`] is produced by parsing and registered in the owning scope's
//! pending queue. It is mutated exactly once, when the expansion engine fills
//! its [`CallState`]; afterwards it is inert. A [`ResolvedCall`] is the
//! short-lived pairing of a looked-up function with the site's raw arguments,
//! constructed per expansion attempt and never persisted.

use crate::ast::Node;
use crate::context::Context;
use crate::error::{Result, Span, VellumError};
use crate::function::{binder, Function, FunctionBody, ParamType};
use crate::value::{Number, Value};
use std::collections::HashMap;
use vellum_types::{ContentKind, ScopeId};

/// A raw call-site argument: positional, named, or the trailing body block.
#[derive(Debug, Clone, PartialEq)]
pub struct CallArgument {
    pub name: Option<String>,
    /// Unparsed argument text; may itself contain nested call syntax.
    pub value: String,
    /// Whether this is the call's trailing indented block.
    pub body: bool,
}

impl CallArgument {
    pub fn positional(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: value.into(),
            body: false,
        }
    }

    pub fn named(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            value: value.into(),
            body: false,
        }
    }

    pub fn body(value: impl Into<String>) -> Self {
        Self {
            name: None,
            value: value.into(),
            body: true,
        }
    }
}

/// Expansion state of a call site.
///
/// `Expanded` is terminal: an already-expanded site is skipped on re-visit.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CallState {
    #[default]
    Pending,
    Expanded(Vec<Node>),
}

/// An unevaluated function invocation in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub struct CallSite {
    pub name: String,
    pub arguments: Vec<CallArgument>,
    /// The scope this call was authored in; resolution happens against it.
    pub scope: ScopeId,
    pub span: Span,
    /// Block or inline position in the source tree.
    pub kind: ContentKind,
    pub state: CallState,
}

impl CallSite {
    pub fn new(
        name: impl Into<String>,
        arguments: Vec<CallArgument>,
        scope: ScopeId,
        span: Span,
        kind: ContentKind,
    ) -> Self {
        Self {
            name: name.into(),
            arguments,
            scope,
            span,
            kind,
            state: CallState::Pending,
        }
    }

    pub fn is_expanded(&self) -> bool {
        matches!(self.state, CallState::Expanded(_))
    }
}

/// A function reference bound to a call's raw arguments and executing scope.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub function: Function,
    pub arguments: Vec<CallArgument>,
    pub scope: ScopeId,
    pub span: Span,
}

impl ResolvedCall {
    /// Binds the arguments and runs the function.
    pub fn execute(&self, ctx: &mut Context) -> Result<Value> {
        let invocation = binder::bind(ctx, self)?;

        match &self.function.body {
            FunctionBody::Native(body) => body(ctx, invocation),
            FunctionBody::Closure(body) => {
                let body = body.clone();
                body(ctx, invocation)
            }
            FunctionBody::Lambda(lambda) => {
                // Arguments are handed over in declared parameter order;
                // unbound optional parameters appear as `none`.
                let arguments: Vec<Value> = self
                    .function
                    .regular_parameters()
                    .map(|p| invocation.value(&p.name).cloned().unwrap_or(Value::None))
                    .collect();
                lambda.invoke(ctx, arguments)
            }
        }
    }
}

/// A call whose "unresolved" failure is deferred until the result is used.
///
/// Keeps lazily-composed expressions valid even when a sub-call references an
/// undefined function on a branch that is never taken.
#[derive(Debug, Clone)]
pub struct UncheckedCall {
    pub name: String,
    pub span: Span,
    pub resolved: Option<ResolvedCall>,
}

impl UncheckedCall {
    pub fn execute(&self, ctx: &mut Context) -> Result<Value> {
        match &self.resolved {
            Some(call) => call.execute(ctx),
            None => Err(VellumError::UnresolvedReference {
                span: self.span,
                name: self.name.clone(),
            }),
        }
    }
}

/// Resolves and executes a call site in its own owning scope.
pub fn execute_site(ctx: &mut Context, site: &CallSite) -> Result<Value> {
    ctx.resolve_unchecked(site).execute(ctx)
}

/// The authoritative name→value mapping of a bound call, handed to the
/// function body together with the scope it executes in.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub name: String,
    pub scope: ScopeId,
    pub span: Span,
    bindings: HashMap<String, Value>,
}

impl Invocation {
    pub(crate) fn new(
        name: String,
        scope: ScopeId,
        span: Span,
        bindings: HashMap<String, Value>,
    ) -> Self {
        Self {
            name,
            scope,
            span,
            bindings,
        }
    }

    pub fn value(&self, parameter: &str) -> Option<&Value> {
        self.bindings.get(parameter)
    }

    fn require(&self, parameter: &str) -> Result<&Value> {
        self.value(parameter).ok_or_else(|| {
            VellumError::runtime(
                self.span,
                self.name.clone(),
                format!("parameter '{}' was not bound", parameter),
            )
        })
    }

    fn mismatch(&self, parameter: &str, expected: ParamType, found: &Value) -> VellumError {
        VellumError::TypeMismatch {
            span: self.span,
            name: self.name.clone(),
            parameter: parameter.to_string(),
            expected: expected.to_string(),
            found: found.kind().to_string(),
        }
    }

    pub fn string(&self, parameter: &str) -> Result<String> {
        match self.require(parameter)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.mismatch(parameter, ParamType::String, other)),
        }
    }

    pub fn number(&self, parameter: &str) -> Result<Number> {
        match self.require(parameter)? {
            Value::Number(n) => Ok(*n),
            other => Err(self.mismatch(parameter, ParamType::Number, other)),
        }
    }

    pub fn boolean(&self, parameter: &str) -> Result<bool> {
        match self.require(parameter)? {
            Value::Boolean(b) => Ok(*b),
            other => Err(self.mismatch(parameter, ParamType::Boolean, other)),
        }
    }

    pub fn lambda(&self, parameter: &str) -> Result<crate::function::lambda::Lambda> {
        match self.require(parameter)? {
            Value::Lambda(lambda) => Ok(lambda.clone()),
            other => Err(self.mismatch(parameter, ParamType::Lambda, other)),
        }
    }

    /// The elements of an iterable-typed argument.
    pub fn iterable(&self, parameter: &str) -> Result<Vec<Value>> {
        let value = self.require(parameter)?;
        value
            .iter_elements()
            .ok_or_else(|| self.mismatch(parameter, ParamType::Iterable, value))
    }

    pub fn dictionary(&self, parameter: &str) -> Result<std::collections::BTreeMap<String, Value>> {
        match self.require(parameter)? {
            Value::Dictionary(entries) => Ok(entries.clone()),
            other => Err(self.mismatch(parameter, ParamType::Dictionary, other)),
        }
    }

    pub fn range(&self, parameter: &str) -> Result<crate::value::Range> {
        match self.require(parameter)? {
            Value::Range(range) => Ok(*range),
            other => Err(self.mismatch(parameter, ParamType::Range, other)),
        }
    }

    /// A runtime error attributed to this invocation.
    pub fn error(&self, message: impl Into<String>) -> VellumError {
        VellumError::runtime(self.span, self.name.clone(), message)
    }
}
