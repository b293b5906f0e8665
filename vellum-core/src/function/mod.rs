//! Callable functions and the libraries that group them.
//!
//! A [`Function`] is an immutable description of a callable: its name, its
//! ordered parameter list and its body. Functions are grouped into
//! [`Library`]s registered on a scope; lookup is by exact, case-sensitive
//! name, scanning libraries in registration order (first match wins).

pub mod binder;
pub mod call;
pub mod lambda;

use crate::context::Context;
use crate::error::Result;
use crate::pipeline::PipelineHooks;
use crate::value::Value;
use call::Invocation;
use std::fmt;
use std::rc::Rc;

/// A built-in function body: a plain function pointer.
pub type NativeFn = fn(&mut Context, Invocation) -> Result<Value>;

/// A capturing function body, used for functions built at runtime
/// (variables, lambda parameter accessors).
pub type ClosureFn = dyn Fn(&mut Context, Invocation) -> Result<Value>;

/// The executable part of a function.
#[derive(Clone)]
pub enum FunctionBody {
    Native(NativeFn),
    Closure(Rc<ClosureFn>),
    /// A user-defined function backed by a lambda (`.function`).
    Lambda(lambda::Lambda),
}

impl fmt::Debug for FunctionBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionBody::Native(_) => write!(f, "Native(..)"),
            FunctionBody::Closure(_) => write!(f, "Closure(..)"),
            FunctionBody::Lambda(lambda) => write!(f, "Lambda({:?})", lambda),
        }
    }
}

/// Declared type of a function parameter, driving argument coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// No coercion: the argument stays dynamic.
    Any,
    String,
    Number,
    Boolean,
    /// An enum constant picked from the given pool, case-insensitively.
    Enum(Vec<String>),
    Range,
    Iterable,
    Dictionary,
    Lambda,
    /// Block markdown content, re-entered into the parser.
    Content,
    /// Inline markdown content.
    InlineContent,
    /// The executing scope, supplied by the engine.
    Context,
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParamType::Any => "any",
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Enum(_) => "enum",
            ParamType::Range => "range",
            ParamType::Iterable => "iterable",
            ParamType::Dictionary => "dictionary",
            ParamType::Lambda => "lambda",
            ParamType::Content => "content",
            ParamType::InlineContent => "inline content",
            ParamType::Context => "context",
        };
        write!(f, "{}", name)
    }
}

/// A function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: ParamType,
    /// Has a default (`none`) when the caller omits it.
    pub optional: bool,
    /// Filled by the engine, invisible to callers.
    pub injected: bool,
    /// Conventionally supplied as the call's trailing indented block.
    pub body: bool,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            optional: false,
            injected: false,
            body: false,
        }
    }

    /// The executing-scope parameter injected by the engine.
    pub fn context(name: impl Into<String>) -> Self {
        let mut parameter = Self::new(name, ParamType::Context);
        parameter.injected = true;
        parameter
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn body(mut self) -> Self {
        self.body = true;
        self
    }
}

/// An immutable description of a callable function.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<Parameter>,
    pub body: FunctionBody,
}

impl Function {
    pub fn native(name: impl Into<String>, parameters: Vec<Parameter>, body: NativeFn) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: FunctionBody::Native(body),
        }
    }

    pub fn closure(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        body: impl Fn(&mut Context, Invocation) -> Result<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: FunctionBody::Closure(Rc::new(body)),
        }
    }

    pub fn from_lambda(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        lambda: lambda::Lambda,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: FunctionBody::Lambda(lambda),
        }
    }

    /// The caller-visible parameters, preserving declaration order.
    pub fn regular_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| !p.injected)
    }
}

/// A named group of functions, optionally carrying pipeline hooks it wants to
/// run at stage boundaries.
#[derive(Debug, Clone, Default)]
pub struct Library {
    pub name: String,
    pub functions: Vec<Function>,
    pub hooks: Option<PipelineHooks>,
}

impl Library {
    pub fn new(name: impl Into<String>, functions: Vec<Function>) -> Self {
        Self {
            name: name.into(),
            functions,
            hooks: None,
        }
    }

    pub fn with_hooks(mut self, hooks: PipelineHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.functions.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_builders() {
        let p = Parameter::new("body", ParamType::Lambda).optional().body();
        assert!(p.optional);
        assert!(p.body);
        assert!(!p.injected);

        let ctx = Parameter::context("context");
        assert!(ctx.injected);
    }

    #[test]
    fn test_library_lookup_is_case_sensitive() {
        let library = Library::new(
            "test",
            vec![Function::native("greet", vec![], |_, _| Ok(Value::Void))],
        );
        assert!(library.function("greet").is_some());
        assert!(library.function("Greet").is_none());
    }
}
