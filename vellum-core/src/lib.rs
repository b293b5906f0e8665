//! # Vellum core
//!
//! Vellum is a document-authoring language that extends Markdown with
//! compile-time function calls:
//!
//! ```text
//! .function {greet}
//!     from to:
//!     **Hello .to** from .from
//!
//! .greet {John} to:{world}
//! ```
//!
//! This crate is the compilation engine: the value model, the function and
//! library registry, the scope chain, the argument binder, the lambda
//! evaluator, the call-expansion engine, and the pipeline that sequences
//! lexing, parsing, attribute collection, expansion and rendering. Built-in
//! function libraries live in `vellum-stdlib`; the command-line front end in
//! `vellum-cli`.

pub mod ast;
pub mod context;
pub mod document;
pub mod error;
pub mod expand;
pub mod function;
pub mod hooks;
pub mod lexer;
pub mod parser;
pub mod pipeline;
pub mod render;
pub mod slug;
pub mod value;

// Re-export key types
pub use ast::{Document, ListItem, MarkdownContent, Node};
pub use context::{Context, ContextOptions};
pub use document::{parse_frontmatter, DocumentInfo};
pub use error::{ErrorContext, ErrorPolicy, Result, VellumError};
pub use expand::{expand_all, is_fully_expanded, CallExpander};
pub use function::call::{CallArgument, CallSite, CallState, Invocation, ResolvedCall, UncheckedCall};
pub use function::lambda::{Lambda, LambdaBody, LambdaParameter};
pub use function::{Function, FunctionBody, Library, ParamType, Parameter};
pub use pipeline::{Pipeline, PipelineHooks, PipelineOptions};
pub use render::{NodeRenderer, OutputFormat, OutputResource};
pub use slug::slugify;
pub use value::{DynamicContent, DynamicValue, Number, Pair, Range, Value, ValueKind};

// Re-export shared types from vellum-types
pub use vellum_types::{CallId, ContentKind, ScopeId, Span};

/// Compiles a document with the given libraries and options.
pub fn compile(
    source: &str,
    libraries: Vec<Library>,
    options: PipelineOptions,
) -> Result<Vec<OutputResource>> {
    Pipeline::new(libraries, options).execute(source)
}
