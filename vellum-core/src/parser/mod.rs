//! Parsing: block structure, inline content and function-call syntax.
//!
//! The parser consumes the block tokens produced by [`crate::lexer`] and
//! builds the document tree, registering call-site placeholders in the
//! compilation context as it encounters them.

pub mod block;
pub mod funcall;
pub mod inline;

pub use block::{parse, parse_document, parse_source};
pub use funcall::{walk_call, WalkedArgument, WalkedCall};
pub use inline::parse_inlines;
