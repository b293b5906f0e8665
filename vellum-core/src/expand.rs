//! The expansion engine: turns every pending call site into realized content.
//!
//! The per-scope pending queue is drained by snapshot-then-clear; execution
//! can register new call sites (a function may itself emit further calls), so
//! draining repeats until a pass produces an empty snapshot. Each site is
//! expanded at most once: an already-expanded site is skipped on re-visit.

use crate::ast::Node;
use crate::context::Context;
use crate::error::{ErrorPolicy, Result};
use crate::function::call::{self, CallState};
use crate::value::output;
use tracing::{debug, trace, warn};
use vellum_types::{CallId, ContentKind, ScopeId};

/// Resolves, executes and splices queued function calls.
pub struct CallExpander<'c> {
    ctx: &'c mut Context,
}

impl<'c> CallExpander<'c> {
    pub fn new(ctx: &'c mut Context) -> Self {
        Self { ctx }
    }

    /// Drains a scope's pending queue to fixpoint.
    pub fn expand_scope(&mut self, scope: ScopeId) -> Result<()> {
        loop {
            let batch = self.ctx.dequeue_calls(scope);
            if batch.is_empty() {
                return Ok(());
            }
            trace!(scope = scope.as_u32(), calls = batch.len(), "draining call queue");
            for id in batch {
                self.expand(id)?;
            }
        }
    }

    /// Expands a single call site.
    ///
    /// In lenient mode a failing call is replaced by a visible error box that
    /// names the innermost function that actually failed; in strict mode the
    /// error aborts the whole compilation.
    pub fn expand(&mut self, id: CallId) -> Result<()> {
        if self.ctx.call(id).is_expanded() {
            trace!(call = id.as_u64(), "call already expanded, skipping");
            return Ok(());
        }

        let site = self.ctx.call(id).clone();
        debug!(name = %site.name, call = id.as_u64(), "expanding call");

        let outcome = match call::execute_site(self.ctx, &site) {
            Ok(value) => output::to_node(&value, site.kind, self.ctx, site.scope)
                .map(|node| finalize(site.kind, node)),
            Err(error) => Err(error),
        };

        match outcome {
            Ok(node) => {
                self.ctx.call_mut(id).state = CallState::Expanded(vec![node]);
            }
            Err(error) => match self.ctx.options.error_policy {
                ErrorPolicy::Strict => return Err(error),
                ErrorPolicy::Lenient => {
                    warn!(name = %site.name, %error, "call failed, substituting error box");
                    let function = error.function_name().unwrap_or(&site.name).to_string();
                    let node = Node::ErrorBox {
                        title: format!(".{}", function),
                        message: error.to_string(),
                    };
                    self.ctx.call_mut(id).state = CallState::Expanded(vec![node]);
                }
            },
        }

        Ok(())
    }
}

/// Wraps stray inline output into a paragraph when the call sits in block
/// position.
fn finalize(kind: ContentKind, node: Node) -> Node {
    if kind.is_block() && node.is_inline() {
        Node::Paragraph {
            children: vec![node],
        }
    } else {
        node
    }
}

/// Convenience used by tests and by re-entrant evaluation: expands
/// everything pending on a scope and returns nothing on success.
pub fn expand_all(ctx: &mut Context, scope: ScopeId) -> Result<()> {
    CallExpander::new(ctx).expand_scope(scope)
}

/// Whether a subtree is fully expanded: no call site reachable from `nodes`
/// is still pending.
pub fn is_fully_expanded(ctx: &Context, nodes: &[Node]) -> bool {
    nodes.iter().all(|node| match node {
        Node::FunctionCall(id) => match &ctx.call(*id).state {
            CallState::Pending => false,
            CallState::Expanded(children) => is_fully_expanded(ctx, children),
        },
        Node::Paragraph { children }
        | Node::Heading { children, .. }
        | Node::BlockQuote { children }
        | Node::Group(children)
        | Node::Emphasis(children)
        | Node::Strong(children)
        | Node::Link { children, .. }
        | Node::ReferenceLink { children, .. } => is_fully_expanded(ctx, children),
        Node::OrderedList { items, .. } | Node::UnorderedList { items } => items
            .iter()
            .all(|item| is_fully_expanded(ctx, &item.children)),
        _ => true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Span, VellumError};
    use crate::function::call::{CallSite, Invocation};
    use crate::function::{Function, Library};
    use crate::value::{Number, Value};

    fn test_library() -> Library {
        Library::new(
            "test",
            vec![
                Function::native("five", vec![], |_, _| Ok(Value::Number(Number::Int(5)))),
                Function::native("fail", vec![], |_, invocation: Invocation| {
                    Err(invocation.error("deliberate failure"))
                }),
            ],
        )
    }

    fn register(ctx: &mut Context, name: &str, kind: ContentKind) -> CallId {
        ctx.register_call(CallSite::new(
            name,
            vec![],
            ScopeId::ROOT,
            Span::default(),
            kind,
        ))
    }

    #[test]
    fn test_expansion_fills_state() {
        let mut ctx = Context::new();
        ctx.register_library(ScopeId::ROOT, test_library());
        let id = register(&mut ctx, "five", ContentKind::Inline);

        expand_all(&mut ctx, ScopeId::ROOT).unwrap();
        match &ctx.call(id).state {
            CallState::Expanded(children) => assert_eq!(children.len(), 1),
            CallState::Pending => panic!("call was not expanded"),
        }
    }

    #[test]
    fn test_expansion_is_idempotent() {
        let mut ctx = Context::new();
        ctx.register_library(ScopeId::ROOT, test_library());
        let id = register(&mut ctx, "five", ContentKind::Inline);

        expand_all(&mut ctx, ScopeId::ROOT).unwrap();
        let first = ctx.call(id).state.clone();

        // Re-expanding an already-expanded site is a no-op.
        CallExpander::new(&mut ctx).expand(id).unwrap();
        assert_eq!(ctx.call(id).state, first);
    }

    #[test]
    fn test_unresolved_call_lenient_mode() {
        let mut ctx = Context::new();
        let id = register(&mut ctx, "nope", ContentKind::Block);

        expand_all(&mut ctx, ScopeId::ROOT).unwrap();
        match &ctx.call(id).state {
            CallState::Expanded(children) => {
                assert!(matches!(
                    &children[0],
                    Node::ErrorBox { title, .. } if title == ".nope"
                ));
            }
            CallState::Pending => panic!("lenient mode must still expand the site"),
        }
    }

    #[test]
    fn test_unresolved_call_strict_mode() {
        let mut ctx = Context::new();
        ctx.options.error_policy = ErrorPolicy::Strict;
        register(&mut ctx, "nope", ContentKind::Block);

        let error = expand_all(&mut ctx, ScopeId::ROOT).unwrap_err();
        assert!(matches!(
            error,
            VellumError::UnresolvedReference { name, .. } if name == "nope"
        ));
    }

    #[test]
    fn test_runtime_failure_names_the_function() {
        let mut ctx = Context::new();
        ctx.register_library(ScopeId::ROOT, test_library());
        let id = register(&mut ctx, "fail", ContentKind::Block);

        expand_all(&mut ctx, ScopeId::ROOT).unwrap();
        match &ctx.call(id).state {
            CallState::Expanded(children) => {
                assert!(matches!(
                    &children[0],
                    Node::ErrorBox { title, message } if title == ".fail" && message.contains("deliberate failure")
                ));
            }
            CallState::Pending => panic!("call was not expanded"),
        }
    }

    #[test]
    fn test_fully_expanded_check() {
        let mut ctx = Context::new();
        ctx.register_library(ScopeId::ROOT, test_library());
        let id = register(&mut ctx, "five", ContentKind::Inline);
        let tree = vec![Node::Paragraph {
            children: vec![Node::FunctionCall(id)],
        }];

        assert!(!is_fully_expanded(&ctx, &tree));
        expand_all(&mut ctx, ScopeId::ROOT).unwrap();
        assert!(is_fully_expanded(&ctx, &tree));
    }
}
