//! The per-compilation environment: scope chain, call table, attributes.
//!
//! Scopes live in an arena indexed by [`ScopeId`]; each scope carries its own
//! library set and pending-call queue and links back to its parent. Forked
//! scopes start with an empty local library set that is searched before
//! delegating to the parent, establishing a linear lookup chain from the
//! innermost scope to the document root.

use crate::ast::attributes::AstAttributes;
use crate::ast::Node;
use crate::document::DocumentInfo;
use crate::error::ErrorPolicy;
use crate::function::call::{CallSite, ResolvedCall, UncheckedCall};
use crate::function::{Function, Library};
use std::collections::VecDeque;
use std::path::PathBuf;
use vellum_types::{CallId, ScopeId};

/// Mutable options consulted by hooks and built-in functions.
#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub error_policy: ErrorPolicy,
    /// Whether headings receive automatically generated identifiers.
    pub auto_identifiers: bool,
    /// Whether section locations and positional labels are tracked.
    pub location_aware: bool,
    /// Heading depth down to which a page break is emitted before sections.
    pub page_break_depth: u8,
    /// Base directory for data-reading functions.
    pub working_directory: Option<PathBuf>,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::default(),
            auto_identifiers: true,
            location_aware: true,
            page_break_depth: 1,
            working_directory: None,
        }
    }
}

#[derive(Debug, Default)]
struct ScopeData {
    parent: Option<ScopeId>,
    libraries: Vec<Library>,
    pending: VecDeque<CallId>,
}

/// The mutable per-document environment.
///
/// Owns the scope arena, the call-site table, the tree attributes and the
/// document metadata. One context is created per compilation and attached to
/// exactly one pipeline.
#[derive(Debug)]
pub struct Context {
    scopes: Vec<ScopeData>,
    calls: Vec<CallSite>,
    pub attributes: AstAttributes,
    pub options: ContextOptions,
    pub document_info: DocumentInfo,
    lock_enqueue: bool,
}

impl Context {
    /// Creates a context with a fresh root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![ScopeData::default()],
            calls: Vec::new(),
            attributes: AstAttributes::default(),
            options: ContextOptions::default(),
            document_info: DocumentInfo::default(),
            lock_enqueue: false,
        }
    }

    /// Forks a scope: the child starts with an empty local library set and
    /// delegates lookups to `parent`. Forked scopes are created per function
    /// invocation and never pooled.
    pub fn fork(&mut self, parent: ScopeId) -> ScopeId {
        let id = ScopeId::new(self.scopes.len() as u32);
        self.scopes.push(ScopeData {
            parent: Some(parent),
            libraries: Vec::new(),
            pending: VecDeque::new(),
        });
        id
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.as_u32() as usize].parent
    }

    pub fn register_library(&mut self, scope: ScopeId, library: Library) {
        self.scopes[scope.as_u32() as usize].libraries.push(library);
    }

    /// Removes a library by exact name from a single scope.
    pub fn remove_library(&mut self, scope: ScopeId, name: &str) -> bool {
        let libraries = &mut self.scopes[scope.as_u32() as usize].libraries;
        let before = libraries.len();
        libraries.retain(|l| l.name != name);
        libraries.len() != before
    }

    pub fn has_library(&self, scope: ScopeId, name: &str) -> bool {
        self.scopes[scope.as_u32() as usize]
            .libraries
            .iter()
            .any(|l| l.name == name)
    }

    /// Libraries registered directly on a scope, in registration order.
    pub fn local_libraries(&self, scope: ScopeId) -> &[Library] {
        &self.scopes[scope.as_u32() as usize].libraries
    }

    /// Looks up a function by exact, case-sensitive name.
    ///
    /// Local libraries are scanned in registration order (first match wins),
    /// then the lookup delegates to the parent scope.
    pub fn function_by_name(&self, scope: ScopeId, name: &str) -> Option<Function> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let data = &self.scopes[id.as_u32() as usize];
            for library in &data.libraries {
                if let Some(function) = library.function(name) {
                    return Some(function.clone());
                }
            }
            current = data.parent;
        }
        None
    }

    /// Registers a call site, enqueueing it for expansion unless enqueuing is
    /// currently locked.
    pub fn register_call(&mut self, site: CallSite) -> CallId {
        let scope = site.scope;
        let id = CallId::new(self.calls.len() as u64);
        self.calls.push(site);
        if !self.lock_enqueue {
            self.scopes[scope.as_u32() as usize].pending.push_back(id);
        }
        id
    }

    pub fn call(&self, id: CallId) -> &CallSite {
        &self.calls[id.as_u64() as usize]
    }

    pub fn call_mut(&mut self, id: CallId) -> &mut CallSite {
        &mut self.calls[id.as_u64() as usize]
    }

    pub fn calls(&self) -> &[CallSite] {
        &self.calls
    }

    /// Snapshot of a scope's pending queue; the original queue is cleared.
    ///
    /// Execution can enqueue further calls, so the expansion engine calls
    /// this repeatedly until a drain produces an empty snapshot.
    pub fn dequeue_calls(&mut self, scope: ScopeId) -> Vec<CallId> {
        self.scopes[scope.as_u32() as usize]
            .pending
            .drain(..)
            .collect()
    }

    pub fn pending_count(&self, scope: ScopeId) -> usize {
        self.scopes[scope.as_u32() as usize].pending.len()
    }

    /// Builds a [`ResolvedCall`] for a registered call site, resolving the
    /// function in the call's own owning scope. `None` means the name matched
    /// nothing, which callers distinguish from a real evaluation error.
    pub fn resolve(&self, id: CallId) -> Option<ResolvedCall> {
        self.resolve_site(self.call(id))
    }

    pub fn resolve_site(&self, site: &CallSite) -> Option<ResolvedCall> {
        self.function_by_name(site.scope, &site.name)
            .map(|function| ResolvedCall {
                function,
                arguments: site.arguments.clone(),
                scope: site.scope,
                span: site.span,
            })
    }

    /// Like [`resolve_site`](Self::resolve_site), but defers the unresolved
    /// failure until the call is actually executed.
    pub fn resolve_unchecked(&self, site: &CallSite) -> UncheckedCall {
        UncheckedCall {
            name: site.name.clone(),
            span: site.span,
            resolved: self.resolve_site(site),
        }
    }

    /// Runs an action with call enqueuing locked: call sites registered
    /// during the action are allocated but never queued for expansion.
    pub fn lock_enqueuing<T>(&mut self, action: impl FnOnce(&mut Self) -> T) -> T {
        let previous = self.lock_enqueue;
        self.lock_enqueue = true;
        let result = action(self);
        self.lock_enqueue = previous;
        result
    }

    /// Flattens the visible text of a subtree, descending into the expanded
    /// children of call sites.
    pub fn plain_text(&self, nodes: &[Node]) -> String {
        let mut out = String::new();
        self.collect_plain_text(nodes, &mut out);
        out
    }

    fn collect_plain_text(&self, nodes: &[Node], out: &mut String) {
        use crate::function::call::CallState;
        for node in nodes {
            match node {
                Node::FunctionCall(id) => {
                    if let CallState::Expanded(children) = &self.call(*id).state {
                        self.collect_plain_text(children, out);
                    }
                }
                Node::Text(s) | Node::CodeSpan(s) | Node::Math(s) => out.push_str(s),
                Node::Emphasis(children)
                | Node::Strong(children)
                | Node::Paragraph { children }
                | Node::Heading { children, .. }
                | Node::BlockQuote { children }
                | Node::Group(children)
                | Node::Link { children, .. }
                | Node::ReferenceLink { children, .. } => self.collect_plain_text(children, out),
                Node::OrderedList { items, .. } | Node::UnorderedList { items } => {
                    for item in items {
                        self.collect_plain_text(&item.children, out);
                    }
                }
                Node::Image { alt, .. } => out.push_str(alt),
                _ => {}
            }
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
