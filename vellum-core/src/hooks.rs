//! Attribute-collection tree walks.
//!
//! Two passes populate the cross-cutting metadata in
//! [`AstAttributes`](crate::ast::attributes::AstAttributes): one right after
//! parsing (section numbering, heading anchors, figure/table labels, presence
//! flags, media references, reference-link resolution) and one after function
//! expansion, when content produced by calls is visible (table of contents,
//! plus a refresh of presence flags and media).

use crate::ast::attributes::{
    AstAttributes, LabelKind, MediaReference, PositionalLabel, PresenceFlags, SectionLocation,
    TocEntry,
};
use crate::ast::{self, Document, Node};
use crate::context::{Context, ContextOptions};
use crate::function::call::CallState;
use crate::slug::slugify;

/// The pre-expansion walk over the authored tree.
pub fn collect_attributes(
    document: &mut Document,
    attributes: &mut AstAttributes,
    options: &ContextOptions,
) {
    let mut state = WalkState::default();
    for node in &mut document.children {
        collect_node(node, attributes, options, &mut state);
    }
}

#[derive(Default)]
struct WalkState {
    counters: Vec<u32>,
    figures: u32,
    tables: u32,
}

impl WalkState {
    /// `1.2`-style prefix of the current top-level section.
    fn section_prefix(&self) -> String {
        self.counters
            .first()
            .map(|major| major.to_string())
            .unwrap_or_else(|| "0".to_string())
    }
}

fn collect_node(
    node: &mut Node,
    attributes: &mut AstAttributes,
    options: &ContextOptions,
    state: &mut WalkState,
) {
    match node {
        Node::Heading {
            level,
            children,
            anchor,
        } => {
            let level = *level as usize;
            if state.counters.len() >= level {
                state.counters.truncate(level);
                *state.counters.last_mut().expect("non-empty counters") += 1;
            } else {
                while state.counters.len() < level {
                    state.counters.push(1);
                }
            }
            if level == 1 {
                state.figures = 0;
                state.tables = 0;
            }
            if options.location_aware {
                attributes.sections.push(SectionLocation {
                    levels: state.counters.clone(),
                });
            }
            if options.auto_identifiers && anchor.is_none() {
                *anchor = Some(slugify(&ast::to_plain_text(children)));
            }
            for child in children.iter_mut() {
                collect_node(child, attributes, options, state);
            }
        }
        Node::CodeBlock { lang, .. } => {
            attributes.presence.code = true;
            if lang.as_deref() == Some("mermaid") {
                attributes.presence.diagram = true;
            }
        }
        Node::Math(_) => attributes.presence.math = true,
        Node::Image { url, .. } => {
            state.figures += 1;
            if options.location_aware {
                attributes.labels.push(PositionalLabel {
                    kind: LabelKind::Figure,
                    label: format!("{}.{}", state.section_prefix(), state.figures),
                });
            }
            let reference = MediaReference::new(url.clone());
            if !attributes.media.iter().any(|m| m.url == reference.url) {
                attributes.media.push(reference);
            }
        }
        Node::Table { header, rows } => {
            state.tables += 1;
            if options.location_aware {
                attributes.labels.push(PositionalLabel {
                    kind: LabelKind::Table,
                    label: format!("{}.{}", state.section_prefix(), state.tables),
                });
            }
            for cell in header.iter_mut().chain(rows.iter_mut().flatten()) {
                for child in cell.iter_mut() {
                    collect_node(child, attributes, options, state);
                }
            }
        }
        Node::ReferenceLink { children, label } => {
            // Resolve against the collected link definitions; unresolved
            // references stay as-is for the renderer to show literally.
            if let Some(definition) = attributes.link_definition(label).cloned() {
                let children = std::mem::take(children);
                *node = Node::Link {
                    children,
                    url: definition.url,
                    title: definition.title,
                };
            }
        }
        Node::Paragraph { children }
        | Node::BlockQuote { children }
        | Node::Group(children)
        | Node::Emphasis(children)
        | Node::Strong(children)
        | Node::Link { children, .. } => {
            for child in children.iter_mut() {
                collect_node(child, attributes, options, state);
            }
        }
        Node::OrderedList { items, .. } | Node::UnorderedList { items } => {
            for item in items.iter_mut() {
                for child in item.children.iter_mut() {
                    collect_node(child, attributes, options, state);
                }
            }
        }
        _ => {}
    }
}

/// The post-expansion walk: assembles the table of contents and refreshes
/// presence flags and media references with content produced by calls.
pub fn collect_expanded_attributes(ctx: &mut Context, document: &Document) {
    let mut toc = Vec::new();
    let mut presence = ctx.attributes.presence;
    let mut media: Vec<MediaReference> = Vec::new();

    scan_expanded(ctx, &document.children, &mut toc, &mut presence, &mut media);

    ctx.attributes.toc = toc;
    ctx.attributes.presence = presence;
    for reference in media {
        if !ctx
            .attributes
            .media
            .iter()
            .any(|m| m.url == reference.url)
        {
            ctx.attributes.media.push(reference);
        }
    }
}

fn scan_expanded(
    ctx: &Context,
    nodes: &[Node],
    toc: &mut Vec<TocEntry>,
    presence: &mut PresenceFlags,
    media: &mut Vec<MediaReference>,
) {
    for node in nodes {
        match node {
            Node::FunctionCall(id) => {
                if let CallState::Expanded(children) = &ctx.call(*id).state {
                    scan_expanded(ctx, children, toc, presence, media);
                }
            }
            Node::Heading {
                level,
                children,
                anchor,
            } => {
                toc.push(TocEntry {
                    text: ctx.plain_text(children),
                    depth: *level,
                    anchor: anchor.clone(),
                });
                scan_expanded(ctx, children, toc, presence, media);
            }
            Node::CodeBlock { lang, .. } => {
                presence.code = true;
                if lang.as_deref() == Some("mermaid") {
                    presence.diagram = true;
                }
            }
            Node::Math(_) => presence.math = true,
            Node::Image { url, .. } => {
                if !media.iter().any(|m| &m.url == url) {
                    media.push(MediaReference::new(url.clone()));
                }
            }
            Node::Paragraph { children }
            | Node::BlockQuote { children }
            | Node::Group(children)
            | Node::Emphasis(children)
            | Node::Strong(children)
            | Node::Link { children, .. }
            | Node::ReferenceLink { children, .. } => {
                scan_expanded(ctx, children, toc, presence, media);
            }
            Node::OrderedList { items, .. } | Node::UnorderedList { items } => {
                for item in items {
                    scan_expanded(ctx, &item.children, toc, presence, media);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use vellum_types::ScopeId;

    fn collected(source: &str) -> (Document, AstAttributes) {
        let mut ctx = Context::new();
        let mut document = parser::parse_document(source, &mut ctx, ScopeId::ROOT).unwrap();
        let mut attributes = std::mem::take(&mut ctx.attributes);
        let options = ContextOptions::default();
        collect_attributes(&mut document, &mut attributes, &options);
        (document, attributes)
    }

    #[test]
    fn test_section_numbering() {
        let (_, attributes) =
            collected("# One\n\n## One-one\n\n## One-two\n\n# Two\n\n### Deep\n");
        let sections: Vec<String> = attributes.sections.iter().map(|s| s.to_string()).collect();
        assert_eq!(sections, vec!["1", "1.1", "1.2", "2", "2.1.1"]);
    }

    #[test]
    fn test_heading_anchors() {
        let (document, _) = collected("# Hello World\n");
        assert!(matches!(
            &document.children[0],
            Node::Heading { anchor: Some(anchor), .. } if anchor == "hello-world"
        ));
    }

    #[test]
    fn test_presence_flags_and_media() {
        let (_, attributes) =
            collected("```mermaid\ngraph TD\n```\n\nInline $x^2$ and ![f](img/f.png)\n");
        assert!(attributes.presence.code);
        assert!(attributes.presence.diagram);
        assert!(attributes.presence.math);
        assert_eq!(attributes.media.len(), 1);
        assert_eq!(attributes.labels.len(), 1);
    }

    #[test]
    fn test_reference_link_resolution() {
        let (document, _) = collected("[docs]: https://example.com\n\nsee [here][docs]\n");
        let children = match &document.children[0] {
            Node::Paragraph { children } => children,
            other => panic!("expected paragraph, got {:?}", other),
        };
        assert!(children
            .iter()
            .any(|n| matches!(n, Node::Link { url, .. } if url == "https://example.com")));
    }

    #[test]
    fn test_toc_assembly() {
        let mut ctx = Context::new();
        let document =
            parser::parse_document("# A\n\n## B\n", &mut ctx, ScopeId::ROOT).unwrap();
        collect_expanded_attributes(&mut ctx, &document);
        assert_eq!(ctx.attributes.toc.len(), 2);
        assert_eq!(ctx.attributes.toc[0].text, "A");
        assert_eq!(ctx.attributes.toc[1].depth, 2);
    }
}
