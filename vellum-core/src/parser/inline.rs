//! Inline parsing: emphasis, code spans, math, links, images and inline
//! function calls.
//!
//! Driven by the logos inline tokens; unmatched delimiters degrade to
//! literal text instead of failing. Inline call sites are registered on the
//! supplied scope and appear as [`Node::FunctionCall`] leaves.

use crate::ast::Node;
use crate::context::Context;
use crate::error::Result;
use crate::function::call::{CallArgument, CallSite};
use crate::lexer::{next_inline_token, InlineToken};
use crate::parser::funcall;
use vellum_types::{ContentKind, ScopeId, Span};

/// Parses inline content, registering any call sites on `scope`.
pub fn parse_inlines(source: &str, ctx: &mut Context, scope: ScopeId) -> Result<Vec<Node>> {
    let mut nodes: Vec<Node> = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let (token, len) = match next_inline_token(rest) {
            Some(next) => next,
            None => break,
        };

        match token {
            InlineToken::Text => {
                push_text(&mut nodes, &rest[..len]);
                pos += len;
            }
            InlineToken::Escaped => {
                push_text(&mut nodes, &rest[1..len]);
                pos += len;
            }
            InlineToken::Fallback
            | InlineToken::BracketClose
            | InlineToken::ParenOpen
            | InlineToken::ParenClose => {
                push_text(&mut nodes, &rest[..len]);
                pos += len;
            }
            InlineToken::CallStart => {
                // A dot only begins a call at the start or after a non-word
                // character, so `2.5` and `2..4` stay literal text.
                let call_position = source[..pos]
                    .chars()
                    .last()
                    .map(|c| !c.is_alphanumeric() && c != '.')
                    .unwrap_or(true);
                match funcall::walk_call(rest, false) {
                    Some(call) if call_position => {
                        let id = register_walked_call(ctx, scope, &call, pos, ContentKind::Inline);
                        nodes.push(Node::FunctionCall(id));
                        pos += call.consumed;
                    }
                    _ => {
                        push_text(&mut nodes, &rest[..len]);
                        pos += len;
                    }
                }
            }
            InlineToken::StrongDelimiter => match find_delimiter(&rest[2..], "**") {
                Some(end) => {
                    let children = parse_inlines(&rest[2..2 + end], ctx, scope)?;
                    nodes.push(Node::Strong(children));
                    pos += 2 + end + 2;
                }
                None => {
                    push_text(&mut nodes, "**");
                    pos += len;
                }
            },
            InlineToken::EmphasisDelimiter => match find_delimiter(&rest[1..], "*") {
                Some(end) => {
                    let children = parse_inlines(&rest[1..1 + end], ctx, scope)?;
                    nodes.push(Node::Emphasis(children));
                    pos += 1 + end + 1;
                }
                None => {
                    push_text(&mut nodes, "*");
                    pos += len;
                }
            },
            InlineToken::CodeDelimiter => match find_delimiter(&rest[1..], "`") {
                Some(end) => {
                    nodes.push(Node::CodeSpan(rest[1..1 + end].to_string()));
                    pos += 1 + end + 1;
                }
                None => {
                    push_text(&mut nodes, "`");
                    pos += len;
                }
            },
            InlineToken::MathDelimiter => match find_delimiter(&rest[1..], "$") {
                Some(end) => {
                    nodes.push(Node::Math(rest[1..1 + end].to_string()));
                    pos += 1 + end + 1;
                }
                None => {
                    push_text(&mut nodes, "$");
                    pos += len;
                }
            },
            InlineToken::ImageStart => match parse_image(rest) {
                Some((node, consumed)) => {
                    nodes.push(node);
                    pos += consumed;
                }
                None => {
                    push_text(&mut nodes, "![");
                    pos += len;
                }
            },
            InlineToken::BracketOpen => match parse_link(rest, ctx, scope)? {
                Some((node, consumed)) => {
                    nodes.push(node);
                    pos += consumed;
                }
                None => {
                    push_text(&mut nodes, "[");
                    pos += len;
                }
            },
        }
    }

    Ok(nodes)
}

/// Registers a walked call as an inline or block call site.
pub fn register_walked_call(
    ctx: &mut Context,
    scope: ScopeId,
    call: &funcall::WalkedCall,
    offset: usize,
    kind: ContentKind,
) -> vellum_types::CallId {
    let mut arguments: Vec<CallArgument> = call
        .arguments
        .iter()
        .map(|argument| CallArgument {
            name: argument.name.clone(),
            value: argument.value.clone(),
            body: false,
        })
        .collect();
    if let Some(body) = &call.body {
        arguments.push(CallArgument::body(body.clone()));
    }

    ctx.register_call(CallSite::new(
        call.name.clone(),
        arguments,
        scope,
        Span::new(offset, offset + call.consumed),
        kind,
    ))
}

/// Appends text, merging with a preceding text node and expanding hard
/// breaks (two trailing spaces before a newline).
fn push_text(nodes: &mut Vec<Node>, text: &str) {
    let mut parts = text.split("  \n").peekable();
    while let Some(part) = parts.next() {
        if !part.is_empty() {
            match nodes.last_mut() {
                Some(Node::Text(existing)) => existing.push_str(part),
                _ => nodes.push(Node::Text(part.to_string())),
            }
        }
        if parts.peek().is_some() {
            nodes.push(Node::HardBreak);
            nodes.push(Node::Text("\n".to_string()));
        }
    }
}

/// Finds an unescaped closing delimiter; the returned offset points at it.
fn find_delimiter(haystack: &str, delimiter: &str) -> Option<usize> {
    let mut from = 0;
    while let Some(found) = haystack[from..].find(delimiter) {
        let index = from + found;
        if index > 0 && haystack.as_bytes()[index - 1] == b'\\' {
            from = index + 1;
            continue;
        }
        return Some(index);
    }
    None
}

/// `![alt](url "title")`
fn parse_image(rest: &str) -> Option<(Node, usize)> {
    let alt_end = find_delimiter(&rest[2..], "]")?;
    let alt = rest[2..2 + alt_end].to_string();
    let after = 2 + alt_end + 1;
    let (url, title, consumed) = parse_destination(&rest[after..])?;
    Some((Node::Image { alt, url, title }, after + consumed))
}

/// `[text](url "title")` or `[text][label]`
fn parse_link(
    rest: &str,
    ctx: &mut Context,
    scope: ScopeId,
) -> Result<Option<(Node, usize)>> {
    let text_end = match find_delimiter(&rest[1..], "]") {
        Some(end) => end,
        None => return Ok(None),
    };
    let inner = &rest[1..1 + text_end];
    let after = 1 + text_end + 1;

    if let Some((url, title, consumed)) = parse_destination(&rest[after..]) {
        let children = parse_inlines(inner, ctx, scope)?;
        return Ok(Some((
            Node::Link {
                children,
                url,
                title,
            },
            after + consumed,
        )));
    }

    if rest[after..].starts_with('[') {
        if let Some(label_end) = find_delimiter(&rest[after + 1..], "]") {
            let label = rest[after + 1..after + 1 + label_end].to_string();
            let children = parse_inlines(inner, ctx, scope)?;
            return Ok(Some((
                Node::ReferenceLink { children, label },
                after + 1 + label_end + 1,
            )));
        }
    }

    Ok(None)
}

/// `(url)` or `(url "title")`; returns the consumed length including parens.
fn parse_destination(rest: &str) -> Option<(String, Option<String>, usize)> {
    if !rest.starts_with('(') {
        return None;
    }
    let end = find_delimiter(&rest[1..], ")")?;
    let content = rest[1..1 + end].trim();
    let (url, title) = match content.split_once(char::is_whitespace) {
        Some((url, title)) => {
            let title = title.trim().trim_matches('"');
            (url.to_string(), Some(title.to_string()))
        }
        None => (content.to_string(), None),
    };
    Some((url, title, 1 + end + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Node> {
        let mut ctx = Context::new();
        parse_inlines(source, &mut ctx, ScopeId::ROOT).unwrap()
    }

    #[test]
    fn test_emphasis_and_strong() {
        let nodes = parse("plain *em* and **bold**");
        assert_eq!(
            nodes,
            vec![
                Node::text("plain "),
                Node::Emphasis(vec![Node::text("em")]),
                Node::text(" and "),
                Node::Strong(vec![Node::text("bold")]),
            ]
        );
    }

    #[test]
    fn test_unmatched_delimiter_is_literal() {
        let nodes = parse("2 * 3");
        assert_eq!(nodes, vec![Node::text("2 * 3")]);
    }

    #[test]
    fn test_code_span_and_math() {
        let nodes = parse("`let x` and $x^2$");
        assert_eq!(
            nodes,
            vec![
                Node::CodeSpan("let x".into()),
                Node::text(" and "),
                Node::Math("x^2".into()),
            ]
        );
    }

    #[test]
    fn test_link_and_image() {
        let nodes = parse("[docs](https://example.com \"Docs\") ![logo](logo.png)");
        assert_eq!(
            nodes,
            vec![
                Node::Link {
                    children: vec![Node::text("docs")],
                    url: "https://example.com".into(),
                    title: Some("Docs".into()),
                },
                Node::text(" "),
                Node::Image {
                    alt: "logo".into(),
                    url: "logo.png".into(),
                    title: None,
                },
            ]
        );
    }

    #[test]
    fn test_reference_link() {
        let nodes = parse("[text][label]");
        assert_eq!(
            nodes,
            vec![Node::ReferenceLink {
                children: vec![Node::text("text")],
                label: "label".into(),
            }]
        );
    }

    #[test]
    fn test_inline_call_registration() {
        let mut ctx = Context::new();
        let nodes = parse_inlines("value: .sum {2} {3}!", &mut ctx, ScopeId::ROOT).unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(matches!(nodes[1], Node::FunctionCall(_)));
        assert_eq!(ctx.calls().len(), 1);
        assert_eq!(ctx.calls()[0].name, "sum");
        assert_eq!(ctx.pending_count(ScopeId::ROOT), 1);
    }

    #[test]
    fn test_escapes() {
        let nodes = parse(r"a \*literal\* star");
        assert_eq!(nodes, vec![Node::text("a *literal* star")]);
    }
}
