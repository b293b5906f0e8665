//! Block parsing: turns block tokens into document nodes.

use crate::ast::{Document, ListItem, Node};
use crate::ast::attributes::LinkDefinition;
use crate::context::Context;
use crate::error::Result;
use crate::lexer::BlockToken;
use crate::parser::funcall;
use crate::parser::inline::{parse_inlines, register_walked_call};
use once_cell::sync::Lazy;
use regex::Regex;
use vellum_types::{ContentKind, ScopeId};

static ITEM_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([ \t]*)(?:([-*+])|(\d+)[.)])\s+(.*)$").unwrap());

/// Parses a list of block tokens into nodes, registering call sites and link
/// definitions on the way.
pub fn parse(tokens: &[BlockToken], ctx: &mut Context, scope: ScopeId) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();

    for token in tokens {
        match token {
            BlockToken::Heading { level, text, .. } => {
                let children = parse_inlines(text, ctx, scope)?;
                nodes.push(Node::Heading {
                    level: *level,
                    children,
                    anchor: None,
                });
            }
            BlockToken::Fence { lang, code, .. } => {
                nodes.push(Node::CodeBlock {
                    lang: lang.clone(),
                    code: code.clone(),
                });
            }
            BlockToken::ThematicBreak { .. } => nodes.push(Node::ThematicBreak),
            BlockToken::LinkDefinition {
                label, url, title, ..
            } => {
                ctx.attributes.link_definitions.push(LinkDefinition {
                    label: label.clone(),
                    url: url.clone(),
                    title: title.clone(),
                });
            }
            BlockToken::FunctionCall { raw, span } => {
                // The walker succeeded during lexing; a failure here means the
                // token was mis-lexed and degrades to a paragraph.
                match funcall::walk_call(raw, true) {
                    Some(call) => {
                        let id =
                            register_walked_call(ctx, scope, &call, span.start, ContentKind::Block);
                        nodes.push(Node::FunctionCall(id));
                    }
                    None => {
                        let children = parse_inlines(raw, ctx, scope)?;
                        nodes.push(Node::Paragraph { children });
                    }
                }
            }
            BlockToken::Quote { text, .. } => {
                let children = parse_source(text, ctx, scope)?;
                nodes.push(Node::BlockQuote { children });
            }
            BlockToken::List { text, .. } => {
                nodes.push(parse_list(text, ctx, scope)?);
            }
            BlockToken::Paragraph { text, .. } => {
                let children = parse_inlines(text, ctx, scope)?;
                nodes.push(Node::Paragraph { children });
            }
        }
    }

    Ok(nodes)
}

/// Tokenizes and parses nested source, e.g. quote content or markdown
/// arguments re-entered from the expansion engine.
pub fn parse_source(source: &str, ctx: &mut Context, scope: ScopeId) -> Result<Vec<Node>> {
    let tokens = crate::lexer::tokenize_blocks(source);
    parse(&tokens, ctx, scope)
}

/// Parses a whole document body.
pub fn parse_document(source: &str, ctx: &mut Context, scope: ScopeId) -> Result<Document> {
    Ok(Document::new(parse_source(source, ctx, scope)?))
}

struct RawItem {
    indent: usize,
    ordered: bool,
    first_line: String,
    continuation: Vec<String>,
}

/// Parses a raw run of list lines into a (possibly nested) list node.
fn parse_list(text: &str, ctx: &mut Context, scope: ScopeId) -> Result<Node> {
    let items = split_items(text);
    build_list(&items, ctx, scope)
}

fn split_items(text: &str) -> Vec<RawItem> {
    let mut items: Vec<RawItem> = Vec::new();
    for line in text.lines() {
        if let Some(captures) = ITEM_MARKER.captures(line) {
            items.push(RawItem {
                indent: captures[1].len(),
                ordered: captures.get(3).is_some(),
                first_line: captures[4].to_string(),
                continuation: Vec::new(),
            });
        } else if let Some(item) = items.last_mut() {
            item.continuation.push(line.trim_start().to_string());
        }
    }
    items
}

fn build_list(items: &[RawItem], ctx: &mut Context, scope: ScopeId) -> Result<Node> {
    let base_indent = items.first().map(|i| i.indent).unwrap_or(0);
    let ordered = items.first().map(|i| i.ordered).unwrap_or(false);
    let mut list_items: Vec<ListItem> = Vec::new();

    let mut index = 0;
    while index < items.len() {
        let item = &items[index];

        // Deeper items belong to a nested list under the previous item.
        let mut nested_end = index + 1;
        while nested_end < items.len() && items[nested_end].indent > base_indent {
            nested_end += 1;
        }

        let mut children = parse_inlines(&item.first_line, ctx, scope)?;
        for line in &item.continuation {
            children.push(Node::text(" "));
            children.append(&mut parse_inlines(line, ctx, scope)?);
        }
        let mut children = vec![Node::Paragraph { children }];

        if nested_end > index + 1 {
            children.push(build_list(&items[index + 1..nested_end], ctx, scope)?);
        }

        list_items.push(ListItem::new(children));
        index = nested_end;
    }

    Ok(if ordered {
        Node::OrderedList {
            start: 1,
            items: list_items,
        }
    } else {
        Node::UnorderedList { items: list_items }
    })
}
