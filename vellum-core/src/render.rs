//! Rendering of the expanded tree.
//!
//! Renderers sit at the pipeline's output boundary: they consume the fully
//! expanded tree plus the populated attributes and produce text. The HTML
//! post-render pass wraps the body in a minimal standalone template.

use crate::ast::{Document, ListItem, Node};
use crate::context::Context;
use crate::function::call::CallState;
use std::fmt::Write as _;

/// Output formats supported by the built-in renderers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Html,
    PlainText,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Html => "html",
            OutputFormat::PlainText => "txt",
        }
    }
}

/// A rendered artifact ready for emission.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputResource {
    pub name: String,
    pub content: String,
    pub format: OutputFormat,
}

impl OutputResource {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.name, self.format.extension())
    }
}

/// Converts the expanded tree to output text.
pub trait NodeRenderer {
    fn render(&self, document: &Document, ctx: &Context) -> String;
}

pub fn renderer_for(format: OutputFormat) -> Box<dyn NodeRenderer> {
    match format {
        OutputFormat::Html => Box::new(HtmlRenderer),
        OutputFormat::PlainText => Box::new(PlainTextRenderer),
    }
}

/// Markdown-flavored plain text output.
pub struct PlainTextRenderer;

impl NodeRenderer for PlainTextRenderer {
    fn render(&self, document: &Document, ctx: &Context) -> String {
        let mut out = String::new();
        render_plain_blocks(&document.children, ctx, &mut out);
        let trimmed = out.trim_end();
        format!("{}\n", trimmed)
    }
}

fn render_plain_blocks(nodes: &[Node], ctx: &Context, out: &mut String) {
    for node in nodes {
        match node {
            Node::Heading {
                level, children, ..
            } => {
                let _ = writeln!(
                    out,
                    "{} {}\n",
                    "#".repeat(*level as usize),
                    render_plain_inlines(children, ctx)
                );
            }
            Node::Paragraph { children } => {
                let _ = writeln!(out, "{}\n", render_plain_inlines(children, ctx));
            }
            Node::CodeBlock { lang, code } => {
                let _ = writeln!(
                    out,
                    "```{}\n{}```\n",
                    lang.as_deref().unwrap_or(""),
                    code
                );
            }
            Node::BlockQuote { children } => {
                let mut inner = String::new();
                render_plain_blocks(children, ctx, &mut inner);
                for line in inner.trim_end().lines() {
                    let _ = writeln!(out, "> {}", line);
                }
                out.push('\n');
            }
            Node::OrderedList { start, items } => {
                for (index, item) in items.iter().enumerate() {
                    render_plain_item(out, &format!("{}. ", start + index as u64), item, ctx);
                }
                out.push('\n');
            }
            Node::UnorderedList { items } => {
                for item in items {
                    render_plain_item(out, "- ", item, ctx);
                }
                out.push('\n');
            }
            Node::Table { header, rows } => {
                let cells = |row: &[Vec<Node>]| {
                    row.iter()
                        .map(|cell| render_plain_inlines(cell, ctx))
                        .collect::<Vec<_>>()
                        .join(" | ")
                };
                let _ = writeln!(out, "{}", cells(header));
                for row in rows {
                    let _ = writeln!(out, "{}", cells(row));
                }
                out.push('\n');
            }
            Node::ThematicBreak => {
                out.push_str("---\n\n");
            }
            Node::ErrorBox { title, message } => {
                let _ = writeln!(out, "[error in {}: {}]\n", title, message);
            }
            Node::FunctionCall(id) => {
                if let CallState::Expanded(children) = &ctx.call(*id).state {
                    render_plain_blocks(children, ctx, out);
                }
            }
            Node::Group(children) => render_plain_blocks(children, ctx, out),
            Node::Blank => {}
            inline => {
                let _ = writeln!(
                    out,
                    "{}\n",
                    render_plain_inlines(std::slice::from_ref(inline), ctx)
                );
            }
        }
    }
}

fn render_plain_item(out: &mut String, marker: &str, item: &ListItem, ctx: &Context) {
    let mut inner = String::new();
    render_plain_blocks(&item.children, ctx, &mut inner);
    let mut lines = inner.trim_end().lines();
    if let Some(first) = lines.next() {
        let _ = writeln!(out, "{}{}", marker, first);
    }
    for line in lines {
        if !line.is_empty() {
            let _ = writeln!(out, "  {}", line);
        }
    }
}

fn render_plain_inlines(nodes: &[Node], ctx: &Context) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Emphasis(children) => {
                let _ = write!(out, "_{}_", render_plain_inlines(children, ctx));
            }
            Node::Strong(children) => {
                let _ = write!(out, "**{}**", render_plain_inlines(children, ctx));
            }
            Node::CodeSpan(code) => {
                let _ = write!(out, "`{}`", code);
            }
            Node::Math(math) => {
                let _ = write!(out, "${}$", math);
            }
            Node::Link { children, url, .. } => {
                let _ = write!(out, "{} ({})", render_plain_inlines(children, ctx), url);
            }
            Node::ReferenceLink { children, .. } => {
                out.push_str(&render_plain_inlines(children, ctx));
            }
            Node::Image { alt, .. } => out.push_str(alt),
            Node::HardBreak => out.push('\n'),
            Node::FunctionCall(id) => {
                if let CallState::Expanded(children) = &ctx.call(*id).state {
                    out.push_str(&render_plain_inlines(children, ctx));
                }
            }
            Node::Group(children) => out.push_str(&render_plain_inlines(children, ctx)),
            Node::Blank => {}
            block => {
                // Stray block content in inline position renders on its own.
                let mut inner = String::new();
                render_plain_blocks(std::slice::from_ref(block), ctx, &mut inner);
                out.push_str(inner.trim_end());
            }
        }
    }
    out
}

/// Standalone HTML output.
pub struct HtmlRenderer;

impl NodeRenderer for HtmlRenderer {
    fn render(&self, document: &Document, ctx: &Context) -> String {
        let mut out = String::new();
        render_html_blocks(&document.children, ctx, &mut out);
        out
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn render_html_blocks(nodes: &[Node], ctx: &Context, out: &mut String) {
    for node in nodes {
        match node {
            Node::Heading {
                level,
                children,
                anchor,
            } => {
                if *level <= ctx.options.page_break_depth {
                    out.push_str("<div class=\"page-break\"></div>\n");
                }
                let id = anchor
                    .as_ref()
                    .map(|a| format!(" id=\"{}\"", escape_html(a)))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "<h{level}{id}>{}</h{level}>",
                    render_html_inlines(children, ctx),
                    level = level,
                    id = id
                );
            }
            Node::Paragraph { children } => {
                let _ = writeln!(out, "<p>{}</p>", render_html_inlines(children, ctx));
            }
            Node::CodeBlock { lang, code } => {
                let class = lang
                    .as_ref()
                    .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
                    .unwrap_or_default();
                let _ = writeln!(
                    out,
                    "<pre><code{}>{}</code></pre>",
                    class,
                    escape_html(code)
                );
            }
            Node::BlockQuote { children } => {
                out.push_str("<blockquote>\n");
                render_html_blocks(children, ctx, out);
                out.push_str("</blockquote>\n");
            }
            Node::OrderedList { items, .. } => {
                out.push_str("<ol>\n");
                render_html_items(items, ctx, out);
                out.push_str("</ol>\n");
            }
            Node::UnorderedList { items } => {
                out.push_str("<ul>\n");
                render_html_items(items, ctx, out);
                out.push_str("</ul>\n");
            }
            Node::Table { header, rows } => {
                out.push_str("<table>\n<thead><tr>");
                for cell in header {
                    let _ = write!(out, "<th>{}</th>", render_html_inlines(cell, ctx));
                }
                out.push_str("</tr></thead>\n<tbody>\n");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        let _ = write!(out, "<td>{}</td>", render_html_inlines(cell, ctx));
                    }
                    out.push_str("</tr>\n");
                }
                out.push_str("</tbody>\n</table>\n");
            }
            Node::ThematicBreak => out.push_str("<hr>\n"),
            Node::ErrorBox { title, message } => {
                let _ = writeln!(
                    out,
                    "<div class=\"error-box\"><strong>{}</strong><p>{}</p></div>",
                    escape_html(title),
                    escape_html(message)
                );
            }
            Node::FunctionCall(id) => {
                if let CallState::Expanded(children) = &ctx.call(*id).state {
                    render_html_blocks(children, ctx, out);
                }
            }
            Node::Group(children) => render_html_blocks(children, ctx, out),
            Node::Blank => {}
            inline => {
                let _ = writeln!(
                    out,
                    "<p>{}</p>",
                    render_html_inlines(std::slice::from_ref(inline), ctx)
                );
            }
        }
    }
}

fn render_html_items(items: &[ListItem], ctx: &Context, out: &mut String) {
    for item in items {
        out.push_str("<li>");
        let mut inner = String::new();
        render_html_blocks(&item.children, ctx, &mut inner);
        out.push_str(inner.trim_end());
        out.push_str("</li>\n");
    }
}

fn render_html_inlines(nodes: &[Node], ctx: &Context) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Emphasis(children) => {
                let _ = write!(out, "<em>{}</em>", render_html_inlines(children, ctx));
            }
            Node::Strong(children) => {
                let _ = write!(out, "<strong>{}</strong>", render_html_inlines(children, ctx));
            }
            Node::CodeSpan(code) => {
                let _ = write!(out, "<code>{}</code>", escape_html(code));
            }
            Node::Math(math) => {
                let _ = write!(out, "<span class=\"math\">{}</span>", escape_html(math));
            }
            Node::Link {
                children,
                url,
                title,
            } => {
                let title = title
                    .as_ref()
                    .map(|t| format!(" title=\"{}\"", escape_html(t)))
                    .unwrap_or_default();
                let _ = write!(
                    out,
                    "<a href=\"{}\"{}>{}</a>",
                    escape_html(url),
                    title,
                    render_html_inlines(children, ctx)
                );
            }
            Node::ReferenceLink { children, label } => {
                // Unresolved reference: render literally.
                let _ = write!(
                    out,
                    "[{}][{}]",
                    render_html_inlines(children, ctx),
                    escape_html(label)
                );
            }
            Node::Image { alt, url, title } => {
                let title = title
                    .as_ref()
                    .map(|t| format!(" title=\"{}\"", escape_html(t)))
                    .unwrap_or_default();
                let _ = write!(
                    out,
                    "<img src=\"{}\" alt=\"{}\"{}>",
                    escape_html(url),
                    escape_html(alt),
                    title
                );
            }
            Node::HardBreak => out.push_str("<br>\n"),
            Node::FunctionCall(id) => {
                if let CallState::Expanded(children) = &ctx.call(*id).state {
                    out.push_str(&render_html_inlines(children, ctx));
                }
            }
            Node::Group(children) => out.push_str(&render_html_inlines(children, ctx)),
            _ => {}
        }
    }
    out
}

/// Wraps rendered HTML in a standalone document template.
pub fn wrap_html(body: &str, ctx: &Context) -> String {
    let title = ctx
        .document_info
        .name
        .clone()
        .unwrap_or_else(|| "Untitled Vellum Document".to_string());
    let authors = if ctx.document_info.authors.is_empty() {
        String::new()
    } else {
        format!(
            "<meta name=\"author\" content=\"{}\">\n",
            escape_html(&ctx.document_info.authors.join(", "))
        )
    };

    format!(
        "<!DOCTYPE html>\n<html{lang}>\n<head>\n<meta charset=\"utf-8\">\n{authors}<title>{title}</title>\n</head>\n<body>\n{body}</body>\n</html>\n",
        lang = ctx
            .document_info
            .locale
            .as_ref()
            .map(|l| format!(" lang=\"{}\"", escape_html(l)))
            .unwrap_or_default(),
        authors = authors,
        title = escape_html(&title),
        body = body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;
    use vellum_types::ScopeId;

    fn render_plain(source: &str) -> String {
        let mut ctx = Context::new();
        let document = parser::parse_document(source, &mut ctx, ScopeId::ROOT).unwrap();
        PlainTextRenderer.render(&document, &ctx)
    }

    fn render_html(source: &str) -> String {
        let mut ctx = Context::new();
        let document = parser::parse_document(source, &mut ctx, ScopeId::ROOT).unwrap();
        HtmlRenderer.render(&document, &ctx)
    }

    #[test]
    fn test_plain_text_snapshot() {
        let rendered = render_plain("# Title\n\nSome *emphasis* and `code`.\n");
        insta::assert_snapshot!(rendered, @r###"
        # Title

        Some _emphasis_ and `code`.
        "###);
    }

    #[test]
    fn test_html_escaping() {
        let rendered = render_html("a < b & c\n");
        assert!(rendered.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_html_heading_anchor_and_page_break() {
        let mut ctx = Context::new();
        let mut document =
            parser::parse_document("# Hello World\n", &mut ctx, ScopeId::ROOT).unwrap();
        let mut attributes = std::mem::take(&mut ctx.attributes);
        crate::hooks::collect_attributes(&mut document, &mut attributes, &ctx.options);
        ctx.attributes = attributes;

        let rendered = HtmlRenderer.render(&document, &ctx);
        assert!(rendered.contains("<div class=\"page-break\"></div>"));
        assert!(rendered.contains("<h1 id=\"hello-world\">Hello World</h1>"));
    }

    #[test]
    fn test_wrap_html_uses_document_info() {
        let mut ctx = Context::new();
        ctx.document_info.name = Some("My Doc".to_string());
        ctx.document_info.authors = vec!["A. Author".to_string()];
        let wrapped = wrap_html("<p>x</p>\n", &ctx);
        assert!(wrapped.contains("<title>My Doc</title>"));
        assert!(wrapped.contains("author"));
    }
}
