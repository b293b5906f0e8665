//! Source tokenization.
//!
//! Block-level lexing is line-oriented: the source is segmented into
//! [`BlockToken`]s (heading, fence, list run, quote run, call, paragraph)
//! that the parser then turns into nodes. Inline-level lexing uses a [`logos`]
//! lexer whose tokens drive the inline parser; function-call arguments are
//! context-sensitive (balanced braces, free-form content) and are therefore
//! walked by [`crate::parser::funcall`] rather than lexed.

use crate::parser::funcall;
use logos::Logos;
use once_cell::sync::Lazy;
use regex::Regex;
use vellum_types::Span;

/// A block-level token.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockToken {
    Heading {
        level: u8,
        text: String,
        span: Span,
    },
    Fence {
        lang: Option<String>,
        code: String,
        span: Span,
    },
    /// A run of list lines, kept raw for the parser to split into items.
    List {
        text: String,
        span: Span,
    },
    /// A run of `>` lines with the markers stripped.
    Quote {
        text: String,
        span: Span,
    },
    ThematicBreak {
        span: Span,
    },
    LinkDefinition {
        label: String,
        url: String,
        title: Option<String>,
        span: Span,
    },
    /// A block-position function call, body lines included.
    FunctionCall {
        raw: String,
        span: Span,
    },
    Paragraph {
        text: String,
        span: Span,
    },
}

static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*?)\s*$").unwrap());
static FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^```([A-Za-z0-9_+-]*)\s*$").unwrap());
static THEMATIC_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:-{3,}|\*{3,}|_{3,})\s*$").unwrap());
static LINK_DEFINITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"^\[([^\]]+)\]:\s*(\S+)(?:\s+"([^"]*)")?\s*$"#).unwrap());
static LIST_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[ \t]*(?:[-*+]|\d+[.)])\s+").unwrap());
static CALL_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\.[a-zA-Z][a-zA-Z0-9]*").unwrap());

/// Splits the source into block tokens.
pub fn tokenize_blocks(source: &str) -> Vec<BlockToken> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < source.len() {
        let rest = &source[pos..];
        let line_end = rest.find('\n').map(|i| i + 1).unwrap_or(rest.len());
        let line = rest[..line_end].trim_end_matches('\n');

        if line.trim().is_empty() {
            pos += line_end;
            continue;
        }

        if let Some(captures) = HEADING.captures(line) {
            tokens.push(BlockToken::Heading {
                level: captures[1].len() as u8,
                text: captures[2].to_string(),
                span: Span::new(pos, pos + line.len()),
            });
            pos += line_end;
            continue;
        }

        if let Some(captures) = FENCE.captures(line) {
            let lang = match &captures[1] {
                "" => None,
                lang => Some(lang.to_string()),
            };
            let (code, consumed) = take_fenced_code(&rest[line_end..]);
            tokens.push(BlockToken::Fence {
                lang,
                code,
                span: Span::new(pos, pos + line_end + consumed),
            });
            pos += line_end + consumed;
            continue;
        }

        if THEMATIC_BREAK.is_match(line) {
            tokens.push(BlockToken::ThematicBreak {
                span: Span::new(pos, pos + line.len()),
            });
            pos += line_end;
            continue;
        }

        if let Some(captures) = LINK_DEFINITION.captures(line) {
            tokens.push(BlockToken::LinkDefinition {
                label: captures[1].to_string(),
                url: captures[2].to_string(),
                title: captures.get(3).map(|m| m.as_str().to_string()),
                span: Span::new(pos, pos + line.len()),
            });
            pos += line_end;
            continue;
        }

        if LIST_ITEM.is_match(line) {
            let consumed = take_list_run(rest);
            tokens.push(BlockToken::List {
                text: rest[..consumed].to_string(),
                span: Span::new(pos, pos + consumed),
            });
            pos += consumed;
            continue;
        }

        if let Some(stripped) = line.strip_prefix('>') {
            let mut text = String::from(stripped.strip_prefix(' ').unwrap_or(stripped));
            text.push('\n');
            let mut consumed = line_end;
            for quote_line in rest[line_end..].split_inclusive('\n') {
                let content = quote_line.strip_suffix('\n').unwrap_or(quote_line);
                match content.strip_prefix('>') {
                    Some(inner) => {
                        text.push_str(inner.strip_prefix(' ').unwrap_or(inner));
                        text.push('\n');
                        consumed += quote_line.len();
                    }
                    None => break,
                }
            }
            tokens.push(BlockToken::Quote {
                text,
                span: Span::new(pos, pos + consumed),
            });
            pos += consumed;
            continue;
        }

        if CALL_LINE.is_match(line) {
            if let Some(call) = funcall::walk_call(rest, true) {
                // A block call owns its line; trailing content after the
                // inline part demotes the line to a paragraph.
                let after_inline = &rest[call.consumed.min(line_end)..line_end];
                if call.consumed >= line_end || after_inline.trim().is_empty() {
                    let consumed = call.consumed.max(line_end.min(rest.len()));
                    tokens.push(BlockToken::FunctionCall {
                        raw: rest[..call.consumed].to_string(),
                        span: Span::new(pos, pos + call.consumed),
                    });
                    pos += consumed;
                    continue;
                }
            }
        }

        // Paragraph: accumulate lines until a blank or structural line.
        let mut consumed = line_end;
        for paragraph_line in rest[line_end..].split_inclusive('\n') {
            let content = paragraph_line.strip_suffix('\n').unwrap_or(paragraph_line);
            if content.trim().is_empty() || is_structural(content) {
                break;
            }
            consumed += paragraph_line.len();
        }
        let text = rest[..consumed].trim_end().to_string();
        tokens.push(BlockToken::Paragraph {
            text,
            span: Span::new(pos, pos + consumed),
        });
        pos += consumed;
    }

    tokens
}

fn is_structural(line: &str) -> bool {
    HEADING.is_match(line)
        || FENCE.is_match(line)
        || THEMATIC_BREAK.is_match(line)
        || LIST_ITEM.is_match(line)
        || line.starts_with('>')
        || CALL_LINE.is_match(line)
}

/// Consumes fenced code up to (and including) the closing fence line.
fn take_fenced_code(rest: &str) -> (String, usize) {
    let mut code = String::new();
    let mut consumed = 0;
    for line in rest.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        consumed += line.len();
        if content.trim_end() == "```" {
            return (code, consumed);
        }
        code.push_str(content);
        code.push('\n');
    }
    // Unclosed fence: the rest of the source is code.
    (code, consumed)
}

/// Consumes a run of list lines: items, indented continuations, nothing else.
fn take_list_run(rest: &str) -> usize {
    let mut consumed = 0;
    for line in rest.split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        let is_item = LIST_ITEM.is_match(content);
        let is_continuation =
            !content.trim().is_empty() && (content.starts_with("  ") || content.starts_with('\t'));
        if consumed > 0 && !is_item && !is_continuation {
            break;
        }
        consumed += line.len();
    }
    consumed
}

/// Inline-level tokens.
///
/// Function-call arguments are not lexed here: on [`InlineToken::CallStart`]
/// the inline parser hands over to the call walker, which knows about
/// balanced braces and escape sequences.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InlineToken {
    #[regex(r"\\[\\.{}*`$\[\]()!:]")]
    Escaped,

    #[regex(r"\.[a-zA-Z][a-zA-Z0-9]*|\.[0-9]+")]
    CallStart,

    #[token("**")]
    StrongDelimiter,

    #[token("*")]
    EmphasisDelimiter,

    #[token("`")]
    CodeDelimiter,

    #[token("$")]
    MathDelimiter,

    #[token("![")]
    ImageStart,

    #[token("[")]
    BracketOpen,

    #[token("]")]
    BracketClose,

    #[token("(")]
    ParenOpen,

    #[token(")")]
    ParenClose,

    #[regex(r"[^\\.*`$\[\]()!]+")]
    Text,

    #[regex(r"[.!\\]")]
    Fallback,
}

/// Lexes the next inline token at the start of `source`.
pub fn next_inline_token(source: &str) -> Option<(InlineToken, usize)> {
    let mut lexer = InlineToken::lexer(source);
    match lexer.next() {
        Some(Ok(token)) => Some((token, lexer.span().end)),
        // Unlexable input degrades to a single raw character.
        Some(Err(())) => Some((InlineToken::Fallback, lexer.span().end.max(1))),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_token() {
        let tokens = tokenize_blocks("# Title\n\nBody text\n");
        assert!(matches!(
            &tokens[0],
            BlockToken::Heading { level: 1, text, .. } if text == "Title"
        ));
        assert!(matches!(&tokens[1], BlockToken::Paragraph { text, .. } if text == "Body text"));
    }

    #[test]
    fn test_fence_token() {
        let tokens = tokenize_blocks("```rust\nfn main() {}\n```\nAfter\n");
        assert!(matches!(
            &tokens[0],
            BlockToken::Fence { lang: Some(lang), code, .. }
                if lang == "rust" && code == "fn main() {}\n"
        ));
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_block_call_with_body() {
        let tokens = tokenize_blocks(".if {yes}\n  Hidden content\n\nNext paragraph\n");
        assert!(matches!(
            &tokens[0],
            BlockToken::FunctionCall { raw, .. } if raw.contains("Hidden content")
        ));
        assert!(matches!(&tokens[1], BlockToken::Paragraph { text, .. } if text == "Next paragraph"));
    }

    #[test]
    fn test_call_with_trailing_text_is_a_paragraph() {
        let tokens = tokenize_blocks(".sum {1} {2} and more words\n");
        assert!(matches!(&tokens[0], BlockToken::Paragraph { .. }));
    }

    #[test]
    fn test_list_run_groups_lines() {
        let tokens = tokenize_blocks("- A\n- B\n  - nested\n\ntail\n");
        assert!(matches!(
            &tokens[0],
            BlockToken::List { text, .. } if text.lines().count() == 3
        ));
    }

    #[test]
    fn test_quote_run() {
        let tokens = tokenize_blocks("> quoted\n> more\nplain\n");
        assert!(
            matches!(&tokens[0], BlockToken::Quote { text, .. } if text == "quoted\nmore\n")
        );
    }

    #[test]
    fn test_link_definition() {
        let tokens = tokenize_blocks("[docs]: https://example.com \"Docs\"\n");
        assert!(matches!(
            &tokens[0],
            BlockToken::LinkDefinition { label, url, title: Some(title), .. }
                if label == "docs" && url == "https://example.com" && title == "Docs"
        ));
    }

    #[test]
    fn test_inline_token_priorities() {
        assert_eq!(next_inline_token(".sum rest"), Some((InlineToken::CallStart, 4)));
        assert_eq!(next_inline_token("**bold"), Some((InlineToken::StrongDelimiter, 2)));
        assert_eq!(next_inline_token("![img"), Some((InlineToken::ImageStart, 2)));
        assert_eq!(next_inline_token(". plain"), Some((InlineToken::Fallback, 1)));
        assert_eq!(next_inline_token(r"\{"), Some((InlineToken::Escaped, 2)));
    }
}
