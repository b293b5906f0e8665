//! Walker for the function-call syntax.
//!
//! A call looks like:
//!
//! ```text
//! .func {arg1} {arg2} name:{arg3}
//!   body argument line 1
//!   body argument line 2
//! ```
//!
//! Inline arguments are brace-delimited with balanced-brace matching and
//! backslash escapes; argument content is free-form (it may contain markdown
//! and nested calls) and is only interpreted during expansion. A trailing
//! body argument consists of the following lines indented by at least two
//! spaces or a tab. Calls chain with `::`, passing the previous call's output
//! as the first argument of the next one.

/// Identifier pattern: a name, or a number (implicit lambda parameters).
fn identifier_len(source: &str) -> usize {
    let mut chars = source.char_indices();
    match chars.next() {
        Some((_, c)) if c.is_ascii_alphabetic() => {}
        Some((_, c)) if c.is_ascii_digit() => {
            return source.chars().take_while(|c| c.is_ascii_digit()).count();
        }
        _ => return 0,
    }
    1 + source[1..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .count()
}

/// A raw argument produced by the walker.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkedArgument {
    pub name: Option<String>,
    pub value: String,
}

/// A complete walked call, chains already folded.
#[derive(Debug, Clone, PartialEq)]
pub struct WalkedCall {
    pub name: String,
    pub arguments: Vec<WalkedArgument>,
    pub body: Option<String>,
    /// Bytes consumed from the start of the input, body included.
    pub consumed: usize,
}

struct Segment {
    name: String,
    arguments: Vec<WalkedArgument>,
    /// Offset just past this segment's inline part.
    end: usize,
}

/// Walks one function call (or `::` chain) at the very start of `source`.
///
/// For a chain `.a {x}::b {y}`, the result is the *last* segment with the raw
/// chain prefix (`.a {x}`) inserted as its first positional argument; the
/// prefix re-parses recursively when that argument is evaluated.
pub fn walk_call(source: &str, allow_body: bool) -> Option<WalkedCall> {
    if !source.starts_with('.') {
        return None;
    }

    let mut segments: Vec<Segment> = Vec::new();
    let mut pos = 1;

    loop {
        let name_len = identifier_len(&source[pos..]);
        if name_len == 0 {
            // `..` or a lone dot: not a call (or an incomplete chain).
            if segments.is_empty() {
                return None;
            }
            break;
        }
        let name = source[pos..pos + name_len].to_string();
        pos += name_len;

        let mut arguments = Vec::new();
        loop {
            match walk_argument(&source[pos..]) {
                Some((argument, len)) => {
                    arguments.push(argument);
                    pos += len;
                }
                None => break,
            }
        }

        segments.push(Segment {
            name,
            arguments,
            end: pos,
        });

        if source[pos..].starts_with("::") {
            pos += 2;
        } else {
            break;
        }
    }

    let inline_end = segments.last().map(|s| s.end).unwrap_or(pos);
    let mut consumed = inline_end;

    let body = if allow_body {
        walk_body(&source[inline_end..]).map(|(body, len)| {
            consumed = inline_end + len;
            body
        })
    } else {
        None
    };

    let last = segments.pop().expect("at least one segment");
    let mut arguments = last.arguments;
    if let Some(previous) = segments.last() {
        // Fold the chain: the raw prefix becomes the first argument.
        arguments.insert(
            0,
            WalkedArgument {
                name: None,
                value: source[..previous.end].to_string(),
            },
        );
    }

    Some(WalkedCall {
        name: last.name,
        arguments,
        body,
        consumed,
    })
}

/// Walks one inline argument: optional `name:` prefix and a balanced-brace
/// value. Returns the argument and the bytes consumed (leading spaces
/// included).
fn walk_argument(source: &str) -> Option<(WalkedArgument, usize)> {
    let spaces = source
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .count();
    let mut pos = spaces;

    let name_len = identifier_len(&source[pos..]);
    let name = if name_len > 0 && source[pos + name_len..].starts_with(":{") {
        let name = source[pos..pos + name_len].to_string();
        pos += name_len + 1;
        Some(name)
    } else {
        None
    };

    if !source[pos..].starts_with('{') {
        return None;
    }
    let content_len = balanced_content_len(&source[pos..])?;
    let value = source[pos + 1..pos + 1 + content_len].to_string();
    pos += content_len + 2;

    Some((
        WalkedArgument {
            name,
            value: trim_indent(&value).trim().to_string(),
        },
        pos,
    ))
}

/// Length of the content between a leading `{` and its balancing `}`.
/// Backslash-escaped braces do not count toward the balance.
fn balanced_content_len(source: &str) -> Option<usize> {
    debug_assert!(source.starts_with('{'));
    let mut depth = 0usize;
    let mut escaped = false;
    for (index, c) in source.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index - 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Walks a trailing body argument: subsequent lines indented by at least two
/// spaces or a tab, blank lines included. Requires the rest of the current
/// line to be blank and at least one non-blank indented line to follow.
fn walk_body(source: &str) -> Option<(String, usize)> {
    let line_end = source.find('\n')?;
    if !source[..line_end].trim().is_empty() {
        return None;
    }

    let mut length = line_end + 1;
    let mut found = false;
    for line in source[line_end + 1..].split_inclusive('\n') {
        let content = line.strip_suffix('\n').unwrap_or(line);
        let indented = content.starts_with("  ") || content.starts_with('\t');
        if !content.trim().is_empty() {
            if !indented {
                break;
            }
            found = true;
        }
        length += line.len();
    }

    if !found {
        return None;
    }

    let body = trim_indent(&source[line_end + 1..length]);
    let body = body.trim_end().to_string();
    if body.is_empty() {
        None
    } else {
        Some((body, length))
    }
}

/// Strips the common leading whitespace of all non-blank lines.
pub fn trim_indent(text: &str) -> String {
    let indent = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.len() - line.trim_start().len())
        .min()
        .unwrap_or(0);

    let mut out = String::with_capacity(text.len());
    let mut first = true;
    for line in text.lines() {
        if !first {
            out.push('\n');
        }
        if line.len() >= indent {
            out.push_str(&line[indent..]);
        } else {
            out.push_str(line.trim_start());
        }
        first = false;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_call() {
        let call = walk_call(".sum {2} {3}", false).unwrap();
        assert_eq!(call.name, "sum");
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(call.arguments[0].value, "2");
        assert_eq!(call.arguments[1].value, "3");
        assert_eq!(call.consumed, 12);
    }

    #[test]
    fn test_named_arguments() {
        let call = walk_call(".greet {John} to:{world}", false).unwrap();
        assert_eq!(call.arguments[0].name, None);
        assert_eq!(call.arguments[1].name.as_deref(), Some("to"));
        assert_eq!(call.arguments[1].value, "world");
    }

    #[test]
    fn test_nested_braces_balance() {
        let call = walk_call(".if {.denominator::equals {0}}", false).unwrap();
        assert_eq!(call.arguments[0].value, ".denominator::equals {0}");
    }

    #[test]
    fn test_bare_name_is_a_call() {
        let call = walk_call(".myvar", false).unwrap();
        assert_eq!(call.name, "myvar");
        assert!(call.arguments.is_empty());
        assert_eq!(call.consumed, 6);
    }

    #[test]
    fn test_numeric_identifier() {
        let call = walk_call(".1", false).unwrap();
        assert_eq!(call.name, "1");
    }

    #[test]
    fn test_chain_folds_into_first_argument() {
        let call = walk_call(".item::lowercase", false).unwrap();
        assert_eq!(call.name, "lowercase");
        assert_eq!(call.arguments.len(), 1);
        assert_eq!(call.arguments[0].value, ".item");
    }

    #[test]
    fn test_chain_keeps_prefix_raw() {
        let call = walk_call(".a {x}::b {y}::c", false).unwrap();
        assert_eq!(call.name, "c");
        assert_eq!(call.arguments[0].value, ".a {x}::b {y}");
    }

    #[test]
    fn test_body_argument() {
        let source = ".if {yes}\n  First line\n\n  Second line\nAfter";
        let call = walk_call(source, true).unwrap();
        assert_eq!(call.body.as_deref(), Some("First line\n\nSecond line"));
        assert_eq!(&source[call.consumed..], "After");
    }

    #[test]
    fn test_no_body_without_indent() {
        let call = walk_call(".if {yes}\nNot a body", true).unwrap();
        assert_eq!(call.body, None);
    }

    #[test]
    fn test_escaped_braces() {
        let call = walk_call(r".show {a \{literal\} brace}", false).unwrap();
        assert_eq!(call.arguments[0].value, r"a \{literal\} brace");
    }

    #[test]
    fn test_not_a_call() {
        assert!(walk_call("plain text", false).is_none());
        assert!(walk_call(". spaced", false).is_none());
        assert!(walk_call("..", false).is_none());
    }
}
