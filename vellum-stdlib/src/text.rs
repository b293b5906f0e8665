//! String manipulation functions.

use unicode_segmentation::UnicodeSegmentation;
use vellum_core::{Function, Library, Number, ParamType, Parameter, Value};

/// The `text` library.
pub fn library() -> Library {
    Library::new(
        "text",
        vec![
            uppercase_function(),
            lowercase_function(),
            capitalize_function(),
            text_function(),
            length_function(),
        ],
    )
}

fn unary(name: &str, body: vellum_core::function::NativeFn) -> Function {
    Function::native(
        name,
        vec![Parameter::new("text", ParamType::String)],
        body,
    )
}

fn uppercase_function() -> Function {
    unary("uppercase", |_, invocation| {
        Ok(Value::String(invocation.string("text")?.to_uppercase()))
    })
}

fn lowercase_function() -> Function {
    unary("lowercase", |_, invocation| {
        Ok(Value::String(invocation.string("text")?.to_lowercase()))
    })
}

/// Uppercases the first grapheme, leaving the rest untouched.
fn capitalize_function() -> Function {
    unary("capitalize", |_, invocation| {
        let text = invocation.string("text")?;
        let mut graphemes = text.graphemes(true);
        let capitalized = match graphemes.next() {
            Some(first) => format!("{}{}", first.to_uppercase(), graphemes.as_str()),
            None => text,
        };
        Ok(Value::String(capitalized))
    })
}

/// `.text {value}` — the string rendition of any value.
fn text_function() -> Function {
    Function::native(
        "text",
        vec![Parameter::new("value", ParamType::Any)],
        |_, invocation| {
            let value = invocation
                .value("value")
                .cloned()
                .unwrap_or(Value::None);
            Ok(Value::String(value.to_display_string()))
        },
    )
}

/// Grapheme count, not byte count.
fn length_function() -> Function {
    unary("length", |_, invocation| {
        let count = invocation.string("text")?.graphemes(true).count();
        Ok(Value::Number(Number::Int(count as i64)))
    })
}
