//! Document metadata accessors.

use chrono::Local;
use vellum_core::{Function, Library, ParamType, Parameter, Value};

/// The `document` library.
pub fn library() -> Library {
    Library::new(
        "document",
        vec![docname_function(), docauthors_function(), today_function()],
    )
}

/// `.docname` reads the document name; `.docname {My Doc}` sets it.
fn docname_function() -> Function {
    Function::native(
        "docname",
        vec![Parameter::new("name", ParamType::String).optional()],
        |ctx, invocation| match invocation.value("name") {
            Some(Value::String(name)) => {
                ctx.document_info.name = Some(name.clone());
                Ok(Value::Void)
            }
            _ => Ok(Value::String(
                ctx.document_info.name.clone().unwrap_or_default(),
            )),
        },
    )
}

/// The document authors as an ordered collection.
fn docauthors_function() -> Function {
    Function::native("docauthors", vec![], |ctx, _| {
        Ok(Value::Ordered(
            ctx.document_info
                .authors
                .iter()
                .map(|author| Value::String(author.clone()))
                .collect(),
        ))
    })
}

/// `.today` — the current date, by default as `YYYY-MM-DD`.
fn today_function() -> Function {
    Function::native(
        "today",
        vec![Parameter::new("format", ParamType::String).optional()],
        |_, invocation| {
            let format = match invocation.value("format") {
                Some(Value::String(format)) => format.clone(),
                _ => "%Y-%m-%d".to_string(),
            };
            Ok(Value::String(Local::now().format(&format).to_string()))
        },
    )
}
